use lovi_common::Money;
use serde::{Deserialize, Serialize};

use crate::RedsysError;

/// `Ds_TransactionType` of a standard authorization
const PAYMENT_TRANSACTION_TYPE: &str = "0";

/// What the store wants to charge. Built from an order before redirecting the customer to the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRequest {
    /// The gateway-facing order reference, 4-12 alphanumeric characters
    pub order_reference: String,
    pub amount: Money,
    pub description: Option<String>,
    /// Redsys language code, e.g. "001" for Spanish, "002" for English
    pub consumer_language: Option<String>,
}

impl PaymentRequest {
    pub fn new<S: Into<String>>(order_reference: S, amount: Money) -> Self {
        Self { order_reference: order_reference.into(), amount, description: None, consumer_language: None }
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_language<S: Into<String>>(mut self, language: S) -> Self {
        self.consumer_language = Some(language.into());
        self
    }
}

/// The JSON document that is base64-encoded into `Ds_MerchantParameters` on the outbound request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerchantParameters {
    /// Amount in minor units (cents)
    #[serde(rename = "DS_MERCHANT_AMOUNT")]
    pub amount: String,
    #[serde(rename = "DS_MERCHANT_ORDER")]
    pub order: String,
    #[serde(rename = "DS_MERCHANT_MERCHANTCODE")]
    pub merchant_code: String,
    #[serde(rename = "DS_MERCHANT_CURRENCY")]
    pub currency: String,
    #[serde(rename = "DS_MERCHANT_TRANSACTIONTYPE")]
    pub transaction_type: String,
    #[serde(rename = "DS_MERCHANT_TERMINAL")]
    pub terminal: String,
    #[serde(rename = "DS_MERCHANT_MERCHANTURL", skip_serializing_if = "Option::is_none", default)]
    pub merchant_url: Option<String>,
    #[serde(rename = "DS_MERCHANT_URLOK", skip_serializing_if = "Option::is_none", default)]
    pub url_ok: Option<String>,
    #[serde(rename = "DS_MERCHANT_URLKO", skip_serializing_if = "Option::is_none", default)]
    pub url_ko: Option<String>,
    #[serde(rename = "DS_MERCHANT_PRODUCTDESCRIPTION", skip_serializing_if = "Option::is_none", default)]
    pub product_description: Option<String>,
    #[serde(rename = "DS_MERCHANT_CONSUMERLANGUAGE", skip_serializing_if = "Option::is_none", default)]
    pub consumer_language: Option<String>,
}

/// The three fields that travel between the store, the customer's browser and the gateway. The field names are part
/// of the Redsys wire contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedParameters {
    #[serde(rename = "Ds_SignatureVersion")]
    pub signature_version: String,
    #[serde(rename = "Ds_MerchantParameters")]
    pub merchant_parameters: String,
    #[serde(rename = "Ds_Signature")]
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentForm {
    /// The gateway URL the form must be posted to
    pub redirect_url: String,
    pub parameters: SignedParameters,
}

/// The decoded contents of `Ds_MerchantParameters` on a gateway notification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackParameters {
    #[serde(rename = "Ds_Date", default)]
    pub date: Option<String>,
    #[serde(rename = "Ds_Hour", default)]
    pub hour: Option<String>,
    #[serde(rename = "Ds_Amount")]
    pub amount: String,
    #[serde(rename = "Ds_Currency", default)]
    pub currency: Option<String>,
    #[serde(rename = "Ds_Order")]
    pub order: String,
    #[serde(rename = "Ds_MerchantCode", default)]
    pub merchant_code: Option<String>,
    #[serde(rename = "Ds_Terminal", default)]
    pub terminal: Option<String>,
    #[serde(rename = "Ds_Response")]
    pub response: String,
    #[serde(rename = "Ds_TransactionType", default)]
    pub transaction_type: Option<String>,
    #[serde(rename = "Ds_SecurePayment", default)]
    pub secure_payment: Option<String>,
    #[serde(rename = "Ds_AuthorisationCode", default)]
    pub authorisation_code: Option<String>,
    #[serde(rename = "Ds_Card_Country", default)]
    pub card_country: Option<String>,
    #[serde(rename = "Ds_Card_Brand", default)]
    pub card_brand: Option<String>,
    #[serde(rename = "Ds_ConsumerLanguage", default)]
    pub consumer_language: Option<String>,
    #[serde(rename = "Ds_MerchantData", default)]
    pub merchant_data: Option<String>,
}

impl CallbackParameters {
    /// The charged amount. Redsys reports it in cents.
    pub fn amount(&self) -> Result<Money, RedsysError> {
        self.amount
            .trim()
            .parse::<i64>()
            .map(Money::from_cents)
            .map_err(|e| RedsysError::MalformedParameters(format!("Ds_Amount '{}' is not an integer. {e}", self.amount)))
    }

    /// The authorisation code, if the gateway supplied a non-blank one.
    pub fn authorisation_code(&self) -> Option<&str> {
        self.authorisation_code.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// Whether the notification reports on a standard payment (`Ds_TransactionType` 0). Cancellations, refunds and
    /// confirmations use other types, and their success codes say nothing about whether the order was paid for.
    /// Gateways that omit the field only ever send payment notifications.
    pub fn is_payment(&self) -> bool {
        self.transaction_type.as_deref().map(str::trim).map_or(true, |t| t == PAYMENT_TRANSACTION_TYPE)
    }

    /// A stable identifier for this gateway outcome.
    ///
    /// Authorized payments carry an authorisation code. Denied payments do not, so the order reference and response
    /// code identify them instead. Redeliveries of the same notification always produce the same id.
    pub fn transaction_id(&self) -> String {
        match self.authorisation_code() {
            Some(code) => format!("{}:{code}", self.order.trim()),
            None => format!("{}:{}", self.order.trim(), self.response.trim()),
        }
    }
}
