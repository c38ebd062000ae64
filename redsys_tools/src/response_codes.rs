use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseCategory {
    Authorized,
    Denied,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseInterpretation {
    pub code: String,
    pub success: bool,
    pub category: ResponseCategory,
    pub message: String,
}

use ResponseCategory::*;

/// Codes with a curated description. Anything else falls back to the numeric ranges.
const KNOWN_CODES: &[(&str, ResponseCategory, &str)] = &[
    ("0000", Authorized, "Transaction authorized"),
    ("0400", Authorized, "Cancellation authorized"),
    ("0900", Authorized, "Refund or confirmation authorized"),
    ("0101", Denied, "Card expired"),
    ("0102", Denied, "Card temporarily blocked or under suspicion of fraud"),
    ("0104", Denied, "Operation not allowed for this card or terminal"),
    ("0106", Denied, "PIN attempts exceeded"),
    ("0116", Denied, "Insufficient funds"),
    ("0118", Denied, "Card not registered"),
    ("0125", Denied, "Card not effective"),
    ("0129", Denied, "Incorrect security code (CVV2/CVC2)"),
    ("0180", Denied, "Card not supported by the system"),
    ("0184", Denied, "Cardholder authentication failed"),
    ("0190", Denied, "Denied by the issuer without a specific reason"),
    ("0191", Denied, "Incorrect expiry date"),
    ("0195", Denied, "Strong customer authentication required"),
    ("0202", Error, "Card blocked by the issuer under suspicion of fraud"),
    ("0904", Error, "Merchant not registered in FUC"),
    ("0909", Error, "Gateway system error"),
    ("0912", Error, "Issuer not available"),
    ("0913", Error, "Duplicate order"),
    ("0944", Error, "Incorrect session"),
    ("0950", Error, "Refund not allowed"),
    ("9064", Error, "Incorrect number of card digits"),
    ("9078", Error, "Operation type not allowed for this card"),
    ("9093", Error, "Card does not exist"),
    ("9094", Error, "Rejected by international servers"),
    ("9104", Error, "Merchant requires secure payment and cardholder has no secure key"),
    ("9218", Error, "Merchant does not allow secure operations through the host-to-host entry"),
    ("9253", Error, "Card fails the check-digit test"),
    ("9256", Error, "Merchant cannot perform pre-authorizations"),
    ("9257", Error, "Card does not allow pre-authorizations"),
    ("9261", Error, "Operation stopped for exceeding the control of restrictions at the gateway"),
    ("9912", Error, "Issuer not available"),
    ("9913", Error, "Error in merchant confirmation sent to the gateway"),
    ("9914", Error, "Merchant confirmation was KO"),
    ("9915", Denied, "Payment cancelled by the user"),
    ("9928", Error, "Cancellation of deferred authorization performed by the gateway"),
    ("9929", Error, "Cancellation of deferred authorization performed by the merchant"),
    ("9997", Error, "Another transaction with the same card is being processed"),
    ("9998", Error, "Card details request in progress"),
    ("9999", Error, "Operation redirected to the issuer for authentication"),
];

/// Interprets a `Ds_Response` value.
///
/// Curated codes map to a fixed description. Other numeric codes fall into ranges: 0-99 authorized, 100-199 denied
/// and 200 or more an error. Non-numeric codes are errors.
pub fn interpret_response_code(code: &str) -> ResponseInterpretation {
    let trimmed = code.trim();
    let normalized = match trimmed.parse::<u32>() {
        Ok(n) if trimmed.len() < 4 => format!("{n:04}"),
        _ => trimmed.to_string(),
    };
    if let Some((_, category, message)) = KNOWN_CODES.iter().find(|(c, _, _)| *c == normalized) {
        return interpretation(normalized, *category, message.to_string());
    }
    match normalized.parse::<u32>() {
        Ok(n) if n <= 99 => interpretation(normalized, Authorized, format!("Transaction authorized (code {n})")),
        Ok(n) if n <= 199 => interpretation(normalized, Denied, format!("Transaction denied by the issuer (code {n})")),
        Ok(n) => interpretation(normalized, Error, format!("Gateway error (code {n})")),
        Err(_) => interpretation(normalized.clone(), Error, format!("Unrecognised response code '{normalized}'")),
    }
}

fn interpretation(code: String, category: ResponseCategory, message: String) -> ResponseInterpretation {
    ResponseInterpretation { code, success: category == Authorized, category, message }
}
