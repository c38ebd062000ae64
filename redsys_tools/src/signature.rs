use base64::{STANDARD, URL_SAFE};
use hmac::{Hmac, Mac};
use log::*;
use sha2::Sha256;

use crate::{
    helpers::{is_valid_merchant_code, is_valid_order_reference, is_valid_terminal},
    CallbackParameters,
    MerchantParameters,
    PaymentForm,
    PaymentRequest,
    RedsysConfig,
    RedsysError,
    SignedParameters,
};

pub const SIGNATURE_VERSION: &str = "HMAC_SHA256_V1";
const MIN_SECRET_KEY_LENGTH: usize = 32;

type HmacSha256 = Hmac<Sha256>;

/// Builds the signed form fields for redirecting a customer to the gateway.
///
/// The request is validated before anything is signed:
/// * the amount must be positive,
/// * the order reference must be 4-12 alphanumeric characters,
/// * the merchant code must be exactly 9 digits, and the terminal 1-3 digits,
/// * the secret key must decode to at least 32 bytes.
pub fn build_payment_form(config: &RedsysConfig, request: &PaymentRequest) -> Result<PaymentForm, RedsysError> {
    if !request.amount.is_positive() {
        return Err(RedsysError::InvalidAmount(request.amount.to_string()));
    }
    if !is_valid_order_reference(&request.order_reference) {
        return Err(RedsysError::InvalidOrderReference(request.order_reference.clone()));
    }
    if !is_valid_merchant_code(&config.merchant_code) {
        return Err(RedsysError::InvalidMerchantCode);
    }
    if !is_valid_terminal(&config.terminal) {
        return Err(RedsysError::InvalidTerminal(config.terminal.clone()));
    }
    let key = decode_secret_key(config.secret_key.reveal())?;
    let parameters = MerchantParameters {
        amount: request.amount.value().to_string(),
        order: request.order_reference.clone(),
        merchant_code: config.merchant_code.clone(),
        currency: config.currency.clone(),
        transaction_type: config.transaction_type.clone(),
        terminal: config.terminal.clone(),
        merchant_url: config.merchant_url.clone(),
        url_ok: config.url_ok.clone(),
        url_ko: config.url_ko.clone(),
        product_description: request.description.clone(),
        consumer_language: request.consumer_language.clone(),
    };
    let merchant_parameters = encode_merchant_parameters(&parameters)?;
    let signature = base64::encode(keyed_mac(&key, &merchant_parameters)?.finalize().into_bytes());
    debug!("💳️ Built payment form for order {} ({})", request.order_reference, request.amount);
    Ok(PaymentForm {
        redirect_url: config.payment_url().to_string(),
        parameters: SignedParameters {
            signature_version: SIGNATURE_VERSION.to_string(),
            merchant_parameters,
            signature,
        },
    })
}

/// JSON-encodes the parameters and then base64-encodes the JSON.
pub fn encode_merchant_parameters(parameters: &MerchantParameters) -> Result<String, RedsysError> {
    let json = serde_json::to_vec(parameters).map_err(|e| RedsysError::EncodingError(e.to_string()))?;
    Ok(base64::encode(json))
}

/// Signs an already-encoded parameter blob with the base64-encoded merchant secret.
pub fn sign_parameters(encoded_parameters: &str, secret_key: &str) -> Result<String, RedsysError> {
    let key = decode_secret_key(secret_key)?;
    let mac = keyed_mac(&key, encoded_parameters)?;
    Ok(base64::encode(mac.finalize().into_bytes()))
}

/// Verifies a gateway notification and decodes its parameters.
///
/// The signature is checked before the parameter blob is decoded, and the comparison is constant-time. Signatures are
/// accepted in either the standard or the URL-safe base64 alphabet. A failed check never says which part failed.
pub fn verify_callback(secret_key: &str, parameters: &SignedParameters) -> Result<CallbackParameters, RedsysError> {
    let version = parameters.signature_version.trim();
    if version != SIGNATURE_VERSION {
        return Err(RedsysError::UnsupportedSignatureVersion(version.to_string()));
    }
    let key = decode_secret_key(secret_key)?;
    let supplied = decode_either_alphabet(&parameters.signature).map_err(|e| {
        warn!("💳️ Gateway signature is not valid base64. {e}");
        RedsysError::InvalidSignature
    })?;
    keyed_mac(&key, &parameters.merchant_parameters)?.verify_slice(&supplied).map_err(|_| {
        warn!("💳️ Gateway signature does not match the merchant parameters. Signature: {}", parameters.signature);
        RedsysError::InvalidSignature
    })?;
    let json = decode_either_alphabet(&parameters.merchant_parameters)
        .map_err(|e| RedsysError::MalformedParameters(format!("Ds_MerchantParameters is not valid base64. {e}")))?;
    let callback = serde_json::from_slice::<CallbackParameters>(&json)
        .map_err(|e| RedsysError::MalformedParameters(format!("Ds_MerchantParameters is not valid JSON. {e}")))?;
    trace!("💳️ Verified gateway notification for order {}", callback.order);
    Ok(callback)
}

fn decode_secret_key(secret_key: &str) -> Result<Vec<u8>, RedsysError> {
    let secret_key = secret_key.trim();
    if secret_key.is_empty() {
        return Err(RedsysError::InvalidSecretKey("No secret key has been configured".to_string()));
    }
    let key = base64::decode(secret_key)
        .map_err(|e| RedsysError::InvalidSecretKey(format!("The key is not valid base64. {e}")))?;
    if key.len() < MIN_SECRET_KEY_LENGTH {
        return Err(RedsysError::InvalidSecretKey(format!(
            "The decoded key is {} bytes long. At least {MIN_SECRET_KEY_LENGTH} bytes are required",
            key.len()
        )));
    }
    Ok(key)
}

fn keyed_mac(key: &[u8], encoded_parameters: &str) -> Result<HmacSha256, RedsysError> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|e| RedsysError::InvalidSecretKey(e.to_string()))?;
    mac.update(encoded_parameters.as_bytes());
    Ok(mac)
}

fn decode_either_alphabet(value: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let value = value.trim();
    if value.contains(|c: char| c == '-' || c == '_') {
        base64::decode_config(value, URL_SAFE)
    } else {
        base64::decode_config(value, STANDARD)
    }
}
