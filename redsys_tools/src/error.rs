use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RedsysError {
    #[error("Invalid payment amount: {0}. The amount must be greater than zero")]
    InvalidAmount(String),
    #[error("Invalid order reference '{0}'. It must be 4 to 12 alphanumeric characters")]
    InvalidOrderReference(String),
    #[error("Invalid merchant code. It must be exactly 9 digits")]
    InvalidMerchantCode,
    #[error("Invalid terminal '{0}'. It must be 1 to 3 digits")]
    InvalidTerminal(String),
    #[error("Invalid merchant secret key. {0}")]
    InvalidSecretKey(String),
    #[error("Unsupported signature version: {0}")]
    UnsupportedSignatureVersion(String),
    #[error("The gateway signature could not be verified")]
    InvalidSignature,
    #[error("Malformed merchant parameters. {0}")]
    MalformedParameters(String),
    #[error("Could not encode merchant parameters. {0}")]
    EncodingError(String),
}
