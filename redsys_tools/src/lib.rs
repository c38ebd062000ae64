//! # Redsys tools
//!
//! A small, dependency-light adapter for the Redsys card payment gateway used by Spanish acquiring banks.
//!
//! * [`build_payment_form`] produces the three signed form fields the customer's browser posts to the gateway.
//! * [`verify_callback`] checks the signature on the asynchronous notification Redsys sends back, and decodes it.
//! * [`interpret_response_code`] turns `Ds_Response` values into authorized/denied/error outcomes.
//!
//! Signatures are HMAC-SHA256 over the base64-encoded merchant parameters, keyed by the base64-decoded merchant
//! secret, and are compared in constant time.
mod config;
mod data_objects;
mod error;
pub mod helpers;
mod response_codes;
mod signature;

pub use config::{RedsysConfig, RedsysEnvironment, REDSYS_PRODUCTION_URL, REDSYS_TEST_URL};
pub use data_objects::{CallbackParameters, MerchantParameters, PaymentForm, PaymentRequest, SignedParameters};
pub use error::RedsysError;
pub use response_codes::{interpret_response_code, ResponseCategory, ResponseInterpretation};
pub use signature::{
    build_payment_form,
    encode_merchant_parameters,
    sign_parameters,
    verify_callback,
    SIGNATURE_VERSION,
};
