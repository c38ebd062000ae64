use std::{env, fmt::Display, str::FromStr};

use log::*;
use lovi_common::{Secret, EURO_ISO_NUMERIC_CODE};

pub const REDSYS_TEST_URL: &str = "https://sis-t.redsys.es:25443/sis/realizarPago";
pub const REDSYS_PRODUCTION_URL: &str = "https://sis.redsys.es/sis/realizarPago";
/// Transaction type "0" is a standard authorization.
const DEFAULT_TRANSACTION_TYPE: &str = "0";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RedsysEnvironment {
    #[default]
    Test,
    Production,
}

impl RedsysEnvironment {
    pub fn payment_url(&self) -> &'static str {
        match self {
            Self::Test => REDSYS_TEST_URL,
            Self::Production => REDSYS_PRODUCTION_URL,
        }
    }
}

impl FromStr for RedsysEnvironment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "test" | "sandbox" => Ok(Self::Test),
            "production" | "prod" | "live" => Ok(Self::Production),
            other => Err(format!("Unknown Redsys environment: {other}")),
        }
    }
}

impl Display for RedsysEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Test => write!(f, "test"),
            Self::Production => write!(f, "production"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RedsysConfig {
    /// The 9-digit FUC code assigned to the merchant by the acquiring bank.
    pub merchant_code: String,
    pub terminal: String,
    /// The base64-encoded SHA-256 signing key from the Redsys administration module.
    pub secret_key: Secret<String>,
    /// ISO-4217 numeric currency code
    pub currency: String,
    pub transaction_type: String,
    pub environment: RedsysEnvironment,
    /// Where Redsys posts the asynchronous notification
    pub merchant_url: Option<String>,
    pub url_ok: Option<String>,
    pub url_ko: Option<String>,
}

impl RedsysConfig {
    pub fn new(merchant_code: &str, terminal: &str, secret_key: &str) -> Self {
        Self {
            merchant_code: merchant_code.to_string(),
            terminal: terminal.to_string(),
            secret_key: Secret::new(secret_key.to_string()),
            currency: EURO_ISO_NUMERIC_CODE.to_string(),
            transaction_type: DEFAULT_TRANSACTION_TYPE.to_string(),
            ..Default::default()
        }
    }

    pub fn new_from_env_or_default() -> Self {
        let merchant_code = env::var("LV_REDSYS_MERCHANT_CODE").unwrap_or_else(|_| {
            warn!("🪛️ LV_REDSYS_MERCHANT_CODE not set. Payment forms cannot be built until it is configured.");
            String::default()
        });
        let terminal = env::var("LV_REDSYS_TERMINAL").unwrap_or_else(|_| {
            info!("🪛️ LV_REDSYS_TERMINAL not set, using terminal 1");
            "1".to_string()
        });
        let secret_key = Secret::new(env::var("LV_REDSYS_SECRET_KEY").unwrap_or_else(|_| {
            warn!("🪛️ LV_REDSYS_SECRET_KEY not set. Gateway callbacks will be rejected.");
            String::default()
        }));
        let currency = env::var("LV_REDSYS_CURRENCY").unwrap_or_else(|_| EURO_ISO_NUMERIC_CODE.to_string());
        let environment = env::var("LV_REDSYS_ENVIRONMENT")
            .ok()
            .and_then(|s| {
                s.parse::<RedsysEnvironment>()
                    .map_err(|e| warn!("🪛️ {e}. Falling back to the test environment."))
                    .ok()
            })
            .unwrap_or_default();
        info!("🪛️ Redsys environment: {environment}");
        let merchant_url = env::var("LV_REDSYS_MERCHANT_URL").ok();
        let url_ok = env::var("LV_REDSYS_URL_OK").ok();
        let url_ko = env::var("LV_REDSYS_URL_KO").ok();
        Self {
            merchant_code,
            terminal,
            secret_key,
            currency,
            transaction_type: DEFAULT_TRANSACTION_TYPE.to_string(),
            environment,
            merchant_url,
            url_ok,
            url_ko,
        }
    }

    pub fn payment_url(&self) -> &'static str {
        self.environment.payment_url()
    }
}
