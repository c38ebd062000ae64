//! Server configuration
//!
//! Every setting is read from an environment variable (a `.env` file is honoured too). Missing or invalid values fall
//! back to a default, and the fallback is logged so that misconfigured deployments are easy to spot.
//!
//! | Variable                   | Default      |
//! |----------------------------|--------------|
//! | `LV_HOST`                  | `127.0.0.1`  |
//! | `LV_PORT`                  | `8480`       |
//! | `LV_DATABASE_URL`          | *(required)* |
//! | `LV_TAX_RATE`              | `0.21`       |
//! | `LV_SHIPPING_RATES`        | `standard:4.95,express:9.95,pickup:0` |
//! | `LV_PENDING_ORDER_TIMEOUT` | `48` (hours) |
//! | `LV_USE_X_FORWARDED_FOR`   | `false`      |
//! | `LV_USE_FORWARDED`         | `false`      |
//! | `LV_REDSYS_IP_WHITELIST`   | *(disabled)* |
//! | `LV_NOTIFICATION_URL`      | *(disabled)* |
//!
//! The Redsys merchant settings (`LV_REDSYS_*`) are read by [`RedsysConfig::new_from_env_or_default`].
use std::{env, net::IpAddr, str::FromStr};

use chrono::Duration;
use log::*;
use lovi_common::{
    helpers::{parse_boolean_flag, parse_key_value_list},
    Money,
};
use lovi_engine::OrderPolicy;
use redsys_tools::RedsysConfig;

const DEFAULT_LV_HOST: &str = "127.0.0.1";
const DEFAULT_LV_PORT: u16 = 8480;
const DEFAULT_PENDING_ORDER_TIMEOUT_HRS: i64 = 48;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_forwarded: bool,
    /// If supplied, requests against /webhooks endpoints will be checked against this list of addresses.
    /// To explicitly disable the whitelist, set `LV_REDSYS_IP_WHITELIST` to "false", "none", or "0".
    pub redsys_whitelist: Option<Vec<IpAddr>>,
    /// Customer notifications and stock alerts are POSTed to this URL, if it is set.
    pub notification_url: Option<String>,
    /// The time an order may wait for payment before it is cancelled and its stock released.
    pub pending_order_timeout: Duration,
    pub policy: OrderPolicy,
    pub redsys: RedsysConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_LV_HOST.to_string(),
            port: DEFAULT_LV_PORT,
            database_url: String::default(),
            use_x_forwarded_for: false,
            use_forwarded: false,
            redsys_whitelist: None,
            notification_url: None,
            pending_order_timeout: Duration::hours(DEFAULT_PENDING_ORDER_TIMEOUT_HRS),
            policy: OrderPolicy::default(),
            redsys: RedsysConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("LV_HOST").ok().unwrap_or_else(|| DEFAULT_LV_HOST.into());
        let port = env::var("LV_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!("🪛️ {s} is not a valid port for LV_PORT. {e} Using the default, {DEFAULT_LV_PORT}, instead.");
                    DEFAULT_LV_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_LV_PORT);
        let database_url = env::var("LV_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ LV_DATABASE_URL is not set. Please set it to the URL for the store database.");
            String::default()
        });
        let use_x_forwarded_for = parse_boolean_flag(env::var("LV_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("LV_USE_FORWARDED").ok(), false);
        let redsys_whitelist = configure_whitelist(env::var("LV_REDSYS_IP_WHITELIST").ok());
        let notification_url = env::var("LV_NOTIFICATION_URL").ok().filter(|s| !s.trim().is_empty());
        match &notification_url {
            Some(url) => info!("🪛️ Notifications will be forwarded to {url}"),
            None => info!("🪛️ LV_NOTIFICATION_URL is not set. Notifications will only be logged."),
        }
        let pending_order_timeout = configure_pending_order_timeout();
        let policy = configure_policy();
        let redsys = RedsysConfig::new_from_env_or_default();
        Self {
            host,
            port,
            database_url,
            use_x_forwarded_for,
            use_forwarded,
            redsys_whitelist,
            notification_url,
            pending_order_timeout,
            policy,
            redsys,
        }
    }
}

fn configure_whitelist(value: Option<String>) -> Option<Vec<IpAddr>> {
    let whitelist = value.and_then(|s| {
        if ["none", "false", "0", ""].contains(&s.trim().to_lowercase().as_str()) {
            info!(
                "🪛️ Redsys IP whitelist is disabled. If this is not what you want, set LV_REDSYS_IP_WHITELIST to a \
                 comma-separated list of IP addresses to enable it."
            );
            return None;
        }
        let ip_addrs = s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(|s| {
                IpAddr::from_str(s)
                    .map_err(|e| warn!("🪛️ Ignoring invalid IP address ({s}) in LV_REDSYS_IP_WHITELIST: {e}"))
                    .ok()
            })
            .collect::<Vec<IpAddr>>();
        Some(ip_addrs)
    });
    match &whitelist {
        Some(whitelist) if whitelist.is_empty() => {
            warn!(
                "🚨️ The Redsys IP whitelist was configured, but is empty. The server will run, but won't accept any \
                 payment notifications."
            );
        },
        None => {
            info!("🪛️ No Redsys IP whitelist is set. Only signature validation will be used.");
        },
        Some(v) => {
            let addrs = v.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", ");
            info!("🪛️ Redsys IP whitelist: {addrs}");
        },
    }
    whitelist
}

fn configure_pending_order_timeout() -> Duration {
    env::var("LV_PENDING_ORDER_TIMEOUT")
        .map_err(|_| {
            info!(
                "🪛️ LV_PENDING_ORDER_TIMEOUT is not set. Using the default value of {} hrs.",
                DEFAULT_PENDING_ORDER_TIMEOUT_HRS
            )
        })
        .and_then(|s| {
            s.trim()
                .parse::<i64>()
                .map(Duration::hours)
                .map_err(|e| warn!("🪛️ Invalid configuration value for LV_PENDING_ORDER_TIMEOUT. {e}"))
        })
        .ok()
        .unwrap_or_else(|| Duration::hours(DEFAULT_PENDING_ORDER_TIMEOUT_HRS))
}

fn configure_policy() -> OrderPolicy {
    let mut policy = OrderPolicy::default();
    match env::var("LV_TAX_RATE").map(|s| s.trim().parse::<f64>()) {
        Ok(Ok(rate)) if (0.0..1.0).contains(&rate) => policy = policy.with_tax_rate(rate),
        Ok(Ok(rate)) => warn!("🪛️ LV_TAX_RATE must be a fraction between 0 and 1, not {rate}. Using the default."),
        Ok(Err(e)) => warn!("🪛️ Invalid configuration value for LV_TAX_RATE. {e}. Using the default."),
        Err(_) => info!("🪛️ LV_TAX_RATE is not set. Using the default value of {}.", policy.tax_rate),
    }
    if let Ok(rates) = env::var("LV_SHIPPING_RATES") {
        let rates = parse_shipping_rates(&rates);
        if rates.is_empty() {
            warn!("🪛️ LV_SHIPPING_RATES has no valid entries. Using the default shipping rates.");
        } else {
            policy = policy.with_shipping_rates(rates);
        }
    }
    let methods = policy
        .shipping_rates
        .iter()
        .map(|(method, cost)| format!("{method} ({cost})"))
        .collect::<Vec<_>>()
        .join(", ");
    info!("🪛️ Shipping methods: {methods}");
    policy
}

/// Parses `method:amount` pairs, logging and skipping any that are invalid.
pub fn parse_shipping_rates(value: &str) -> Vec<(String, Money)> {
    let (pairs, rejected) = parse_key_value_list(value);
    for item in rejected {
        warn!("🪛️ Ignoring invalid shipping rate '{item}'. Use the form method:amount");
    }
    pairs
        .into_iter()
        .filter_map(|(method, amount)| match Money::from_str(&amount) {
            Ok(cost) if !cost.is_negative() => Some((method, cost)),
            Ok(_) => {
                warn!("🪛️ Ignoring negative shipping rate for {method}");
                None
            },
            Err(e) => {
                warn!("🪛️ Ignoring shipping rate for {method}. {e}");
                None
            },
        })
        .collect()
}
