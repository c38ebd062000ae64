use std::collections::HashMap;

use chrono::Duration;
use lovi_common::Money;

pub const DEFAULT_TAX_RATE: f64 = 0.21;
pub const DEFAULT_ALLOCATION_ATTEMPTS: u32 = 3;
pub const DEFAULT_NOTIFICATION_QUIET_MINUTES: i64 = 5;

/// Business rules applied when orders are placed and moved through their life cycle.
#[derive(Debug, Clone)]
pub struct OrderPolicy {
    /// Applied to the order subtotal
    pub tax_rate: f64,
    /// Shipping cost per shipping method. Method names are matched case-insensitively.
    pub shipping_rates: HashMap<String, Money>,
    /// How many times an order is re-planned when stock changes underneath it
    pub allocation_attempts: u32,
    /// Customers are not notified of orders leaving `PENDING` within this period of the order being placed
    pub notification_quiet_period: Duration,
}

impl Default for OrderPolicy {
    fn default() -> Self {
        let shipping_rates = [
            ("standard", Money::from_cents(495)),
            ("express", Money::from_cents(995)),
            ("pickup", Money::from_cents(0)),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        Self {
            tax_rate: DEFAULT_TAX_RATE,
            shipping_rates,
            allocation_attempts: DEFAULT_ALLOCATION_ATTEMPTS,
            notification_quiet_period: Duration::minutes(DEFAULT_NOTIFICATION_QUIET_MINUTES),
        }
    }
}

impl OrderPolicy {
    pub fn with_tax_rate(mut self, tax_rate: f64) -> Self {
        self.tax_rate = tax_rate;
        self
    }

    /// Replaces the shipping rate table.
    pub fn with_shipping_rates<I: IntoIterator<Item = (String, Money)>>(mut self, rates: I) -> Self {
        self.shipping_rates = rates.into_iter().map(|(k, v)| (k.to_lowercase(), v)).collect();
        self
    }

    pub fn with_allocation_attempts(mut self, attempts: u32) -> Self {
        self.allocation_attempts = attempts.max(1);
        self
    }

    pub fn with_notification_quiet_period(mut self, period: Duration) -> Self {
        self.notification_quiet_period = period;
        self
    }

    pub fn shipping_cost(&self, method: &str) -> Option<Money> {
        self.shipping_rates.get(&method.trim().to_lowercase()).copied()
    }
}
