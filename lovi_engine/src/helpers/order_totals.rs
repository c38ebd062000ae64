use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use lovi_common::Money;
use serde::{Deserialize, Serialize};

use crate::db_types::{NewOrderLine, OrderNumber};

pub const ORDER_NUMBER_PREFIX: &str = "LV";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineAmount {
    pub unit_price: Money,
    pub quantity: i64,
}

impl LineAmount {
    pub fn new(unit_price: Money, quantity: i64) -> Self {
        Self { unit_price, quantity }
    }
}

impl From<&NewOrderLine> for LineAmount {
    fn from(line: &NewOrderLine) -> Self {
        Self { unit_price: line.unit_price, quantity: line.quantity }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Money,
    pub tax_amount: Money,
    pub shipping_cost: Money,
    pub total_amount: Money,
}

/// Subtotal is the sum of the line amounts. Tax is levied on the subtotal only, rounded to the cent.
pub fn compute_totals(lines: &[LineAmount], shipping_cost: Money, tax_rate: f64) -> OrderTotals {
    let subtotal = lines.iter().map(|l| l.unit_price * l.quantity).sum::<Money>();
    let tax_amount = subtotal.apply_rate(tax_rate);
    let total_amount = subtotal + tax_amount + shipping_cost;
    OrderTotals { subtotal, tax_amount, shipping_cost, total_amount }
}

/// `LV` + `YYMMDD` + `-` + a zero-padded daily sequence number.
pub fn format_order_number(date: NaiveDate, sequence: u32) -> OrderNumber {
    OrderNumber(format!("{ORDER_NUMBER_PREFIX}{}-{sequence:03}", date.format("%y%m%d")))
}

/// The start of the local calendar day that contains `now`, expressed in UTC.
pub fn local_midnight(now: DateTime<Local>) -> DateTime<Utc> {
    let Some(midnight) = now.date_naive().and_hms_opt(0, 0, 0) else {
        return now.with_timezone(&Utc);
    };
    // A DST change at midnight can make local midnight ambiguous or skipped. Take the earliest valid instant.
    Local
        .from_local_datetime(&midnight)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
}
