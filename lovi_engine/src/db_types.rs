//! Records as they are stored in, and read back from, the database.
use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use lovi_common::Money;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Conversion error: {0}")]
pub struct ConversionError(String);

//--------------------------------------      Variants       ---------------------------------------------------------

/// A purchasable SKU. `stock` is a cached aggregate of the variant's active ledger entries and is only ever written by
/// the aggregate refresh.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Variant {
    pub id: i64,
    pub product_id: i64,
    pub sku: String,
    pub name: String,
    pub stock: i64,
    pub min_stock: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Variant {
    pub fn is_low_on_stock(&self) -> bool {
        self.stock <= self.min_stock
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewVariant {
    pub product_id: i64,
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub min_stock: i64,
}

//--------------------------------------    Stock ledger     ---------------------------------------------------------

/// One pool of inventory for a variant, supplied by a single brand.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct StockEntry {
    pub id: i64,
    pub variant_id: i64,
    pub brand: String,
    pub cost_price: Money,
    pub sale_price: Option<Money>,
    pub location: Option<String>,
    pub quantity: i64,
    pub is_preferred: bool,
    /// Lower values are consumed first
    pub priority: i64,
    pub min_stock: i64,
    pub max_stock: Option<i64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStockEntry {
    pub variant_id: i64,
    pub brand: String,
    pub cost_price: Money,
    #[serde(default)]
    pub sale_price: Option<Money>,
    #[serde(default)]
    pub location: Option<String>,
    pub quantity: i64,
    #[serde(default)]
    pub is_preferred: bool,
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub min_stock: i64,
    #[serde(default)]
    pub max_stock: Option<i64>,
    /// Who received the stock. Recorded on the purchase movement.
    #[serde(default)]
    pub actor: Option<String>,
}

impl NewStockEntry {
    pub fn new<S: Into<String>>(variant_id: i64, brand: S, cost_price: Money, quantity: i64) -> Self {
        Self {
            variant_id,
            brand: brand.into(),
            cost_price,
            sale_price: None,
            location: None,
            quantity,
            is_preferred: false,
            priority: 0,
            min_stock: 0,
            max_stock: None,
            actor: None,
        }
    }

    pub fn preferred(mut self) -> Self {
        self.is_preferred = true;
        self
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_location<S: Into<String>>(mut self, location: S) -> Self {
        self.location = Some(location.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementType {
    Purchase,
    Sale,
    Adjustment,
    Return,
}

impl Display for MovementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MovementType::Purchase => "PURCHASE",
            MovementType::Sale => "SALE",
            MovementType::Adjustment => "ADJUSTMENT",
            MovementType::Return => "RETURN",
        };
        f.write_str(s)
    }
}

/// An immutable record of a single quantity change to a ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: i64,
    pub stock_entry_id: i64,
    pub movement_type: MovementType,
    /// Signed change in quantity
    pub quantity: i64,
    pub previous_quantity: i64,
    pub new_quantity: i64,
    pub order_line_id: Option<i64>,
    pub actor: Option<String>,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStockMovement {
    pub stock_entry_id: i64,
    pub movement_type: MovementType,
    pub quantity: i64,
    pub previous_quantity: i64,
    pub new_quantity: i64,
    pub order_line_id: Option<i64>,
    pub actor: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AllocationStatus {
    Allocated,
    Fulfilled,
    Cancelled,
    Returned,
}

/// Links an order line to the ledger entry that supplied (part of) it.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct OrderLineAllocation {
    pub id: i64,
    pub order_line_id: i64,
    pub stock_entry_id: i64,
    pub quantity: i64,
    pub status: AllocationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------       Orders        ---------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatusType {
    Pending,
    Confirmed,
    InProduction,
    ReadyForPickup,
    Shipped,
    Delivered,
    /// Terminal. Any allocated stock has been returned to the ledger.
    Cancelled,
    /// Terminal.
    Refunded,
}

impl OrderStatusType {
    pub const ALL: [OrderStatusType; 8] = [
        OrderStatusType::Pending,
        OrderStatusType::Confirmed,
        OrderStatusType::InProduction,
        OrderStatusType::ReadyForPickup,
        OrderStatusType::Shipped,
        OrderStatusType::Delivered,
        OrderStatusType::Cancelled,
        OrderStatusType::Refunded,
    ];

    /// The states that can be reached from this one in a single step.
    pub fn allowed_transitions(&self) -> &'static [OrderStatusType] {
        use OrderStatusType::*;
        match self {
            Pending => &[Confirmed, Cancelled],
            Confirmed => &[InProduction, Cancelled],
            InProduction => &[ReadyForPickup, Shipped, Cancelled],
            ReadyForPickup => &[Delivered, Cancelled],
            Shipped => &[Delivered, Cancelled],
            Delivered => &[Refunded],
            Cancelled | Refunded => &[],
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.allowed_transitions().is_empty()
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderStatusType::Pending => "PENDING",
            OrderStatusType::Confirmed => "CONFIRMED",
            OrderStatusType::InProduction => "IN_PRODUCTION",
            OrderStatusType::ReadyForPickup => "READY_FOR_PICKUP",
            OrderStatusType::Shipped => "SHIPPED",
            OrderStatusType::Delivered => "DELIVERED",
            OrderStatusType::Cancelled => "CANCELLED",
            OrderStatusType::Refunded => "REFUNDED",
        };
        f.write_str(s)
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace([' ', '-'], "_");
        OrderStatusType::ALL
            .into_iter()
            .find(|status| status.to_string() == normalized)
            .ok_or_else(|| ConversionError(format!("Invalid order status: {s}")))
    }
}

/// The payment state of an order, as opposed to the state of an individual payment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatusType {
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl Display for PaymentStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentStatusType::Pending => "PENDING",
            PaymentStatusType::Paid => "PAID",
            PaymentStatusType::Failed => "FAILED",
            PaymentStatusType::Refunded => "REFUNDED",
        };
        f.write_str(s)
    }
}

/// A human-readable order number, e.g. `LV261016-001`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderNumber(pub String);

impl OrderNumber {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for OrderNumber {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderNumber {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_number: OrderNumber,
    pub customer_id: String,
    pub status: OrderStatusType,
    pub payment_status: PaymentStatusType,
    pub subtotal: Money,
    pub tax_amount: Money,
    pub shipping_cost: Money,
    pub total_amount: Money,
    pub shipping_method: String,
    pub shipping_address: Option<String>,
    pub tracking_number: Option<String>,
    pub notes: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderLine {
    pub product_id: i64,
    #[serde(default)]
    pub variant_id: Option<i64>,
    pub quantity: i64,
    pub unit_price: Money,
}

impl NewOrderLine {
    pub fn new(product_id: i64, variant_id: Option<i64>, quantity: i64, unit_price: Money) -> Self {
        Self { product_id, variant_id, quantity, unit_price }
    }
}

/// An order as submitted by the storefront, before totals, numbering and allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub customer_id: String,
    #[serde(default)]
    pub shipping_address: Option<String>,
    pub shipping_method: String,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub lines: Vec<NewOrderLine>,
}

impl NewOrder {
    pub fn new<S: Into<String>>(customer_id: S, shipping_method: S) -> Self {
        Self {
            customer_id: customer_id.into(),
            shipping_address: None,
            shipping_method: shipping_method.into(),
            payment_method: None,
            notes: None,
            lines: vec![],
        }
    }

    pub fn with_line(mut self, line: NewOrderLine) -> Self {
        self.lines.push(line);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub variant_id: Option<i64>,
    pub quantity: i64,
    pub unit_price: Money,
}

//--------------------------------------      Payments       ---------------------------------------------------------

/// The state of a single payment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentRecordStatus {
    Pending,
    Completed,
    Failed,
}

impl Display for PaymentRecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentRecordStatus::Pending => "PENDING",
            PaymentRecordStatus::Completed => "COMPLETED",
            PaymentRecordStatus::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// What the gateway told us about a payment attempt. Stored as JSON alongside the payment record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayResponse {
    pub gateway: String,
    pub response_code: String,
    pub message: String,
    pub authorized: bool,
    pub amount: Money,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub authorisation_code: Option<String>,
    #[serde(default)]
    pub card_brand: Option<String>,
    #[serde(default)]
    pub card_country: Option<String>,
    #[serde(default)]
    pub secure_payment: Option<String>,
    /// The date and time reported by the gateway, verbatim
    #[serde(default)]
    pub gateway_timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: i64,
    pub order_id: i64,
    pub method: String,
    pub status: PaymentRecordStatus,
    pub amount: Money,
    pub transaction_id: Option<String>,
    pub gateway_response: Option<Json<GatewayResponse>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
