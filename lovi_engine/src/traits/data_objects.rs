use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{
        GatewayResponse,
        NewOrder,
        Order,
        OrderLine,
        OrderLineAllocation,
        OrderStatusType,
        PaymentRecord,
        StockEntry,
        StockMovement,
        Variant,
    },
    helpers::{AllocationPlan, OrderTotals},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivedStock {
    pub entry: StockEntry,
    pub movement: StockMovement,
    pub variant: Variant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAdjustment {
    pub stock_entry_id: i64,
    /// Signed change in quantity. May not take the entry below zero.
    pub delta: i64,
    pub reason: Option<String>,
    pub actor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustmentResult {
    pub entry: StockEntry,
    pub movement: StockMovement,
    pub variant: Variant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovedStockEntry {
    pub entry: StockEntry,
    /// `true` if the entry was deleted outright, `false` if it had history and was deactivated instead
    pub deleted: bool,
    pub variant: Variant,
}

/// Everything needed to persist a new order in one transaction. `plans` is aligned with `order.lines`; lines without
/// a variant have no plan.
#[derive(Debug, Clone)]
pub struct OrderSubmission {
    pub order: NewOrder,
    pub totals: OrderTotals,
    pub plans: Vec<Option<AllocationPlan>>,
    pub payment_method: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertedOrder {
    pub order: Order,
    pub lines: Vec<OrderLine>,
    pub allocations: Vec<OrderLineAllocation>,
    pub payment: PaymentRecord,
    /// Variants whose stock was drawn down, as they stand after the insert
    pub variants: Vec<Variant>,
}

/// A conditional status change. It only succeeds if the order is still in `from` when the update runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub order_id: i64,
    pub from: OrderStatusType,
    pub to: OrderStatusType,
    pub notes: Option<String>,
    /// Only used when entering `SHIPPED`. An existing tracking number is never overwritten.
    pub tracking_number: Option<String>,
    pub actor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChangeResult {
    pub order: Order,
    /// Allocations returned to the ledger by a cancellation
    pub released: Vec<OrderLineAllocation>,
    /// Variants whose stock moved, as they stand after the change
    pub variants: Vec<Variant>,
}

/// A verified gateway verdict on the latest payment attempt for an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentOutcome {
    pub transaction_id: String,
    pub authorized: bool,
    pub response: GatewayResponse,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReconcileResult {
    Applied {
        order: Order,
        payment: PaymentRecord,
        previous_status: OrderStatusType,
        released: Vec<OrderLineAllocation>,
        variants: Vec<Variant>,
    },
    /// The transaction id was seen before, or there was no pending payment left to settle.
    AlreadyProcessed { order: Order },
}

impl ReconcileResult {
    pub fn order(&self) -> &Order {
        match self {
            ReconcileResult::Applied { order, .. } => order,
            ReconcileResult::AlreadyProcessed { order } => order,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, ReconcileResult::Applied { .. })
    }
}
