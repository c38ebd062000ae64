use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderStatusType, PaymentRecord, Variant};

/// A new order has been stored and its stock allocated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreatedEvent {
    pub order: Order,
}

impl OrderCreatedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// An order moved to a new state, and the customer should hear about it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusChangedEvent {
    pub order: Order,
    pub old_status: OrderStatusType,
    pub new_status: OrderStatusType,
}

impl OrderStatusChangedEvent {
    pub fn new(order: Order, old_status: OrderStatusType) -> Self {
        let new_status = order.status;
        Self { order, old_status, new_status }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReconciledEvent {
    pub order: Order,
    pub payment: PaymentRecord,
    pub authorized: bool,
}

/// A variant's aggregate stock is at or below its minimum after a ledger mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LowStockEvent {
    pub variant: Variant,
}

impl LowStockEvent {
    pub fn new(variant: Variant) -> Self {
        Self { variant }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    OrderCreated(OrderCreatedEvent),
    OrderStatusChanged(OrderStatusChangedEvent),
    PaymentReconciled(PaymentReconciledEvent),
    LowStock(LowStockEvent),
}
