use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Order, OrderLine, OrderLineAllocation, OrderStatusType, PaymentRecord},
    helpers::StatusTransition,
};

/// An order with everything hanging off it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetails {
    pub order: Order,
    pub lines: Vec<OrderLine>,
    pub allocations: Vec<OrderLineAllocation>,
    pub payments: Vec<PaymentRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatusType,
    #[serde(default)]
    pub notes: Option<String>,
    /// Used when shipping. A synthetic tracking number is assigned if none is given.
    #[serde(default)]
    pub tracking_number: Option<String>,
    #[serde(default)]
    pub actor: Option<String>,
}

impl StatusUpdate {
    pub fn new(status: OrderStatusType) -> Self {
        Self { status, notes: None, tracking_number: None, actor: None }
    }

    pub fn with_notes<S: Into<String>>(mut self, notes: S) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_tracking_number<S: Into<String>>(mut self, tracking_number: S) -> Self {
        self.tracking_number = Some(tracking_number.into());
        self
    }

    pub fn by<S: Into<String>>(mut self, actor: S) -> Self {
        self.actor = Some(actor.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdateResult {
    pub order: Order,
    /// `None` if the order was already in the requested state
    pub transition: Option<StatusTransition>,
    pub customer_notified: bool,
}
