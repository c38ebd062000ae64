use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db_types::{OrderNumber, OrderStatusType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Cannot move an order from {from} to {to}")]
pub struct InvalidTransition {
    pub from: OrderStatusType,
    pub to: OrderStatusType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTransition {
    pub from: OrderStatusType,
    pub to: OrderStatusType,
}

/// Checks a requested status change against the transition table.
///
/// Returns `Ok(None)` when the order is already in the requested state, which callers treat as a no-op.
pub fn validate_transition(
    from: OrderStatusType,
    to: OrderStatusType,
) -> Result<Option<StatusTransition>, InvalidTransition> {
    if from == to {
        return Ok(None);
    }
    if from.allowed_transitions().contains(&to) {
        Ok(Some(StatusTransition { from, to }))
    } else {
        Err(InvalidTransition { from, to })
    }
}

/// Customers are not told about an order leaving `PENDING` within the quiet period after it was placed. They have
/// only just received the order confirmation.
pub fn should_notify(
    transition: &StatusTransition,
    created_at: DateTime<Utc>,
    now: DateTime<Utc>,
    quiet_period: Duration,
) -> bool {
    !(transition.from == OrderStatusType::Pending && now - created_at < quiet_period)
}

pub fn tracking_number_for(order_number: &OrderNumber) -> String {
    format!("TRK-{order_number}")
}
