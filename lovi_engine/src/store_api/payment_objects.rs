use lovi_common::Money;
use serde::{Deserialize, Serialize};

use crate::db_types::OrderNumber;

/// What a payment gateway needs to know to charge for an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequestData {
    pub order_number: OrderNumber,
    pub customer_id: String,
    pub amount: Money,
    pub description: String,
}
