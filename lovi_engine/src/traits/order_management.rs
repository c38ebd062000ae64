use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{
    db_types::{Order, OrderLine, OrderLineAllocation, OrderNumber, OrderStatusType, PaymentRecord},
    helpers::InvalidTransition,
    traits::{
        InsertedOrder,
        InventoryError,
        InventoryManagement,
        OrderSubmission,
        PaymentOutcome,
        ReconcileResult,
        StatusChange,
        StatusChangeResult,
    },
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderFlowError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("{0}")]
    InventoryError(#[from] InventoryError),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(String),
    #[error("The requested order (internal id {0}) does not exist")]
    OrderIdNotFound(i64),
    #[error("Cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatusType, to: OrderStatusType },
    #[error("Order {0} was modified by someone else. Fetch it again and retry.")]
    ConcurrentModification(String),
    #[error("Invalid order. {0}")]
    ValidationError(String),
    #[error("Could not allocate a unique order number. {0}")]
    OrderNumberExhausted(String),
    #[error("Order {0} cannot be paid for. {1}")]
    NotPayable(String, String),
}

impl From<sqlx::Error> for OrderFlowError {
    fn from(e: sqlx::Error) -> Self {
        OrderFlowError::DatabaseError(e.to_string())
    }
}

impl From<InvalidTransition> for OrderFlowError {
    fn from(e: InvalidTransition) -> Self {
        OrderFlowError::InvalidTransition { from: e.from, to: e.to }
    }
}

/// Order behaviour a backend must provide.
#[allow(async_fn_in_trait)]
pub trait OrderManagement: InventoryManagement {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Persists an order in a single transaction: the order row with a freshly generated order number, its lines, the
    /// allocations for each planned line, and a `PENDING` payment record.
    ///
    /// The order number is the date-sequenced number for today. Collisions with a concurrent insert are retried with
    /// the next sequence number.
    async fn insert_order(&self, submission: OrderSubmission) -> Result<InsertedOrder, OrderFlowError>;

    async fn fetch_order_by_id(&self, id: i64) -> Result<Option<Order>, OrderFlowError>;

    async fn fetch_order_by_number(&self, order_number: &OrderNumber) -> Result<Option<Order>, OrderFlowError>;

    /// Finds an order from the reference the payment gateway knows it by, i.e. the order number with everything but
    /// letters and digits removed.
    async fn fetch_order_by_gateway_reference(&self, reference: &str) -> Result<Option<Order>, OrderFlowError>;

    async fn fetch_order_lines(&self, order_id: i64) -> Result<Vec<OrderLine>, OrderFlowError>;

    async fn fetch_order_allocations(&self, order_id: i64) -> Result<Vec<OrderLineAllocation>, OrderFlowError>;

    async fn fetch_payments(&self, order_id: i64) -> Result<Vec<PaymentRecord>, OrderFlowError>;

    /// Executes a status change that has already been validated against the transition table.
    ///
    /// The update is conditional on the order still being in `change.from`; if it is not,
    /// [`OrderFlowError::ConcurrentModification`] is returned and nothing is written. Entering `CANCELLED` releases
    /// every line's allocations, and entering `SHIPPED` marks them fulfilled, in the same transaction.
    async fn change_status(&self, change: StatusChange) -> Result<StatusChangeResult, OrderFlowError>;

    /// Settles the most recent pending payment for the order with the gateway's verdict, and moves the order
    /// accordingly. Idempotent with respect to `outcome.transaction_id`.
    async fn reconcile_payment(&self, order_id: i64, outcome: PaymentOutcome)
        -> Result<ReconcileResult, OrderFlowError>;

    /// Orders that are still `PENDING`, with a `PENDING` payment, that were created before `created_before`.
    async fn fetch_stale_pending_orders(&self, created_before: DateTime<Utc>) -> Result<Vec<Order>, OrderFlowError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), OrderFlowError> {
        Ok(())
    }
}
