//! # Backend contracts
//!
//! The traits in this module define what a database backend must provide for the store engine to run on it.
//!
//! * [`InventoryManagement`] covers the stock ledger: variants, ledger entries, movements, and the atomic application
//!   and release of allocation plans.
//! * [`OrderManagement`] covers orders, their lines and payment records, conditional status changes and payment
//!   reconciliation. Every backend that manages orders also manages inventory, since placing or cancelling an order
//!   moves stock in the same transaction.
mod data_objects;
mod inventory_management;
mod order_management;

pub use data_objects::{
    AdjustmentResult,
    InsertedOrder,
    OrderSubmission,
    PaymentOutcome,
    ReceivedStock,
    ReconcileResult,
    RemovedStockEntry,
    StatusChange,
    StatusChangeResult,
    StockAdjustment,
};
pub use inventory_management::{InventoryError, InventoryManagement};
pub use order_management::{OrderFlowError, OrderManagement};
