//! LoviBox store engine
//!
//! The order-fulfilment core of the LoviBox storefront: per-brand stock pools for each product variant, allocation of
//! stock across those pools when an order is placed, the order status state machine, and reconciliation of payment
//! gateway notifications against local order state.
//!
//! The library is divided into the following sections:
//! 1. Persisted data types ([`mod@db_types`]) and the backend contracts ([`mod@traits`]). A backend implements
//!    [`InventoryManagement`] and [`OrderManagement`]. [`SqliteDatabase`] is the SQLite implementation.
//! 2. Pure domain logic ([`mod@helpers`]): the allocation planner, order totals and numbering, and the transition
//!    table.
//! 3. The public API ([`InventoryApi`], [`OrderFlowApi`]) that validates requests, applies the order policy and
//!    publishes events.
//!
//! The engine emits events when orders are created, change status or are paid, and when a variant runs low on stock.
//! A simple hook system ([`mod@events`]) lets callers react to them without blocking the order flow.
pub mod db_types;
pub mod events;
pub mod helpers;
mod store_api;
pub mod traits;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use store_api::{
    inventory_api::InventoryApi,
    inventory_objects,
    order_flow_api::OrderFlowApi,
    order_objects,
    payment_objects,
    policy::OrderPolicy,
};
pub use traits::{InventoryError, InventoryManagement, OrderFlowError, OrderManagement};
