//! # Store engine public API
//!
//! The API objects wrap a database backend and add validation, policy and event publication on top of it.
//!
//! * [`inventory_api`] manages variants and the stock ledger, and previews allocations.
//! * [`order_flow_api`] places orders, runs the order status state machine and reconciles gateway payment
//!   notifications.
//!
//! The other submodules hold the request and response types, and the order policy.
//!
//! # API usage
//!
//! ```rust,ignore
//! use lovi_engine::{events::EventProducers, InventoryApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/store.db", 5).await?;
//! db.migrate().await?;
//! let api = InventoryApi::new(db, EventProducers::default());
//! let plan = api.plan_allocation(variant_id, 7).await?;
//! ```
use log::*;

use crate::{
    db_types::Variant,
    events::{EventProducers, LowStockEvent},
};

pub mod inventory_api;
pub mod inventory_objects;
pub mod order_flow_api;
pub mod order_objects;
pub mod payment_objects;
pub mod policy;

/// Raises a low-stock alert for every variant at or below its minimum.
pub(crate) async fn publish_low_stock(producers: &EventProducers, variants: &[Variant]) {
    for variant in variants.iter().filter(|v| v.is_low_on_stock()) {
        warn!(
            "📦️ Variant {} [{}] is low on stock: {} left (minimum {})",
            variant.name, variant.sku, variant.stock, variant.min_stock
        );
        producers.publish_low_stock(LowStockEvent::new(variant.clone())).await;
    }
}
