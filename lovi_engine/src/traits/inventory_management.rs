use thiserror::Error;

use crate::{
    db_types::{NewStockEntry, NewVariant, OrderLineAllocation, StockEntry, StockMovement, Variant},
    helpers::{AllocationError, AllocationPlan},
    traits::{AdjustmentResult, ReceivedStock, RemovedStockEntry, StockAdjustment},
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InventoryError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("The requested variant {0} does not exist")]
    VariantNotFound(i64),
    #[error("The requested stock entry {0} does not exist")]
    StockEntryNotFound(i64),
    #[error("A variant with SKU {0} already exists")]
    DuplicateSku(String),
    #[error("Quantity must be positive, but was {0}")]
    InvalidQuantity(i64),
    #[error("Insufficient stock for variant {variant_id}. Requested {requested}, but only {available} available")]
    InsufficientStock { variant_id: i64, available: i64, requested: i64 },
    #[error(
        "Stock for variant {variant_id} changed while allocating. Entry {stock_entry_id} was planned for {planned} but \
         only has {available}"
    )]
    StockChanged { variant_id: i64, stock_entry_id: i64, planned: i64, available: i64 },
    #[error("Adjusting entry {stock_entry_id} by {delta} would leave it with negative stock ({quantity} on hand)")]
    NegativeStock { stock_entry_id: i64, quantity: i64, delta: i64 },
    #[error("Invalid stock request. {0}")]
    ValidationError(String),
}

impl From<sqlx::Error> for InventoryError {
    fn from(e: sqlx::Error) -> Self {
        InventoryError::DatabaseError(e.to_string())
    }
}

impl From<AllocationError> for InventoryError {
    fn from(e: AllocationError) -> Self {
        match e {
            AllocationError::InvalidQuantity(q) => InventoryError::InvalidQuantity(q),
            AllocationError::InsufficientStock { variant_id, available, requested } => {
                InventoryError::InsufficientStock { variant_id, available, requested }
            },
        }
    }
}

/// Stock ledger behaviour a backend must provide.
///
/// Every mutating method is atomic, and leaves the variant's aggregate `stock` equal to the sum of its active entries.
#[allow(async_fn_in_trait)]
pub trait InventoryManagement: Clone {
    async fn create_variant(&self, variant: NewVariant) -> Result<Variant, InventoryError>;

    async fn fetch_variant(&self, variant_id: i64) -> Result<Option<Variant>, InventoryError>;

    async fn fetch_stock_entry(&self, stock_entry_id: i64) -> Result<Option<StockEntry>, InventoryError>;

    /// Fetches the ledger entries for a variant, ordered by id. Inactive entries are only included if `active_only`
    /// is false.
    async fn fetch_stock_entries(&self, variant_id: i64, active_only: bool) -> Result<Vec<StockEntry>, InventoryError>;

    /// The sum of the quantities of the variant's active entries.
    async fn available_stock(&self, variant_id: i64) -> Result<i64, InventoryError>;

    /// Creates a new ledger entry and records a `PURCHASE` movement for the received quantity.
    async fn receive_stock(&self, entry: NewStockEntry) -> Result<ReceivedStock, InventoryError>;

    /// Applies a manual correction and records an `ADJUSTMENT` movement. The entry may never go below zero.
    async fn adjust_stock(&self, adjustment: StockAdjustment) -> Result<AdjustmentResult, InventoryError>;

    /// Deletes an entry that has never been drawn on or adjusted. Entries with any history are deactivated instead.
    async fn remove_stock_entry(&self, stock_entry_id: i64) -> Result<RemovedStockEntry, InventoryError>;

    /// The movement log for an entry, oldest first.
    async fn fetch_movements(&self, stock_entry_id: i64) -> Result<Vec<StockMovement>, InventoryError>;

    async fn fetch_allocations_for_line(&self, order_line_id: i64) -> Result<Vec<OrderLineAllocation>, InventoryError>;

    /// Executes an allocation plan for an order line.
    ///
    /// Each planned entry is decremented only if it still holds the planned quantity. If any entry does not, nothing
    /// is written and [`InventoryError::StockChanged`] is returned.
    async fn apply_allocation(
        &self,
        order_line_id: i64,
        plan: &AllocationPlan,
    ) -> Result<Vec<OrderLineAllocation>, InventoryError>;

    /// Returns every live allocation of the order line to the entry it came from. Returns the allocations that were
    /// released; releasing a line twice is a no-op.
    async fn release_allocations(&self, order_line_id: i64) -> Result<Vec<OrderLineAllocation>, InventoryError>;
}
