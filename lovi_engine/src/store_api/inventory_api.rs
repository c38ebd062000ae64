use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{NewStockEntry, NewVariant, OrderLineAllocation, StockEntry, StockMovement, Variant},
    events::EventProducers,
    helpers::{plan_allocation, AllocationPlan},
    store_api::{inventory_objects::StockOverview, publish_low_stock},
    traits::{AdjustmentResult, InventoryError, InventoryManagement, ReceivedStock, RemovedStockEntry, StockAdjustment},
};

/// `InventoryApi` manages variants and their per-brand stock ledgers.
pub struct InventoryApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for InventoryApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InventoryApi")
    }
}

impl<B> InventoryApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> InventoryApi<B>
where B: InventoryManagement
{
    pub async fn create_variant(&self, variant: NewVariant) -> Result<Variant, InventoryError> {
        if variant.sku.trim().is_empty() {
            return Err(InventoryError::ValidationError("A variant needs a SKU".into()));
        }
        if variant.name.trim().is_empty() {
            return Err(InventoryError::ValidationError("A variant needs a name".into()));
        }
        if variant.min_stock < 0 {
            return Err(InventoryError::ValidationError(format!("Minimum stock cannot be negative ({})", variant.min_stock)));
        }
        let variant = self.db.create_variant(variant).await?;
        info!("📦️ Variant {} [{}] created", variant.name, variant.sku);
        Ok(variant)
    }

    /// Receives inventory from a brand into a new ledger entry.
    pub async fn receive_stock(&self, entry: NewStockEntry) -> Result<ReceivedStock, InventoryError> {
        if entry.brand.trim().is_empty() {
            return Err(InventoryError::ValidationError("Stock must be attributed to a brand".into()));
        }
        if entry.cost_price.is_negative() {
            return Err(InventoryError::ValidationError(format!("Cost price cannot be negative ({})", entry.cost_price)));
        }
        if entry.sale_price.is_some_and(|p| p.is_negative()) {
            return Err(InventoryError::ValidationError("Sale price cannot be negative".into()));
        }
        if entry.quantity <= 0 {
            return Err(InventoryError::InvalidQuantity(entry.quantity));
        }
        if matches!(entry.max_stock, Some(max) if max < entry.min_stock) {
            return Err(InventoryError::ValidationError("Maximum stock is below the minimum".into()));
        }
        self.fetch_variant(entry.variant_id).await?;
        let received = self.db.receive_stock(entry).await?;
        publish_low_stock(&self.producers, std::slice::from_ref(&received.variant)).await;
        Ok(received)
    }

    /// Manually corrects the quantity held in a ledger entry, e.g. after a stock take.
    pub async fn adjust_stock(&self, adjustment: StockAdjustment) -> Result<AdjustmentResult, InventoryError> {
        let result = self.db.adjust_stock(adjustment).await?;
        publish_low_stock(&self.producers, std::slice::from_ref(&result.variant)).await;
        Ok(result)
    }

    pub async fn remove_stock_entry(&self, stock_entry_id: i64) -> Result<RemovedStockEntry, InventoryError> {
        let result = self.db.remove_stock_entry(stock_entry_id).await?;
        publish_low_stock(&self.producers, std::slice::from_ref(&result.variant)).await;
        Ok(result)
    }

    /// Works out which entries would supply `quantity` units of the variant right now. Nothing is reserved.
    pub async fn plan_allocation(&self, variant_id: i64, quantity: i64) -> Result<AllocationPlan, InventoryError> {
        if quantity <= 0 {
            return Err(InventoryError::InvalidQuantity(quantity));
        }
        self.fetch_variant(variant_id).await?;
        let entries = self.db.fetch_stock_entries(variant_id, true).await?;
        let plan = plan_allocation(variant_id, quantity, &entries)?;
        trace!("📦️ Plan for {quantity} of variant #{variant_id}: {:?}", plan.allocations);
        Ok(plan)
    }

    pub async fn apply_allocation(
        &self,
        order_line_id: i64,
        plan: &AllocationPlan,
    ) -> Result<Vec<OrderLineAllocation>, InventoryError> {
        let allocations = self.db.apply_allocation(order_line_id, plan).await?;
        if let Some(variant) = self.db.fetch_variant(plan.variant_id).await? {
            publish_low_stock(&self.producers, &[variant]).await;
        }
        Ok(allocations)
    }

    pub async fn release_allocations(&self, order_line_id: i64) -> Result<Vec<OrderLineAllocation>, InventoryError> {
        self.db.release_allocations(order_line_id).await
    }

    pub async fn stock_overview(&self, variant_id: i64) -> Result<StockOverview, InventoryError> {
        let variant = self.fetch_variant(variant_id).await?;
        let entries = self.db.fetch_stock_entries(variant_id, false).await?;
        let available = entries.iter().filter(|e| e.is_active).map(|e| e.quantity).sum();
        Ok(StockOverview { variant, entries, available })
    }

    pub async fn stock_entry(&self, stock_entry_id: i64) -> Result<StockEntry, InventoryError> {
        self.db.fetch_stock_entry(stock_entry_id).await?.ok_or(InventoryError::StockEntryNotFound(stock_entry_id))
    }

    pub async fn movements_for_entry(&self, stock_entry_id: i64) -> Result<Vec<StockMovement>, InventoryError> {
        self.stock_entry(stock_entry_id).await?;
        self.db.fetch_movements(stock_entry_id).await
    }

    pub async fn fetch_variant(&self, variant_id: i64) -> Result<Variant, InventoryError> {
        self.db.fetch_variant(variant_id).await?.ok_or(InventoryError::VariantNotFound(variant_id))
    }
}
