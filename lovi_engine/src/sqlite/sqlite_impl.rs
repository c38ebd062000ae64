//! `SqliteDatabase` is a concrete implementation of a store engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module. Read-only trait methods acquire a connection and writers always open a transaction. Either way they call
//! through to the free functions in [`super::db`].
use std::{collections::BTreeMap, fmt::Debug};

use chrono::{DateTime, Local, Utc};
use log::*;
use sqlx::SqlitePool;

use super::db::{allocations, db_url, new_pool, orders, payments, stock, variants};
use crate::{
    db_types::{
        MovementType,
        NewStockEntry,
        NewStockMovement,
        NewVariant,
        Order,
        OrderLine,
        OrderLineAllocation,
        OrderNumber,
        OrderStatusType,
        PaymentRecord,
        PaymentRecordStatus,
        PaymentStatusType,
        StockEntry,
        StockMovement,
        Variant,
    },
    helpers::{format_order_number, local_midnight, AllocationPlan},
    traits::{
        AdjustmentResult,
        InsertedOrder,
        InventoryError,
        InventoryManagement,
        OrderFlowError,
        OrderManagement,
        OrderSubmission,
        PaymentOutcome,
        ReceivedStock,
        ReconcileResult,
        RemovedStockEntry,
        StatusChange,
        StatusChangeResult,
        StockAdjustment,
    },
};

/// How many order numbers to try before giving up on an insert.
const ORDER_NUMBER_ATTEMPTS: u32 = 5;

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl InventoryManagement for SqliteDatabase {
    async fn create_variant(&self, variant: NewVariant) -> Result<Variant, InventoryError> {
        let mut tx = self.pool.begin().await?;
        let variant = variants::insert_variant(variant, &mut tx).await?;
        tx.commit().await?;
        Ok(variant)
    }

    async fn fetch_variant(&self, variant_id: i64) -> Result<Option<Variant>, InventoryError> {
        let mut conn = self.pool.acquire().await?;
        let variant = variants::fetch_variant(variant_id, &mut conn).await?;
        Ok(variant)
    }

    async fn fetch_stock_entry(&self, stock_entry_id: i64) -> Result<Option<StockEntry>, InventoryError> {
        let mut conn = self.pool.acquire().await?;
        let entry = stock::fetch_stock_entry(stock_entry_id, &mut conn).await?;
        Ok(entry)
    }

    async fn fetch_stock_entries(&self, variant_id: i64, active_only: bool) -> Result<Vec<StockEntry>, InventoryError> {
        let mut conn = self.pool.acquire().await?;
        let entries = stock::fetch_stock_entries(variant_id, active_only, &mut conn).await?;
        Ok(entries)
    }

    async fn available_stock(&self, variant_id: i64) -> Result<i64, InventoryError> {
        let mut conn = self.pool.acquire().await?;
        let total = stock::available_stock(variant_id, &mut conn).await?;
        Ok(total)
    }

    async fn receive_stock(&self, entry: NewStockEntry) -> Result<ReceivedStock, InventoryError> {
        if entry.quantity <= 0 {
            return Err(InventoryError::InvalidQuantity(entry.quantity));
        }
        let mut tx = self.pool.begin().await?;
        let new_entry = stock::insert_stock_entry(&entry, &mut tx).await.map_err(|e| match e {
            sqlx::Error::Database(ref d) if d.is_foreign_key_violation() => {
                InventoryError::VariantNotFound(entry.variant_id)
            },
            e => e.into(),
        })?;
        let movement = NewStockMovement {
            stock_entry_id: new_entry.id,
            movement_type: MovementType::Purchase,
            quantity: new_entry.quantity,
            previous_quantity: 0,
            new_quantity: new_entry.quantity,
            order_line_id: None,
            actor: entry.actor.clone(),
            reason: Some(format!("Received from {}", new_entry.brand)),
        };
        let movement = stock::insert_movement(movement, &mut tx).await?;
        let variant = variants::refresh_stock(new_entry.variant_id, &mut tx).await?;
        tx.commit().await?;
        info!(
            "🗃️ {} units of variant #{} received from {} into entry #{}",
            new_entry.quantity, new_entry.variant_id, new_entry.brand, new_entry.id
        );
        Ok(ReceivedStock { entry: new_entry, movement, variant })
    }

    async fn adjust_stock(&self, adjustment: StockAdjustment) -> Result<AdjustmentResult, InventoryError> {
        let StockAdjustment { stock_entry_id, delta, reason, actor } = adjustment;
        if delta == 0 {
            return Err(InventoryError::InvalidQuantity(delta));
        }
        let mut tx = self.pool.begin().await?;
        let Some(entry) = stock::adjust_quantity(stock_entry_id, delta, &mut tx).await? else {
            let current = stock::fetch_stock_entry(stock_entry_id, &mut tx).await?;
            tx.rollback().await?;
            return match current {
                Some(e) => Err(InventoryError::NegativeStock { stock_entry_id, quantity: e.quantity, delta }),
                None => Err(InventoryError::StockEntryNotFound(stock_entry_id)),
            };
        };
        let movement = NewStockMovement {
            stock_entry_id,
            movement_type: MovementType::Adjustment,
            quantity: delta,
            previous_quantity: entry.quantity - delta,
            new_quantity: entry.quantity,
            order_line_id: None,
            actor,
            reason,
        };
        let movement = stock::insert_movement(movement, &mut tx).await?;
        let variant = variants::refresh_stock(entry.variant_id, &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ Stock entry #{stock_entry_id} adjusted by {delta} to {}", entry.quantity);
        Ok(AdjustmentResult { entry, movement, variant })
    }

    async fn remove_stock_entry(&self, stock_entry_id: i64) -> Result<RemovedStockEntry, InventoryError> {
        let mut tx = self.pool.begin().await?;
        let entry = stock::deactivate_entry(stock_entry_id, &mut tx)
            .await?
            .ok_or(InventoryError::StockEntryNotFound(stock_entry_id))?;
        let deleted = !stock::has_history(stock_entry_id, &mut tx).await?;
        if deleted {
            stock::delete_entry(stock_entry_id, &mut tx).await?;
        }
        let variant = variants::refresh_stock(entry.variant_id, &mut tx).await?;
        tx.commit().await?;
        if deleted {
            info!("🗃️ Stock entry #{stock_entry_id} had no movements and was deleted");
        } else {
            info!("🗃️ Stock entry #{stock_entry_id} has history and was deactivated");
        }
        Ok(RemovedStockEntry { entry, deleted, variant })
    }

    async fn fetch_movements(&self, stock_entry_id: i64) -> Result<Vec<StockMovement>, InventoryError> {
        let mut conn = self.pool.acquire().await?;
        let movements = stock::fetch_movements(stock_entry_id, &mut conn).await?;
        Ok(movements)
    }

    async fn fetch_allocations_for_line(&self, order_line_id: i64) -> Result<Vec<OrderLineAllocation>, InventoryError> {
        let mut conn = self.pool.acquire().await?;
        let allocations = allocations::fetch_allocations_for_line(order_line_id, &mut conn).await?;
        Ok(allocations)
    }

    async fn apply_allocation(
        &self,
        order_line_id: i64,
        plan: &AllocationPlan,
    ) -> Result<Vec<OrderLineAllocation>, InventoryError> {
        let mut tx = self.pool.begin().await?;
        match allocations::apply_plan(order_line_id, plan, &mut tx).await {
            Ok((result, _)) => {
                tx.commit().await?;
                Ok(result)
            },
            Err(e) => {
                tx.rollback().await?;
                Err(e)
            },
        }
    }

    async fn release_allocations(&self, order_line_id: i64) -> Result<Vec<OrderLineAllocation>, InventoryError> {
        let mut tx = self.pool.begin().await?;
        let (released, _) = allocations::release_line(order_line_id, None, &mut tx).await?;
        tx.commit().await?;
        Ok(released)
    }
}

impl OrderManagement for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_order(&self, submission: OrderSubmission) -> Result<InsertedOrder, OrderFlowError> {
        let now = Local::now();
        let midnight = local_midnight(now);
        let mut sequence = {
            let mut conn = self.pool.acquire().await?;
            orders::count_orders_since(midnight, &mut conn).await? + 1
        };
        let mut tx = self.pool.begin().await?;
        for attempt in 1..=ORDER_NUMBER_ATTEMPTS {
            let number = format_order_number(now.date_naive(), u32::try_from(sequence).unwrap_or(u32::MAX));
            let inserted = match orders::insert_order(&number, &submission.order, &submission.totals, &mut tx).await {
                Ok(inserted) => inserted,
                Err(e) if is_busy(&e) && attempt < ORDER_NUMBER_ATTEMPTS => {
                    warn!("🗃️ Database was busy while inserting order {number}. Retrying.");
                    continue;
                },
                Err(e) => return Err(e.into()),
            };
            let Some(order) = inserted else {
                // The failed insert left this transaction holding the write lock, so the count is now exact
                let count = orders::count_orders_since(midnight, &mut tx).await?;
                debug!("🗃️ Order number {number} is taken. {count} orders have been placed today.");
                sequence = (count + 1).max(sequence + 1);
                continue;
            };
            return match insert_order_contents(order, &submission, &mut tx).await {
                Ok(result) => {
                    tx.commit().await?;
                    Ok(result)
                },
                Err(e) => {
                    tx.rollback().await?;
                    Err(e)
                },
            };
        }
        tx.rollback().await?;
        Err(OrderFlowError::OrderNumberExhausted(format!(
            "Gave up after {ORDER_NUMBER_ATTEMPTS} attempts. Last sequence tried was {sequence}"
        )))
    }

    async fn fetch_order_by_id(&self, id: i64) -> Result<Option<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_id(id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_by_number(&self, order_number: &OrderNumber) -> Result<Option<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_number(order_number, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_by_gateway_reference(&self, reference: &str) -> Result<Option<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_gateway_reference(reference, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_lines(&self, order_id: i64) -> Result<Vec<OrderLine>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let lines = orders::fetch_order_lines(order_id, &mut conn).await?;
        Ok(lines)
    }

    async fn fetch_order_allocations(&self, order_id: i64) -> Result<Vec<OrderLineAllocation>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let result = allocations::fetch_allocations_for_order(order_id, &mut conn).await?;
        Ok(result)
    }

    async fn fetch_payments(&self, order_id: i64) -> Result<Vec<PaymentRecord>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let result = payments::fetch_payments_for_order(order_id, &mut conn).await?;
        Ok(result)
    }

    async fn change_status(&self, change: StatusChange) -> Result<StatusChangeResult, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let updated = orders::update_status_if(
            change.order_id,
            change.from,
            change.to,
            change.notes.as_deref(),
            if change.to == OrderStatusType::Shipped { change.tracking_number.as_deref() } else { None },
            &mut tx,
        )
        .await?;
        let Some(order) = updated else {
            tx.rollback().await?;
            return Err(OrderFlowError::ConcurrentModification(format!(
                "#{} is no longer {}",
                change.order_id, change.from
            )));
        };
        let mut released = Vec::new();
        let mut touched = Vec::new();
        match change.to {
            OrderStatusType::Cancelled => {
                let (r, v) = release_order(order.id, change.actor.as_deref(), &mut tx).await?;
                released = r;
                touched = v;
            },
            OrderStatusType::Shipped => {
                let fulfilled = allocations::mark_order_fulfilled(order.id, &mut tx).await?;
                debug!("🗃️ {} allocations of order {} marked as fulfilled", fulfilled.len(), order.order_number);
            },
            _ => {},
        }
        tx.commit().await?;
        info!("🗃️ Order {} moved from {} to {}", order.order_number, change.from, change.to);
        Ok(StatusChangeResult { order, released, variants: touched })
    }

    async fn reconcile_payment(
        &self,
        order_id: i64,
        outcome: PaymentOutcome,
    ) -> Result<ReconcileResult, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let status = if outcome.authorized { PaymentRecordStatus::Completed } else { PaymentRecordStatus::Failed };
        let settled = payments::settle_latest_pending(
            order_id,
            status,
            &outcome.transaction_id,
            &outcome.response,
            outcome.received_at,
            &mut tx,
        )
        .await?;
        let Some(payment) = settled else {
            tx.rollback().await?;
            let order = self.fetch_order_by_id(order_id).await?.ok_or(OrderFlowError::OrderIdNotFound(order_id))?;
            info!(
                "🗃️ Payment notification {} for order {} was already processed. Nothing to do.",
                outcome.transaction_id, order.order_number
            );
            return Ok(ReconcileResult::AlreadyProcessed { order });
        };
        let current =
            orders::fetch_order_by_id(order_id, &mut tx).await?.ok_or(OrderFlowError::OrderIdNotFound(order_id))?;
        let previous_status = current.status;
        let mut released = Vec::new();
        let mut touched = Vec::new();
        let order = if outcome.authorized {
            if current.status == OrderStatusType::Pending {
                orders::update_status_if(order_id, OrderStatusType::Pending, OrderStatusType::Confirmed, None, None, &mut tx)
                    .await?;
            } else {
                warn!(
                    "🗃️ Payment {} authorized for order {}, which is {}. The order status is left as it is.",
                    outcome.transaction_id, current.order_number, current.status
                );
            }
            orders::update_payment_status(order_id, PaymentStatusType::Paid, Some(outcome.received_at), &mut tx).await?
        } else {
            if current.status.allowed_transitions().contains(&OrderStatusType::Cancelled) {
                orders::update_status_if(order_id, current.status, OrderStatusType::Cancelled, None, None, &mut tx).await?;
                let (r, v) = release_order(order_id, Some("payment-gateway"), &mut tx).await?;
                released = r;
                touched = v;
            } else {
                warn!(
                    "🗃️ Payment {} declined for order {}, which is {} and can no longer be cancelled.",
                    outcome.transaction_id, current.order_number, current.status
                );
            }
            orders::update_payment_status(order_id, PaymentStatusType::Failed, None, &mut tx).await?
        };
        tx.commit().await?;
        info!(
            "🗃️ Payment {} for order {} settled as {}. Order is now {} / {}",
            outcome.transaction_id, order.order_number, payment.status, order.status, order.payment_status
        );
        Ok(ReconcileResult::Applied { order, payment, previous_status, released, variants: touched })
    }

    async fn fetch_stale_pending_orders(&self, created_before: DateTime<Utc>) -> Result<Vec<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let result = orders::fetch_stale_pending_orders(created_before, &mut conn).await?;
        Ok(result)
    }

    async fn close(&mut self) -> Result<(), OrderFlowError> {
        self.pool.close().await;
        Ok(())
    }
}

/// Writes the lines, allocations and payment record of a freshly inserted order header.
async fn insert_order_contents(
    order: Order,
    submission: &OrderSubmission,
    conn: &mut sqlx::SqliteConnection,
) -> Result<InsertedOrder, OrderFlowError> {
    let mut lines = Vec::with_capacity(submission.order.lines.len());
    let mut all_allocations = Vec::new();
    let mut touched = BTreeMap::new();
    for (new_line, plan) in submission.order.lines.iter().zip(submission.plans.iter()) {
        let line = orders::insert_order_line(order.id, new_line, &mut *conn).await?;
        if let Some(plan) = plan {
            let (allocated, variant) = allocations::apply_plan(line.id, plan, &mut *conn).await?;
            all_allocations.extend(allocated);
            touched.insert(variant.id, variant);
        }
        lines.push(line);
    }
    let payment = payments::insert_payment(order.id, &submission.payment_method, order.total_amount, conn).await?;
    Ok(InsertedOrder { order, lines, allocations: all_allocations, payment, variants: touched.into_values().collect() })
}

/// Releases every line of the order. Variants are de-duplicated, keeping their latest state.
async fn release_order(
    order_id: i64,
    actor: Option<&str>,
    conn: &mut sqlx::SqliteConnection,
) -> Result<(Vec<OrderLineAllocation>, Vec<Variant>), OrderFlowError> {
    let lines = orders::fetch_order_lines(order_id, &mut *conn).await?;
    let mut released = Vec::new();
    let mut touched = BTreeMap::new();
    for line in lines {
        let (r, v) = allocations::release_line(line.id, actor, &mut *conn).await?;
        released.extend(r);
        touched.extend(v.into_iter().map(|v| (v.id, v)));
    }
    Ok((released, touched.into_values().collect()))
}

fn is_busy(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(d) if d.message().contains("database is locked"))
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL in `LV_DATABASE_URL`.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Brings the schema up to date.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
