//! Applying and releasing allocation plans.
//!
//! None of these functions are atomic on their own. Run them inside a transaction.
use std::collections::BTreeSet;

use chrono::Utc;
use log::*;
use sqlx::SqliteConnection;

use super::{stock, variants};
use crate::{
    db_types::{AllocationStatus, MovementType, NewStockMovement, OrderLineAllocation, Variant},
    helpers::AllocationPlan,
    traits::InventoryError,
};

/// Draws down each planned entry and links it to the order line.
///
/// Every decrement is a compare-and-swap against the planned quantity. If an entry no longer holds enough stock the
/// function stops with [`InventoryError::StockChanged`], and the caller must roll back.
pub async fn apply_plan(
    order_line_id: i64,
    plan: &AllocationPlan,
    conn: &mut SqliteConnection,
) -> Result<(Vec<OrderLineAllocation>, Variant), InventoryError> {
    let mut allocations = Vec::with_capacity(plan.allocations.len());
    for planned in &plan.allocations {
        let remaining =
            stock::decrement_if_available(planned.stock_entry_id, plan.variant_id, planned.quantity, &mut *conn).await?;
        let Some(new_quantity) = remaining else {
            let available = stock::fetch_stock_entry(planned.stock_entry_id, &mut *conn)
                .await?
                .filter(|e| e.is_active)
                .map(|e| e.quantity)
                .unwrap_or(0);
            debug!(
                "🗃️ Stock entry #{} can no longer cover {} units (has {available}). Plan for line #{order_line_id} is \
                 stale",
                planned.stock_entry_id, planned.quantity
            );
            return Err(InventoryError::StockChanged {
                variant_id: plan.variant_id,
                stock_entry_id: planned.stock_entry_id,
                planned: planned.quantity,
                available,
            });
        };
        let movement = NewStockMovement {
            stock_entry_id: planned.stock_entry_id,
            movement_type: MovementType::Sale,
            quantity: -planned.quantity,
            previous_quantity: new_quantity + planned.quantity,
            new_quantity,
            order_line_id: Some(order_line_id),
            actor: None,
            reason: Some(format!("Allocated to order line #{order_line_id}")),
        };
        stock::insert_movement(movement, &mut *conn).await?;
        let allocation = insert_allocation(order_line_id, planned.stock_entry_id, planned.quantity, &mut *conn).await?;
        allocations.push(allocation);
    }
    let variant = variants::refresh_stock(plan.variant_id, conn).await?;
    debug!(
        "🗃️ {} units of variant #{} allocated to order line #{order_line_id} from {} entries",
        plan.requested,
        plan.variant_id,
        allocations.len()
    );
    Ok((allocations, variant))
}

async fn insert_allocation(
    order_line_id: i64,
    stock_entry_id: i64,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<OrderLineAllocation, sqlx::Error> {
    let allocation = sqlx::query_as(
        r#"
            INSERT INTO order_line_allocations (order_line_id, stock_entry_id, quantity, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING *;
        "#,
    )
    .bind(order_line_id)
    .bind(stock_entry_id)
    .bind(quantity)
    .bind(AllocationStatus::Allocated)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    Ok(allocation)
}

/// Returns every live allocation of the line to its original entry, recording a `RETURN` movement for each.
///
/// Returns the released allocations and the refreshed variants they belonged to.
pub async fn release_line(
    order_line_id: i64,
    actor: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<(Vec<OrderLineAllocation>, Vec<Variant>), InventoryError> {
    let released: Vec<OrderLineAllocation> = sqlx::query_as(
        r#"
            UPDATE order_line_allocations SET status = $2, updated_at = $3
            WHERE order_line_id = $1 AND status IN ('ALLOCATED', 'FULFILLED')
            RETURNING *;
        "#,
    )
    .bind(order_line_id)
    .bind(AllocationStatus::Cancelled)
    .bind(Utc::now())
    .fetch_all(&mut *conn)
    .await?;
    let mut variant_ids = BTreeSet::new();
    for allocation in &released {
        let new_quantity = stock::increment(allocation.stock_entry_id, allocation.quantity, &mut *conn).await?;
        let movement = NewStockMovement {
            stock_entry_id: allocation.stock_entry_id,
            movement_type: MovementType::Return,
            quantity: allocation.quantity,
            previous_quantity: new_quantity - allocation.quantity,
            new_quantity,
            order_line_id: Some(order_line_id),
            actor: actor.map(String::from),
            reason: Some(format!("Released from order line #{order_line_id}")),
        };
        stock::insert_movement(movement, &mut *conn).await?;
        let variant_id: i64 = sqlx::query_scalar("SELECT variant_id FROM brand_stock WHERE id = $1")
            .bind(allocation.stock_entry_id)
            .fetch_one(&mut *conn)
            .await?;
        variant_ids.insert(variant_id);
    }
    let mut refreshed = Vec::with_capacity(variant_ids.len());
    for variant_id in variant_ids {
        refreshed.push(variants::refresh_stock(variant_id, &mut *conn).await?);
    }
    if !released.is_empty() {
        debug!("🗃️ {} allocations released from order line #{order_line_id}", released.len());
    }
    Ok((released, refreshed))
}

/// Marks every `ALLOCATED` allocation of the order as `FULFILLED`.
pub async fn mark_order_fulfilled(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderLineAllocation>, sqlx::Error> {
    let fulfilled = sqlx::query_as(
        r#"
            UPDATE order_line_allocations SET status = $2, updated_at = $3
            WHERE status = 'ALLOCATED'
              AND order_line_id IN (SELECT id FROM order_lines WHERE order_id = $1)
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .bind(AllocationStatus::Fulfilled)
    .bind(Utc::now())
    .fetch_all(conn)
    .await?;
    Ok(fulfilled)
}

pub async fn fetch_allocations_for_line(
    order_line_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderLineAllocation>, sqlx::Error> {
    let allocations = sqlx::query_as("SELECT * FROM order_line_allocations WHERE order_line_id = $1 ORDER BY id ASC")
        .bind(order_line_id)
        .fetch_all(conn)
        .await?;
    Ok(allocations)
}

pub async fn fetch_allocations_for_order(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderLineAllocation>, sqlx::Error> {
    let allocations = sqlx::query_as(
        r#"
            SELECT a.* FROM order_line_allocations a
            JOIN order_lines l ON l.id = a.order_line_id
            WHERE l.order_id = $1
            ORDER BY a.id ASC
        "#,
    )
    .bind(order_id)
    .fetch_all(conn)
    .await?;
    Ok(allocations)
}
