//! Ledger entries and their movement log.
use chrono::Utc;
use log::*;
use sqlx::SqliteConnection;

use crate::db_types::{NewStockEntry, NewStockMovement, StockEntry, StockMovement};

pub async fn insert_stock_entry(entry: &NewStockEntry, conn: &mut SqliteConnection) -> Result<StockEntry, sqlx::Error> {
    let now = Utc::now();
    let entry: StockEntry = sqlx::query_as(
        r#"
            INSERT INTO brand_stock (
                variant_id,
                brand,
                cost_price,
                sale_price,
                location,
                quantity,
                is_preferred,
                priority,
                min_stock,
                max_stock,
                is_active,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 1, $11, $11)
            RETURNING *;
        "#,
    )
    .bind(entry.variant_id)
    .bind(&entry.brand)
    .bind(entry.cost_price)
    .bind(entry.sale_price)
    .bind(&entry.location)
    .bind(entry.quantity)
    .bind(entry.is_preferred)
    .bind(entry.priority)
    .bind(entry.min_stock)
    .bind(entry.max_stock)
    .bind(now)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Stock entry #{} ({}) created for variant #{}", entry.id, entry.brand, entry.variant_id);
    Ok(entry)
}

pub async fn fetch_stock_entry(id: i64, conn: &mut SqliteConnection) -> Result<Option<StockEntry>, sqlx::Error> {
    let entry = sqlx::query_as("SELECT * FROM brand_stock WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(entry)
}

pub async fn fetch_stock_entries(
    variant_id: i64,
    active_only: bool,
    conn: &mut SqliteConnection,
) -> Result<Vec<StockEntry>, sqlx::Error> {
    let entries = sqlx::query_as(
        "SELECT * FROM brand_stock WHERE variant_id = $1 AND (is_active = 1 OR $2 = 0) ORDER BY id ASC",
    )
    .bind(variant_id)
    .bind(active_only)
    .fetch_all(conn)
    .await?;
    Ok(entries)
}

pub async fn available_stock(variant_id: i64, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let total: i64 =
        sqlx::query_scalar("SELECT COALESCE(SUM(quantity), 0) FROM brand_stock WHERE variant_id = $1 AND is_active = 1")
            .bind(variant_id)
            .fetch_one(conn)
            .await?;
    Ok(total)
}

/// Takes `quantity` units from the entry, but only if it is still active and holds at least that many. Returns the new
/// quantity, or `None` if the entry could not cover the request.
pub async fn decrement_if_available(
    id: i64,
    variant_id: i64,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<i64>, sqlx::Error> {
    let remaining = sqlx::query_scalar(
        r#"
            UPDATE brand_stock SET quantity = quantity - $3, updated_at = $4
            WHERE id = $1 AND variant_id = $2 AND is_active = 1 AND quantity >= $3
            RETURNING quantity;
        "#,
    )
    .bind(id)
    .bind(variant_id)
    .bind(quantity)
    .bind(Utc::now())
    .fetch_optional(conn)
    .await?;
    Ok(remaining)
}

/// Puts `quantity` units back into the entry, whether or not it is still active. Returns the new quantity.
pub async fn increment(id: i64, quantity: i64, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let total = sqlx::query_scalar(
        "UPDATE brand_stock SET quantity = quantity + $2, updated_at = $3 WHERE id = $1 RETURNING quantity",
    )
    .bind(id)
    .bind(quantity)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    Ok(total)
}

/// Adds `delta` (which may be negative) to the entry's quantity, unless that would take it below zero.
pub async fn adjust_quantity(
    id: i64,
    delta: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<StockEntry>, sqlx::Error> {
    let entry = sqlx::query_as(
        r#"
            UPDATE brand_stock SET quantity = quantity + $2, updated_at = $3
            WHERE id = $1 AND quantity + $2 >= 0
            RETURNING *;
        "#,
    )
    .bind(id)
    .bind(delta)
    .bind(Utc::now())
    .fetch_optional(conn)
    .await?;
    Ok(entry)
}

pub async fn deactivate_entry(id: i64, conn: &mut SqliteConnection) -> Result<Option<StockEntry>, sqlx::Error> {
    let entry = sqlx::query_as("UPDATE brand_stock SET is_active = 0, updated_at = $2 WHERE id = $1 RETURNING *")
        .bind(id)
        .bind(Utc::now())
        .fetch_optional(conn)
        .await?;
    Ok(entry)
}

/// An entry has history once any movement or allocation refers to it. Receiving the stock counts, so only entries
/// created without a purchase record can ever be deleted outright.
pub async fn has_history(id: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let count: i64 = sqlx::query_scalar(
        r#"
            SELECT
                (SELECT COUNT(*) FROM stock_movements WHERE stock_entry_id = $1) +
                (SELECT COUNT(*) FROM order_line_allocations WHERE stock_entry_id = $1)
        "#,
    )
    .bind(id)
    .fetch_one(conn)
    .await?;
    Ok(count > 0)
}

/// Removes the entry row. The movement ledger is never touched, so callers must check [`has_history`] first.
pub async fn delete_entry(id: i64, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM brand_stock WHERE id = $1").bind(id).execute(conn).await?;
    debug!("🗃️ Stock entry #{id} deleted");
    Ok(())
}

pub async fn insert_movement(
    movement: NewStockMovement,
    conn: &mut SqliteConnection,
) -> Result<StockMovement, sqlx::Error> {
    let movement: StockMovement = sqlx::query_as(
        r#"
            INSERT INTO stock_movements (
                stock_entry_id,
                movement_type,
                quantity,
                previous_quantity,
                new_quantity,
                order_line_id,
                actor,
                reason,
                created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *;
        "#,
    )
    .bind(movement.stock_entry_id)
    .bind(movement.movement_type)
    .bind(movement.quantity)
    .bind(movement.previous_quantity)
    .bind(movement.new_quantity)
    .bind(movement.order_line_id)
    .bind(movement.actor)
    .bind(movement.reason)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    trace!(
        "🗃️ {} movement of {} recorded for stock entry #{} ({} -> {})",
        movement.movement_type,
        movement.quantity,
        movement.stock_entry_id,
        movement.previous_quantity,
        movement.new_quantity
    );
    Ok(movement)
}

pub async fn fetch_movements(stock_entry_id: i64, conn: &mut SqliteConnection) -> Result<Vec<StockMovement>, sqlx::Error> {
    let movements = sqlx::query_as("SELECT * FROM stock_movements WHERE stock_entry_id = $1 ORDER BY id ASC")
        .bind(stock_entry_id)
        .fetch_all(conn)
        .await?;
    Ok(movements)
}
