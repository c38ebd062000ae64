use chrono::{DateTime, Utc};
use log::*;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewOrder, NewOrderLine, Order, OrderLine, OrderNumber, OrderStatusType, PaymentStatusType},
    helpers::OrderTotals,
};

/// Counts the orders created at or after `since`.
pub async fn count_orders_since(since: DateTime<Utc>, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE julianday(created_at) >= julianday($1)")
        .bind(since)
        .fetch_one(conn)
        .await?;
    Ok(count)
}

/// Inserts a new order header with the given order number. This is not atomic, and only writes the header. Embed
/// the call in a transaction alongside the lines and payment record.
///
/// Returns `None` if the order number is already taken.
pub async fn insert_order(
    order_number: &OrderNumber,
    order: &NewOrder,
    totals: &OrderTotals,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let result = sqlx::query_as::<_, Order>(
        r#"
            INSERT INTO orders (
                order_number,
                customer_id,
                status,
                payment_status,
                subtotal,
                tax_amount,
                shipping_cost,
                total_amount,
                shipping_method,
                shipping_address,
                notes,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $12)
            RETURNING *;
        "#,
    )
    .bind(order_number.as_str())
    .bind(&order.customer_id)
    .bind(OrderStatusType::Pending)
    .bind(PaymentStatusType::Pending)
    .bind(totals.subtotal)
    .bind(totals.tax_amount)
    .bind(totals.shipping_cost)
    .bind(totals.total_amount)
    .bind(&order.shipping_method)
    .bind(&order.shipping_address)
    .bind(&order.notes)
    .bind(Utc::now())
    .fetch_one(conn)
    .await;
    match result {
        Ok(order) => {
            debug!("🗃️ Order {} inserted with id {}", order.order_number, order.id);
            Ok(Some(order))
        },
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            debug!("🗃️ Order number {order_number} is already taken");
            Ok(None)
        },
        Err(e) => Err(e),
    }
}

pub async fn insert_order_line(
    order_id: i64,
    line: &NewOrderLine,
    conn: &mut SqliteConnection,
) -> Result<OrderLine, sqlx::Error> {
    let line = sqlx::query_as(
        r#"
            INSERT INTO order_lines (order_id, product_id, variant_id, quantity, unit_price)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .bind(line.product_id)
    .bind(line.variant_id)
    .bind(line.quantity)
    .bind(line.unit_price)
    .fetch_one(conn)
    .await?;
    Ok(line)
}

pub async fn fetch_order_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_order_by_number(
    order_number: &OrderNumber,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE order_number = $1")
        .bind(order_number.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

/// Looks the order up by its number, or by its number with the dash removed (which is how the payment gateway knows
/// it).
pub async fn fetch_order_by_gateway_reference(
    reference: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        "SELECT * FROM orders WHERE order_number = $1 OR REPLACE(order_number, '-', '') = $1 ORDER BY id ASC LIMIT 1",
    )
    .bind(reference)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

pub async fn fetch_order_lines(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<OrderLine>, sqlx::Error> {
    let lines = sqlx::query_as("SELECT * FROM order_lines WHERE order_id = $1 ORDER BY id ASC")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(lines)
}

/// Moves the order from `from` to `to`, but only if it is still in `from`. Returns `None` if it is not.
///
/// `notes`, if given, replace the order's notes. `tracking_number` is only written if the order does not have one.
pub async fn update_status_if(
    id: i64,
    from: OrderStatusType,
    to: OrderStatusType,
    notes: Option<&str>,
    tracking_number: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET
                status = $3,
                notes = COALESCE($4, notes),
                tracking_number = COALESCE(tracking_number, $5),
                updated_at = $6
            WHERE id = $1 AND status = $2
            RETURNING *;
        "#,
    )
    .bind(id)
    .bind(from)
    .bind(to)
    .bind(notes)
    .bind(tracking_number)
    .bind(Utc::now())
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Sets the payment status of the order, and optionally stamps `paid_at`.
pub async fn update_payment_status(
    id: i64,
    payment_status: PaymentStatusType,
    paid_at: Option<DateTime<Utc>>,
    conn: &mut SqliteConnection,
) -> Result<Order, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET payment_status = $2, paid_at = COALESCE($3, paid_at), updated_at = $4
            WHERE id = $1
            RETURNING *;
        "#,
    )
    .bind(id)
    .bind(payment_status)
    .bind(paid_at)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    Ok(order)
}

/// Orders still awaiting payment that were placed before `created_before`, oldest first.
pub async fn fetch_stale_pending_orders(
    created_before: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as(
        r#"
            SELECT * FROM orders
            WHERE status = 'PENDING' AND payment_status = 'PENDING' AND julianday(created_at) < julianday($1)
            ORDER BY id ASC
        "#,
    )
    .bind(created_before)
    .fetch_all(conn)
    .await?;
    Ok(orders)
}
