use chrono::{DateTime, Utc};
use lovi_common::Money;
use log::*;
use sqlx::{types::Json, SqliteConnection};

use crate::db_types::{GatewayResponse, PaymentRecord, PaymentRecordStatus};

/// Records a new `PENDING` payment attempt for the order.
pub async fn insert_payment(
    order_id: i64,
    method: &str,
    amount: Money,
    conn: &mut SqliteConnection,
) -> Result<PaymentRecord, sqlx::Error> {
    let payment: PaymentRecord = sqlx::query_as(
        r#"
            INSERT INTO payments (order_id, method, status, amount, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .bind(method)
    .bind(PaymentRecordStatus::Pending)
    .bind(amount)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Pending {method} payment #{} of {amount} recorded for order #{order_id}", payment.id);
    Ok(payment)
}

pub async fn fetch_payments_for_order(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<PaymentRecord>, sqlx::Error> {
    let payments = sqlx::query_as("SELECT * FROM payments WHERE order_id = $1 ORDER BY id ASC")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(payments)
}

/// Settles the most recent `PENDING` payment for the order.
///
/// Nothing is written, and `None` is returned, if there is no pending payment or if `transaction_id` has already been
/// applied to any payment. This is what makes repeated gateway notifications harmless.
pub async fn settle_latest_pending(
    order_id: i64,
    status: PaymentRecordStatus,
    transaction_id: &str,
    response: &GatewayResponse,
    updated_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentRecord>, sqlx::Error> {
    let payment = sqlx::query_as(
        r#"
            UPDATE payments SET status = $2, transaction_id = $3, gateway_response = $4, updated_at = $5
            WHERE id = (
                SELECT id FROM payments WHERE order_id = $1 AND status = 'PENDING' ORDER BY id DESC LIMIT 1
            )
            AND NOT EXISTS (SELECT 1 FROM payments WHERE transaction_id = $3)
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .bind(status)
    .bind(transaction_id)
    .bind(Json(response))
    .bind(updated_at)
    .fetch_optional(conn)
    .await?;
    Ok(payment)
}
