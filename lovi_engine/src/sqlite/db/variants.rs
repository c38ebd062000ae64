use chrono::Utc;
use log::*;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewVariant, Variant},
    traits::InventoryError,
};

pub async fn insert_variant(variant: NewVariant, conn: &mut SqliteConnection) -> Result<Variant, InventoryError> {
    let now = Utc::now();
    let result = sqlx::query_as::<_, Variant>(
        r#"
            INSERT INTO variants (product_id, sku, name, stock, min_stock, created_at, updated_at)
            VALUES ($1, $2, $3, 0, $4, $5, $5)
            RETURNING *;
        "#,
    )
    .bind(variant.product_id)
    .bind(&variant.sku)
    .bind(&variant.name)
    .bind(variant.min_stock)
    .bind(now)
    .fetch_one(conn)
    .await;
    match result {
        Ok(v) => {
            debug!("🗃️ Variant {} [{}] created with id {}", v.name, v.sku, v.id);
            Ok(v)
        },
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(InventoryError::DuplicateSku(variant.sku)),
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_variant(variant_id: i64, conn: &mut SqliteConnection) -> Result<Option<Variant>, sqlx::Error> {
    let variant = sqlx::query_as("SELECT * FROM variants WHERE id = $1").bind(variant_id).fetch_optional(conn).await?;
    Ok(variant)
}

/// Recomputes the variant's cached stock from its active ledger entries. Must be called in the same transaction as
/// any change to the ledger.
pub async fn refresh_stock(variant_id: i64, conn: &mut SqliteConnection) -> Result<Variant, InventoryError> {
    let variant: Option<Variant> = sqlx::query_as(
        r#"
            UPDATE variants SET
                stock = (SELECT COALESCE(SUM(quantity), 0) FROM brand_stock WHERE variant_id = $1 AND is_active = 1),
                updated_at = $2
            WHERE id = $1
            RETURNING *;
        "#,
    )
    .bind(variant_id)
    .bind(Utc::now())
    .fetch_optional(conn)
    .await?;
    let variant = variant.ok_or(InventoryError::VariantNotFound(variant_id))?;
    trace!("🗃️ Variant #{variant_id} stock refreshed to {}", variant.stock);
    Ok(variant)
}
