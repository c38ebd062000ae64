//! # SQLite Database methods
//!
//! This module contains "low-level" SQLite database interactions.
//!
//! All these interaction are maintained by simple functions (rather than stateful structs) that accept a
//! `&mut SqliteConnection` argument. Callers can obtain a connection from a pool,
//! or create an atomic transaction as the need arises and call through to the functions without any other changes.
//!
//! SQLite only allows one writer at a time. Every multi-statement write in this crate opens its transaction with a
//! write statement. A transaction that reads first and then writes may have to upgrade its lock, which can
//! fail with `SQLITE_BUSY` without waiting for the busy timeout.
use std::{env, str::FromStr};

use log::info;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Error as SqlxError,
    SqlitePool,
};

pub mod allocations;
pub mod orders;
pub mod payments;
pub mod stock;
pub mod variants;

const SQLITE_DB_URL: &str = "sqlite://data/lovibox_store.db";

pub fn db_url() -> String {
    let result = env::var("LV_DATABASE_URL").unwrap_or_else(|_| {
        info!("🗃️ LV_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("🗃️ Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true).foreign_keys(true);
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await?;
    Ok(pool)
}
