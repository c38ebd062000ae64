#![allow(dead_code)]
use log::*;
use lovi_common::Money;
use lovi_engine::{
    db_types::{NewStockEntry, NewVariant, Variant},
    events::EventProducers,
    InventoryApi,
    OrderFlowApi,
    OrderManagement,
    OrderPolicy,
    SqliteDatabase,
};
use sqlx::{migrate::MigrateDatabase, Sqlite};

pub fn random_db_path() -> String {
    let dir = std::env::temp_dir();
    format!("sqlite://{}/lovi_engine_it_{}.db", dir.display(), rand::random::<u64>())
}

/// Creates a fresh, migrated database and returns a handle to it.
pub async fn prepare_test_env(url: &str, max_connections: u32) -> SqliteDatabase {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    if Sqlite::database_exists(url).await.unwrap_or(false) {
        Sqlite::drop_database(url).await.expect("Error dropping database");
    }
    Sqlite::create_database(url).await.expect("Error creating database");
    let db = SqliteDatabase::new_with_url(url, max_connections).await.expect("Error creating connection to database");
    db.migrate().await.expect("Error running DB migrations");
    debug!("🚀️ Created test database {url}");
    db
}

pub struct TestStore {
    pub url: String,
    pub inventory: InventoryApi<SqliteDatabase>,
    pub orders: OrderFlowApi<SqliteDatabase>,
}

impl TestStore {
    pub async fn new(max_connections: u32, producers: EventProducers) -> Self {
        let url = random_db_path();
        let db = prepare_test_env(&url, max_connections).await;
        let inventory = InventoryApi::new(db.clone(), producers.clone());
        let orders = OrderFlowApi::new(db, producers, OrderPolicy::default());
        Self { url, inventory, orders }
    }

    pub async fn variant(&self, sku: &str, min_stock: i64) -> Variant {
        let variant = NewVariant { product_id: 1, sku: sku.to_string(), name: format!("Box {sku}"), min_stock };
        self.inventory.create_variant(variant).await.expect("Error creating variant")
    }

    /// Receives `quantity` units from `brand` and returns the new ledger entry id.
    pub async fn receive(&self, variant_id: i64, brand: &str, cost_cents: i64, quantity: i64, preferred: bool) -> i64 {
        let mut entry = NewStockEntry::new(variant_id, brand, Money::from_cents(cost_cents), quantity);
        if preferred {
            entry = entry.preferred();
        }
        self.inventory.receive_stock(entry).await.expect("Error receiving stock").entry.id
    }

    pub async fn tear_down(mut self) {
        if let Err(e) = self.orders.db_mut().close().await {
            error!("🚀️ Failed to close database: {e}");
        }
        drop(self.inventory);
        Sqlite::drop_database(&self.url).await.ok();
    }
}
