use std::{collections::HashMap, fmt::Debug};

use cucumber::World;
use lovi_engine::{
    db_types::OrderNumber,
    events::EventProducers,
    helpers::AllocationPlan,
    InventoryApi,
    InventoryError,
    OrderFlowApi,
    OrderFlowError,
    SqliteDatabase,
};

use crate::support::TestStore;

#[derive(Default, Debug, World)]
pub struct StoreWorld {
    pub system: Option<StoreSystem>,
}

pub struct StoreSystem {
    pub store: TestStore,
    /// SKU -> variant id
    pub variants: HashMap<String, i64>,
    /// "SKU/brand" -> ledger entry id
    pub entries: HashMap<String, i64>,
    pub last_plan: Option<Result<AllocationPlan, InventoryError>>,
    pub last_order: Option<OrderNumber>,
    pub last_error: Option<OrderFlowError>,
}

impl Debug for StoreSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StoreSystem({})", self.store.url)
    }
}

impl StoreSystem {
    pub async fn new() -> Self {
        let store = TestStore::new(1, EventProducers::default()).await;
        Self {
            store,
            variants: HashMap::new(),
            entries: HashMap::new(),
            last_plan: None,
            last_order: None,
            last_error: None,
        }
    }
}

impl StoreWorld {
    pub async fn system(&mut self) -> &mut StoreSystem {
        if self.system.is_none() {
            self.system = Some(StoreSystem::new().await);
        }
        self.system.as_mut().expect("Store system not initialised")
    }

    pub fn sys(&self) -> &StoreSystem {
        self.system.as_ref().expect("Store system not initialised")
    }

    pub fn inventory(&self) -> &InventoryApi<SqliteDatabase> {
        &self.sys().store.inventory
    }

    pub fn orders(&self) -> &OrderFlowApi<SqliteDatabase> {
        &self.sys().store.orders
    }

    pub fn variant_id(&self, sku: &str) -> i64 {
        *self.sys().variants.get(sku).unwrap_or_else(|| panic!("Unknown variant {sku}"))
    }

    pub fn entry_id(&self, sku: &str, brand: &str) -> i64 {
        let key = format!("{sku}/{brand}");
        *self.sys().entries.get(&key).unwrap_or_else(|| panic!("Unknown stock entry {key}"))
    }

    pub fn last_order(&self) -> OrderNumber {
        self.sys().last_order.clone().expect("No order has been placed")
    }
}
