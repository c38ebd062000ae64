use serde::{Deserialize, Serialize};

use crate::db_types::{StockEntry, Variant};

/// A variant together with every ledger entry it has, active or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockOverview {
    pub variant: Variant,
    pub entries: Vec<StockEntry>,
    /// Sum of the active entries. Always equal to `variant.stock`.
    pub available: i64,
}
