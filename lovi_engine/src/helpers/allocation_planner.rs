//! Chooses which ledger entries supply a requested quantity of a variant.
//!
//! Entries are consumed greedily in a strict order:
//! 1. preferred entries first,
//! 2. then by ascending priority,
//! 3. then by ascending cost price,
//! 4. then by descending available quantity,
//! 5. and finally by ascending entry id, so that equal entries never swap places between runs.
//!
//! Planning never mutates anything. A plan either covers the full request or is not produced at all.
use std::cmp::Ordering;

use lovi_common::Money;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db_types::StockEntry;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedAllocation {
    pub stock_entry_id: i64,
    pub brand: String,
    pub quantity: i64,
    pub unit_cost: Money,
}

impl PlannedAllocation {
    pub fn cost(&self) -> Money {
        self.unit_cost * self.quantity
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationPlan {
    pub variant_id: i64,
    pub requested: i64,
    pub allocations: Vec<PlannedAllocation>,
    pub total_cost: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
    #[error("Requested quantity must be positive, but was {0}")]
    InvalidQuantity(i64),
    #[error("Insufficient stock for variant {variant_id}. Requested {requested}, but only {available} available")]
    InsufficientStock { variant_id: i64, available: i64, requested: i64 },
}

fn allocation_order(a: &StockEntry, b: &StockEntry) -> Ordering {
    b.is_preferred
        .cmp(&a.is_preferred)
        .then(a.priority.cmp(&b.priority))
        .then(a.cost_price.cmp(&b.cost_price))
        .then(b.quantity.cmp(&a.quantity))
        .then(a.id.cmp(&b.id))
}

/// Sorts entries into the order in which they will be consumed.
pub fn sort_for_allocation(entries: &mut [StockEntry]) {
    entries.sort_by(allocation_order);
}

/// Builds an allocation plan for `requested` units of `variant_id` out of `entries`.
///
/// Entries that belong to a different variant, are inactive, or are empty are ignored.
pub fn plan_allocation(
    variant_id: i64,
    requested: i64,
    entries: &[StockEntry],
) -> Result<AllocationPlan, AllocationError> {
    if requested <= 0 {
        return Err(AllocationError::InvalidQuantity(requested));
    }
    let mut candidates = entries
        .iter()
        .filter(|e| e.variant_id == variant_id && e.is_active && e.quantity > 0)
        .cloned()
        .collect::<Vec<_>>();
    let available = candidates.iter().map(|e| e.quantity).sum::<i64>();
    if available < requested {
        return Err(AllocationError::InsufficientStock { variant_id, available, requested });
    }
    sort_for_allocation(&mut candidates);
    let mut remaining = requested;
    let mut allocations = Vec::new();
    for entry in candidates {
        if remaining == 0 {
            break;
        }
        let quantity = remaining.min(entry.quantity);
        remaining -= quantity;
        allocations.push(PlannedAllocation {
            stock_entry_id: entry.id,
            brand: entry.brand,
            quantity,
            unit_cost: entry.cost_price,
        });
    }
    let total_cost = allocations.iter().map(PlannedAllocation::cost).sum();
    Ok(AllocationPlan { variant_id, requested, allocations, total_cost })
}

/// Deducts a plan from a working copy of the ledger, so that several lines for the same variant can be planned
/// against each other before anything is written.
pub fn reserve_planned(entries: &mut [StockEntry], plan: &AllocationPlan) {
    for planned in &plan.allocations {
        if let Some(entry) = entries.iter_mut().find(|e| e.id == planned.stock_entry_id) {
            entry.quantity -= planned.quantity;
        }
    }
}
