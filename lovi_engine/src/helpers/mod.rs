//! Pure domain logic. Nothing in here touches the database, so it is all unit-testable in isolation.
mod allocation_planner;
mod order_totals;
mod status_machine;

pub use allocation_planner::{
    plan_allocation,
    reserve_planned,
    sort_for_allocation,
    AllocationError,
    AllocationPlan,
    PlannedAllocation,
};
pub use order_totals::{compute_totals, format_order_number, local_midnight, LineAmount, OrderTotals};
pub use status_machine::{should_notify, tracking_number_for, validate_transition, InvalidTransition, StatusTransition};
