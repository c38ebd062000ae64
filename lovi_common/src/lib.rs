//! Value types shared by every crate in the LoviBox store workspace.
//!
//! * [`Money`] is an integer amount of euro cents. All monetary arithmetic in the store happens on cents so that
//!   totals never drift through floating point rounding.
//! * [`Secret`] hides configuration values such as gateway keys from `Debug` and `Display` output.
//! * [`helpers`] holds small parsing utilities for environment-driven configuration.
pub mod helpers;
mod money;
pub mod op;
mod secret;

pub use money::{Money, MoneyConversionError, EURO_CURRENCY_CODE, EURO_ISO_NUMERIC_CODE};
pub use secret::Secret;
