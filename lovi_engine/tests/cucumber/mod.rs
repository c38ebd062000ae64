mod steps;
mod world;

pub use world::{StoreSystem, StoreWorld};
