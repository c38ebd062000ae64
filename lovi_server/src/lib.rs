//! # LoviBox store server
//!
//! This crate hosts the HTTP front end for the LoviBox store engine. It is responsible for:
//! * Accepting orders from the storefront and moving them through their life cycle.
//! * Managing the per-brand stock ledger behind every product variant.
//! * Building signed Redsys payment forms, and reconciling the notifications Redsys sends back.
//! * Forwarding customer notifications and low-stock alerts, and expiring orders that are never paid.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `GET /health`: A health check route that returns a 200 OK response.
//! * `POST /api/orders`: Place a new order.
//! * `GET /api/orders/{order_number}`: The order, with its lines, allocations and payment records.
//! * `PATCH /api/orders/{order_number}/status`: Move an order to a new status.
//! * `POST /api/orders/{order_number}/payment`: The signed Redsys payment form for an unpaid order.
//! * `POST /api/variants`: Create a product variant.
//! * `GET /api/variants/{id}/stock`: The variant with its stock ledger entries.
//! * `GET /api/variants/{id}/allocation?quantity=N`: Preview how an order for `N` units would be allocated.
//! * `POST /api/stock`: Receive stock into a new ledger entry.
//! * `POST /api/stock/{id}/adjust`: Apply a manual stock correction.
//! * `DELETE /api/stock/{id}`: Delete a ledger entry, or deactivate it if it has any history.
//! * `GET /api/stock/{id}/movements`: The movement log for a ledger entry.
//! * `POST /webhooks/redsys`: The Redsys payment notification endpoint.

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod expiry_worker;
pub mod helpers;
pub mod integrations;
pub mod notifications;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
