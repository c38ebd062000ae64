//! Customer notifications and stock alerts
//!
//! The engine publishes events when orders are created, change status or are paid, and when a variant runs low on
//! stock. The hooks registered here log every event and, when `LV_NOTIFICATION_URL` is configured, forward it as JSON
//! to that URL (typically a mailer or a chat integration).
//!
//! Delivery is best effort. A failed delivery is logged and then forgotten. It never affects the order it is about.
use std::{future::Future, pin::Pin, time::Duration};

use log::*;
use lovi_engine::events::{
    EventHandlers,
    EventHooks,
    LowStockEvent,
    OrderCreatedEvent,
    OrderStatusChangedEvent,
    PaymentReconciledEvent,
};
use reqwest::Client;
use serde::Serialize;

use crate::errors::ServerError;

pub const NOTIFICATION_EVENT_BUFFER_SIZE: usize = 25;
const NOTIFICATION_TIMEOUT: Duration = Duration::from_secs(10);

type HookFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

#[derive(Debug, Clone, Serialize)]
pub struct Notification<T> {
    pub event: &'static str,
    pub data: T,
}

/// Posts notifications to a single URL.
#[derive(Debug, Clone)]
pub struct NotificationForwarder {
    client: Client,
    url: String,
}

impl NotificationForwarder {
    pub fn new<S: Into<String>>(url: S) -> Result<Self, ServerError> {
        let client = Client::builder()
            .timeout(NOTIFICATION_TIMEOUT)
            .build()
            .map_err(|e| ServerError::InitializeError(format!("Could not create notification client. {e}")))?;
        Ok(Self { client, url: url.into() })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn forward<T: Serialize>(&self, notification: Notification<T>) {
        let event = notification.event;
        match self.client.post(&self.url).json(&notification).send().await {
            Ok(res) if res.status().is_success() => debug!("📬️ {event} notification delivered to {}", self.url),
            Ok(res) => warn!("📬️ {event} notification was refused by {}. Status {}", self.url, res.status()),
            Err(e) => warn!("📬️ Could not deliver {event} notification to {}. {e}", self.url),
        }
    }
}

/// Builds the event handlers for the server. Events are always logged, and forwarded if `forwarder` is given.
pub fn create_notification_handlers(forwarder: Option<NotificationForwarder>) -> EventHandlers {
    let mut hooks = EventHooks::default();
    let fwd = forwarder.clone();
    hooks.on_order_created(move |ev: OrderCreatedEvent| {
        info!(
            "📬️ New order {} for customer {}. Total {}",
            ev.order.order_number, ev.order.customer_id, ev.order.total_amount
        );
        forward(fwd.clone(), "order_created", ev)
    });
    let fwd = forwarder.clone();
    hooks.on_order_status_changed(move |ev: OrderStatusChangedEvent| {
        info!(
            "📬️ Notifying customer {} that order {} is now {} (was {})",
            ev.order.customer_id, ev.order.order_number, ev.new_status, ev.old_status
        );
        forward(fwd.clone(), "order_status_changed", ev)
    });
    let fwd = forwarder.clone();
    hooks.on_payment_reconciled(move |ev: PaymentReconciledEvent| {
        let verdict = if ev.authorized { "authorized" } else { "declined" };
        info!("📬️ Payment of {} for order {} was {verdict}", ev.payment.amount, ev.order.order_number);
        forward(fwd.clone(), "payment_reconciled", ev)
    });
    let fwd = forwarder;
    hooks.on_low_stock(move |ev: LowStockEvent| {
        warn!(
            "📬️ Variant {} ({}) is low on stock. {} units left, minimum is {}",
            ev.variant.sku, ev.variant.name, ev.variant.stock, ev.variant.min_stock
        );
        forward(fwd.clone(), "low_stock", ev)
    });
    EventHandlers::new(NOTIFICATION_EVENT_BUFFER_SIZE, hooks)
}

fn forward<T: Serialize + Send + Sync + 'static>(
    forwarder: Option<NotificationForwarder>,
    event: &'static str,
    data: T,
) -> HookFuture {
    match forwarder {
        Some(forwarder) => Box::pin(async move { forwarder.forward(Notification { event, data }).await }),
        None => no_op(),
    }
}

fn no_op() -> HookFuture {
    Box::pin(async {})
}
