use std::{future::Future, pin::Pin, sync::Arc};

use log::*;

use crate::events::{
    EventHandler,
    EventProducer,
    Handler,
    LowStockEvent,
    OrderCreatedEvent,
    OrderStatusChangedEvent,
    PaymentReconciledEvent,
};

/// The sending halves of every registered hook. Cheap to clone and handed to each API object.
#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_created_producer: Vec<EventProducer<OrderCreatedEvent>>,
    pub order_status_changed_producer: Vec<EventProducer<OrderStatusChangedEvent>>,
    pub payment_reconciled_producer: Vec<EventProducer<PaymentReconciledEvent>>,
    pub low_stock_producer: Vec<EventProducer<LowStockEvent>>,
}

impl EventProducers {
    pub async fn publish_order_created(&self, event: OrderCreatedEvent) {
        for emitter in &self.order_created_producer {
            emitter.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_order_status_changed(&self, event: OrderStatusChangedEvent) {
        for emitter in &self.order_status_changed_producer {
            emitter.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_payment_reconciled(&self, event: PaymentReconciledEvent) {
        for emitter in &self.payment_reconciled_producer {
            emitter.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_low_stock(&self, event: LowStockEvent) {
        for emitter in &self.low_stock_producer {
            emitter.publish_event(event.clone()).await;
        }
    }
}

pub struct EventHandlers {
    pub on_order_created: Option<EventHandler<OrderCreatedEvent>>,
    pub on_order_status_changed: Option<EventHandler<OrderStatusChangedEvent>>,
    pub on_payment_reconciled: Option<EventHandler<PaymentReconciledEvent>>,
    pub on_low_stock: Option<EventHandler<LowStockEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_order_created = hooks.on_order_created.map(|f| EventHandler::new(buffer_size, f));
        let on_order_status_changed = hooks.on_order_status_changed.map(|f| EventHandler::new(buffer_size, f));
        let on_payment_reconciled = hooks.on_payment_reconciled.map(|f| EventHandler::new(buffer_size, f));
        let on_low_stock = hooks.on_low_stock.map(|f| EventHandler::new(buffer_size, f));
        Self { on_order_created, on_order_status_changed, on_payment_reconciled, on_low_stock }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_created {
            result.order_created_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_order_status_changed {
            result.order_status_changed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_payment_reconciled {
            result.payment_reconciled_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_low_stock {
            result.low_stock_producer.push(handler.subscribe());
        }
        result
    }

    /// Spawns a task per registered hook. Each task ends once every producer for it has been dropped.
    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_order_created {
            debug!("📬️ Starting order created hook");
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_order_status_changed {
            debug!("📬️ Starting order status changed hook");
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_payment_reconciled {
            debug!("📬️ Starting payment reconciled hook");
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_low_stock {
            debug!("📬️ Starting low stock hook");
            tokio::spawn(handler.start_handler());
        }
    }
}

type HookFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_created: Option<Handler<OrderCreatedEvent>>,
    pub on_order_status_changed: Option<Handler<OrderStatusChangedEvent>>,
    pub on_payment_reconciled: Option<Handler<PaymentReconciledEvent>>,
    pub on_low_stock: Option<Handler<LowStockEvent>>,
}

impl EventHooks {
    pub fn on_order_created<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderCreatedEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_order_created = Some(Arc::new(f));
        self
    }

    pub fn on_order_status_changed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderStatusChangedEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_order_status_changed = Some(Arc::new(f));
        self
    }

    pub fn on_payment_reconciled<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(PaymentReconciledEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_payment_reconciled = Some(Arc::new(f));
        self
    }

    pub fn on_low_stock<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(LowStockEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_low_stock = Some(Arc::new(f));
        self
    }
}
