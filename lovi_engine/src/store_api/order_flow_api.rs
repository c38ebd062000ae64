use std::{collections::HashMap, fmt::Debug};

use chrono::{Duration, Utc};
use log::*;

use crate::{
    db_types::{NewOrder, Order, OrderNumber, OrderStatusType, PaymentStatusType, StockEntry},
    events::{EventProducers, OrderCreatedEvent, OrderStatusChangedEvent, PaymentReconciledEvent},
    helpers::{
        compute_totals,
        plan_allocation,
        reserve_planned,
        should_notify,
        tracking_number_for,
        validate_transition,
        AllocationPlan,
        LineAmount,
    },
    store_api::{
        order_objects::{OrderDetails, StatusUpdate, StatusUpdateResult},
        payment_objects::PaymentRequestData,
        policy::OrderPolicy,
        publish_low_stock,
    },
    traits::{
        InventoryError,
        OrderFlowError,
        OrderManagement,
        OrderSubmission,
        PaymentOutcome,
        ReconcileResult,
        StatusChange,
    },
};

pub const DEFAULT_PAYMENT_METHOD: &str = "redsys";
const EXPIRY_ACTOR: &str = "expiry-worker";

/// `OrderFlowApi` is the primary API for placing orders and moving them through their life cycle, including the
/// settlement of gateway payment notifications.
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
    policy: OrderPolicy,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers, policy: OrderPolicy) -> Self {
        Self { db, producers, policy }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }

    pub fn policy(&self) -> &OrderPolicy {
        &self.policy
    }
}

impl<B> OrderFlowApi<B>
where B: OrderManagement
{
    /// Places a new order.
    ///
    /// The order is validated, priced, and stock is planned for every line that names a variant. The order, its lines,
    /// the allocations and a pending payment record are then written in one transaction. If stock moves between
    /// planning and writing, the order is re-planned, up to the policy's number of attempts.
    pub async fn create_order(&self, order: NewOrder) -> Result<OrderDetails, OrderFlowError> {
        let shipping_cost = self.validate_order(&order)?;
        let amounts = order.lines.iter().map(LineAmount::from).collect::<Vec<_>>();
        let totals = compute_totals(&amounts, shipping_cost, self.policy.tax_rate);
        let payment_method = order.payment_method.clone().unwrap_or_else(|| DEFAULT_PAYMENT_METHOD.to_string());
        let attempts = self.policy.allocation_attempts.max(1);
        let mut attempt = 1;
        let inserted = loop {
            let plans = self.plan_lines(&order).await?;
            let submission =
                OrderSubmission { order: order.clone(), totals, plans, payment_method: payment_method.clone() };
            match self.db.insert_order(submission).await {
                Ok(inserted) => break inserted,
                Err(OrderFlowError::InventoryError(e @ InventoryError::StockChanged { .. })) if attempt < attempts => {
                    warn!("🔄️📦️ Stock changed while placing an order ({e}). Re-planning, attempt {attempt}/{attempts}");
                    attempt += 1;
                },
                Err(e) => return Err(e),
            }
        };
        info!(
            "🔄️📦️ Order {} placed for customer {}. Total {}",
            inserted.order.order_number, inserted.order.customer_id, inserted.order.total_amount
        );
        self.producers.publish_order_created(OrderCreatedEvent::new(inserted.order.clone())).await;
        publish_low_stock(&self.producers, &inserted.variants).await;
        Ok(OrderDetails {
            order: inserted.order,
            lines: inserted.lines,
            allocations: inserted.allocations,
            payments: vec![inserted.payment],
        })
    }

    fn validate_order(&self, order: &NewOrder) -> Result<lovi_common::Money, OrderFlowError> {
        if order.customer_id.trim().is_empty() {
            return Err(OrderFlowError::ValidationError("An order needs a customer".into()));
        }
        if order.lines.is_empty() {
            return Err(OrderFlowError::ValidationError("An order needs at least one line".into()));
        }
        for (i, line) in order.lines.iter().enumerate() {
            if line.quantity <= 0 {
                return Err(OrderFlowError::ValidationError(format!(
                    "Line {} has a non-positive quantity ({})",
                    i + 1,
                    line.quantity
                )));
            }
            if line.unit_price.is_negative() {
                return Err(OrderFlowError::ValidationError(format!("Line {} has a negative unit price", i + 1)));
            }
        }
        self.policy.shipping_cost(&order.shipping_method).ok_or_else(|| {
            OrderFlowError::ValidationError(format!("Unknown shipping method: {}", order.shipping_method))
        })
    }

    /// Plans every line against a working copy of the ledger, so that two lines for the same variant cannot both
    /// claim the same units.
    async fn plan_lines(&self, order: &NewOrder) -> Result<Vec<Option<AllocationPlan>>, OrderFlowError> {
        let mut ledgers: HashMap<i64, Vec<StockEntry>> = HashMap::new();
        let mut plans = Vec::with_capacity(order.lines.len());
        for line in &order.lines {
            let Some(variant_id) = line.variant_id else {
                plans.push(None);
                continue;
            };
            if !ledgers.contains_key(&variant_id) {
                if self.db.fetch_variant(variant_id).await?.is_none() {
                    return Err(InventoryError::VariantNotFound(variant_id).into());
                }
                let entries = self.db.fetch_stock_entries(variant_id, true).await?;
                ledgers.insert(variant_id, entries);
            }
            let entries = ledgers.entry(variant_id).or_default();
            let plan = plan_allocation(variant_id, line.quantity, entries).map_err(InventoryError::from)?;
            reserve_planned(entries, &plan);
            plans.push(Some(plan));
        }
        Ok(plans)
    }

    pub async fn order_by_number(&self, order_number: &OrderNumber) -> Result<OrderDetails, OrderFlowError> {
        let order = self
            .db
            .fetch_order_by_number(order_number)
            .await?
            .ok_or_else(|| OrderFlowError::OrderNotFound(order_number.to_string()))?;
        self.order_details(order).await
    }

    async fn order_details(&self, order: Order) -> Result<OrderDetails, OrderFlowError> {
        let lines = self.db.fetch_order_lines(order.id).await?;
        let allocations = self.db.fetch_order_allocations(order.id).await?;
        let payments = self.db.fetch_payments(order.id).await?;
        Ok(OrderDetails { order, lines, allocations, payments })
    }

    /// Moves an order to a new status.
    ///
    /// Requests that are not in the transition table fail with [`OrderFlowError::InvalidTransition`] and leave the
    /// order untouched. Requesting the current status is a no-op.
    pub async fn update_status(
        &self,
        order_number: &OrderNumber,
        update: StatusUpdate,
    ) -> Result<StatusUpdateResult, OrderFlowError> {
        let order = self
            .db
            .fetch_order_by_number(order_number)
            .await?
            .ok_or_else(|| OrderFlowError::OrderNotFound(order_number.to_string()))?;
        self.transition(order, update).await
    }

    async fn transition(&self, order: Order, update: StatusUpdate) -> Result<StatusUpdateResult, OrderFlowError> {
        let Some(transition) = validate_transition(order.status, update.status)? else {
            debug!("🔄️ Order {} is already {}. Nothing to do.", order.order_number, order.status);
            return Ok(StatusUpdateResult { order, transition: None, customer_notified: false });
        };
        let tracking_number = match transition.to {
            OrderStatusType::Shipped => {
                update.tracking_number.clone().or_else(|| Some(tracking_number_for(&order.order_number)))
            },
            _ => None,
        };
        let change = StatusChange {
            order_id: order.id,
            from: transition.from,
            to: transition.to,
            notes: update.notes,
            tracking_number,
            actor: update.actor,
        };
        let result = self.db.change_status(change).await?;
        info!("🔄️ Order {} moved from {} to {}", result.order.order_number, transition.from, transition.to);
        publish_low_stock(&self.producers, &result.variants).await;
        let notify =
            should_notify(&transition, result.order.created_at, Utc::now(), self.policy.notification_quiet_period);
        if notify {
            let event = OrderStatusChangedEvent::new(result.order.clone(), transition.from);
            self.producers.publish_order_status_changed(event).await;
        } else {
            debug!("🔄️ Order {} is within its quiet period. The customer is not notified.", result.order.order_number);
        }
        Ok(StatusUpdateResult { order: result.order, transition: Some(transition), customer_notified: notify })
    }

    /// Applies a verified payment gateway verdict to the order the gateway knows as `gateway_reference`.
    ///
    /// Repeated deliveries of the same notification are harmless, and return [`ReconcileResult::AlreadyProcessed`].
    pub async fn reconcile_payment(
        &self,
        gateway_reference: &str,
        outcome: PaymentOutcome,
    ) -> Result<ReconcileResult, OrderFlowError> {
        let order = self
            .db
            .fetch_order_by_gateway_reference(gateway_reference)
            .await?
            .ok_or_else(|| OrderFlowError::OrderNotFound(gateway_reference.to_string()))?;
        let authorized = outcome.authorized;
        let result = self.db.reconcile_payment(order.id, outcome).await?;
        if let ReconcileResult::Applied { order, payment, previous_status, variants, .. } = &result {
            info!(
                "💳️ Payment for order {} {}. Order is {}",
                order.order_number,
                if authorized { "authorized" } else { "declined" },
                order.status
            );
            let event = PaymentReconciledEvent { order: order.clone(), payment: payment.clone(), authorized };
            self.producers.publish_payment_reconciled(event).await;
            if *previous_status != order.status {
                let event = OrderStatusChangedEvent::new(order.clone(), *previous_status);
                self.producers.publish_order_status_changed(event).await;
            }
            publish_low_stock(&self.producers, variants).await;
        }
        Ok(result)
    }

    /// The data a payment gateway needs to take payment for the order. Only orders awaiting payment qualify.
    pub async fn payment_request_for(&self, order_number: &OrderNumber) -> Result<PaymentRequestData, OrderFlowError> {
        let order = self
            .db
            .fetch_order_by_number(order_number)
            .await?
            .ok_or_else(|| OrderFlowError::OrderNotFound(order_number.to_string()))?;
        if order.status != OrderStatusType::Pending {
            return Err(OrderFlowError::NotPayable(order_number.to_string(), format!("The order is {}", order.status)));
        }
        if order.payment_status != PaymentStatusType::Pending {
            return Err(OrderFlowError::NotPayable(
                order_number.to_string(),
                format!("Payment is already {}", order.payment_status),
            ));
        }
        Ok(PaymentRequestData {
            order_number: order.order_number.clone(),
            customer_id: order.customer_id,
            amount: order.total_amount,
            description: format!("LoviBox order {}", order.order_number),
        })
    }

    /// Cancels orders that have been waiting for payment for longer than `timeout`, releasing their stock.
    ///
    /// Orders that cannot be cancelled (e.g. because a payment notification got there first) are logged and skipped.
    pub async fn expire_pending_orders(&self, timeout: Duration) -> Result<Vec<Order>, OrderFlowError> {
        let cutoff = Utc::now() - timeout;
        let stale = self.db.fetch_stale_pending_orders(cutoff).await?;
        let mut expired = Vec::with_capacity(stale.len());
        for order in stale {
            let number = order.order_number.clone();
            let update = StatusUpdate::new(OrderStatusType::Cancelled).by(EXPIRY_ACTOR);
            match self.transition(order, update).await {
                Ok(result) => expired.push(result.order),
                Err(e) => warn!("🔄️ Could not expire order {number}: {e}"),
            }
        }
        if !expired.is_empty() {
            info!("🔄️ {} orders were not paid within {} hours and have expired", expired.len(), timeout.num_hours());
        }
        Ok(expired)
    }
}
