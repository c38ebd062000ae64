//! Glue between the Redsys gateway adapter and the order flow.
//!
//! Outbound, an unpaid order is turned into a signed payment form. Inbound, a gateway notification is verified, turned
//! into a [`PaymentOutcome`] and reconciled against the order it refers to.
use chrono::Utc;
use log::*;
use lovi_engine::{
    db_types::{GatewayResponse, OrderNumber},
    payment_objects::PaymentRequestData,
    traits::{OrderManagement, PaymentOutcome, ReconcileResult},
    OrderFlowApi,
    OrderFlowError,
};
use redsys_tools::{
    build_payment_form,
    helpers::gateway_order_reference,
    interpret_response_code,
    verify_callback,
    CallbackParameters,
    PaymentForm,
    PaymentRequest,
    RedsysConfig,
    SignedParameters,
};

use crate::{data_objects::WebhookAck, errors::ServerError};

pub const REDSYS_GATEWAY: &str = "redsys";

/// Builds the signed form that sends the customer to the Redsys payment page for this order.
pub fn payment_form_for(
    config: &RedsysConfig,
    data: &PaymentRequestData,
    language: Option<String>,
) -> Result<PaymentForm, ServerError> {
    let reference = gateway_order_reference(data.order_number.as_str());
    let mut request = PaymentRequest::new(reference, data.amount).with_description(data.description.clone());
    if let Some(language) = language {
        request = request.with_language(language);
    }
    let form = build_payment_form(config, &request)?;
    debug!("💳️ Built Redsys payment form for order {} ({})", data.order_number, data.amount);
    Ok(form)
}

/// Converts a verified notification into the outcome the order flow understands.
pub fn payment_outcome(callback: &CallbackParameters) -> Result<PaymentOutcome, ServerError> {
    let amount = callback.amount()?;
    let interpretation = interpret_response_code(&callback.response);
    let authorized = interpretation.success && callback.is_payment();
    if interpretation.success && !authorized {
        warn!(
            "💳️ Redsys reported '{}' for {} on transaction type {}. This is not a payment, so it does not count as one.",
            interpretation.message,
            callback.order,
            callback.transaction_type.as_deref().unwrap_or_default()
        );
    }
    let gateway_timestamp = match (&callback.date, &callback.hour) {
        (Some(date), Some(hour)) => Some(format!("{date} {hour}")),
        (Some(date), None) => Some(date.clone()),
        _ => None,
    };
    let response = GatewayResponse {
        gateway: REDSYS_GATEWAY.to_string(),
        response_code: interpretation.code.clone(),
        message: interpretation.message.clone(),
        authorized,
        amount,
        currency: callback.currency.clone(),
        authorisation_code: callback.authorisation_code().map(String::from),
        card_brand: callback.card_brand.clone(),
        card_country: callback.card_country.clone(),
        secure_payment: callback.secure_payment.clone(),
        gateway_timestamp,
    };
    Ok(PaymentOutcome {
        transaction_id: callback.transaction_id(),
        authorized,
        response,
        received_at: Utc::now(),
    })
}

/// Verifies and applies a Redsys payment notification.
///
/// The signature is checked before anything else happens, so a forged notification never reaches the database.
/// Denied payments are still processed notifications, and are acknowledged as such. Notifications about refunds or
/// cancellations are acknowledged without touching the order.
pub async fn process_notification<B: OrderManagement>(
    api: &OrderFlowApi<B>,
    config: &RedsysConfig,
    parameters: &SignedParameters,
) -> Result<WebhookAck, ServerError> {
    let callback = verify_callback(config.secret_key.reveal(), parameters)?;
    if !callback.is_payment() {
        let reference = callback.order.trim();
        let order = api
            .db()
            .fetch_order_by_gateway_reference(reference)
            .await?
            .ok_or_else(|| OrderFlowError::OrderNotFound(reference.to_string()))?;
        info!(
            "💳️ Redsys notification for {} has transaction type {}. Only payments are reconciled.",
            order.order_number,
            callback.transaction_type.as_deref().unwrap_or_default()
        );
        return Ok(ack(order.order_number, false, false, "Not a payment notification. Nothing to do"));
    }
    let outcome = payment_outcome(&callback)?;
    info!(
        "💳️ Redsys notification for {}: code {} ({}). Transaction {}",
        callback.order, outcome.response.response_code, outcome.response.message, outcome.transaction_id
    );
    let authorized = outcome.authorized;
    let charged = outcome.response.amount;
    let result = api.reconcile_payment(callback.order.trim(), outcome).await?;
    let order = result.order();
    if authorized && charged != order.total_amount {
        warn!(
            "💳️ Redsys charged {charged} for order {}, but the order total is {}. Please check this payment by hand.",
            order.order_number, order.total_amount
        );
    }
    let ack = match &result {
        ReconcileResult::Applied { order, .. } => {
            let verdict = if authorized { "authorized" } else { "denied" };
            let message = format!("Payment {verdict}. Order is {}", order.status);
            ack(order.order_number.clone(), authorized, true, message)
        },
        ReconcileResult::AlreadyProcessed { order } => {
            info!("💳️ Notification for order {} was already processed", order.order_number);
            ack(order.order_number.clone(), authorized, false, "Notification already processed")
        },
    };
    Ok(ack)
}

fn ack<S: Into<String>>(order_number: OrderNumber, authorized: bool, applied: bool, message: S) -> WebhookAck {
    WebhookAck { success: true, order_number, authorized, applied, message: message.into() }
}
