use lovi_engine::{
    db_types::{OrderNumber, OrderStatusType},
    order_objects::StatusUpdate,
};
use serde::{Deserialize, Serialize};

/// Body of `PATCH /api/orders/{order_number}/status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdateParams {
    pub status: OrderStatusType,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub tracking_number: Option<String>,
    /// Who requested the change. Recorded on any stock movements the change causes.
    #[serde(default)]
    pub actor: Option<String>,
}

impl From<StatusUpdateParams> for StatusUpdate {
    fn from(params: StatusUpdateParams) -> Self {
        StatusUpdate {
            status: params.status,
            notes: params.notes,
            tracking_number: params.tracking_number,
            actor: params.actor,
        }
    }
}

/// Body of `POST /api/orders/{order_number}/payment`. Everything is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentFormParams {
    /// Redsys consumer language code, e.g. "001" for Spanish, "002" for English
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationQuery {
    pub quantity: i64,
}

/// Body of `POST /api/stock/{id}/adjust`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustStockParams {
    pub delta: i64,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub actor: Option<String>,
}

/// What Redsys gets back for every notification that was processed, whether the payment was authorized or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookAck {
    pub success: bool,
    pub order_number: OrderNumber,
    pub authorized: bool,
    /// False when the notification had already been applied
    pub applied: bool,
    pub message: String,
}
