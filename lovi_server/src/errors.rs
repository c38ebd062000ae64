use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use log::*;
use lovi_engine::{InventoryError, OrderFlowError};
use redsys_tools::RedsysError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("{0}")]
    ValidationError(String),
    #[error("Cannot move order from {from} to {to}")]
    InvalidTransition { from: String, to: String },
    #[error("{0}")]
    InsufficientStock(String),
    #[error("{0}")]
    StockChanged(String),
    #[error("{0}")]
    Conflict(String),
    #[error("The gateway signature could not be verified")]
    InvalidSignature,
    #[error("Access denied for {0}")]
    ForbiddenPeer(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::InvalidTransition { .. } => StatusCode::BAD_REQUEST,
            Self::InsufficientStock(_) => StatusCode::CONFLICT,
            Self::StockChanged(_) => StatusCode::CONFLICT,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::InvalidSignature => StatusCode::FORBIDDEN,
            Self::ForbiddenPeer(_) => StatusCode::FORBIDDEN,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<InventoryError> for ServerError {
    fn from(e: InventoryError) -> Self {
        match e {
            InventoryError::DatabaseError(s) => {
                error!("💻️ Database error while handling a stock request. {s}");
                Self::BackendError(format!("Database error: {s}"))
            },
            InventoryError::VariantNotFound(_) | InventoryError::StockEntryNotFound(_) => {
                Self::NoRecordFound(e.to_string())
            },
            InventoryError::DuplicateSku(_) => Self::Conflict(e.to_string()),
            InventoryError::InvalidQuantity(_) | InventoryError::NegativeStock { .. } => {
                Self::ValidationError(e.to_string())
            },
            InventoryError::ValidationError(_) => Self::ValidationError(e.to_string()),
            InventoryError::InsufficientStock { .. } => Self::InsufficientStock(e.to_string()),
            InventoryError::StockChanged { .. } => Self::StockChanged(e.to_string()),
        }
    }
}

impl From<OrderFlowError> for ServerError {
    fn from(e: OrderFlowError) -> Self {
        match e {
            OrderFlowError::DatabaseError(s) => {
                error!("💻️ Database error while handling an order request. {s}");
                Self::BackendError(format!("Database error: {s}"))
            },
            OrderFlowError::InventoryError(e) => e.into(),
            OrderFlowError::OrderNotFound(_) | OrderFlowError::OrderIdNotFound(_) => Self::NoRecordFound(e.to_string()),
            OrderFlowError::InvalidTransition { from, to } => {
                Self::InvalidTransition { from: from.to_string(), to: to.to_string() }
            },
            OrderFlowError::ConcurrentModification(_) => Self::Conflict(e.to_string()),
            OrderFlowError::ValidationError(_) => Self::ValidationError(e.to_string()),
            OrderFlowError::NotPayable(..) => Self::ValidationError(e.to_string()),
            OrderFlowError::OrderNumberExhausted(_) => {
                error!("💻️ {e}");
                Self::BackendError(e.to_string())
            },
        }
    }
}

/// Signature failures are logged in full here and reported to the caller without detail.
impl From<RedsysError> for ServerError {
    fn from(e: RedsysError) -> Self {
        match e {
            RedsysError::InvalidSignature | RedsysError::UnsupportedSignatureVersion(_) => {
                warn!("💳️ Rejecting gateway notification. {e}");
                Self::InvalidSignature
            },
            RedsysError::InvalidSecretKey(_) => {
                error!("💳️ Cannot verify gateway notifications. {e}");
                Self::InvalidSignature
            },
            RedsysError::MalformedParameters(_) => Self::InvalidRequestBody(e.to_string()),
            RedsysError::InvalidAmount(_) | RedsysError::InvalidOrderReference(_) => {
                Self::ValidationError(e.to_string())
            },
            RedsysError::InvalidMerchantCode | RedsysError::InvalidTerminal(_) => {
                error!("💳️ The Redsys merchant settings are invalid. {e}");
                Self::ConfigurationError(e.to_string())
            },
            RedsysError::EncodingError(_) => Self::Unspecified(e.to_string()),
        }
    }
}
