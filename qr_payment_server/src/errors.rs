use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use qr_payment_engine::{traits::SaleApiError, WebhookFlowError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Webhook signature verification failed: {0}")]
    InvalidWebhookSignature(String),
    #[error("The payment provider could not be reached. {0}")]
    UpstreamUnavailable(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("The record already exists. {0}")]
    DuplicateRecord(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidWebhookSignature(_) => StatusCode::UNAUTHORIZED,
            Self::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::DuplicateRecord(_) => StatusCode::CONFLICT,
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

impl From<WebhookFlowError> for ServerError {
    fn from(e: WebhookFlowError) -> Self {
        match e {
            // Not-found never escapes the flow; anything that does is a transient upstream
            // failure, and a 502 is what makes the provider redeliver.
            WebhookFlowError::ProviderError(e) => Self::UpstreamUnavailable(e.to_string()),
            WebhookFlowError::DatabaseError(e) => Self::from(e),
        }
    }
}

impl From<SaleApiError> for ServerError {
    fn from(e: SaleApiError) -> Self {
        match e {
            SaleApiError::SaleNotFound(id) => Self::NoRecordFound(format!("Sale {id}")),
            SaleApiError::SaleAlreadyExists(id) => Self::DuplicateRecord(format!("Sale {id}")),
            SaleApiError::DatabaseError(e) => Self::BackendError(format!("Database error: {e}")),
        }
    }
}
