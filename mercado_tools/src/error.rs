use thiserror::Error;

#[derive(Debug, Error)]
pub enum MercadoApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("The provider has no record of {0}")]
    NotFound(String),
    #[error("The provider query timed out: {0}")]
    Timeout(String),
    #[error("Invalid REST response: {0}")]
    ResponseError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
}
