use thiserror::Error;

#[derive(Debug, Error)]
pub enum PortalApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Invalid portal URL: {0}")]
    InvalidUrl(String),
    #[error("Request failed: {0}")]
    RequestError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("API error: {0}")]
    ApiError(String),
}
