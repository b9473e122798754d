use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("kite API error ({error_type}): {message}")]
    KiteApi { error_type: String, message: String },

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("order rejected: {0}")]
    OrderRejected(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("network error: {0}")]
    Network(String),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type KiteResult<T> = Result<T, AppError>;

impl AppError {
    /// Map a Kite `error_type` onto the failure kind callers branch on.
    pub fn from_kite(error_type: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        match error_type {
            "TokenException" | "PermissionException" => AppError::Authentication(message),
            "InputException" | "OrderException" | "MarginException" | "HoldingException" => {
                AppError::OrderRejected(message)
            }
            "NetworkException" => AppError::Network(message),
            _ => AppError::KiteApi {
                error_type: error_type.to_string(),
                message,
            },
        }
    }

    /// Whether a later attempt can plausibly succeed without operator action.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::Http(_)
                | AppError::Network(_)
                | AppError::OrderRejected(_)
                | AppError::KiteApi { .. }
        )
    }
}
