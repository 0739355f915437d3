use thiserror::Error;

/// Errors returned by the SpielViel REST API client
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unauthorized request to {0}")]
    Unauthorized(String),

    #[error("Request to {url} failed with status {status}")]
    Status { status: u16, url: String },

    #[error("Failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// Short text suitable for a transient notification
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Http(e) if e.is_timeout() => "Server did not respond in time".to_string(),
            ApiError::Http(_) => "Server is not reachable".to_string(),
            ApiError::Unauthorized(_) => "Not signed in or session expired".to_string(),
            ApiError::Status { status: 404, .. } => "Unknown game".to_string(),
            ApiError::Status { status, .. } => format!("Server error ({})", status),
            ApiError::Decode { .. } => "Unexpected server response".to_string(),
            ApiError::InvalidUrl(_) => "Station is misconfigured".to_string(),
        }
    }
}
