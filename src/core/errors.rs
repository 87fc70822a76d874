use thiserror::Error;

#[derive(Error, Debug)]
pub enum IgError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Server problem: status code: {status}, reason: {reason}")]
    Transport { status: u16, reason: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API allowance exceeded")]
    AllowanceExceeded,

    #[error("Session expired: client token missing")]
    SessionExpired,

    #[error("API error: {status} - {code}")]
    Api { status: u16, code: String },

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl IgError {
    /// Whether the session handler may recover from this error by resetting
    /// the session and repeating the request.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::AllowanceExceeded | Self::SessionExpired)
    }

    /// The broker's `errorCode`, when the error carries one.
    pub fn error_code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => Some(code),
            _ => None,
        }
    }
}

impl From<crate::core::config::ConfigError> for IgError {
    fn from(err: crate::core::config::ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(IgError::AllowanceExceeded.is_retryable());
        assert!(IgError::SessionExpired.is_retryable());
        assert!(!IgError::Transport {
            status: 503,
            reason: "Service Unavailable".to_string()
        }
        .is_retryable());
        assert!(!IgError::Api {
            status: 400,
            code: "error.public-api.failure.stockbroking-not-supported".to_string()
        }
        .is_retryable());
        assert!(!IgError::Configuration("missing".to_string()).is_retryable());
    }

    #[test]
    fn test_error_code_exposed_for_api_errors() {
        let err = IgError::Api {
            status: 404,
            code: "error.confirms.deal-not-found".to_string(),
        };
        assert_eq!(err.error_code(), Some("error.confirms.deal-not-found"));
        assert_eq!(IgError::SessionExpired.error_code(), None);
    }
}
