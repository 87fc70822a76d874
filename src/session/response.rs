use crate::core::errors::IgError;
use crate::core::kernel::RawResponse;
use serde_json::Value;

// The weekly historical-data allowance is not listed: resetting the
// session does not restore it.
const ALLOWANCE_MARKERS: [&str; 3] = [
    "exceeded-api-key-allowance",
    "exceeded-account-allowance",
    "exceeded-account-trading-allowance",
];

const CLIENT_TOKEN_MISSING: &str = "error.security.client-token-missing";

/// Conditions a full session reset can recover from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryableKind {
    AllowanceExceeded,
    ClientTokenMissing,
}

impl From<RetryableKind> for IgError {
    fn from(kind: RetryableKind) -> Self {
        match kind {
            RetryableKind::AllowanceExceeded => Self::AllowanceExceeded,
            RetryableKind::ClientTokenMissing => Self::SessionExpired,
        }
    }
}

/// What a response means for the caller
#[derive(Debug)]
pub enum ResponseOutcome {
    Payload(Value),
    Retryable(RetryableKind),
    Fatal(IgError),
}

pub fn is_allowance_exceeded(body: &str) -> bool {
    ALLOWANCE_MARKERS.iter().any(|marker| body.contains(marker))
}

/// Decode a body, treating an empty one as JSON `null`
pub fn decode_body(body: &str) -> Result<Value, serde_json::Error> {
    if body.trim().is_empty() {
        Ok(Value::Null)
    } else {
        serde_json::from_str(body)
    }
}

/// The `errorCode` field of a decoded body, if present
pub fn error_code(payload: &Value) -> Option<String> {
    payload.get("errorCode").map(|code| match code {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

/// Classify a gateway response.
///
/// Server errors are fatal, allowance markers and a missing client token are
/// retryable, any other `errorCode` (or a non-success status without one) is
/// a fatal [`IgError::Api`]. Everything else is the decoded payload.
pub fn classify(raw: &RawResponse) -> ResponseOutcome {
    let status = raw.status;
    if status.is_server_error() {
        return ResponseOutcome::Fatal(IgError::Transport {
            status: status.as_u16(),
            reason: raw.reason().to_string(),
        });
    }

    if is_allowance_exceeded(&raw.body) {
        return ResponseOutcome::Retryable(RetryableKind::AllowanceExceeded);
    }

    let payload = match decode_body(&raw.body) {
        Ok(payload) => payload,
        Err(e) if status.is_success() => return ResponseOutcome::Fatal(IgError::Json(e)),
        Err(_) => Value::Null,
    };

    if let Some(code) = error_code(&payload) {
        if code.contains(CLIENT_TOKEN_MISSING) {
            return ResponseOutcome::Retryable(RetryableKind::ClientTokenMissing);
        }
        return ResponseOutcome::Fatal(IgError::Api {
            status: status.as_u16(),
            code,
        });
    }

    if !status.is_success() {
        return ResponseOutcome::Fatal(IgError::Api {
            status: status.as_u16(),
            code: raw.reason().to_string(),
        });
    }

    ResponseOutcome::Payload(payload)
}
