//! Session lifecycle for the IG gateway.
//!
//! [`SessionHandler`] is the only path through which requests reach the
//! broker. It logs in with one of the three protocol versions, keeps the
//! persistent header set, refreshes short-lived v3 tokens before they are
//! used, and resets the whole session when the gateway reports an exhausted
//! allowance or a lost client token.

pub mod auth;
pub mod handler;
pub mod response;
pub mod retry;

use serde_json::{Map, Value};
use std::time::Duration;

pub use auth::{AuthProtocol, AuthState, OAuthToken};
pub use handler::{SessionHandler, SessionResponse};
pub use response::{classify, ResponseOutcome, RetryableKind};
pub use retry::{ConfirmationPolicy, RetryPolicy};

/// Request parameters: query string for reads, JSON body for everything else
pub type Params = Map<String, Value>;

/// Timing knobs for retries, confirmation polling and paginated reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    pub retry: RetryPolicy,
    pub confirmation: ConfirmationPolicy,
    /// Pause between successive pages of historical prices
    pub page_wait: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            confirmation: ConfirmationPolicy::default(),
            page_wait: Duration::from_secs(1),
        }
    }
}

impl SessionOptions {
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_confirmation(mut self, confirmation: ConfirmationPolicy) -> Self {
        self.confirmation = confirmation;
        self
    }

    pub fn with_page_wait(mut self, page_wait: Duration) -> Self {
        self.page_wait = page_wait;
        self
    }
}

/// The four verbs every endpoint call goes through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Create,
    Read,
    Update,
    Delete,
}

impl Verb {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "POST",
            Self::Read => "GET",
            Self::Update => "PUT",
            Self::Delete => "DELETE (POST)",
        }
    }
}

/// Flatten parameters into query pairs. `null` values are dropped.
pub fn query_pairs(params: &Params) -> Vec<(String, String)> {
    params
        .iter()
        .filter_map(|(key, value)| {
            let value = match value {
                Value::Null => return None,
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            Some((key.clone(), value))
        })
        .collect()
}
