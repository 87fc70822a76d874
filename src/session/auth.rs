use crate::core::errors::IgError;
use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::str::FromStr;

/// Header names carried on the persistent session header set
pub mod headers {
    pub const API_KEY: &str = "x-ig-api-key";
    pub const VERSION: &str = "version";
    pub const CST: &str = "cst";
    pub const SECURITY_TOKEN: &str = "x-security-token";
    pub const ACCOUNT_ID: &str = "ig-account-id";
    pub const METHOD_OVERRIDE: &str = "_method";
}

/// Login protocol version of the `/session` endpoint.
///
/// The three versions are not interchangeable: v1 and v2 hand back `CST` and
/// `X-SECURITY-TOKEN` response headers that stay valid for hours, v3 returns
/// a short-lived OAuth access token plus a refresh token and needs the
/// account number on every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AuthProtocol {
    V1,
    #[default]
    V2,
    V3,
}

impl AuthProtocol {
    /// Value for the `VERSION` request header
    pub const fn version(self) -> &'static str {
        match self {
            Self::V1 => "1",
            Self::V2 => "2",
            Self::V3 => "3",
        }
    }

    pub const fn uses_oauth(self) -> bool {
        matches!(self, Self::V3)
    }
}

impl FromStr for AuthProtocol {
    type Err = IgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1" => Ok(Self::V1),
            "2" => Ok(Self::V2),
            "3" => Ok(Self::V3),
            other => Err(IgError::InvalidParameters(format!(
                "Unsupported session version '{}', expected 1, 2 or 3",
                other
            ))),
        }
    }
}

impl fmt::Display for AuthProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.version())
    }
}

/// The `oauthToken` object of a v3 login, or the whole body of a refresh
#[derive(Clone, Deserialize)]
pub struct OAuthToken {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    #[serde(deserialize_with = "seconds_from_string_or_number")]
    pub expires_in: u64,
    #[serde(default)]
    pub scope: Option<String>,
}

impl fmt::Debug for OAuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthToken")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

impl OAuthToken {
    /// Value for the `Authorization` header, e.g. `Bearer 4a1b...`
    pub fn authorization(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

// IG sends `expires_in` as a quoted number
fn seconds_from_string_or_number<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

const MAX_VALIDITY_SECS: i64 = 365 * 24 * 60 * 60;
/// Seconds before expiry at which a v3 session is refreshed
const REFRESH_MARGIN_SECS: i64 = 5;

/// Tokens and expiry of the current login.
///
/// `refresh_token` and `valid_until` are always set and cleared together;
/// both present means the session is a refreshable v3 session.
#[derive(Debug, Clone, Default)]
pub struct AuthState {
    pub access_token: Option<Secret<String>>,
    pub token_type: Option<String>,
    pub refresh_token: Option<Secret<String>>,
    pub valid_until: Option<DateTime<Utc>>,
}

impl AuthState {
    /// Install a freshly issued token pair, valid for `expires_in` seconds from `now`
    pub fn apply(&mut self, token: &OAuthToken, now: DateTime<Utc>) {
        let validity = i64::try_from(token.expires_in)
            .unwrap_or(MAX_VALIDITY_SECS)
            .min(MAX_VALIDITY_SECS);
        self.access_token = Some(Secret::new(token.access_token.clone()));
        self.token_type = Some(token.token_type.clone());
        self.refresh_token = Some(Secret::new(token.refresh_token.clone()));
        self.valid_until = Some(now + Duration::seconds(validity));
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub const fn is_refreshable(&self) -> bool {
        self.refresh_token.is_some() && self.valid_until.is_some()
    }

    /// True once `now` is within `REFRESH_MARGIN_SECS` of the recorded
    /// expiry. Sessions without an expiry (v1/v2) never need a refresh.
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.valid_until
            .is_some_and(|valid_until| now + Duration::seconds(REFRESH_MARGIN_SECS) >= valid_until)
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_ref().map(|t| t.expose_secret().as_str())
    }
}
