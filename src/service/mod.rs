//! One method per IG endpoint.
//!
//! Every method shapes its parameters, picks the API version the endpoint
//! family supports and hands the call to [`SessionHandler`]. Dealing calls
//! resolve their deal reference through confirmation polling; history and
//! price reads follow the gateway's pagination until the last page.

pub mod account;
pub mod dealing;
pub mod general;
pub mod login;
pub mod markets;
pub mod navigation;
pub mod pagination;
pub mod prices;
pub mod watchlists;

use crate::core::config::IgConfig;
use crate::core::errors::IgError;
use crate::core::kernel::{ReqwestRest, RestClient, RestClientBuilder, RestClientConfig};
use crate::session::{Params, SessionHandler, SessionOptions};
use serde_json::Value;

pub use account::{ActivityQuery, TransactionQuery};
pub use dealing::Confirmation;
pub use navigation::NavigationEntry;
pub use prices::PriceQuery;

/// Client for the IG REST API
#[derive(Debug)]
pub struct IgService<R: RestClient = ReqwestRest> {
    session: SessionHandler<R>,
}

impl IgService<ReqwestRest> {
    /// Build a client for the configured account type with default timings
    pub fn new(config: &IgConfig) -> Result<Self, IgError> {
        Self::with_options(config, SessionOptions::default())
    }

    pub fn with_options(config: &IgConfig, options: SessionOptions) -> Result<Self, IgError> {
        let rest_config = RestClientConfig::new(config.resolved_base_url()).with_timeout(30);
        let rest = RestClientBuilder::new(rest_config).build()?;
        Ok(Self {
            session: SessionHandler::new(rest, config, options)?,
        })
    }
}

impl<R: RestClient> IgService<R> {
    /// Wrap an existing session handler, e.g. one built on a custom transport
    pub fn from_session(session: SessionHandler<R>) -> Self {
        Self { session }
    }

    pub const fn session(&self) -> &SessionHandler<R> {
        &self.session
    }
}

/// Shorthand for building a parameter map from key/value pairs
pub(crate) fn params<const N: usize>(pairs: [(&str, Value); N]) -> Params {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

/// Pull a string field out of a response body
pub(crate) fn required_str(payload: &Value, field: &str) -> Result<String, IgError> {
    payload
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| IgError::UnexpectedResponse(format!("response has no '{}' field", field)))
}
