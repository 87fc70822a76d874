/// Transport layer for the IG gateway
///
/// The kernel knows nothing about sessions, tokens or broker error codes. It
/// sends one HTTP request with the header set it is handed and returns the
/// status, headers and body text untouched. Authentication state and error
/// classification live in [`crate::session`].
///
/// ```rust,no_run
/// use ig_trading::core::kernel::*;
/// use reqwest::header::HeaderMap;
///
/// # async fn example() -> Result<(), ig_trading::IgError> {
/// let config = RestClientConfig::new("https://demo-api.ig.com/gateway/deal".to_string())
///     .with_timeout(10);
/// let rest = RestClientBuilder::new(config).build()?;
/// let response = rest.get("/markets", &HeaderMap::new(), &[]).await?;
/// println!("{}", response.status);
/// # Ok(())
/// # }
/// ```
pub mod rest;

pub use rest::{RawResponse, ReqwestRest, RestClient, RestClientBuilder, RestClientConfig};
