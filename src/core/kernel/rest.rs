use crate::core::errors::IgError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use tracing::{instrument, trace};

/// Status, headers and undecoded body of one HTTP exchange
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl RawResponse {
    /// Canonical reason phrase for the status code, if any
    pub fn reason(&self) -> &'static str {
        self.status.canonical_reason().unwrap_or("Unknown")
    }

    /// A response header as text, ignoring values that are not valid UTF-8
    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// REST client trait for making HTTP requests against the gateway
///
/// Implementations send exactly the headers they are given; the caller owns
/// the persistent header set.
#[async_trait]
pub trait RestClient: Send + Sync {
    /// Make a GET request
    ///
    /// # Arguments
    /// * `endpoint` - Path appended to the base URL
    /// * `headers` - Full header set for this request
    /// * `query_params` - Query parameters as key-value pairs
    async fn get(
        &self,
        endpoint: &str,
        headers: &HeaderMap,
        query_params: &[(String, String)],
    ) -> Result<RawResponse, IgError>;

    /// Make a POST request with a JSON body
    async fn post(
        &self,
        endpoint: &str,
        headers: &HeaderMap,
        body: &Value,
    ) -> Result<RawResponse, IgError>;

    /// Make a PUT request with a JSON body
    async fn put(
        &self,
        endpoint: &str,
        headers: &HeaderMap,
        body: &Value,
    ) -> Result<RawResponse, IgError>;

    /// Base URL every endpoint is resolved against
    fn base_url(&self) -> &str;
}

/// Configuration for the REST client
#[derive(Clone, Debug)]
pub struct RestClientConfig {
    /// Base URL for the API
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// User agent string to include in requests
    pub user_agent: String,
}

impl RestClientConfig {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            timeout_seconds: 30,
            user_agent: concat!("ig-trading/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    /// Set the user agent string
    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }
}

/// Builder for creating REST client instances
pub struct RestClientBuilder {
    config: RestClientConfig,
}

impl RestClientBuilder {
    pub fn new(config: RestClientConfig) -> Self {
        Self { config }
    }

    /// Build the REST client
    pub fn build(self) -> Result<ReqwestRest, IgError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(self.config.timeout_seconds))
            .user_agent(&self.config.user_agent)
            .build()
            .map_err(|e| IgError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(ReqwestRest {
            client,
            config: self.config,
        })
    }
}

/// Implementation of `RestClient` using reqwest
#[derive(Clone)]
pub struct ReqwestRest {
    client: Client,
    config: RestClientConfig,
}

impl std::fmt::Debug for ReqwestRest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestRest")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ReqwestRest {
    /// Create a client with default timeout and user agent
    pub fn new(base_url: String) -> Result<Self, IgError> {
        RestClientBuilder::new(RestClientConfig::new(base_url)).build()
    }

    /// Build the full URL for an endpoint
    fn build_url(&self, endpoint: &str) -> String {
        format!("{}{}", self.config.base_url, endpoint)
    }

    #[instrument(skip(self, headers, query_params, body), fields(method = %method, endpoint = %endpoint))]
    async fn make_request(
        &self,
        method: Method,
        endpoint: &str,
        headers: &HeaderMap,
        query_params: &[(String, String)],
        body: Option<Vec<u8>>,
    ) -> Result<RawResponse, IgError> {
        let url = self.build_url(endpoint);
        let mut request = self.client.request(method, &url).headers(headers.clone());

        if !query_params.is_empty() {
            request = request.query(query_params);
        }

        if let Some(body) = body {
            if !headers.contains_key(reqwest::header::CONTENT_TYPE) {
                request = request.header(
                    reqwest::header::CONTENT_TYPE,
                    HeaderValue::from_static("application/json"),
                );
            }
            request = request.body(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;

        trace!(status = %status, "Response body: {}", body);

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

#[async_trait]
impl RestClient for ReqwestRest {
    async fn get(
        &self,
        endpoint: &str,
        headers: &HeaderMap,
        query_params: &[(String, String)],
    ) -> Result<RawResponse, IgError> {
        self.make_request(Method::GET, endpoint, headers, query_params, None)
            .await
    }

    async fn post(
        &self,
        endpoint: &str,
        headers: &HeaderMap,
        body: &Value,
    ) -> Result<RawResponse, IgError> {
        let body_bytes = serde_json::to_vec(body)?;
        self.make_request(Method::POST, endpoint, headers, &[], Some(body_bytes))
            .await
    }

    async fn put(
        &self,
        endpoint: &str,
        headers: &HeaderMap,
        body: &Value,
    ) -> Result<RawResponse, IgError> {
        let body_bytes = serde_json::to_vec(body)?;
        self.make_request(Method::PUT, endpoint, headers, &[], Some(body_bytes))
            .await
    }

    fn base_url(&self) -> &str {
        &self.config.base_url
    }
}
