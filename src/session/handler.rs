use crate::core::config::IgConfig;
use crate::core::errors::IgError;
use crate::core::kernel::{RawResponse, RestClient};
use crate::session::auth::{headers, AuthProtocol, AuthState, OAuthToken};
use crate::session::response::{
    classify, decode_body, error_code, is_allowance_exceeded, ResponseOutcome,
};
use crate::session::{query_pairs, Params, SessionOptions, Verb};
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, Secret};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

const SESSION_ENDPOINT: &str = "/session";
const REFRESH_ENDPOINT: &str = "/session/refresh-token";

/// Headers and decoded body of a login, for callers that need the raw
/// tokens (e.g. the streaming adapter)
#[derive(Debug, Clone)]
pub struct SessionResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl SessionResponse {
    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

#[derive(Debug, Default)]
struct SessionState {
    auth: AuthState,
    headers: HeaderMap,
    protocol: Option<AuthProtocol>,
}

/// Owner of the login state and the single path for every API call.
///
/// Each verb call holds the state lock from the validity check until the
/// response has been classified, so concurrent callers never see a
/// half-updated header set. Backoff waits between `read` retries happen
/// with the lock released.
pub struct SessionHandler<R: RestClient> {
    rest: R,
    username: String,
    password: Secret<String>,
    acc_number: Option<String>,
    options: SessionOptions,
    state: Mutex<SessionState>,
}

impl<R: RestClient> std::fmt::Debug for SessionHandler<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandler")
            .field("base_url", &self.rest.base_url())
            .field("username", &self.username)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<R: RestClient> SessionHandler<R> {
    pub fn new(rest: R, config: &IgConfig, options: SessionOptions) -> Result<Self, IgError> {
        let api_key = HeaderValue::from_str(config.api_key()).map_err(|_| {
            IgError::Configuration("API key contains characters not allowed in a header".into())
        })?;

        let mut default_headers = HeaderMap::new();
        default_headers.insert(HeaderName::from_static(headers::API_KEY), api_key);
        default_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        default_headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json; charset=UTF-8"),
        );

        Ok(Self {
            rest,
            username: config.username.clone(),
            password: config.password.clone(),
            acc_number: config.acc_number.clone(),
            options,
            state: Mutex::new(SessionState {
                headers: default_headers,
                ..SessionState::default()
            }),
        })
    }

    pub const fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn base_url(&self) -> &str {
        self.rest.base_url()
    }

    pub fn acc_number(&self) -> Option<&str> {
        self.acc_number.as_deref()
    }

    /// Snapshot of the current tokens and expiry
    pub async fn auth_state(&self) -> AuthState {
        self.state.lock().await.auth.clone()
    }

    /// Snapshot of the persistent header set
    pub async fn headers(&self) -> HeaderMap {
        self.state.lock().await.headers.clone()
    }

    /// Protocol of the last successful login
    pub async fn protocol(&self) -> Option<AuthProtocol> {
        self.state.lock().await.protocol
    }

    /// The `CST` and `X-SECURITY-TOKEN` values currently sent with requests
    pub async fn security_tokens(&self) -> Option<(String, String)> {
        let state = self.state.lock().await;
        let cst = state.headers.get(headers::CST)?.to_str().ok()?;
        let xst = state.headers.get(headers::SECURITY_TOKEN)?.to_str().ok()?;
        Some((cst.to_string(), xst.to_string()))
    }

    /// Log in and install the tokens the chosen protocol hands back
    pub async fn create_session(&self, protocol: AuthProtocol) -> Result<SessionResponse, IgError> {
        let mut state = self.state.lock().await;
        self.login(&mut state, protocol).await
    }

    /// Trade the stored refresh token for a new token pair. Returns the HTTP
    /// status of the refresh call. The gateway serves refreshes on version "1".
    pub async fn refresh_session(&self, version: &str) -> Result<StatusCode, IgError> {
        let mut state = self.state.lock().await;
        self.refresh(&mut state, version).await
    }

    /// Drop all tokens and log in again from the credentials as a v3 session
    pub async fn reset_session(&self) -> Result<SessionResponse, IgError> {
        let mut state = self.state.lock().await;
        self.reset(&mut state).await
    }

    /// Forget every token without contacting the gateway
    pub async fn clear_session(&self) {
        let mut state = self.state.lock().await;
        state.auth.clear();
        state.protocol = None;
        for name in [headers::CST, headers::SECURITY_TOKEN, headers::ACCOUNT_ID] {
            state.headers.remove(name);
        }
        state.headers.remove(AUTHORIZATION);
    }

    /// Create = POST
    pub async fn create(&self, endpoint: &str, params: &Params, version: &str) -> Result<Value, IgError> {
        self.execute(Verb::Create, endpoint, params, version).await
    }

    /// Read = GET, retried with backoff on allowance and token errors
    pub async fn read(&self, endpoint: &str, params: &Params, version: &str) -> Result<Value, IgError> {
        self.options
            .retry
            .run("read", || self.execute(Verb::Read, endpoint, params, version))
            .await
    }

    /// Update = PUT
    pub async fn update(&self, endpoint: &str, params: &Params, version: &str) -> Result<Value, IgError> {
        self.execute(Verb::Update, endpoint, params, version).await
    }

    /// Delete = POST with a `_method: DELETE` override header
    pub async fn delete(&self, endpoint: &str, params: &Params, version: &str) -> Result<Value, IgError> {
        self.execute(Verb::Delete, endpoint, params, version).await
    }

    #[instrument(skip(self, params), fields(verb = verb.as_str(), endpoint = %endpoint, version = %version))]
    async fn execute(
        &self,
        verb: Verb,
        endpoint: &str,
        params: &Params,
        version: &str,
    ) -> Result<Value, IgError> {
        let mut state = self.state.lock().await;
        self.check_session(&mut state).await?;
        set_version(&mut state.headers, version)?;

        let body = Value::Object(params.clone());
        let raw = match verb {
            Verb::Read => {
                self.rest
                    .get(endpoint, &state.headers, &query_pairs(params))
                    .await
            }
            Verb::Create => self.rest.post(endpoint, &state.headers, &body).await,
            Verb::Update => self.rest.put(endpoint, &state.headers, &body).await,
            Verb::Delete => {
                state.headers.insert(
                    HeaderName::from_static(headers::METHOD_OVERRIDE),
                    HeaderValue::from_static("DELETE"),
                );
                let raw = self.rest.post(endpoint, &state.headers, &body).await;
                state.headers.remove(headers::METHOD_OVERRIDE);
                raw
            }
        }?;

        info!("{} '{}', resp {}", verb.as_str(), endpoint, raw.status.as_u16());
        copy_security_tokens(&mut state.headers, &raw.headers);
        self.handle_response(&mut state, &raw).await
    }

    async fn handle_response(
        &self,
        state: &mut SessionState,
        raw: &RawResponse,
    ) -> Result<Value, IgError> {
        match classify(raw) {
            ResponseOutcome::Payload(payload) => Ok(payload),
            ResponseOutcome::Retryable(kind) => {
                debug!(?kind, status = raw.status.as_u16(), "Recoverable response, resetting session");
                self.reset(state).await?;
                Err(kind.into())
            }
            ResponseOutcome::Fatal(e) => {
                debug!(status = raw.status.as_u16(), "Request failed: {}", e);
                Err(e)
            }
        }
    }

    /// Refresh a v3 session whose tokens have expired; fall back to a full
    /// reset when the refresh fails. Sessions without an expiry are left alone.
    async fn check_session(&self, state: &mut SessionState) -> Result<(), IgError> {
        debug!("Checking session status...");
        if !state.auth.needs_refresh(Utc::now()) {
            return Ok(());
        }

        info!("Current session has expired, refreshing...");
        if let Err(e) = self.refresh(state, AuthProtocol::V1.version()).await {
            warn!("Refresh failed ({}), resetting session", e);
            self.reset(state).await?;
        }
        Ok(())
    }

    async fn reset(&self, state: &mut SessionState) -> Result<SessionResponse, IgError> {
        info!("Nuking session, full reset.");
        state.auth.clear();
        state.headers.remove(AUTHORIZATION);
        self.login(state, AuthProtocol::V3).await
    }

    async fn login(
        &self,
        state: &mut SessionState,
        protocol: AuthProtocol,
    ) -> Result<SessionResponse, IgError> {
        if protocol.uses_oauth() && self.acc_number.is_none() {
            return Err(IgError::Configuration(
                "Account number must be set for v3 sessions".to_string(),
            ));
        }

        info!(
            "Creating new {} session for user '{}' at '{}'",
            protocol,
            self.username,
            self.rest.base_url()
        );

        set_version(&mut state.headers, protocol.version())?;
        let credentials = json!({
            "identifier": self.username,
            "password": self.password.expose_secret(),
        });
        let raw = self
            .rest
            .post(SESSION_ENDPOINT, &state.headers, &credentials)
            .await?;
        let body = decode_auth_response(&raw)?;

        copy_security_tokens(&mut state.headers, &raw.headers);
        if protocol.uses_oauth() {
            if let Some(acc_number) = &self.acc_number {
                let value = HeaderValue::from_str(acc_number).map_err(|_| {
                    IgError::Configuration("Account number is not a valid header value".into())
                })?;
                state
                    .headers
                    .insert(HeaderName::from_static(headers::ACCOUNT_ID), value);
            }
            let token = body.get("oauthToken").cloned().ok_or_else(|| {
                IgError::UnexpectedResponse("v3 session response has no oauthToken".into())
            })?;
            let token: OAuthToken = serde_json::from_value(token)?;
            install_oauth(state, &token)?;
        } else {
            state.auth.clear();
            state.headers.remove(AUTHORIZATION);
            state.headers.remove(headers::ACCOUNT_ID);
        }
        state.protocol = Some(protocol);

        Ok(SessionResponse {
            status: raw.status,
            headers: raw.headers,
            body,
        })
    }

    async fn refresh(&self, state: &mut SessionState, version: &str) -> Result<StatusCode, IgError> {
        info!("Refreshing session '{}'", self.username);
        let refresh_token = state
            .auth
            .refresh_token()
            .ok_or_else(|| IgError::InvalidParameters("No refresh token: not a v3 session".into()))?
            .to_string();

        set_version(&mut state.headers, version)?;
        let raw = self
            .rest
            .post(
                REFRESH_ENDPOINT,
                &state.headers,
                &json!({ "refresh_token": refresh_token }),
            )
            .await?;
        let body = decode_auth_response(&raw)?;
        let token: OAuthToken = serde_json::from_value(body)?;
        install_oauth(state, &token)?;
        Ok(raw.status)
    }
}

/// Error handling for login and refresh: no reset, since these calls are
/// themselves the recovery path.
fn decode_auth_response(raw: &RawResponse) -> Result<Value, IgError> {
    if raw.status.is_server_error() {
        return Err(IgError::Transport {
            status: raw.status.as_u16(),
            reason: raw.reason().to_string(),
        });
    }
    if is_allowance_exceeded(&raw.body) {
        return Err(IgError::AllowanceExceeded);
    }
    let body = decode_body(&raw.body)?;
    if let Some(code) = error_code(&body) {
        return Err(IgError::Api {
            status: raw.status.as_u16(),
            code,
        });
    }
    if !raw.status.is_success() {
        return Err(IgError::Api {
            status: raw.status.as_u16(),
            code: raw.reason().to_string(),
        });
    }
    Ok(body)
}

fn install_oauth(state: &mut SessionState, token: &OAuthToken) -> Result<(), IgError> {
    let authorization = HeaderValue::from_str(&token.authorization())
        .map_err(|_| IgError::UnexpectedResponse("Access token is not a valid header".into()))?;
    state.headers.insert(AUTHORIZATION, authorization);
    state.auth.apply(token, Utc::now());
    Ok(())
}

fn set_version(session_headers: &mut HeaderMap, version: &str) -> Result<(), IgError> {
    let value = HeaderValue::from_str(version)
        .map_err(|_| IgError::InvalidParameters(format!("Invalid API version '{}'", version)))?;
    session_headers.insert(HeaderName::from_static(headers::VERSION), value);
    Ok(())
}

/// Keep renewed v1/v2 tokens for all future requests
fn copy_security_tokens(session_headers: &mut HeaderMap, response_headers: &HeaderMap) {
    for name in [headers::CST, headers::SECURITY_TOKEN] {
        if let Some(value) = response_headers.get(name) {
            session_headers.insert(HeaderName::from_static(name), value.clone());
        }
    }
}
