use crate::core::errors::IgError;
use crate::core::kernel::RestClient;
use crate::service::{params, IgService};
use crate::session::{AuthProtocol, Params, SessionResponse};
use serde_json::{json, Value};
use tracing::{info, instrument};

const SESSION: &str = "/session";

impl<R: RestClient> IgService<R> {
    /// Log in with the given protocol version
    pub async fn create_session(&self, protocol: AuthProtocol) -> Result<SessionResponse, IgError> {
        self.session().create_session(protocol).await
    }

    /// End the session on the gateway and forget the local tokens
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), IgError> {
        self.session().delete(SESSION, &Params::new(), "1").await?;
        self.session().clear_session().await;
        info!("Logged out");
        Ok(())
    }

    /// Make `account_id` the active account, optionally also the default one
    #[instrument(skip(self))]
    pub async fn switch_account(
        &self,
        account_id: &str,
        default_account: bool,
    ) -> Result<Value, IgError> {
        let body = params([
            ("accountId", json!(account_id)),
            ("defaultAccount", json!(default_account)),
        ]);
        self.session().update(SESSION, &body, "1").await
    }

    /// Current session details. With `fetch_session_tokens` the gateway also
    /// returns `CST`/`X-SECURITY-TOKEN` headers, which are kept for later calls.
    pub async fn read_session(&self, fetch_session_tokens: bool) -> Result<Value, IgError> {
        let query = params([(
            "fetchSessionTokens",
            json!(if fetch_session_tokens { "true" } else { "false" }),
        )]);
        self.session().read(SESSION, &query, "1").await
    }
}
