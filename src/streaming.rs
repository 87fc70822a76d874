//! Credentials for the Lightstreamer push channel.
//!
//! The push server authenticates with the account id and a password built
//! from the REST session's `CST` and `X-SECURITY-TOKEN` values. v3 logins
//! do not return those tokens, so they are fetched with an extra session read.

use crate::core::errors::IgError;
use crate::core::kernel::RestClient;
use crate::service::{required_str, IgService};
use crate::session::auth::headers;
use crate::session::{AuthProtocol, SessionResponse};
use secrecy::{ExposeSecret, Secret};
use tracing::{info, instrument};

#[derive(Debug, Clone)]
pub struct StreamingCredentials {
    pub endpoint: String,
    pub account_id: Option<String>,
    password: Secret<String>,
}

impl StreamingCredentials {
    pub fn from_tokens(endpoint: &str, account_id: Option<&str>, cst: &str, xst: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            account_id: account_id.map(str::to_string),
            password: Secret::new(format!("CST-{}|XST-{}", cst, xst)),
        }
    }

    /// Read the endpoint from a v1/v2 login body and the tokens from its headers
    pub fn from_session_response(
        response: &SessionResponse,
        account_id: Option<&str>,
    ) -> Result<Self, IgError> {
        let endpoint = required_str(&response.body, "lightstreamerEndpoint")?;
        let token = |name: &str| {
            response.header_str(name).ok_or_else(|| {
                IgError::UnexpectedResponse(format!("login response has no {} header", name))
            })
        };
        Ok(Self::from_tokens(
            &endpoint,
            account_id,
            token(headers::CST)?,
            token(headers::SECURITY_TOKEN)?,
        ))
    }

    /// `CST-{cst}|XST-{xst}`
    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }
}

/// Logs in on behalf of the streaming client and derives its credentials
#[derive(Debug)]
pub struct IgStreamService<'a, R: RestClient> {
    service: &'a IgService<R>,
}

impl<'a, R: RestClient> IgStreamService<'a, R> {
    pub const fn new(service: &'a IgService<R>) -> Self {
        Self { service }
    }

    #[instrument(skip(self))]
    pub async fn create_session(
        &self,
        protocol: AuthProtocol,
    ) -> Result<StreamingCredentials, IgError> {
        let response = self.service.create_session(protocol).await?;
        let session = self.service.session();
        let account_id = session
            .acc_number()
            .map(str::to_string)
            .or_else(|| response.body.get("currentAccountId")?.as_str().map(str::to_string));

        let credentials = if protocol.uses_oauth() {
            self.service.read_session(true).await?;
            let endpoint = required_str(&response.body, "lightstreamerEndpoint")?;
            let (cst, xst) = session.security_tokens().await.ok_or_else(|| {
                IgError::UnexpectedResponse("session read returned no security tokens".into())
            })?;
            StreamingCredentials::from_tokens(&endpoint, account_id.as_deref(), &cst, &xst)
        } else {
            StreamingCredentials::from_session_response(&response, account_id.as_deref())?
        };

        info!("Streaming credentials ready for {}", credentials.endpoint);
        Ok(credentials)
    }
}
