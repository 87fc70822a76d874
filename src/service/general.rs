use crate::core::errors::IgError;
use crate::core::kernel::RestClient;
use crate::service::{params, IgService};
use crate::session::Params;
use serde_json::{json, Value};
use tracing::{instrument, warn};

const APPLICATIONS: &str = "/operations/application";

impl<R: RestClient> IgService<R> {
    /// Client-owned applications and their allowances
    pub async fn get_client_apps(&self) -> Result<Value, IgError> {
        self.session().read(APPLICATIONS, &Params::new(), "1").await
    }

    #[instrument(skip(self, api_key))]
    pub async fn update_client_app(
        &self,
        allowance_account_overall: u32,
        allowance_account_trading: u32,
        api_key: &str,
        status: &str,
    ) -> Result<Value, IgError> {
        let body = params([
            ("allowanceAccountOverall", json!(allowance_account_overall)),
            ("allowanceAccountTrading", json!(allowance_account_trading)),
            ("apiKey", json!(api_key)),
            ("status", json!(status)),
        ]);
        self.session().update(APPLICATIONS, &body, "1").await
    }

    /// Stop the current API key from processing further requests. Only the
    /// web platform can enable it again.
    pub async fn disable_client_app_key(&self) -> Result<Value, IgError> {
        warn!("Disabling the current application key");
        let endpoint = format!("{}/disable", APPLICATIONS);
        self.session().update(&endpoint, &Params::new(), "1").await
    }
}
