use crate::core::errors::IgError;
use crate::core::kernel::RestClient;
use crate::service::{params, IgService};
use crate::session::Params;
use serde_json::{json, Value};
use tracing::instrument;

impl<R: RestClient> IgService<R> {
    /// Client sentiment for one market, or for several in a single call
    #[instrument(skip(self))]
    pub async fn fetch_client_sentiment_by_instrument(
        &self,
        market_ids: &[&str],
    ) -> Result<Value, IgError> {
        match market_ids {
            [] => Err(IgError::InvalidParameters(
                "at least one market id is required".into(),
            )),
            [market_id] => {
                let endpoint = format!("/clientsentiment/{}", market_id);
                self.session().read(&endpoint, &Params::new(), "1").await
            }
            many => {
                let query = params([("marketIds", json!(many.join(",")))]);
                self.session().read("/clientsentiment", &query, "1").await
            }
        }
    }

    pub async fn fetch_related_client_sentiment_by_instrument(
        &self,
        market_id: &str,
    ) -> Result<Value, IgError> {
        let endpoint = format!("/clientsentiment/related/{}", market_id);
        self.session().read(&endpoint, &Params::new(), "1").await
    }

    /// Root of the market navigation tree
    pub async fn fetch_top_level_navigation_nodes(&self) -> Result<Value, IgError> {
        self.session()
            .read("/marketnavigation", &Params::new(), "1")
            .await
    }

    /// Child nodes and markets of a navigation node
    pub async fn fetch_sub_nodes_by_node(&self, node: &str) -> Result<Value, IgError> {
        let endpoint = format!("/marketnavigation/{}", node);
        self.session().read(&endpoint, &Params::new(), "1").await
    }

    pub async fn fetch_market_by_epic(&self, epic: &str) -> Result<Value, IgError> {
        let endpoint = format!("/markets/{}", epic);
        self.session().read(&endpoint, &Params::new(), "3").await
    }

    /// Details of several markets. `detailed` picks between the full and the
    /// snapshot-only view and is only honoured by version 2.
    #[instrument(skip(self))]
    pub async fn fetch_markets_by_epics(
        &self,
        epics: &[&str],
        detailed: bool,
        version: &str,
    ) -> Result<Value, IgError> {
        let mut query = params([("epics", json!(epics.join(",")))]);
        if version == "2" {
            let filter = if detailed { "ALL" } else { "SNAPSHOT_ONLY" };
            query.insert("filter".into(), json!(filter));
        }
        let mut data = self.session().read("/markets", &query, version).await?;
        match data.get_mut("marketDetails") {
            Some(details) => Ok(details.take()),
            None => Err(IgError::UnexpectedResponse(
                "response has no 'marketDetails' field".into(),
            )),
        }
    }

    pub async fn search_markets(&self, search_term: &str) -> Result<Value, IgError> {
        let query = params([("searchTerm", json!(search_term))]);
        self.session().read("/markets", &query, "1").await
    }
}
