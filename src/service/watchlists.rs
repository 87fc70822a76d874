use crate::core::errors::IgError;
use crate::core::kernel::RestClient;
use crate::service::{params, IgService};
use crate::session::Params;
use serde_json::{json, Value};
use tracing::instrument;

const WATCHLISTS: &str = "/watchlists";

impl<R: RestClient> IgService<R> {
    pub async fn fetch_all_watchlists(&self) -> Result<Value, IgError> {
        self.session().read(WATCHLISTS, &Params::new(), "1").await
    }

    #[instrument(skip(self))]
    pub async fn create_watchlist(&self, name: &str, epics: &[&str]) -> Result<Value, IgError> {
        let body = params([("name", json!(name)), ("epics", json!(epics))]);
        self.session().create(WATCHLISTS, &body, "1").await
    }

    #[instrument(skip(self))]
    pub async fn delete_watchlist(&self, watchlist_id: &str) -> Result<Value, IgError> {
        let endpoint = format!("{}/{}", WATCHLISTS, watchlist_id);
        self.session().delete(&endpoint, &Params::new(), "1").await
    }

    pub async fn fetch_watchlist_markets(&self, watchlist_id: &str) -> Result<Value, IgError> {
        let endpoint = format!("{}/{}", WATCHLISTS, watchlist_id);
        self.session().read(&endpoint, &Params::new(), "1").await
    }

    pub async fn add_market_to_watchlist(
        &self,
        watchlist_id: &str,
        epic: &str,
    ) -> Result<Value, IgError> {
        let endpoint = format!("{}/{}", WATCHLISTS, watchlist_id);
        let body = params([("epic", json!(epic))]);
        self.session().update(&endpoint, &body, "1").await
    }

    pub async fn remove_market_from_watchlist(
        &self,
        watchlist_id: &str,
        epic: &str,
    ) -> Result<Value, IgError> {
        let endpoint = format!("{}/{}/{}", WATCHLISTS, watchlist_id, epic);
        self.session().delete(&endpoint, &Params::new(), "1").await
    }
}
