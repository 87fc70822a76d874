use crate::core::errors::IgError;
use crate::core::kernel::RestClient;
use crate::core::types::TransactionType;
use crate::service::{params, required_str, IgService};
use crate::session::Params;
use crate::utils::{conv_to_ms, format_day, format_iso};
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::instrument;

const ACTIVITY_ENDPOINT: &str = "/history/activity";
const TRANSACTIONS_ENDPOINT: &str = "/history/transactions";

/// Filters for the v3 account activity endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityQuery {
    pub from: Option<NaiveDateTime>,
    pub to: Option<NaiveDateTime>,
    /// Include affected deals and order details
    pub detailed: bool,
    pub deal_id: Option<String>,
    /// FIQL filter, e.g. `channel==PUBLIC_WEB_API`
    pub filter: Option<String>,
    pub page_size: u32,
}

impl Default for ActivityQuery {
    fn default() -> Self {
        Self {
            from: None,
            to: None,
            detailed: false,
            deal_id: None,
            filter: None,
            page_size: 50,
        }
    }
}

impl ActivityQuery {
    pub fn between(from: NaiveDateTime, to: NaiveDateTime) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
            ..Self::default()
        }
    }

    pub fn detailed(mut self) -> Self {
        self.detailed = true;
        self
    }

    pub fn with_deal_id(mut self, deal_id: &str) -> Self {
        self.deal_id = Some(deal_id.to_string());
        self
    }

    pub fn with_filter(mut self, filter: &str) -> Self {
        self.filter = Some(filter.to_string());
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    fn to_params(&self) -> Params {
        let mut p = Params::new();
        if let Some(from) = &self.from {
            p.insert("from".into(), json!(format_iso(from)));
        }
        if let Some(to) = &self.to {
            p.insert("to".into(), json!(format_iso(to)));
        }
        if self.detailed {
            p.insert("detailed".into(), json!("true"));
        }
        if let Some(deal_id) = &self.deal_id {
            p.insert("dealId".into(), json!(deal_id));
        }
        if let Some(filter) = &self.filter {
            p.insert("filter".into(), json!(filter));
        }
        p.insert("pageSize".into(), json!(self.page_size));
        p
    }
}

/// Filters for the v2 transaction history endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionQuery {
    pub trans_type: Option<TransactionType>,
    pub from: Option<NaiveDateTime>,
    pub to: Option<NaiveDateTime>,
    /// Span back from now; ignored by the gateway when a date range is given
    pub max_span_seconds: Option<u64>,
    pub page_size: u32,
}

impl Default for TransactionQuery {
    fn default() -> Self {
        Self {
            trans_type: None,
            from: None,
            to: None,
            max_span_seconds: None,
            page_size: 20,
        }
    }
}

impl TransactionQuery {
    pub fn of_type(trans_type: TransactionType) -> Self {
        Self {
            trans_type: Some(trans_type),
            ..Self::default()
        }
    }

    pub fn between(mut self, from: NaiveDateTime, to: NaiveDateTime) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    pub fn with_max_span(mut self, seconds: u64) -> Self {
        self.max_span_seconds = Some(seconds);
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    fn to_params(&self) -> Params {
        let mut p = Params::new();
        if let Some(trans_type) = self.trans_type {
            p.insert("type".into(), json!(trans_type.as_str()));
        }
        if let Some(from) = &self.from {
            p.insert("from".into(), json!(format_iso(from)));
        }
        if let Some(to) = &self.to {
            p.insert("to".into(), json!(format_iso(to)));
        }
        if let Some(span) = self.max_span_seconds {
            p.insert("maxSpanSeconds".into(), json!(span));
        }
        p.insert("pageSize".into(), json!(self.page_size));
        p
    }
}

impl<R: RestClient> IgService<R> {
    pub async fn fetch_accounts(&self) -> Result<Value, IgError> {
        self.session().read("/accounts", &Params::new(), "1").await
    }

    pub async fn fetch_account_preferences(&self) -> Result<Value, IgError> {
        self.session()
            .read("/accounts/preferences", &Params::new(), "1")
            .await
    }

    /// Turn trailing stops on or off. Returns the gateway's `status` field.
    #[instrument(skip(self))]
    pub async fn update_account_preferences(
        &self,
        trailing_stops_enabled: bool,
    ) -> Result<String, IgError> {
        let enabled = if trailing_stops_enabled { "true" } else { "false" };
        let body = params([("trailingStopsEnabled", json!(enabled))]);
        let data = self
            .session()
            .update("/accounts/preferences", &body, "1")
            .await?;
        required_str(&data, "status")
    }

    /// Activity over the last `period`
    pub async fn fetch_account_activity_by_period(&self, period: Duration) -> Result<Value, IgError> {
        let endpoint = format!("{}/{}", ACTIVITY_ENDPOINT, conv_to_ms(period));
        self.session().read(&endpoint, &Params::new(), "1").await
    }

    /// Activity between two calendar days, inclusive
    pub async fn fetch_account_activity_by_date(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Value, IgError> {
        if from > to {
            return Err(IgError::InvalidParameters(format!(
                "from date {} is after to date {}",
                from, to
            )));
        }
        let endpoint = format!(
            "{}/{}/{}",
            ACTIVITY_ENDPOINT,
            format_day(&from),
            format_day(&to)
        );
        self.session().read(&endpoint, &Params::new(), "1").await
    }

    /// v2 activity history with every page bundled into `activities`
    #[instrument(skip(self))]
    pub async fn fetch_account_activity_v2(
        &self,
        from: Option<NaiveDateTime>,
        to: Option<NaiveDateTime>,
        max_span_seconds: Option<u64>,
        page_size: u32,
    ) -> Result<Value, IgError> {
        let mut p = Params::new();
        if let Some(from) = &from {
            p.insert("from".into(), json!(format_iso(from)));
        }
        if let Some(to) = &to {
            p.insert("to".into(), json!(format_iso(to)));
        }
        if let Some(span) = max_span_seconds {
            p.insert("maxSpanSeconds".into(), json!(span));
        }
        p.insert("pageSize".into(), json!(page_size));

        self.collect_numbered_pages(ACTIVITY_ENDPOINT, p, "2", "activities", None)
            .await
    }

    /// v3 activity history, following the gateway's paging links until the
    /// whole range has been read
    #[instrument(skip(self))]
    pub async fn fetch_account_activity(&self, query: &ActivityQuery) -> Result<Value, IgError> {
        self.collect_linked_pages(ACTIVITY_ENDPOINT, query.to_params(), "3", "activities")
            .await
    }

    pub async fn fetch_transaction_history_by_type_and_period(
        &self,
        trans_type: TransactionType,
        period: Duration,
    ) -> Result<Value, IgError> {
        let endpoint = format!(
            "{}/{}/{}",
            TRANSACTIONS_ENDPOINT,
            trans_type.as_str(),
            conv_to_ms(period)
        );
        self.session().read(&endpoint, &Params::new(), "1").await
    }

    /// v2 transaction history with every page bundled into `transactions`
    #[instrument(skip(self))]
    pub async fn fetch_transaction_history(&self, query: &TransactionQuery) -> Result<Value, IgError> {
        self.collect_numbered_pages(
            TRANSACTIONS_ENDPOINT,
            query.to_params(),
            "2",
            "transactions",
            None,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_activity_query_params() {
        let p = ActivityQuery::between(at(1, 9), at(2, 17))
            .detailed()
            .with_filter("channel==PUBLIC_WEB_API")
            .to_params();

        assert_eq!(p["from"], json!("2024-03-01T09:00:00"));
        assert_eq!(p["to"], json!("2024-03-02T17:00:00"));
        assert_eq!(p["detailed"], json!("true"));
        assert_eq!(p["filter"], json!("channel==PUBLIC_WEB_API"));
        assert_eq!(p["pageSize"], json!(50));
        assert!(!p.contains_key("dealId"));
    }

    #[test]
    fn test_default_activity_query_only_pages() {
        let p = ActivityQuery::default().to_params();
        assert_eq!(p.len(), 1);
        assert_eq!(p["pageSize"], json!(50));
    }

    #[test]
    fn test_transaction_query_params() {
        let p = TransactionQuery::of_type(TransactionType::AllDeal)
            .with_max_span(600)
            .with_page_size(10)
            .to_params();

        assert_eq!(p["type"], json!("ALL_DEAL"));
        assert_eq!(p["maxSpanSeconds"], json!(600));
        assert_eq!(p["pageSize"], json!(10));
        assert!(!p.contains_key("from"));
    }
}
