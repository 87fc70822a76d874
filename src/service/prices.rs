use crate::core::errors::IgError;
use crate::core::kernel::RestClient;
use crate::core::types::Resolution;
use crate::service::{params, IgService};
use crate::session::Params;
use crate::utils::{conv_datetime, format_iso, format_spaced};
use chrono::{Duration as ChronoDuration, NaiveDateTime, Utc};
use serde_json::{json, Value};
use tracing::{info, instrument};

/// Parameters of the v3 `/prices/{epic}` endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceQuery {
    pub resolution: Option<Resolution>,
    pub from: Option<NaiveDateTime>,
    pub to: Option<NaiveDateTime>,
    /// Most recent points to return when no date range is given
    pub max: Option<u32>,
    pub page_size: u32,
}

impl Default for PriceQuery {
    fn default() -> Self {
        Self {
            resolution: None,
            from: None,
            to: None,
            max: None,
            page_size: 20,
        }
    }
}

impl PriceQuery {
    pub fn between(resolution: Resolution, from: NaiveDateTime, to: NaiveDateTime) -> Self {
        Self {
            resolution: Some(resolution),
            from: Some(from),
            to: Some(to),
            ..Self::default()
        }
    }

    pub fn last(resolution: Resolution, points: u32) -> Self {
        Self {
            resolution: Some(resolution),
            max: Some(points),
            ..Self::default()
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    fn to_params(&self) -> Params {
        let mut p = Params::new();
        if let Some(resolution) = self.resolution {
            p.insert("resolution".into(), json!(resolution.as_str()));
        }
        if let Some(from) = &self.from {
            p.insert("from".into(), json!(format_iso(from)));
        }
        if let Some(to) = &self.to {
            p.insert("to".into(), json!(format_iso(to)));
        }
        if let Some(max) = self.max {
            p.insert("max".into(), json!(max));
        }
        p.insert("pageSize".into(), json!(self.page_size));
        p
    }
}

/// Report the historical-data allowance carried in `metadata.allowance`
fn log_allowance(data: &Value) {
    let Some(allowance) = data.pointer("/metadata/allowance") else {
        return;
    };
    let remaining = allowance.get("remainingAllowance").and_then(Value::as_i64);
    let expiry = allowance
        .get("allowanceExpiry")
        .and_then(Value::as_i64)
        .map(|secs| Utc::now() + ChronoDuration::seconds(secs));
    if let (Some(remaining), Some(expiry)) = (remaining, expiry) {
        info!(
            "Historic price data allowance: {} remaining until {}",
            remaining, expiry
        );
    }
}

impl<R: RestClient> IgService<R> {
    /// v3 historical prices with every page bundled into `prices`, pausing
    /// between pages
    #[instrument(skip(self, query))]
    pub async fn fetch_historical_prices_by_epic(
        &self,
        epic: &str,
        query: &PriceQuery,
    ) -> Result<Value, IgError> {
        let endpoint = format!("/prices/{}", epic);
        let wait = self.session().options().page_wait;
        let data = self
            .collect_numbered_pages(&endpoint, query.to_params(), "3", "prices", Some(wait))
            .await?;
        log_allowance(&data);
        Ok(data)
    }

    pub async fn fetch_historical_prices_by_epic_and_num_points(
        &self,
        epic: &str,
        resolution: Resolution,
        num_points: u32,
    ) -> Result<Value, IgError> {
        let endpoint = format!("/prices/{}/{}/{}", epic, resolution, num_points);
        self.session().read(&endpoint, &Params::new(), "2").await
    }

    /// Prices between two instants. Version 1 takes the range as query
    /// parameters, version 2 as path segments.
    #[instrument(skip(self))]
    pub async fn fetch_historical_prices_by_epic_and_date_range(
        &self,
        epic: &str,
        resolution: Resolution,
        start: &NaiveDateTime,
        end: &NaiveDateTime,
        version: &str,
    ) -> Result<Value, IgError> {
        match version {
            "1" => {
                let endpoint = format!("/prices/{}/{}", epic, resolution);
                let query = params([
                    ("startdate", json!(conv_datetime(start, version)?)),
                    ("enddate", json!(conv_datetime(end, version)?)),
                ]);
                self.session().read(&endpoint, &query, version).await
            }
            "2" => {
                let endpoint = format!(
                    "/prices/{}/{}/{}/{}",
                    epic,
                    resolution,
                    format_spaced(start),
                    format_spaced(end)
                );
                self.session().read(&endpoint, &Params::new(), version).await
            }
            other => Err(IgError::InvalidParameters(format!(
                "date-range prices support versions 1 and 2, not '{}'",
                other
            ))),
        }
    }
}
