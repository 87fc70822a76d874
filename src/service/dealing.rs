use crate::core::errors::IgError;
use crate::core::kernel::RestClient;
use crate::core::types::{
    to_params, ClosePositionRequest, CreatePositionRequest, CreateWorkingOrderRequest,
    UpdatePositionRequest, UpdateWorkingOrderRequest,
};
use crate::service::{required_str, IgService};
use crate::session::Params;
use serde_json::Value;
use tokio::time::sleep;
use tracing::{info, instrument, warn};

const POSITIONS_OTC: &str = "/positions/otc";
const WORKING_ORDERS_OTC: &str = "/workingorders/otc";

/// Statuses meaning "the deal exists but the gateway has not published it yet"
const CONFIRMATION_NOT_READY: &[u16] = &[404, 405];
const POSITION_NOT_READY: &[u16] = &[404];

/// Outcome of polling for a deal
#[derive(Debug, Clone, PartialEq)]
pub enum Confirmation {
    /// The decoded confirmation or position body
    Confirmed(Value),
    /// Every poll came back not-found. Carries the last response's status
    /// and error code.
    Pending {
        attempts: u32,
        status: u16,
        code: String,
    },
}

impl Confirmation {
    pub const fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed(_))
    }

    pub const fn payload(&self) -> Option<&Value> {
        match self {
            Self::Confirmed(payload) => Some(payload),
            Self::Pending { .. } => None,
        }
    }

    pub fn into_payload(self) -> Option<Value> {
        match self {
            Self::Confirmed(payload) => Some(payload),
            Self::Pending { .. } => None,
        }
    }

    /// `dealStatus` of a confirmation, e.g. `ACCEPTED` or `REJECTED`
    pub fn deal_status(&self) -> Option<&str> {
        self.payload()?.get("dealStatus")?.as_str()
    }
}

impl<R: RestClient> IgService<R> {
    /// Read `endpoint` until it stops answering with one of the `not_ready`
    /// statuses or the confirmation policy runs out of attempts
    async fn poll_deal(
        &self,
        endpoint: &str,
        version: &str,
        not_ready: &[u16],
    ) -> Result<Confirmation, IgError> {
        let policy = self.session().options().confirmation;
        let max_attempts = policy.max_attempts.max(1);
        let mut pending = Confirmation::Pending {
            attempts: 0,
            status: 0,
            code: String::new(),
        };

        for attempt in 1..=max_attempts {
            match self.session().read(endpoint, &Params::new(), version).await {
                Ok(payload) => return Ok(Confirmation::Confirmed(payload)),
                Err(IgError::Api { status, code }) if not_ready.contains(&status) => {
                    info!("Deal '{}' not found ({}), retrying.", endpoint, status);
                    pending = Confirmation::Pending {
                        attempts: attempt,
                        status,
                        code,
                    };
                    if attempt < max_attempts {
                        sleep(policy.delay).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }

        warn!(endpoint, attempts = max_attempts, "Deal still not available");
        Ok(pending)
    }

    /// Poll for the confirmation of a deal reference
    #[instrument(skip(self))]
    pub async fn fetch_deal_by_deal_reference(
        &self,
        deal_reference: &str,
    ) -> Result<Confirmation, IgError> {
        let endpoint = format!("/confirms/{}", deal_reference);
        self.poll_deal(&endpoint, "1", CONFIRMATION_NOT_READY).await
    }

    /// Poll for an open position by deal id
    #[instrument(skip(self))]
    pub async fn fetch_open_position_by_deal_id(&self, deal_id: &str) -> Result<Confirmation, IgError> {
        let endpoint = format!("/positions/{}", deal_id);
        self.poll_deal(&endpoint, "2", POSITION_NOT_READY).await
    }

    /// All open positions; `version` is "1" or "2"
    pub async fn fetch_open_positions(&self, version: &str) -> Result<Value, IgError> {
        self.session().read("/positions", &Params::new(), version).await
    }

    async fn confirm(&self, data: &Value) -> Result<Confirmation, IgError> {
        let deal_reference = required_str(data, "dealReference")?;
        self.fetch_deal_by_deal_reference(&deal_reference).await
    }

    #[instrument(skip(self, request), fields(deal_id = ?request.deal_id))]
    pub async fn close_open_position(
        &self,
        request: &ClosePositionRequest,
    ) -> Result<Confirmation, IgError> {
        request.validate()?;
        let data = self
            .session()
            .delete(POSITIONS_OTC, &to_params(request)?, "1")
            .await?;
        self.confirm(&data).await
    }

    #[instrument(skip(self, request), fields(epic = %request.epic))]
    pub async fn create_open_position(
        &self,
        request: &CreatePositionRequest,
    ) -> Result<Confirmation, IgError> {
        request.validate()?;
        let data = self
            .session()
            .create(POSITIONS_OTC, &to_params(request)?, "2")
            .await?;
        self.confirm(&data).await
    }

    #[instrument(skip(self, request))]
    pub async fn update_open_position(
        &self,
        deal_id: &str,
        request: &UpdatePositionRequest,
    ) -> Result<Confirmation, IgError> {
        let endpoint = format!("{}/{}", POSITIONS_OTC, deal_id);
        let data = self
            .session()
            .update(&endpoint, &to_params(request)?, "2")
            .await?;
        self.confirm(&data).await
    }

    /// All working orders; `version` is "1" or "2"
    pub async fn fetch_working_orders(&self, version: &str) -> Result<Value, IgError> {
        self.session()
            .read("/workingorders", &Params::new(), version)
            .await
    }

    #[instrument(skip(self, request), fields(epic = %request.epic))]
    pub async fn create_working_order(
        &self,
        request: &CreateWorkingOrderRequest,
    ) -> Result<Confirmation, IgError> {
        request.validate()?;
        let data = self
            .session()
            .create(WORKING_ORDERS_OTC, &to_params(request)?, "2")
            .await?;
        self.confirm(&data).await
    }

    #[instrument(skip(self, request))]
    pub async fn update_working_order(
        &self,
        deal_id: &str,
        request: &UpdateWorkingOrderRequest,
    ) -> Result<Confirmation, IgError> {
        let endpoint = format!("{}/{}", WORKING_ORDERS_OTC, deal_id);
        let data = self
            .session()
            .update(&endpoint, &to_params(request)?, "2")
            .await?;
        self.confirm(&data).await
    }

    #[instrument(skip(self))]
    pub async fn delete_working_order(&self, deal_id: &str) -> Result<Confirmation, IgError> {
        let endpoint = format!("{}/{}", WORKING_ORDERS_OTC, deal_id);
        let data = self
            .session()
            .delete(&endpoint, &Params::new(), "2")
            .await?;
        self.confirm(&data).await
    }
}
