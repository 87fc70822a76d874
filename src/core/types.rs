use crate::core::errors::IgError;
use crate::session::Params;
use crate::utils::formatting::conv_datetime;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Buy,
    Sell,
}

impl Direction {
    /// The direction that closes a position opened in this direction
    pub const fn opposite(self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

/// How a market position is filled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    Market,
    Limit,
    Quote,
}

/// Trigger type of a working order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkingOrderType {
    Limit,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeInForce {
    GoodTillCancelled,
    GoodTillDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    All,
    AllDeal,
    Deposit,
    Withdrawal,
}

impl TransactionType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "ALL",
            Self::AllDeal => "ALL_DEAL",
            Self::Deposit => "DEPOSIT",
            Self::Withdrawal => "WITHDRAWAL",
        }
    }
}

/// Price bar resolution for historical price requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Resolution {
    Second,
    Minute,
    #[serde(rename = "MINUTE_2")]
    Minute2,
    #[serde(rename = "MINUTE_3")]
    Minute3,
    #[serde(rename = "MINUTE_5")]
    Minute5,
    #[serde(rename = "MINUTE_10")]
    Minute10,
    #[serde(rename = "MINUTE_15")]
    Minute15,
    #[serde(rename = "MINUTE_30")]
    Minute30,
    Hour,
    #[serde(rename = "HOUR_2")]
    Hour2,
    #[serde(rename = "HOUR_3")]
    Hour3,
    #[serde(rename = "HOUR_4")]
    Hour4,
    Day,
    Week,
    Month,
}

impl Resolution {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Second => "SECOND",
            Self::Minute => "MINUTE",
            Self::Minute2 => "MINUTE_2",
            Self::Minute3 => "MINUTE_3",
            Self::Minute5 => "MINUTE_5",
            Self::Minute10 => "MINUTE_10",
            Self::Minute15 => "MINUTE_15",
            Self::Minute30 => "MINUTE_30",
            Self::Hour => "HOUR",
            Self::Hour2 => "HOUR_2",
            Self::Hour3 => "HOUR_3",
            Self::Hour4 => "HOUR_4",
            Self::Day => "DAY",
            Self::Week => "WEEK",
            Self::Month => "MONTH",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_false(value: &bool) -> bool {
    !*value
}

/// Body of `POST /positions/otc`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePositionRequest {
    pub currency_code: String,
    pub direction: Direction,
    pub epic: String,
    pub expiry: String,
    pub force_open: bool,
    pub guaranteed_stop: bool,
    #[serde(with = "rust_decimal::serde::float_option", skip_serializing_if = "Option::is_none")]
    pub level: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option", skip_serializing_if = "Option::is_none")]
    pub limit_distance: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option", skip_serializing_if = "Option::is_none")]
    pub limit_level: Option<Decimal>,
    pub order_type: OrderType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote_id: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub size: Decimal,
    #[serde(with = "rust_decimal::serde::float_option", skip_serializing_if = "Option::is_none")]
    pub stop_distance: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option", skip_serializing_if = "Option::is_none")]
    pub stop_level: Option<Decimal>,
    pub trailing_stop: bool,
    #[serde(with = "rust_decimal::serde::float_option", skip_serializing_if = "Option::is_none")]
    pub trailing_stop_increment: Option<Decimal>,
}

impl CreatePositionRequest {
    /// A market order with no stops or limits
    pub fn market(epic: &str, direction: Direction, size: Decimal, currency_code: &str) -> Self {
        Self {
            currency_code: currency_code.to_string(),
            direction,
            epic: epic.to_string(),
            expiry: "-".to_string(),
            force_open: true,
            guaranteed_stop: false,
            level: None,
            limit_distance: None,
            limit_level: None,
            order_type: OrderType::Market,
            quote_id: None,
            size,
            stop_distance: None,
            stop_level: None,
            trailing_stop: false,
            trailing_stop_increment: None,
        }
    }

    #[must_use]
    pub fn with_expiry(mut self, expiry: &str) -> Self {
        self.expiry = expiry.to_string();
        self
    }

    #[must_use]
    pub fn with_stop_distance(mut self, distance: Decimal) -> Self {
        self.stop_distance = Some(distance);
        self
    }

    #[must_use]
    pub fn with_limit_distance(mut self, distance: Decimal) -> Self {
        self.limit_distance = Some(distance);
        self
    }

    /// Reject combinations the dealing API refuses
    pub fn validate(&self) -> Result<(), IgError> {
        if self.size <= Decimal::ZERO {
            return Err(IgError::InvalidParameters("size must be positive".into()));
        }
        if self.limit_level.is_some() && self.limit_distance.is_some() {
            return Err(IgError::InvalidParameters(
                "set either limit_level or limit_distance, not both".into(),
            ));
        }
        if self.stop_level.is_some() && self.stop_distance.is_some() {
            return Err(IgError::InvalidParameters(
                "set either stop_level or stop_distance, not both".into(),
            ));
        }
        match self.order_type {
            OrderType::Limit if self.level.is_none() => Err(IgError::InvalidParameters(
                "LIMIT orders need a level".into(),
            )),
            OrderType::Quote if self.level.is_none() || self.quote_id.is_none() => Err(
                IgError::InvalidParameters("QUOTE orders need a level and a quote_id".into()),
            ),
            OrderType::Market if self.level.is_some() || self.quote_id.is_some() => Err(
                IgError::InvalidParameters("MARKET orders take no level or quote_id".into()),
            ),
            _ if self.trailing_stop && self.stop_distance.is_none() => Err(
                IgError::InvalidParameters("trailing stops need a stop_distance".into()),
            ),
            _ if self.trailing_stop && self.guaranteed_stop => Err(IgError::InvalidParameters(
                "a trailing stop cannot be guaranteed".into(),
            )),
            _ => Ok(()),
        }
    }
}

/// Body of the delete-override `POST /positions/otc`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosePositionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deal_id: Option<String>,
    pub direction: Direction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry: Option<String>,
    #[serde(with = "rust_decimal::serde::float_option", skip_serializing_if = "Option::is_none")]
    pub level: Option<Decimal>,
    pub order_type: OrderType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote_id: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub size: Decimal,
}

impl ClosePositionRequest {
    /// Close (part of) a position by deal id at market
    pub fn market(deal_id: &str, direction: Direction, size: Decimal) -> Self {
        Self {
            deal_id: Some(deal_id.to_string()),
            direction,
            epic: None,
            expiry: None,
            level: None,
            order_type: OrderType::Market,
            quote_id: None,
            size,
        }
    }

    pub fn validate(&self) -> Result<(), IgError> {
        if self.deal_id.is_none() && self.epic.is_none() {
            return Err(IgError::InvalidParameters(
                "closing a position needs a deal_id or an epic".into(),
            ));
        }
        if self.size <= Decimal::ZERO {
            return Err(IgError::InvalidParameters("size must be positive".into()));
        }
        Ok(())
    }
}

/// Body of `PUT /positions/otc/{dealId}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePositionRequest {
    #[serde(with = "rust_decimal::serde::float_option", skip_serializing_if = "Option::is_none")]
    pub limit_level: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option", skip_serializing_if = "Option::is_none")]
    pub stop_level: Option<Decimal>,
    #[serde(skip_serializing_if = "is_false")]
    pub guaranteed_stop: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub trailing_stop: bool,
    #[serde(with = "rust_decimal::serde::float_option", skip_serializing_if = "Option::is_none")]
    pub trailing_stop_distance: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option", skip_serializing_if = "Option::is_none")]
    pub trailing_stop_increment: Option<Decimal>,
}

/// Body of `POST /workingorders/otc`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkingOrderRequest {
    pub currency_code: String,
    pub direction: Direction,
    pub epic: String,
    pub expiry: String,
    pub guaranteed_stop: bool,
    #[serde(with = "rust_decimal::serde::float")]
    pub level: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub size: Decimal,
    pub time_in_force: TimeInForce,
    #[serde(rename = "type")]
    pub order_type: WorkingOrderType,
    #[serde(with = "rust_decimal::serde::float_option", skip_serializing_if = "Option::is_none")]
    pub limit_distance: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option", skip_serializing_if = "Option::is_none")]
    pub limit_level: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option", skip_serializing_if = "Option::is_none")]
    pub stop_distance: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option", skip_serializing_if = "Option::is_none")]
    pub stop_level: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub good_till_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deal_reference: Option<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub force_open: bool,
}

impl CreateWorkingOrderRequest {
    pub fn new(
        epic: &str,
        direction: Direction,
        order_type: WorkingOrderType,
        level: Decimal,
        size: Decimal,
        currency_code: &str,
    ) -> Self {
        Self {
            currency_code: currency_code.to_string(),
            direction,
            epic: epic.to_string(),
            expiry: "-".to_string(),
            guaranteed_stop: false,
            level,
            size,
            time_in_force: TimeInForce::GoodTillCancelled,
            order_type,
            limit_distance: None,
            limit_level: None,
            stop_distance: None,
            stop_level: None,
            good_till_date: None,
            deal_reference: None,
            force_open: false,
        }
    }

    /// Keep the order until `until`, switching time in force to GOOD_TILL_DATE
    pub fn good_till(mut self, until: &NaiveDateTime) -> Result<Self, IgError> {
        self.good_till_date = Some(conv_datetime(until, "2")?);
        self.time_in_force = TimeInForce::GoodTillDate;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), IgError> {
        if self.size <= Decimal::ZERO {
            return Err(IgError::InvalidParameters("size must be positive".into()));
        }
        if self.time_in_force == TimeInForce::GoodTillDate && self.good_till_date.is_none() {
            return Err(IgError::InvalidParameters(
                "GOOD_TILL_DATE orders need a good_till_date".into(),
            ));
        }
        Ok(())
    }
}

/// Body of `PUT /workingorders/otc/{dealId}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWorkingOrderRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub good_till_date: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub level: Decimal,
    #[serde(with = "rust_decimal::serde::float_option", skip_serializing_if = "Option::is_none")]
    pub limit_distance: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option", skip_serializing_if = "Option::is_none")]
    pub limit_level: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option", skip_serializing_if = "Option::is_none")]
    pub stop_distance: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option", skip_serializing_if = "Option::is_none")]
    pub stop_level: Option<Decimal>,
    pub guaranteed_stop: bool,
    pub time_in_force: TimeInForce,
    #[serde(rename = "type")]
    pub order_type: WorkingOrderType,
}

/// Serialize a request body into the parameter map the session verbs take
pub fn to_params<T: Serialize>(request: &T) -> Result<Params, IgError> {
    match serde_json::to_value(request)? {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(IgError::InvalidParameters(format!(
            "request must serialize to an object, got {}",
            other
        ))),
    }
}
