use crate::core::errors::IgError;
use chrono::{NaiveDate, NaiveDateTime};
use std::time::Duration;

/// Format a timestamp the way the given API version expects in request bodies
///
/// * version 1: `2014:12:15-00:00:00`
/// * version 2 and 3: `2014/12/15 00:00:00`
pub fn conv_datetime(dt: &NaiveDateTime, version: &str) -> Result<String, IgError> {
    let fmt = match version {
        "1" => "%Y:%m:%d-%H:%M:%S",
        "2" | "3" => "%Y/%m/%d %H:%M:%S",
        other => {
            return Err(IgError::InvalidParameters(format!(
                "No date format for API version '{}'",
                other
            )))
        }
    };
    Ok(dt.format(fmt).to_string())
}

/// Whole milliseconds in `period`, as used by the `/history/.../{milliseconds}` paths
pub fn conv_to_ms(period: Duration) -> u128 {
    period.as_millis()
}

/// `yyyy-MM-dd'T'HH:mm:ss`, the query format of the v2/v3 history and price endpoints
pub fn format_iso(dt: &NaiveDateTime) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// `yyyy-MM-dd HH:mm:ss`, the path format of the v2 price-by-date-range endpoint
pub fn format_spaced(dt: &NaiveDateTime) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// `dd-MM-yyyy`, the path format of the v1 activity-by-date endpoint
pub fn format_day(date: &NaiveDate) -> String {
    date.format("%d-%m-%Y").to_string()
}
