use crate::core::errors::IgError;
use crate::core::kernel::RestClient;
use crate::service::IgService;
use crate::session::Params;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;
use url::Url;

/// `metadata.pageData` of a page-numbered response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageData {
    pub page_number: u64,
    pub total_pages: u64,
}

impl PageData {
    pub fn from_payload(payload: &Value) -> Result<Self, IgError> {
        let page_data = payload
            .pointer("/metadata/pageData")
            .ok_or_else(|| IgError::UnexpectedResponse("response has no metadata.pageData".into()))?;
        let field = |name: &str| {
            page_data.get(name).and_then(Value::as_u64).ok_or_else(|| {
                IgError::UnexpectedResponse(format!("metadata.pageData has no '{}'", name))
            })
        };
        Ok(Self {
            page_number: field("pageNumber")?,
            total_pages: field("totalPages")?,
        })
    }

    pub const fn is_last(&self) -> bool {
        self.total_pages == 0 || self.page_number >= self.total_pages
    }
}

/// Remove the list `field` from a page, leaving the rest of the body intact
pub fn take_items(payload: &mut Value, field: &str) -> Result<Vec<Value>, IgError> {
    match payload.get_mut(field).map(Value::take) {
        Some(Value::Array(items)) => Ok(items),
        Some(Value::Null) | None => Ok(Vec::new()),
        Some(other) => Err(IgError::UnexpectedResponse(format!(
            "'{}' is not a list: {}",
            field, other
        ))),
    }
}

/// `metadata.paging.next` of a cursor-paginated response
pub fn next_page_link(payload: &Value) -> Option<&str> {
    payload
        .pointer("/metadata/paging/next")
        .and_then(Value::as_str)
        .filter(|next| !next.is_empty())
}

/// Copy the `from`/`to` window of a continuation link into `params`,
/// dropping whichever bound the link leaves out. Returns whether the
/// parameters changed.
pub fn apply_next_page_link(params: &mut Params, next: &str) -> Result<bool, IgError> {
    let base = Url::parse("https://gateway.invalid/")
        .map_err(|e| IgError::UnexpectedResponse(e.to_string()))?;
    let url = base
        .join(next)
        .map_err(|e| IgError::UnexpectedResponse(format!("bad paging link '{}': {}", next, e)))?;

    let mut changed = false;
    for bound in ["from", "to"] {
        let value = url
            .query_pairs()
            .find(|(key, _)| key == bound)
            .map(|(_, value)| Value::String(value.into_owned()));
        let before = match &value {
            Some(value) => params.insert(bound.to_string(), value.clone()),
            None => params.remove(bound),
        };
        changed |= before != value;
    }
    Ok(changed)
}

impl<R: RestClient> IgService<R> {
    /// Read successive numbered pages, accumulating `field`, until the
    /// gateway reports the last page. The returned body is the last page
    /// with `field` replaced by the accumulated list.
    pub(crate) async fn collect_numbered_pages(
        &self,
        endpoint: &str,
        mut params: Params,
        version: &str,
        field: &str,
        wait: Option<Duration>,
    ) -> Result<Value, IgError> {
        let mut items = Vec::new();
        let mut page_number: u64 = 1;

        loop {
            params.insert("pageNumber".to_string(), json!(page_number));
            let mut data = self.session().read(endpoint, &params, version).await?;
            items.extend(take_items(&mut data, field)?);

            let page = PageData::from_payload(&data)?;
            debug!(endpoint, page = page.page_number, total = page.total_pages, "Fetched page");
            if page.is_last() {
                data[field] = Value::Array(items);
                return Ok(data);
            }

            page_number += 1;
            if let Some(wait) = wait {
                sleep(wait).await;
            }
        }
    }

    /// Follow `metadata.paging.next` links, accumulating `field`, until the
    /// gateway stops returning one.
    pub(crate) async fn collect_linked_pages(
        &self,
        endpoint: &str,
        mut params: Params,
        version: &str,
        field: &str,
    ) -> Result<Value, IgError> {
        let mut items = Vec::new();

        loop {
            let mut data = self.session().read(endpoint, &params, version).await?;
            items.extend(take_items(&mut data, field)?);

            let Some(next) = next_page_link(&data).map(str::to_string) else {
                data[field] = Value::Array(items);
                return Ok(data);
            };
            debug!(endpoint, next = %next, "Following paging link");
            if !apply_next_page_link(&mut params, &next)? {
                // a link that does not move the window would loop forever
                data[field] = Value::Array(items);
                return Ok(data);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_data() {
        let page = |n, total| json!({"metadata": {"pageData": {"pageNumber": n, "totalPages": total, "pageSize": 20}}});

        let first = PageData::from_payload(&page(1, 3)).unwrap();
        assert!(!first.is_last());
        assert!(PageData::from_payload(&page(3, 3)).unwrap().is_last());
        assert!(PageData::from_payload(&page(1, 0)).unwrap().is_last());
        assert!(PageData::from_payload(&json!({"prices": []})).is_err());
    }

    #[test]
    fn test_take_items() {
        let mut payload = json!({"activities": [1, 2, 3], "metadata": {}});
        assert_eq!(take_items(&mut payload, "activities").unwrap().len(), 3);
        assert!(payload["activities"].is_null());
        assert!(take_items(&mut payload, "missing").unwrap().is_empty());

        let mut bad = json!({"activities": "nope"});
        assert!(take_items(&mut bad, "activities").is_err());
    }

    #[test]
    fn test_next_page_link() {
        let with_next = json!({"metadata": {"paging": {"size": 50, "next": "/history/activity?from=2024-01-02T00:00:00&to=2024-01-03T00:00:00"}}});
        assert!(next_page_link(&with_next).is_some());
        let last = json!({"metadata": {"paging": {"size": 3, "next": null}}});
        assert!(next_page_link(&last).is_none());
    }

    #[test]
    fn test_apply_next_page_link_moves_window() {
        let mut params = Params::new();
        params.insert("from".into(), json!("2024-01-01T00:00:00"));
        params.insert("to".into(), json!("2024-01-05T00:00:00"));
        params.insert("pageSize".into(), json!(50));

        let changed = apply_next_page_link(
            &mut params,
            "/history/activity?version=3&from=2024-01-03T10:00:00&pageSize=50",
        )
        .unwrap();

        assert!(changed);
        assert_eq!(params["from"], json!("2024-01-03T10:00:00"));
        assert!(!params.contains_key("to"));
        assert_eq!(params["pageSize"], json!(50));
    }

    #[test]
    fn test_apply_next_page_link_detects_no_progress() {
        let mut params = Params::new();
        params.insert("from".into(), json!("2024-01-01T00:00:00"));

        let changed =
            apply_next_page_link(&mut params, "/history/activity?from=2024-01-01T00:00:00").unwrap();
        assert!(!changed);
    }
}
