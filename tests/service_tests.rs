mod common;

use chrono::NaiveDate;
use common::*;
use ig_trading::service::{ActivityQuery, PriceQuery, TransactionQuery};
use ig_trading::{
    AuthProtocol, ClosePositionRequest, Confirmation, CreatePositionRequest,
    CreateWorkingOrderRequest, Direction, IgError, IgStreamService, NavigationEntry, Resolution,
    TransactionType, WorkingOrderType,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, header, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn page(field: &str, items: usize, number: u64, total: u64) -> ResponseTemplate {
    let list: Vec<Value> = (0..items).map(|i| json!({ "index": i })).collect();
    ResponseTemplate::new(200).set_body_json(json!({
        field: list,
        "metadata": {"pageData": {"pageNumber": number, "pageSize": 20, "totalPages": total}},
    }))
}

async fn logged_in(server: &MockServer) -> ig_trading::IgService {
    mount_login(server, v2_login("cst-1", "xst-1"), 1).await;
    let service = service(server);
    service.create_session(AuthProtocol::V2).await.unwrap();
    service
}

fn deal_not_found() -> ResponseTemplate {
    error(404, "error.confirms.deal-not-found")
}

#[tokio::test]
async fn test_numbered_pagination_stops_at_last_page() {
    let server = MockServer::start().await;
    let service = logged_in(&server).await;

    for (number, items) in [(1u64, 20usize), (2, 20), (3, 7)] {
        Mock::given(method("GET"))
            .and(path("/history/activity"))
            .and(header("version", "2"))
            .and(query_param("pageNumber", number.to_string()))
            .respond_with(page("activities", items, number, 3))
            .expect(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/history/activity"))
        .and(query_param("pageNumber", "4"))
        .respond_with(page("activities", 0, 4, 3))
        .expect(0)
        .mount(&server)
        .await;

    let data = service
        .fetch_account_activity_v2(None, None, Some(600), 20)
        .await
        .unwrap();
    assert_eq!(data["activities"].as_array().unwrap().len(), 47);
}

#[tokio::test]
async fn test_transaction_history_with_no_pages() {
    let server = MockServer::start().await;
    let service = logged_in(&server).await;
    Mock::given(method("GET"))
        .and(path("/history/transactions"))
        .and(query_param("type", "DEPOSIT"))
        .respond_with(page("transactions", 0, 0, 0))
        .expect(1)
        .mount(&server)
        .await;

    let query = TransactionQuery::of_type(TransactionType::Deposit);
    let data = service.fetch_transaction_history(&query).await.unwrap();
    assert!(data["transactions"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_activity_follows_paging_links() {
    let server = MockServer::start().await;
    let service = logged_in(&server).await;

    Mock::given(method("GET"))
        .and(path("/history/activity"))
        .and(header("version", "3"))
        .and(query_param("from", "2024-01-01T00:00:00"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "activities": [{"dealId": "A"}, {"dealId": "B"}],
            "metadata": {"paging": {"size": 2, "next": "/history/activity?version=3&from=2024-01-01T12:00:00&to=2024-01-02T00:00:00&pageSize=2"}},
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/history/activity"))
        .and(query_param("from", "2024-01-01T12:00:00"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "activities": [{"dealId": "C"}],
            "metadata": {"paging": {"size": 1, "next": null}},
        })))
        .expect(1)
        .mount(&server)
        .await;

    let from = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
    let to = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap().and_hms_opt(0, 0, 0).unwrap();
    let query = ActivityQuery::between(from, to).with_page_size(2);

    let data = service.fetch_account_activity(&query).await.unwrap();
    let ids: Vec<&str> = data["activities"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|a| a["dealId"].as_str())
        .collect();
    assert_eq!(ids, ["A", "B", "C"]);
}

#[tokio::test]
async fn test_activity_by_date_rejects_reversed_range() {
    let server = MockServer::start().await;
    let service = logged_in(&server).await;

    let later = NaiveDate::from_ymd_opt(2024, 2, 2).unwrap();
    let earlier = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
    let result = service.fetch_account_activity_by_date(later, earlier).await;
    assert!(matches!(result, Err(IgError::InvalidParameters(_))));
}

#[tokio::test]
async fn test_open_position_polls_until_confirmed() {
    let server = MockServer::start().await;
    let service = logged_in(&server).await;

    Mock::given(method("POST"))
        .and(path("/positions/otc"))
        .and(header("version", "2"))
        .and(body_partial_json(json!({"epic": "CS.D.EURUSD.MINI.IP", "direction": "BUY"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"dealReference": "REF1"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/confirms/REF1"))
        .respond_with(deal_not_found())
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/confirms/REF1"))
        .and(header("version", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"dealStatus": "ACCEPTED", "dealId": "DI1"})))
        .expect(1)
        .mount(&server)
        .await;

    let request =
        CreatePositionRequest::market("CS.D.EURUSD.MINI.IP", Direction::Buy, Decimal::ONE, "GBP");
    let confirmation = service.create_open_position(&request).await.unwrap();
    assert!(confirmation.is_confirmed());
    assert_eq!(confirmation.deal_status(), Some("ACCEPTED"));
}

#[tokio::test]
async fn test_close_position_reports_pending_after_five_polls() {
    let server = MockServer::start().await;
    let service = logged_in(&server).await;

    Mock::given(method("POST"))
        .and(path("/positions/otc"))
        .and(header("_method", "DELETE"))
        .and(header("version", "1"))
        .and(body_partial_json(json!({"dealId": "DI1", "direction": "SELL", "orderType": "MARKET"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"dealReference": "REF2"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/confirms/REF2"))
        .respond_with(error(405, "error.confirms.deal-not-found"))
        .expect(5)
        .mount(&server)
        .await;

    let request = ClosePositionRequest::market("DI1", Direction::Sell, Decimal::ONE);
    let confirmation = service.close_open_position(&request).await.unwrap();
    assert_eq!(
        confirmation,
        Confirmation::Pending {
            attempts: 5,
            status: 405,
            code: "error.confirms.deal-not-found".into(),
        }
    );
}

#[tokio::test]
async fn test_confirmation_polling_stops_on_other_errors() {
    let server = MockServer::start().await;
    let service = logged_in(&server).await;

    Mock::given(method("GET"))
        .and(path("/confirms/REF3"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let result = service.fetch_deal_by_deal_reference("REF3").await;
    assert!(matches!(result, Err(IgError::Transport { status: 500, .. })));
}

#[tokio::test]
async fn test_position_by_deal_id_does_not_retry_405() {
    let server = MockServer::start().await;
    let service = logged_in(&server).await;

    Mock::given(method("GET"))
        .and(path("/positions/DI9"))
        .respond_with(error(405, "error.method-not-allowed"))
        .expect(1)
        .mount(&server)
        .await;

    let result = service.fetch_open_position_by_deal_id("DI9").await;
    assert!(matches!(result, Err(IgError::Api { status: 405, .. })));
}

#[tokio::test]
async fn test_invalid_position_is_rejected_before_sending() {
    let server = MockServer::start().await;
    let service = logged_in(&server).await;
    Mock::given(method("POST"))
        .and(path("/positions/otc"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let request = CreatePositionRequest::market("CS.D.EURUSD.MINI.IP", Direction::Buy, Decimal::ZERO, "GBP");
    let result = service.create_open_position(&request).await;
    assert!(matches!(result, Err(IgError::InvalidParameters(_))));
}

#[tokio::test]
async fn test_working_order_round_trip() {
    let server = MockServer::start().await;
    let service = logged_in(&server).await;

    let level = Decimal::new(75005, 1);
    let expected = json!({
        "epic": "IX.D.FTSE.DAILY.IP",
        "direction": "BUY",
        "type": "LIMIT",
        "level": 7500.5,
        "size": 2.0,
        "currencyCode": "GBP",
        "expiry": "-",
        "timeInForce": "GOOD_TILL_CANCELLED",
        "guaranteedStop": false,
    });

    Mock::given(method("POST"))
        .and(path("/workingorders/otc"))
        .and(header("version", "2"))
        .and(body_partial_json(expected.clone()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"dealReference": "WO1"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/confirms/WO1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"dealStatus": "ACCEPTED", "dealId": "DIWO1"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/workingorders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "workingOrders": [{"workingOrderData": {
                "dealId": "DIWO1",
                "epic": "IX.D.FTSE.DAILY.IP",
                "direction": "BUY",
                "orderType": "LIMIT",
                "orderLevel": 7500.5,
                "orderSize": 2.0,
                "currencyCode": "GBP",
                "timeInForce": "GOOD_TILL_CANCELLED",
            }}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = CreateWorkingOrderRequest::new(
        "IX.D.FTSE.DAILY.IP",
        Direction::Buy,
        WorkingOrderType::Limit,
        level,
        Decimal::new(2, 0),
        "GBP",
    );
    let confirmation = service.create_working_order(&request).await.unwrap();
    assert_eq!(confirmation.payload().unwrap()["dealId"], json!("DIWO1"));

    let orders = service.fetch_working_orders("2").await.unwrap();
    let order = &orders["workingOrders"][0]["workingOrderData"];
    assert_eq!(order["dealId"], json!("DIWO1"));
    assert_eq!(order["epic"], expected["epic"]);
    assert_eq!(order["direction"], expected["direction"]);
    assert_eq!(order["orderLevel"], expected["level"]);
    assert_eq!(order["orderSize"], expected["size"]);
}

#[tokio::test]
async fn test_delete_working_order_confirms() {
    let server = MockServer::start().await;
    let service = logged_in(&server).await;

    Mock::given(method("POST"))
        .and(path("/workingorders/otc/DIWO1"))
        .and(header("_method", "DELETE"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"dealReference": "WO2"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/confirms/WO2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"dealStatus": "ACCEPTED"})))
        .expect(1)
        .mount(&server)
        .await;

    let confirmation = service.delete_working_order("DIWO1").await.unwrap();
    assert!(confirmation.is_confirmed());
}

#[tokio::test]
async fn test_historical_prices_accumulate_pages() {
    let server = MockServer::start().await;
    let service = logged_in(&server).await;

    for number in 1..=2u64 {
        Mock::given(method("GET"))
            .and(path("/prices/CS.D.EURUSD.MINI.IP"))
            .and(header("version", "3"))
            .and(query_param("resolution", "HOUR"))
            .and(query_param("pageNumber", number.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "prices": [{"snapshotTime": format!("page {}", number)}],
                "instrumentType": "CURRENCIES",
                "metadata": {
                    "allowance": {"remainingAllowance": 9990, "totalAllowance": 10000, "allowanceExpiry": 600},
                    "pageData": {"pageNumber": number, "pageSize": 1, "totalPages": 2},
                },
            })))
            .expect(1)
            .mount(&server)
            .await;
    }

    let query = PriceQuery::last(Resolution::Hour, 2).with_page_size(1);
    let data = service
        .fetch_historical_prices_by_epic("CS.D.EURUSD.MINI.IP", &query)
        .await
        .unwrap();
    assert_eq!(data["prices"].as_array().unwrap().len(), 2);
    assert_eq!(data["instrumentType"], json!("CURRENCIES"));
}

#[tokio::test]
async fn test_prices_by_date_range_per_version() {
    let server = MockServer::start().await;
    let service = logged_in(&server).await;

    Mock::given(method("GET"))
        .and(path("/prices/CS.D.EURUSD.MINI.IP/DAY"))
        .and(header("version", "1"))
        .and(query_param("startdate", "2024:01:01-00:00:00"))
        .and(query_param("enddate", "2024:01:31-00:00:00"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"prices": [], "v": 1})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/prices/CS\.D\.EURUSD\.MINI\.IP/DAY/2024-01-01[^/]+/2024-01-31[^/]+$"))
        .and(header("version", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"prices": [], "v": 2})))
        .expect(1)
        .mount(&server)
        .await;

    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
    let end = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap().and_hms_opt(0, 0, 0).unwrap();
    let epic = "CS.D.EURUSD.MINI.IP";

    let v1 = service
        .fetch_historical_prices_by_epic_and_date_range(epic, Resolution::Day, &start, &end, "1")
        .await
        .unwrap();
    assert_eq!(v1["v"], json!(1));
    let v2 = service
        .fetch_historical_prices_by_epic_and_date_range(epic, Resolution::Day, &start, &end, "2")
        .await
        .unwrap();
    assert_eq!(v2["v"], json!(2));
    let v3 = service
        .fetch_historical_prices_by_epic_and_date_range(epic, Resolution::Day, &start, &end, "3")
        .await;
    assert!(matches!(v3, Err(IgError::InvalidParameters(_))));
}

#[tokio::test]
async fn test_markets_by_epics_returns_details() {
    let server = MockServer::start().await;
    let service = logged_in(&server).await;

    Mock::given(method("GET"))
        .and(path("/markets"))
        .and(query_param("epics", "A.B.C,D.E.F"))
        .and(query_param("filter", "SNAPSHOT_ONLY"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "marketDetails": [{"snapshot": {}}, {"snapshot": {}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let details = service
        .fetch_markets_by_epics(&["A.B.C", "D.E.F"], false, "2")
        .await
        .unwrap();
    assert_eq!(details.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_client_sentiment_single_and_many() {
    let server = MockServer::start().await;
    let service = logged_in(&server).await;

    Mock::given(method("GET"))
        .and(path("/clientsentiment/EURUSD"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"marketId": "EURUSD"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/clientsentiment"))
        .and(query_param("marketIds", "EURUSD,GBPUSD"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"clientSentiments": []})))
        .expect(1)
        .mount(&server)
        .await;

    service.fetch_client_sentiment_by_instrument(&["EURUSD"]).await.unwrap();
    service
        .fetch_client_sentiment_by_instrument(&["EURUSD", "GBPUSD"])
        .await
        .unwrap();
    assert!(service.fetch_client_sentiment_by_instrument(&[]).await.is_err());
}

#[tokio::test]
async fn test_update_account_preferences_returns_status() {
    let server = MockServer::start().await;
    let service = logged_in(&server).await;

    Mock::given(method("PUT"))
        .and(path("/accounts/preferences"))
        .and(body_partial_json(json!({"trailingStopsEnabled": "true"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "SUCCESS"})))
        .expect(1)
        .mount(&server)
        .await;

    assert_eq!(service.update_account_preferences(true).await.unwrap(), "SUCCESS");
}

#[tokio::test]
async fn test_watchlist_market_membership() {
    let server = MockServer::start().await;
    let service = logged_in(&server).await;

    Mock::given(method("PUT"))
        .and(path("/watchlists/W1"))
        .and(body_partial_json(json!({"epic": "IX.D.DAX.DAILY.IP"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "SUCCESS"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/watchlists/W1/IX.D.DAX.DAILY.IP"))
        .and(header("_method", "DELETE"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "SUCCESS"})))
        .expect(1)
        .mount(&server)
        .await;

    service.add_market_to_watchlist("W1", "IX.D.DAX.DAILY.IP").await.unwrap();
    service
        .remove_market_from_watchlist("W1", "IX.D.DAX.DAILY.IP")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_logout_clears_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/session"))
        .and(header("_method", "DELETE"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    let service = logged_in(&server).await;
    assert!(service.session().security_tokens().await.is_some());

    service.logout().await.unwrap();

    assert!(service.session().security_tokens().await.is_none());
    assert!(service.session().protocol().await.is_none());
}

#[tokio::test]
async fn test_navigation_walk_is_depth_first() {
    let server = MockServer::start().await;
    let service = logged_in(&server).await;

    Mock::given(method("GET"))
        .and(path("/marketnavigation"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "nodes": [{"id": "1", "name": "Indices"}, {"id": "2", "name": "Forex"}],
            "markets": null,
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/marketnavigation/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "nodes": [{"id": "11", "name": "UK"}],
            "markets": [{"epic": "IX.D.DOW.DAILY.IP", "instrumentName": "Wall Street", "expiry": "DFB"}],
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/marketnavigation/11"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "nodes": null,
            "markets": [{"epic": "IX.D.FTSE.DAILY.IP", "instrumentName": "FTSE 100", "expiry": "DFB"}],
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/marketnavigation/2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"nodes": [], "markets": []})))
        .expect(1)
        .mount(&server)
        .await;

    let entries = service.walk_navigation(None).await.unwrap();
    let lines: Vec<String> = entries.iter().map(ToString::to_string).collect();
    assert_eq!(
        lines,
        [
            "Indices [1]",
            "  UK [11]",
            "    FTSE 100 (DFB): IX.D.FTSE.DAILY.IP",
            "  Wall Street (DFB): IX.D.DOW.DAILY.IP",
            "Forex [2]",
        ]
    );
    assert!(matches!(entries[0], NavigationEntry::Node { depth: 0, .. }));
}

#[tokio::test]
async fn test_streaming_credentials_from_v2_login() {
    let server = MockServer::start().await;
    mount_login(&server, v2_login("cst-9", "xst-9"), 1).await;
    let service = service(&server);

    let credentials = IgStreamService::new(&service)
        .create_session(AuthProtocol::V2)
        .await
        .unwrap();
    assert_eq!(credentials.endpoint, "https://demo-apd.marketdatasystems.com");
    assert_eq!(credentials.account_id.as_deref(), Some(ACCOUNT));
    assert_eq!(credentials.password(), "CST-cst-9|XST-xst-9");
}

#[tokio::test]
async fn test_streaming_credentials_from_v3_login() {
    let server = MockServer::start().await;
    mount_login(&server, v3_login("access-1", "refresh-1", "60"), 1).await;
    Mock::given(method("GET"))
        .and(path("/session"))
        .and(query_param("fetchSessionTokens", "true"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("CST", "cst-3")
                .insert_header("X-SECURITY-TOKEN", "xst-3")
                .set_body_json(json!({"clientId": "100", "accountId": ACCOUNT})),
        )
        .expect(1)
        .mount(&server)
        .await;
    let service = service(&server);

    let credentials = IgStreamService::new(&service)
        .create_session(AuthProtocol::V3)
        .await
        .unwrap();
    assert_eq!(credentials.password(), "CST-cst-3|XST-xst-3");
}

#[tokio::test]
async fn test_navigation_walk_runs_on_spawned_task() {
    let server = MockServer::start().await;
    let service = logged_in(&server).await;
    Mock::given(method("GET"))
        .and(path("/marketnavigation"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "nodes": [{"id": "1", "name": "Indices"}],
            "markets": [],
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/marketnavigation/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"nodes": [], "markets": []})))
        .expect(1)
        .mount(&server)
        .await;

    let service = Arc::new(service);
    let walker = Arc::clone(&service);
    let entries = tokio::spawn(async move { walker.walk_navigation(None).await })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].to_string(), "Indices [1]");
}
