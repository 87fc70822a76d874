//! Stub IG gateway and fast session timings for the integration tests

#![allow(dead_code)]

use ig_trading::session::{ConfirmationPolicy, RetryPolicy};
use ig_trading::{IgConfig, IgService, SessionOptions};
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const ACCOUNT: &str = "ABC123";

pub fn fast_options() -> SessionOptions {
    SessionOptions::default()
        .with_retry(RetryPolicy::new(5, Duration::from_millis(1), 2))
        .with_confirmation(ConfirmationPolicy {
            max_attempts: 5,
            delay: Duration::from_millis(1),
        })
        .with_page_wait(Duration::from_millis(1))
}

pub fn config(server: &MockServer) -> IgConfig {
    IgConfig::new("trader".into(), "hunter2".into(), "test-api-key".into())
        .acc_number(ACCOUNT.into())
        .base_url(server.uri())
}

pub fn service(server: &MockServer) -> IgService {
    IgService::with_options(&config(server), fast_options()).expect("service")
}

pub fn oauth_token(access: &str, refresh: &str, expires_in: &str) -> Value {
    json!({
        "access_token": access,
        "refresh_token": refresh,
        "scope": "profile",
        "token_type": "Bearer",
        "expires_in": expires_in,
    })
}

pub fn v3_login_body(access: &str, refresh: &str, expires_in: &str) -> Value {
    json!({
        "clientId": "100",
        "accountId": ACCOUNT,
        "timezoneOffset": 0,
        "lightstreamerEndpoint": "https://demo-apd.marketdatasystems.com",
        "oauthToken": oauth_token(access, refresh, expires_in),
    })
}

pub fn v3_login(access: &str, refresh: &str, expires_in: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(v3_login_body(access, refresh, expires_in))
}

pub fn v2_login(cst: &str, xst: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("CST", cst)
        .insert_header("X-SECURITY-TOKEN", xst)
        .set_body_json(json!({
            "accountType": "SPREADBET",
            "currentAccountId": ACCOUNT,
            "lightstreamerEndpoint": "https://demo-apd.marketdatasystems.com",
        }))
}

pub fn error(status: u16, code: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(json!({ "errorCode": code }))
}

/// Login mock answering every `POST /session`
pub async fn mount_login(server: &MockServer, response: ResponseTemplate, times: u64) {
    Mock::given(method("POST"))
        .and(path("/session"))
        .respond_with(response)
        .expect(times)
        .mount(server)
        .await;
}
