//! End-to-end tests against a gateway bound to a real socket.
#![cfg(unix)]

use gateway_sdk::GatewayClient;
use reqwest::StatusCode;
use serde_json::{json, Map, Value};

mod common;

fn params(value: Value) -> Option<Map<String, Value>> {
    value.as_object().cloned()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_budget_report_dispatch() {
    let gateway = common::start_gateway(|_| {}).await;
    let client = GatewayClient::new(&gateway.url, common::API_KEY);

    let result = client
        .run_script_typed(
            "budget.sh",
            params(json!({"category": "Sales", "quarter": "Q1", "note": null})),
        )
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.return_code, 0);
    assert_eq!(result.output["summary"]["record_count"], 3);
    assert_eq!(result.output["summary"]["total_variance"], 4800);
    assert_eq!(result.output["filters"]["month"], Value::Null);
    // Echoed unchanged, in order, including the skipped null.
    let keys: Vec<&str> = result.parameters.keys().map(String::as_str).collect();
    assert_eq!(keys, ["category", "quarter", "note"]);

    gateway.shutdown.trigger();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_injection_characters_are_stripped() {
    let gateway = common::start_gateway(|_| {}).await;
    let client = GatewayClient::new(&gateway.url, common::API_KEY);

    let result = client
        .run_script_typed("budget.sh", params(json!({"category": "Sales; rm -rf /"})))
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.output["filters"]["category"], "Sales rm -rf /");
    assert_eq!(result.parameters["category"], "Sales; rm -rf /");

    gateway.shutdown.trigger();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_execution_rate_limit() {
    // Slow refill so process startup time cannot top the bucket back up.
    let gateway = common::start_gateway(|config| {
        config.rate_limit.execution.refill_per_second = 0.1;
    })
    .await;
    let client = GatewayClient::new(&gateway.url, common::API_KEY);

    for i in 0..10 {
        let resp = client.run_script("budget.sh", None).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK, "request {}", i);
    }

    let resp = client.run_script("budget.sh", None).await.unwrap();
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(resp.headers().contains_key("retry-after"));
    let body: Value = resp.json().await.unwrap();
    assert!(body["retry_after"].as_u64().unwrap() >= 1);

    // The standard bucket is untouched.
    assert_eq!(client.health().await.unwrap().status(), StatusCode::OK);

    gateway.shutdown.trigger();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_rejections() {
    let gateway = common::start_gateway(|_| {}).await;
    let client = GatewayClient::new(&gateway.url, common::API_KEY);

    let resp = client.run_script("missing.sh", None).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = client.run_script("../secret", None).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = client
        .run_script("budget.sh", params(json!({"bad key": "x"})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let stranger = GatewayClient::new(&gateway.url, "not-the-key");
    let resp = stranger.list_scripts().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["detail"], "Invalid API key");

    gateway.shutdown.trigger();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_loopback_not_allowed() {
    let gateway = common::start_gateway(|config| {
        config.access.allowed_ips = vec!["10.0.0.0/8".into()];
    })
    .await;
    let client = GatewayClient::new(&gateway.url, common::API_KEY);

    let resp = client.health().await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    gateway.shutdown.trigger();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failing_script_is_still_ok() {
    let gateway = common::start_gateway(|_| {}).await;
    let client = GatewayClient::new(&gateway.url, common::API_KEY);

    let result = client.run_script_typed("broken.sh", None).await.unwrap();
    assert!(!result.success);
    assert_eq!(result.return_code, 3);
    assert_eq!(result.output, json!(""));
    assert_eq!(result.error.as_deref(), Some("disk on fire\n"));

    gateway.shutdown.trigger();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_list_and_info() {
    let gateway = common::start_gateway(|_| {}).await;
    let client = GatewayClient::new(&gateway.url, common::API_KEY);

    let listing: gateway_sdk::ScriptListing =
        client.list_scripts().await.unwrap().json().await.unwrap();
    let names: Vec<&str> = listing.scripts.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["broken.sh", "budget.sh"]);

    let info: gateway_sdk::ScriptInfo = client.script_info("budget.sh").await.unwrap().json().await.unwrap();
    assert!(info.help_text.unwrap().contains("--quarter"));
    assert!(info.size > 0);

    let resp = client.root().await.unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Welcome to Script Runner API!");

    gateway.shutdown.trigger();
}
