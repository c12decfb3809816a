use std::time::Duration;

use portal_tools::{PortalApi, PortalApiError, PortalConfig, CHECKOUT_JOURNEY_PATH, TRANSACTIONS_PATH};
use recon_common::Secret;
use serde_json::json;
use wiremock::{
    matchers::{header, method, path, query_param},
    Mock,
    MockServer,
    ResponseTemplate,
};

fn record(id: u64) -> serde_json::Value {
    json!({"id": id, "stripe_payment_intent_id": format!("pi_{id}")})
}

fn api_for(server: &MockServer) -> PortalApi {
    let config =
        PortalConfig::new("Acme", &server.uri(), Secret::new("key-123".to_string()), Duration::from_secs(5)).unwrap();
    PortalApi::new(config).unwrap()
}

#[tokio::test]
async fn pages_are_concatenated_in_order_until_has_more_is_false() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/get_checkout_journey.php"))
        .and(query_param("page", "1"))
        .and(query_param("days", "2"))
        .and(query_param("limit", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true, "data": [record(1), record(2)], "has_more": true
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/get_checkout_journey.php"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true, "data": [record(3), record(4)], "has_more": true
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/get_checkout_journey.php"))
        .and(query_param("page", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true, "data": [record(5)], "has_more": false
        })))
        .mount(&server)
        .await;

    let api = api_for(&server);
    let records = api.checkout_journeys(2, 2).await.unwrap();
    let ids: Vec<u64> = records.iter().map(|r| r["id"].as_u64().unwrap()).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn single_page_collections_need_one_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/get_transactions.php"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true, "data": [record(7)], "has_more": false
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = api_for(&server);
    let records = api.transactions(2, 100).await.unwrap();
    assert_eq!(records.len(), 1);
}

#[tokio::test]
async fn failed_envelope_aborts_the_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/get_checkout_journey.php"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true, "data": [record(1)], "has_more": true
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/get_checkout_journey.php"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false, "error": "backend offline"
        })))
        .mount(&server)
        .await;

    let api = api_for(&server);
    let err = api.checkout_journeys(2, 1).await.unwrap_err();
    match err {
        PortalApiError::ApiError(message) => assert_eq!(message, "backend offline"),
        other => panic!("expected ApiError, got {other:?}"),
    }
}

#[tokio::test]
async fn non_2xx_status_aborts_the_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/get_transactions.php"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let api = api_for(&server);
    let err = api.transactions(2, 100).await.unwrap_err();
    match err {
        PortalApiError::QueryError { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "boom");
        },
        other => panic!("expected QueryError, got {other:?}"),
    }
}

#[tokio::test]
async fn requests_carry_the_api_key_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/get_checkout_journey.php"))
        .and(header("X-Api-Key", "key-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true, "data": [], "has_more": false
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = api_for(&server);
    let records = api.checkout_journeys(2, 100).await.unwrap();
    assert!(records.is_empty());
}
