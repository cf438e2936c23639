#![allow(clippy::unwrap_used)]
// Integration tests for `GatewayClient` using wiremock.

use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mycomize_api::{Error, GatewayClient, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, GatewayClient) {
    let server = MockServer::start().await;
    let client = GatewayClient::from_token(
        &server.uri(),
        &SecretString::from("long-lived-token"),
        &TransportConfig::default(),
    )
    .unwrap();
    (server, client)
}

// ── Health check ────────────────────────────────────────────────────

#[tokio::test]
async fn test_api_status_sends_bearer_token() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/"))
        .and(header("authorization", "Bearer long-lived-token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "message": "API running.", "version": "2024.1" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let status = client.api_status().await.unwrap();

    assert_eq!(status.message.as_deref(), Some("API running."));
    assert_eq!(status.version.as_deref(), Some("2024.1"));
}

#[tokio::test]
async fn test_api_status_without_version() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "API running." })))
        .mount(&server)
        .await;

    let status = client.api_status().await.unwrap();
    assert!(status.version.is_none());
}

#[tokio::test]
async fn test_unauthorized_is_authentication_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/"))
        .respond_with(ResponseTemplate::new(401).set_body_string("401: Unauthorized"))
        .mount(&server)
        .await;

    let result = client.api_status().await;

    match result {
        Err(Error::Authentication { status, .. }) => assert_eq!(status, 401),
        other => panic!("expected Authentication error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_forbidden_is_authentication_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/states"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let err = client.states().await.unwrap_err();
    assert!(err.is_auth(), "expected auth error, got: {err:?}");
}

// ── States ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_states() {
    let (server, client) = setup().await;

    let body = json!([
        {
            "entity_id": "sensor.tub_humidity",
            "state": "91.5",
            "attributes": {
                "friendly_name": "Tub Humidity",
                "device_class": "humidity",
                "unit_of_measurement": "%"
            },
            "last_changed": "2024-06-15T10:30:00+00:00",
            "last_updated": "2024-06-15T10:30:00+00:00"
        },
        {
            "entity_id": "switch.fae_fan",
            "state": "off",
            "attributes": { "friendly_name": "FAE Fan" }
        }
    ]);

    Mock::given(method("GET"))
        .and(path("/api/states"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let states = client.states().await.unwrap();

    assert_eq!(states.len(), 2);
    assert_eq!(states[0].entity_id, "sensor.tub_humidity");
    assert_eq!(states[0].friendly_name(), Some("Tub Humidity"));
    assert_eq!(states[0].device_class(), Some("humidity"));
    assert_eq!(states[0].unit_of_measurement(), Some("%"));
    assert!(states[0].last_updated.is_some());
    assert_eq!(states[1].device_class(), None);
    assert_eq!(states[1].state, "off");
}

#[tokio::test]
async fn test_empty_state_list_is_ok() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/states"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    assert!(client.states().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_states_is_deserialization_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/states"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy error</html>"))
        .mount(&server)
        .await;

    let result = client.states().await;
    assert!(
        matches!(result, Err(Error::Deserialization { .. })),
        "expected Deserialization error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_single_state() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/states/sensor.tub_temperature"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entity_id": "sensor.tub_temperature",
            "state": "22.4",
            "attributes": { "unit_of_measurement": "°C" }
        })))
        .mount(&server)
        .await;

    let state = client.state("sensor.tub_temperature").await.unwrap();
    assert_eq!(state.state, "22.4");
    assert_eq!(state.unit_of_measurement(), Some("°C"));
}

// ── Services ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_call_service() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/services/switch/turn_on"))
        .and(body_json(json!({ "entity_id": "switch.fae_fan" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "entity_id": "switch.fae_fan", "state": "on", "attributes": {} }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let changed = client
        .call_service("switch", "turn_on", &json!({ "entity_id": "switch.fae_fan" }))
        .await
        .unwrap();

    assert_eq!(changed.len(), 1);
    assert_eq!(changed[0].state, "on");
}

// ── Transport ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_unreachable_gateway_is_transient() {
    // Port 9 (discard) on localhost is essentially never listening.
    let client = GatewayClient::from_token(
        "http://127.0.0.1:9",
        &SecretString::from("token"),
        &TransportConfig::default(),
    )
    .unwrap();

    let err = client.api_status().await.unwrap_err();
    assert!(err.is_transient(), "expected transient error, got: {err:?}");
}
