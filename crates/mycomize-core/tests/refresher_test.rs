#![allow(clippy::unwrap_used)]
// Live state polling lifecycle.

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mycomize_api::TransportConfig;
use mycomize_core::{
    ConnectionProbe, ConnectionStatus, CoreError, DisconnectReason, EntityRef, EventBus, Gateway,
    GatewayHub, GatewayId, GrowId, HubConfig, LinkRecord, LinkTable, LiveValue, Stage,
    StateRefresher, StatusBoard,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn hub() -> GatewayHub {
    GatewayHub::new(HubConfig {
        state_poll_interval: Duration::from_millis(50),
        probe_timeout: Duration::from_secs(2),
        ..HubConfig::default()
    })
}

fn gateway(uri: &str) -> Gateway {
    Gateway::new(GatewayId(1), "Tent", uri, SecretString::from("token"))
}

async fn mount_states(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/states"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "entity_id": "sensor.tent_humidity",
                "state": "91.2",
                "attributes": { "unit_of_measurement": "%" },
                "last_updated": "2024-05-01T12:00:00Z"
            },
            { "entity_id": "switch.fan", "state": "off", "attributes": {} },
            { "entity_id": "light.unlinked", "state": "on", "attributes": {} }
        ])))
        .mount(server)
        .await;
}

async fn mount_api(server: &MockServer, status: u16, times: Option<u64>) {
    let mock = Mock::given(method("GET"))
        .and(path("/api/"))
        .respond_with(ResponseTemplate::new(status).set_body_json(json!({ "message": "API running." })));
    let mock = match times {
        Some(n) => mock.up_to_n_times(n),
        None => mock,
    };
    mock.mount(server).await;
}

async fn wait_until(mut check: impl AsyncFnMut() -> bool) -> bool {
    for _ in 0..40 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    false
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_refresher_publishes_linked_values_only() {
    let server = MockServer::start().await;
    mount_api(&server, 200, None).await;
    mount_states(&server).await;
    let hub = hub();
    let gw = gateway(&server.uri());
    hub.probe(&gw).await.unwrap();

    for name in ["sensor.tent_humidity", "switch.fan"] {
        hub.links().upsert(LinkRecord::active(
            EntityRef::new(GatewayId(1), name),
            GrowId(1),
            Stage::Fruiting,
        ));
    }

    let mut values = hub.start_refresher(&gw).await.unwrap();
    tokio::time::timeout(Duration::from_secs(2), values.changed())
        .await
        .unwrap()
        .unwrap();

    let snapshot = values.borrow().clone();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(
        snapshot["sensor.tent_humidity"].value,
        LiveValue::Numeric {
            value: 91.2,
            unit: Some("%".into())
        }
    );
    assert_eq!(snapshot["switch.fan"].value, LiveValue::Off);
    assert!(!snapshot.contains_key("light.unlinked"));

    hub.shutdown().await;
}

#[tokio::test]
async fn test_refresher_requires_connected_gateway() {
    let hub = hub();
    let err = hub
        .start_refresher(&gateway("http://127.0.0.1:9"))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotConnected { gateway_id: GatewayId(1) }));
}

#[tokio::test]
async fn test_refresher_stops_when_gateway_disconnects() {
    let server = MockServer::start().await;
    mount_api(&server, 200, Some(1)).await;
    mount_api(&server, 503, None).await;
    mount_states(&server).await;
    let hub = hub();
    let gw = gateway(&server.uri());

    assert!(hub.probe(&gw).await.unwrap().is_connected());
    hub.start_refresher(&gw).await.unwrap();
    assert!(hub.is_refreshing(GatewayId(1)).await);

    // re-probe fails -> disconnected -> polling ends on its own
    assert!(!hub.probe(&gw).await.unwrap().is_connected());
    let stopped = wait_until(async || !hub.is_refreshing(GatewayId(1)).await).await;
    assert!(stopped);
}

#[tokio::test]
async fn test_refresher_survives_successful_reprobe() {
    let server = MockServer::start().await;
    mount_api(&server, 200, None).await;
    mount_states(&server).await;
    let hub = hub();
    let gw = gateway(&server.uri());
    hub.probe(&gw).await.unwrap();
    hub.links().upsert(LinkRecord::active(
        EntityRef::new(GatewayId(1), "switch.fan"),
        GrowId(1),
        Stage::Fruiting,
    ));

    let mut values = hub.start_refresher(&gw).await.unwrap();
    tokio::time::timeout(Duration::from_secs(2), values.changed())
        .await
        .unwrap()
        .unwrap();

    // connected -> connecting -> connected
    assert!(hub.probe(&gw).await.unwrap().is_connected());
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(hub.is_refreshing(GatewayId(1)).await);

    drop(values.borrow_and_update());
    tokio::time::timeout(Duration::from_secs(2), values.changed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(values.borrow()["switch.fan"].value, LiveValue::Off);

    hub.shutdown().await;
}

#[tokio::test]
async fn test_refresher_marks_gateway_disconnected_on_revoked_token() {
    let server = MockServer::start().await;
    mount_api(&server, 200, None).await;
    Mock::given(method("GET"))
        .and(path("/api/states"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "Invalid token" })))
        .expect(1)
        .mount(&server)
        .await;
    let hub = hub();
    let gw = gateway(&server.uri());
    hub.probe(&gw).await.unwrap();
    hub.links().upsert(LinkRecord::active(
        EntityRef::new(GatewayId(1), "switch.fan"),
        GrowId(1),
        Stage::Fruiting,
    ));

    let mut values = hub.start_refresher(&gw).await.unwrap();
    let stopped = wait_until(async || !hub.is_refreshing(GatewayId(1)).await).await;
    assert!(stopped);

    assert_eq!(
        hub.status(GatewayId(1)),
        ConnectionStatus::Disconnected {
            reason: DisconnectReason::Authentication
        }
    );
    // sender dropped with the task
    assert!(values.changed().await.is_err());
}

#[tokio::test]
async fn test_refresher_stops_when_gateway_removed() {
    let server = MockServer::start().await;
    mount_api(&server, 200, None).await;
    mount_states(&server).await;

    let events = EventBus::new();
    let board = Arc::new(StatusBoard::new(events.clone()));
    let probe = ConnectionProbe::new(
        Arc::clone(&board),
        TransportConfig::default(),
        Duration::from_secs(2),
    );
    let refresher = StateRefresher::new(
        Arc::clone(&board),
        events,
        TransportConfig::default(),
        Duration::from_millis(50),
        Duration::from_secs(2),
    );
    let links = LinkTable::new();
    let gw = gateway(&server.uri());

    probe.probe(&gw).await.unwrap();
    let handle = refresher
        .spawn(&gw, links.subscribe(), &CancellationToken::new())
        .unwrap();
    assert!(handle.is_running());

    board.remove(GatewayId(1));
    let stopped = wait_until(async || !handle.is_running()).await;
    assert!(stopped);
}

#[tokio::test]
async fn test_credential_change_stops_refresher() {
    let server = MockServer::start().await;
    mount_api(&server, 200, None).await;
    mount_states(&server).await;
    let hub = hub();
    let gw = gateway(&server.uri());
    hub.probe(&gw).await.unwrap();

    hub.start_refresher(&gw).await.unwrap();
    hub.credentials_changed(GatewayId(1)).await;

    assert!(!hub.is_refreshing(GatewayId(1)).await);
    assert_eq!(hub.status(GatewayId(1)).label(), "unknown");
}
