#![allow(clippy::unwrap_used)]
// Link manager against a wiremock backend.

use std::sync::Arc;

use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mycomize_api::{BackendClient, TransportConfig};
use mycomize_core::{
    BackendLinkSink, CoreError, EntityLinkManager, EntityRef, GatewayHub, GatewayId, GrowId,
    HubConfig, HubEvent, LinkRecord, LinkState, Stage,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn entity_row(id: i64, name: &str, grow: Option<i64>, stage: Option<&str>) -> serde_json::Value {
    json!({
        "id": id,
        "gateway_id": 1,
        "entity_name": name,
        "entity_type": name.split('.').next(),
        "domain": name.split('.').next(),
        "is_enabled": true,
        "linked_grow_id": grow,
        "linked_stage": stage
    })
}

async fn setup() -> (MockServer, GatewayHub, EntityLinkManager<BackendLinkSink>) {
    let server = MockServer::start().await;
    let client = BackendClient::from_token(
        &server.uri(),
        &SecretString::from("session-token"),
        &TransportConfig::default(),
    )
    .unwrap();
    let hub = GatewayHub::new(HubConfig::default());
    let manager = hub.link_manager(BackendLinkSink::new(Arc::new(client)));
    (server, hub, manager)
}

fn eref(name: &str) -> EntityRef {
    EntityRef::new(GatewayId(1), name)
}

async fn mount_rows(server: &MockServer, rows: serde_json::Value, times: u64) {
    Mock::given(method("GET"))
        .and(path("/iot-gateways/1/entities"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows))
        .expect(times)
        .mount(server)
        .await;
}

// ── Link ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_bulk_link_second_item_fails() {
    let (server, hub, manager) = setup().await;
    mount_rows(
        &server,
        json!([
            entity_row(11, "switch.fan", None, None),
            entity_row(12, "switch.humidifier", None, None),
            entity_row(13, "sensor.tent_humidity", None, None)
        ]),
        1,
    )
    .await;

    for (id, status) in [(11, 200), (12, 500), (13, 200)] {
        let response = if status == 200 {
            ResponseTemplate::new(200).set_body_json(entity_row(id, "x.y", Some(5), Some("fruiting")))
        } else {
            ResponseTemplate::new(500).set_body_json(json!({ "detail": "database unavailable" }))
        };
        Mock::given(method("PUT"))
            .and(path(format!("/iot-gateways/1/entities/{id}/link")))
            .and(body_json(json!({ "grow_id": 5, "stage": "fruiting" })))
            .respond_with(response)
            .expect(1)
            .mount(&server)
            .await;
    }
    let mut events = hub.events();

    let ids = [
        eref("switch.fan"),
        eref("switch.humidifier"),
        eref("sensor.tent_humidity"),
    ];
    let outcome = manager.link(&ids, GrowId(5), Stage::Fruiting).await.unwrap();

    assert_eq!(
        outcome.succeeded,
        vec![eref("switch.fan"), eref("sensor.tent_humidity")]
    );
    assert_eq!(outcome.failed, vec![eref("switch.humidifier")]);
    assert!(!outcome.is_success());

    let links = hub.links();
    for linked in &outcome.succeeded {
        let record = links.get(linked).unwrap();
        assert_eq!((record.grow_id, record.stage), (GrowId(5), Stage::Fruiting));
        assert_eq!(record.state, LinkState::Active);
    }
    assert!(!links.is_linked(&eref("switch.humidifier")));

    assert!(matches!(
        events.recv().await.unwrap(),
        HubEvent::LinksChanged { ref entities } if entities.len() == 2
    ));
    assert!(matches!(
        outcome.into_result(),
        Err(CoreError::PartialBulkFailure {
            succeeded: 2,
            failed: 1
        })
    ));
}

#[tokio::test]
async fn test_link_creates_missing_row_first() {
    let (server, hub, manager) = setup().await;
    mount_rows(&server, json!([]), 1).await;

    Mock::given(method("POST"))
        .and(path("/iot-gateways/1/entities"))
        .and(body_json(json!({
            "entity_name": "sensor.tent_temp",
            "entity_type": "sensor",
            "domain": "sensor"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(entity_row(21, "sensor.tent_temp", None, None)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/iot-gateways/1/entities/21/link"))
        .respond_with(ResponseTemplate::new(200).set_body_json(entity_row(
            21,
            "sensor.tent_temp",
            Some(3),
            Some("spawn_colonization"),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = manager
        .link(&[eref("sensor.tent_temp")], GrowId(3), Stage::SpawnColonization)
        .await
        .unwrap();

    assert!(outcome.is_success());
    assert_eq!(
        hub.links().get(&eref("sensor.tent_temp")).unwrap().stage,
        Stage::SpawnColonization
    );
}

#[tokio::test]
async fn test_link_rejects_empty_selection_without_requests() {
    let (server, _hub, manager) = setup().await;
    mount_rows(&server, json!([]), 0).await;

    let err = manager.link(&[], GrowId(1), Stage::Harvest).await.unwrap_err();
    assert!(matches!(err, CoreError::Validation { .. }));
}

#[tokio::test]
async fn test_link_session_expiry_surfaces() {
    let (server, _hub, manager) = setup().await;
    Mock::given(method("GET"))
        .and(path("/iot-gateways/1/entities"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "detail": "Not authenticated" })))
        .mount(&server)
        .await;

    let outcome = manager
        .link(&[eref("switch.fan")], GrowId(1), Stage::Harvest)
        .await
        .unwrap();
    let err = outcome.into_result().unwrap_err();
    assert!(err.is_session_expired());
}

// ── Unlink ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_unlink_removes_link() {
    let (server, hub, manager) = setup().await;
    mount_rows(
        &server,
        json!([entity_row(11, "switch.fan", Some(5), Some("fruiting"))]),
        1,
    )
    .await;
    Mock::given(method("DELETE"))
        .and(path("/iot-gateways/1/entities/11/unlink"))
        .respond_with(ResponseTemplate::new(200).set_body_json(entity_row(11, "switch.fan", None, None)))
        .expect(1)
        .mount(&server)
        .await;
    hub.links()
        .upsert(LinkRecord::active(eref("switch.fan"), GrowId(5), Stage::Fruiting));

    let outcome = manager.unlink(&[eref("switch.fan")]).await.unwrap();

    assert!(outcome.is_success());
    assert!(!hub.links().is_linked(&eref("switch.fan")));
}

#[tokio::test]
async fn test_unlink_vanished_row_is_not_found() {
    let (server, hub, manager) = setup().await;
    mount_rows(
        &server,
        json!([entity_row(11, "switch.fan", Some(5), Some("fruiting"))]),
        1,
    )
    .await;
    Mock::given(method("DELETE"))
        .and(path("/iot-gateways/1/entities/11/unlink"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "detail": "Entity not found" })))
        .mount(&server)
        .await;
    hub.links()
        .upsert(LinkRecord::active(eref("switch.fan"), GrowId(5), Stage::Fruiting));

    let outcome = manager.unlink(&[eref("switch.fan")]).await.unwrap();

    assert_eq!(outcome.failed, vec![eref("switch.fan")]);
    assert!(matches!(
        outcome.errors[0].error,
        CoreError::NotFound { ref identifier, .. } if identifier == "1/switch.fan"
    ));
    // rolled back: the link is still shown, no longer pending
    assert_eq!(
        hub.links().get(&eref("switch.fan")).unwrap().state,
        LinkState::Active
    );
}

#[tokio::test]
async fn test_unlink_without_row_fails_that_item() {
    let (server, _hub, manager) = setup().await;
    mount_rows(&server, json!([]), 1).await;

    let outcome = manager.unlink(&[eref("switch.ghost")]).await.unwrap();
    assert_eq!(outcome.failed.len(), 1);
    assert!(matches!(outcome.errors[0].error, CoreError::NotFound { .. }));
}

// ── Sync ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_load_links_rebuilds_table() {
    let (server, hub, manager) = setup().await;
    mount_rows(
        &server,
        json!([
            entity_row(11, "switch.fan", Some(5), Some("fruiting")),
            entity_row(12, "sensor.co2", None, None),
            entity_row(13, "sensor.odd", Some(5), Some("pinning"))
        ]),
        1,
    )
    .await;

    let records = manager.sink().load_links(GatewayId(1)).await.unwrap();
    hub.sync_links(GatewayId(1), records);

    assert_eq!(hub.links().len(), 1);
    assert!(hub.links().is_linked(&eref("switch.fan")));

    assert_eq!(hub.grow_deleted(GrowId(5)), 1);
    assert!(hub.links().is_empty());
}
