// Wire types for the backend `/iot-gateways` API.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A gateway row as returned by the backend.
///
/// User-supplied columns are optional on the wire because the backend
/// stores them encrypted and may hand back nulls for rows created by
/// older clients.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayRecord {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub linked_entities_count: Option<String>,
    #[serde(default)]
    pub linkable_entities_count: Option<String>,
}

/// Body for gateway create (`POST`) and partial update (`PUT`).
///
/// `None` fields are omitted so an update only touches what was set.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GatewayWrite {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linked_entities_count: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linkable_entities_count: Option<String>,
}

/// An entity row under a gateway.
///
/// `linked_grow_id` / `linked_stage` carry the entity's single active link.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EntityRecord {
    pub id: i64,
    pub gateway_id: i64,
    #[serde(alias = "entity_id")]
    pub entity_name: String,
    #[serde(default)]
    pub entity_type: Option<String>,
    #[serde(default)]
    pub friendly_name: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub device_class: Option<String>,
    #[serde(default = "default_enabled")]
    pub is_enabled: bool,
    #[serde(default)]
    pub linked_grow_id: Option<i64>,
    #[serde(default)]
    pub linked_stage: Option<String>,
    #[serde(default)]
    pub last_state: Option<String>,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Serialize)]
pub struct EntityCreate {
    pub entity_name: String,
    pub entity_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub friendly_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_class: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkEntityCreate {
    pub entities: Vec<EntityCreate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkEntityIds {
    pub entity_ids: Vec<i64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EntityUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub friendly_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_enabled: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkRequest {
    pub grow_id: i64,
    pub stage: String,
}
