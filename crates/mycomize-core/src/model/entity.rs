use mycomize_api::backend::EntityRecord;
use mycomize_api::gateway::RawState;
use serde::Serialize;

use super::{EntityRef, GatewayId};

/// One observable/controllable point exposed by a gateway.
///
/// A cached projection of remote state: everything here can be rebuilt
/// from `GET /api/states` at any time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entity {
    pub gateway_id: GatewayId,
    pub entity_name: String,
    pub domain: String,
    pub device_class: Option<String>,
    pub friendly_name: Option<String>,
    pub enabled: bool,
}

/// The domain of a raw entity id: everything before the first `.`.
///
/// An id without a separator is its own domain.
pub fn domain_of(entity_name: &str) -> &str {
    entity_name
        .split_once('.')
        .map_or(entity_name, |(domain, _)| domain)
}

impl Entity {
    pub fn from_state(gateway_id: GatewayId, raw: &RawState) -> Self {
        Self {
            gateway_id,
            domain: domain_of(&raw.entity_id).to_owned(),
            entity_name: raw.entity_id.clone(),
            device_class: raw.device_class().map(str::to_owned),
            friendly_name: raw.friendly_name().map(str::to_owned),
            enabled: true,
        }
    }

    pub fn from_record(record: &EntityRecord) -> Self {
        Self {
            gateway_id: GatewayId(record.gateway_id),
            domain: record
                .domain
                .clone()
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| domain_of(&record.entity_name).to_owned()),
            entity_name: record.entity_name.clone(),
            device_class: record.device_class.clone().filter(|d| !d.is_empty()),
            friendly_name: record.friendly_name.clone().filter(|n| !n.is_empty()),
            enabled: record.is_enabled,
        }
    }

    pub fn entity_ref(&self) -> EntityRef {
        EntityRef::new(self.gateway_id, self.entity_name.clone())
    }

    /// Friendly name when the gateway supplies one, raw id otherwise.
    pub fn display_name(&self) -> &str {
        self.friendly_name.as_deref().unwrap_or(&self.entity_name)
    }
}
