use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Backend identifier of a configured gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GatewayId(pub i64);

impl fmt::Display for GatewayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Backend identifier of a grow (a cultivation batch).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GrowId(pub i64);

impl fmt::Display for GrowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Cultivation phase an entity can be linked to.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Stage {
    Inoculation,
    SpawnColonization,
    BulkColonization,
    Fruiting,
    Harvest,
}

impl Stage {
    /// Human label, e.g. `"Bulk Colonization"`.
    pub fn label(self) -> &'static str {
        match self {
            Self::Inoculation => "Inoculation",
            Self::SpawnColonization => "Spawn Colonization",
            Self::BulkColonization => "Bulk Colonization",
            Self::Fruiting => "Fruiting",
            Self::Harvest => "Harvest",
        }
    }
}

/// Identity of an entity: the raw entity id is only unique within its
/// gateway, so the pair is the key everywhere links are tracked.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityRef {
    pub gateway_id: GatewayId,
    pub entity_name: String,
}

impl EntityRef {
    pub fn new(gateway_id: GatewayId, entity_name: impl Into<String>) -> Self {
        Self {
            gateway_id,
            entity_name: entity_name.into(),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.gateway_id, self.entity_name)
    }
}
