use chrono::{DateTime, Utc};
use mycomize_api::gateway::RawState;
use serde::Serialize;

/// Interpreted value of an entity's state string.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LiveValue {
    On,
    Off,
    Numeric { value: f64, unit: Option<String> },
    /// The gateway reports `unavailable` or `unknown`.
    Unavailable,
    Text { value: String },
}

impl LiveValue {
    pub fn parse(state: &str, unit: Option<&str>) -> Self {
        match state.trim() {
            "on" => Self::On,
            "off" => Self::Off,
            "unavailable" | "unknown" | "" => Self::Unavailable,
            other => match other.parse::<f64>() {
                Ok(value) if value.is_finite() => Self::Numeric {
                    value,
                    unit: unit.map(str::to_owned),
                },
                _ => Self::Text {
                    value: other.to_owned(),
                },
            },
        }
    }
}

impl std::fmt::Display for LiveValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::On => f.write_str("on"),
            Self::Off => f.write_str("off"),
            Self::Numeric {
                value,
                unit: Some(unit),
            } => write!(f, "{value} {unit}"),
            Self::Numeric { value, unit: None } => write!(f, "{value}"),
            Self::Unavailable => f.write_str("unavailable"),
            Self::Text { value } => f.write_str(value),
        }
    }
}

/// Latest known state of one linked entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveState {
    pub entity_name: String,
    pub value: LiveValue,
    pub last_updated: Option<DateTime<Utc>>,
}

impl From<&RawState> for LiveState {
    fn from(raw: &RawState) -> Self {
        Self {
            entity_name: raw.entity_id.clone(),
            value: LiveValue::parse(&raw.state, raw.unit_of_measurement()),
            last_updated: raw.last_updated.or(raw.last_changed),
        }
    }
}
