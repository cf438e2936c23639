use chrono::NaiveDateTime;
use mycomize_api::GatewayKind;
use mycomize_api::backend::{GatewayRecord, GatewayWrite};
use secrecy::{ExposeSecret, SecretString};

use super::GatewayId;
use crate::error::CoreError;
use crate::fingerprint::CredentialFingerprint;

/// A configured gateway as the core sees it.
///
/// `base_url` is kept as entered; it is parsed and normalized only when a
/// client is built, so an invalid value surfaces as a validation error at
/// probe time instead of failing construction.
#[derive(Debug, Clone)]
pub struct Gateway {
    pub id: GatewayId,
    pub name: String,
    pub kind: GatewayKind,
    pub base_url: String,
    pub api_key: SecretString,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: Option<NaiveDateTime>,
}

impl Gateway {
    pub fn new(
        id: GatewayId,
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: SecretString,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            kind: GatewayKind::HomeAssistant,
            base_url: base_url.into(),
            api_key,
            description: None,
            is_active: true,
            created_at: None,
        }
    }

    /// Identity of the current (base-url, api-key) pair.
    pub fn fingerprint(&self) -> CredentialFingerprint {
        CredentialFingerprint::derive(&self.base_url, &self.api_key)
    }

    /// Reject gateways that cannot possibly be contacted.
    pub fn validate_credentials(&self) -> Result<(), CoreError> {
        if self.base_url.trim().is_empty() {
            return Err(CoreError::validation("base_url", "base URL is required"));
        }
        if self.api_key.expose_secret().trim().is_empty() {
            return Err(CoreError::validation("api_key", "API key is required"));
        }
        Ok(())
    }

    /// Convert a backend row, filling gaps the backend may leave null.
    pub fn from_record(record: GatewayRecord) -> Result<Self, CoreError> {
        let kind = match record.kind.as_deref() {
            None | Some("") => GatewayKind::HomeAssistant,
            Some(raw) => raw.parse().map_err(|_| {
                CoreError::validation("type", format!("unsupported gateway kind '{raw}'"))
            })?,
        };

        Ok(Self {
            id: GatewayId(record.id),
            name: record.name.unwrap_or_default(),
            kind,
            base_url: record.api_url.unwrap_or_default(),
            api_key: SecretString::from(record.api_key.unwrap_or_default()),
            description: record.description,
            is_active: record.is_active,
            created_at: record.created_at,
        })
    }
}

/// The editable fields of a gateway, before they are saved.
///
/// Used for both create and edit; on edit, `api_key` starts out empty
/// unless the user (or a credential handoff) fills it in.
#[derive(Debug, Clone)]
pub struct GatewayForm {
    pub name: String,
    pub kind: GatewayKind,
    pub base_url: String,
    pub api_key: SecretString,
    pub description: Option<String>,
}

impl Default for GatewayForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            kind: GatewayKind::HomeAssistant,
            base_url: String::new(),
            api_key: SecretString::from(String::new()),
            description: None,
        }
    }
}

impl GatewayForm {
    pub fn from_gateway(gateway: &Gateway) -> Self {
        Self {
            name: gateway.name.clone(),
            kind: gateway.kind,
            base_url: gateway.base_url.clone(),
            api_key: gateway.api_key.clone(),
            description: gateway.description.clone(),
        }
    }

    /// Field-level validation for a create.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.name.trim().is_empty() {
            return Err(CoreError::validation("name", "name is required"));
        }
        if self.base_url.trim().is_empty() {
            return Err(CoreError::validation("base_url", "base URL is required"));
        }
        url::Url::parse(self.base_url.trim())
            .map_err(|e| CoreError::validation("base_url", e.to_string()))?;
        if self.api_key.expose_secret().trim().is_empty() {
            return Err(CoreError::validation("api_key", "API key is required"));
        }
        Ok(())
    }

    /// Backend body for `POST /iot-gateways/`.
    pub fn to_create(&self) -> GatewayWrite {
        GatewayWrite {
            name: Some(self.name.trim().to_owned()),
            kind: Some(self.kind.as_str().to_owned()),
            api_url: Some(self.base_url.trim().to_owned()),
            api_key: Some(self.api_key.expose_secret().trim().to_owned()),
            description: self.description.clone(),
            ..GatewayWrite::default()
        }
    }

    /// Backend body for a partial `PUT`: only fields that differ from
    /// `current` are sent.
    pub fn to_update(&self, current: &Gateway) -> GatewayWrite {
        let changed = |new: &str, old: &str| (new.trim() != old).then(|| new.trim().to_owned());
        let key = self.api_key.expose_secret();

        GatewayWrite {
            name: changed(&self.name, &current.name),
            api_url: changed(&self.base_url, &current.base_url),
            api_key: (!key.trim().is_empty())
                .then(|| changed(key, current.api_key.expose_secret()))
                .flatten(),
            description: (self.description != current.description)
                .then(|| self.description.clone().unwrap_or_default()),
            ..GatewayWrite::default()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn gateway() -> Gateway {
        Gateway::new(
            GatewayId(1),
            "Tent",
            "http://hass.local:8123",
            SecretString::from("token-1"),
        )
    }

    #[test]
    fn empty_api_key_fails_validation() {
        let mut gw = gateway();
        gw.api_key = SecretString::from("   ");
        let err = gw.validate_credentials().unwrap_err();
        assert!(matches!(err, CoreError::Validation { ref field, .. } if field == "api_key"));
    }

    #[test]
    fn empty_base_url_fails_validation() {
        let mut gw = gateway();
        gw.base_url = String::new();
        let err = gw.validate_credentials().unwrap_err();
        assert!(matches!(err, CoreError::Validation { ref field, .. } if field == "base_url"));
    }

    #[test]
    fn record_without_kind_defaults_to_home_assistant() {
        let record: GatewayRecord = serde_json::from_value(serde_json::json!({
            "id": 4,
            "name": "Lab",
            "api_url": "http://lab:8123",
            "api_key": "k",
            "is_active": true
        }))
        .unwrap();
        let gw = Gateway::from_record(record).unwrap();
        assert_eq!(gw.kind, GatewayKind::HomeAssistant);
        assert_eq!(gw.id, GatewayId(4));
    }

    #[test]
    fn update_only_carries_changed_fields() {
        let current = gateway();
        let mut form = GatewayForm::from_gateway(&current);
        form.name = "Fruiting tent".into();

        let body = form.to_update(&current);
        assert_eq!(body.name.as_deref(), Some("Fruiting tent"));
        assert!(body.api_url.is_none());
        assert!(body.api_key.is_none());
    }

    #[test]
    fn blank_key_on_edit_keeps_stored_key() {
        let current = gateway();
        let mut form = GatewayForm::from_gateway(&current);
        form.api_key = SecretString::from("");
        assert!(form.to_update(&current).api_key.is_none());
    }

    #[test]
    fn form_rejects_unparseable_url() {
        let form = GatewayForm {
            name: "x".into(),
            base_url: "hass local".into(),
            api_key: SecretString::from("k"),
            ..GatewayForm::default()
        };
        assert!(matches!(
            form.validate(),
            Err(CoreError::Validation { ref field, .. }) if field == "base_url"
        ));
    }
}
