use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::model::Entity;

/// Which domains and device classes the linkable list shows.
///
/// Entries are stored lowercase and trimmed. An entity without a device
/// class is never hidden by the device-class filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterPreferences {
    pub domains: BTreeSet<String>,
    pub device_classes: BTreeSet<String>,
    pub show_all_domains: bool,
    pub show_all_device_classes: bool,
}

impl Default for FilterPreferences {
    fn default() -> Self {
        Self {
            domains: BTreeSet::new(),
            device_classes: BTreeSet::new(),
            show_all_domains: true,
            show_all_device_classes: true,
        }
    }
}

impl FilterPreferences {
    /// Restore the shape invariant after deserializing or editing: sets
    /// hold trimmed lowercase names, and an empty set means show all.
    pub fn normalize(&mut self) {
        self.domains = normalize_set(&self.domains);
        self.device_classes = normalize_set(&self.device_classes);
        if self.domains.is_empty() {
            self.show_all_domains = true;
        }
        if self.device_classes.is_empty() {
            self.show_all_device_classes = true;
        }
    }

    pub fn allows(&self, entity: &Entity) -> bool {
        let domain_ok =
            self.show_all_domains || self.domains.contains(&entity.domain.to_ascii_lowercase());
        let class_ok = self.show_all_device_classes
            || entity
                .device_class
                .as_ref()
                .is_none_or(|class| self.device_classes.contains(&class.to_ascii_lowercase()));
        domain_ok && class_ok
    }
}

fn normalize_set(values: &BTreeSet<String>) -> BTreeSet<String> {
    values
        .iter()
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty())
        .collect()
}

/// Key/JSON persistence the preference store writes through.
pub trait PreferenceBackend: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<Value>, CoreError>;
    fn store(&self, key: &str, value: &Value) -> Result<(), CoreError>;
}

/// In-memory backend for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    values: Mutex<HashMap<String, Value>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceBackend for MemoryPreferences {
    fn load(&self, key: &str) -> Result<Option<Value>, CoreError> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).cloned())
    }

    fn store(&self, key: &str, value: &Value) -> Result<(), CoreError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_owned(), value.clone());
        Ok(())
    }
}

impl<B: PreferenceBackend + ?Sized> PreferenceBackend for std::sync::Arc<B> {
    fn load(&self, key: &str) -> Result<Option<Value>, CoreError> {
        (**self).load(key)
    }

    fn store(&self, key: &str, value: &Value) -> Result<(), CoreError> {
        (**self).store(key, value)
    }
}

/// Namespaced preference key for one user.
pub fn preference_key(user_id: &str) -> String {
    format!("user:{user_id}:entity_filters")
}

/// Owner of a user's filter preferences.
///
/// The only way to change them: every mutation normalizes, persists and
/// then publishes on the `watch` channel.
pub struct FilterPreferenceStore<B> {
    backend: B,
    key: String,
    current: watch::Sender<FilterPreferences>,
}

impl<B: PreferenceBackend> FilterPreferenceStore<B> {
    /// Load the user's preferences. Missing or unreadable values fall
    /// back to defaults; a backend error is returned.
    pub fn load(backend: B, user_id: &str) -> Result<Self, CoreError> {
        let key = preference_key(user_id);
        let prefs = match backend.load(&key)? {
            None => FilterPreferences::default(),
            Some(value) => match serde_json::from_value::<FilterPreferences>(value) {
                Ok(mut prefs) => {
                    prefs.normalize();
                    prefs
                }
                Err(e) => {
                    warn!(%key, error = %e, "stored filter preferences unreadable, using defaults");
                    FilterPreferences::default()
                }
            },
        };
        debug!(%key, ?prefs, "filter preferences loaded");

        let (current, _) = watch::channel(prefs);
        Ok(Self {
            backend,
            key,
            current,
        })
    }

    pub fn current(&self) -> FilterPreferences {
        self.current.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FilterPreferences> {
        self.current.subscribe()
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Apply `edit`, persist, publish. Nothing changes if persisting fails.
    pub fn update(
        &self,
        edit: impl FnOnce(&mut FilterPreferences),
    ) -> Result<FilterPreferences, CoreError> {
        let mut next = self.current();
        edit(&mut next);
        next.normalize();

        let value = serde_json::to_value(&next).map_err(|e| CoreError::Preferences {
            message: e.to_string(),
        })?;
        self.backend.store(&self.key, &value)?;
        self.current.send_replace(next.clone());
        Ok(next)
    }

    /// Show only `domains` (an empty set means show all).
    pub fn set_domains(
        &self,
        domains: impl IntoIterator<Item = String>,
    ) -> Result<FilterPreferences, CoreError> {
        let domains: BTreeSet<String> = domains.into_iter().collect();
        self.update(|p| {
            p.show_all_domains = domains.is_empty();
            p.domains = domains;
        })
    }

    /// Show only `classes` (an empty set means show all).
    pub fn set_device_classes(
        &self,
        classes: impl IntoIterator<Item = String>,
    ) -> Result<FilterPreferences, CoreError> {
        let classes: BTreeSet<String> = classes.into_iter().collect();
        self.update(|p| {
            p.show_all_device_classes = classes.is_empty();
            p.device_classes = classes;
        })
    }

    pub fn toggle_domain(&self, domain: &str) -> Result<FilterPreferences, CoreError> {
        let domain = domain.trim().to_ascii_lowercase();
        self.update(|p| {
            if !p.domains.remove(&domain) {
                p.domains.insert(domain);
            }
            p.show_all_domains = p.domains.is_empty();
        })
    }

    pub fn toggle_device_class(&self, class: &str) -> Result<FilterPreferences, CoreError> {
        let class = class.trim().to_ascii_lowercase();
        self.update(|p| {
            if !p.device_classes.remove(&class) {
                p.device_classes.insert(class);
            }
            p.show_all_device_classes = p.device_classes.is_empty();
        })
    }

    pub fn reset(&self) -> Result<FilterPreferences, CoreError> {
        self.update(|p| *p = FilterPreferences::default())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::filter::linkable_view;
    use crate::model::GatewayId;
    use crate::store::LinkTable;
    use std::sync::Arc;

    fn entity(name: &str, class: Option<&str>) -> Entity {
        Entity {
            gateway_id: GatewayId(1),
            entity_name: name.into(),
            domain: crate::model::domain_of(name).into(),
            device_class: class.map(Into::into),
            friendly_name: None,
            enabled: true,
        }
    }

    struct FailingBackend;

    impl PreferenceBackend for FailingBackend {
        fn load(&self, _: &str) -> Result<Option<Value>, CoreError> {
            Ok(None)
        }

        fn store(&self, _: &str, _: &Value) -> Result<(), CoreError> {
            Err(CoreError::Preferences {
                message: "disk full".into(),
            })
        }
    }

    #[test]
    fn defaults_show_everything() {
        let prefs = FilterPreferences::default();
        assert!(prefs.allows(&entity("sensor.t", Some("temperature"))));
        assert!(prefs.allows(&entity("switch.fan", None)));
    }

    #[test]
    fn domain_filter_is_case_insensitive() {
        let mut prefs = FilterPreferences {
            domains: ["  Switch ".to_owned()].into(),
            show_all_domains: false,
            ..FilterPreferences::default()
        };
        prefs.normalize();
        assert!(prefs.allows(&entity("switch.fan", None)));
        assert!(!prefs.allows(&entity("sensor.t", None)));
    }

    #[test]
    fn missing_device_class_passes_class_filter() {
        let prefs = FilterPreferences {
            device_classes: ["humidity".to_owned()].into(),
            show_all_device_classes: false,
            ..FilterPreferences::default()
        };
        assert!(prefs.allows(&entity("switch.fan", None)));
        assert!(prefs.allows(&entity("sensor.h", Some("humidity"))));
        assert!(!prefs.allows(&entity("sensor.t", Some("temperature"))));
    }

    #[test]
    fn preferences_survive_a_new_store() {
        let backend = Arc::new(MemoryPreferences::new());
        let store = FilterPreferenceStore::load(Arc::clone(&backend), "42").unwrap();
        store.set_domains(["switch".to_owned()]).unwrap();

        let reopened = FilterPreferenceStore::load(backend, "42").unwrap();
        let prefs = reopened.current();
        assert!(!prefs.show_all_domains);
        assert_eq!(prefs.domains, BTreeSet::from(["switch".to_owned()]));
    }

    #[test]
    fn users_are_namespaced() {
        let backend = Arc::new(MemoryPreferences::new());
        FilterPreferenceStore::load(Arc::clone(&backend), "1")
            .unwrap()
            .set_domains(["switch".to_owned()])
            .unwrap();

        let other = FilterPreferenceStore::load(backend, "2").unwrap();
        assert_eq!(other.current(), FilterPreferences::default());
    }

    #[test]
    fn garbage_in_storage_falls_back_to_defaults() {
        let backend = MemoryPreferences::new();
        backend
            .store(&preference_key("7"), &serde_json::json!({"domains": 12}))
            .unwrap();
        let store = FilterPreferenceStore::load(backend, "7").unwrap();
        assert_eq!(store.current(), FilterPreferences::default());
    }

    #[test]
    fn failed_persist_leaves_preferences_unchanged() {
        let store = FilterPreferenceStore::load(FailingBackend, "1").unwrap();
        assert!(store.toggle_domain("switch").is_err());
        assert_eq!(store.current(), FilterPreferences::default());
    }

    #[test]
    fn toggling_last_domain_off_shows_all_again() {
        let store = FilterPreferenceStore::load(MemoryPreferences::new(), "1").unwrap();
        let prefs = store.toggle_domain("switch").unwrap();
        assert!(!prefs.show_all_domains);
        let prefs = store.toggle_domain("switch").unwrap();
        assert!(prefs.show_all_domains);
    }

    #[test]
    fn blank_domain_does_not_hide_everything() {
        let store = FilterPreferenceStore::load(MemoryPreferences::new(), "1").unwrap();
        let prefs = store
            .update(|p| {
                p.show_all_domains = false;
                p.domains = ["  ".to_owned()].into();
            })
            .unwrap();

        assert!(prefs.domains.is_empty());
        assert!(prefs.show_all_domains);

        let pool = [entity("switch.fan", None)];
        let view = linkable_view(&pool, &LinkTable::new(), &prefs, "");
        assert_eq!(view["switch"].len(), 1);
    }

    #[test]
    fn stored_empty_restriction_loads_as_show_all() {
        let backend = MemoryPreferences::new();
        backend
            .store(
                &preference_key("9"),
                &serde_json::json!({
                    "showAllDomains": false,
                    "domains": [],
                    "showAllDeviceClasses": false
                }),
            )
            .unwrap();
        let store = FilterPreferenceStore::load(backend, "9").unwrap();
        assert_eq!(store.current(), FilterPreferences::default());
    }

    #[test]
    fn updates_are_published() {
        let store = FilterPreferenceStore::load(MemoryPreferences::new(), "1").unwrap();
        let mut rx = store.subscribe();
        store.toggle_device_class("Humidity").unwrap();
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().device_classes.contains("humidity"));
    }
}
