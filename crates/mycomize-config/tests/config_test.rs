#![allow(clippy::unwrap_used)]
// Config loading, credential resolution, and on-disk state.

use std::time::Duration;

use pretty_assertions::assert_eq;
use secrecy::{ExposeSecret, SecretString};

use mycomize_config::{
    Config, ConfigError, Defaults, FileCredentialSlot, JsonFilePreferences, Profile,
    load_config_from, profile_to_hub_config, resolve_token, save_config_to,
};
use mycomize_core::{
    CredentialHandoff, CredentialSlot, FilterPreferenceStore, GatewayForm, PreferenceBackend,
    TlsVerification,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn profile() -> Profile {
    Profile {
        backend: "https://mycomize.example.com".into(),
        user_id: "42".into(),
        ..Profile::default()
    }
}

// ── Loading / saving ────────────────────────────────────────────────

#[test]
fn test_missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = load_config_from(&dir.path().join("config.toml")).unwrap();

    assert_eq!(config.default_profile.as_deref(), Some("default"));
    assert_eq!(config.defaults.probe_timeout, 8);
    assert_eq!(config.defaults.catalog_timeout, 15);
    assert_eq!(config.defaults.poll_interval, 30);
    assert!(config.profiles.is_empty());
}

#[test]
fn test_profile_round_trips_through_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut config = Config::default();
    config.profiles.insert(
        "default".into(),
        Profile {
            token: Some("plain".into()),
            probe_timeout: Some(5),
            ..profile()
        },
    );
    save_config_to(&config, &path).unwrap();

    let loaded = load_config_from(&path).unwrap();
    let (name, p) = loaded.profile(None).unwrap();
    assert_eq!(name, "default");
    assert_eq!(p.backend, "https://mycomize.example.com");
    assert_eq!(p.user_id, "42");
    assert_eq!(p.probe_timeout, Some(5));
}

#[test]
fn test_unknown_profile_is_an_error() {
    let config = Config::default();
    assert!(matches!(
        config.profile(Some("lab")),
        Err(ConfigError::UnknownProfile { ref profile }) if profile == "lab"
    ));
}

// ── Credentials ─────────────────────────────────────────────────────

#[test]
fn test_token_env_takes_precedence_over_plaintext() {
    let expected = std::env::var("PATH").unwrap();
    let p = Profile {
        token_env: Some("PATH".into()),
        token: Some("plain".into()),
        ..profile()
    };
    let token = resolve_token(&p, "env-precedence-test").unwrap();
    assert_eq!(token.expose_secret(), expected);
}

#[test]
fn test_plaintext_token_is_last_resort() {
    let p = Profile {
        token_env: Some("MYCOMIZE_TEST_UNSET_TOKEN_VARIABLE".into()),
        token: Some("plain".into()),
        ..profile()
    };
    let token = resolve_token(&p, "plaintext-fallback-test").unwrap();
    assert_eq!(token.expose_secret(), "plain");
}

#[test]
fn test_no_token_anywhere() {
    let err = resolve_token(&profile(), "no-token-test").unwrap_err();
    assert!(matches!(err, ConfigError::NoCredentials { .. }));
}

// ── HubConfig translation ───────────────────────────────────────────

#[test]
fn test_hub_config_uses_defaults_and_overrides() {
    let defaults = Defaults::default();
    let p = Profile {
        catalog_timeout: Some(20),
        insecure: Some(true),
        ..profile()
    };
    let hub = profile_to_hub_config(&p, &defaults);

    assert_eq!(hub.probe_timeout, Duration::from_secs(8));
    assert_eq!(hub.catalog_timeout, Duration::from_secs(20));
    assert_eq!(hub.state_poll_interval, Duration::from_secs(30));
    assert_eq!(hub.tls, TlsVerification::DangerAcceptInvalid);
}

#[test]
fn test_hub_config_custom_ca() {
    let p = Profile {
        ca_cert: Some("/etc/ssl/hass.pem".into()),
        ..profile()
    };
    let hub = profile_to_hub_config(&p, &Defaults::default());
    assert_eq!(hub.tls, TlsVerification::CustomCa("/etc/ssl/hass.pem".into()));
}

// ── Preferences file ────────────────────────────────────────────────

#[test]
fn test_preferences_persist_across_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prefs").join("42.json");

    let store = FilterPreferenceStore::load(JsonFilePreferences::new(&path), "42").unwrap();
    store.set_domains(["switch".to_owned()]).unwrap();
    drop(store);

    let reopened = FilterPreferenceStore::load(JsonFilePreferences::new(&path), "42").unwrap();
    let prefs = reopened.current();
    assert!(!prefs.show_all_domains);
    assert!(prefs.domains.contains("switch"));

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert!(raw.get("user:42:entity_filters").is_some());
}

#[test]
fn test_corrupt_preferences_file_is_replaced_on_save() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("42.json");
    std::fs::write(&path, "not json").unwrap();

    let backend = JsonFilePreferences::new(&path);
    assert!(backend.load("user:42:entity_filters").is_err());

    backend.store("user:42:entity_filters", &serde_json::json!({})).unwrap();
    let store = FilterPreferenceStore::load(JsonFilePreferences::new(&path), "42").unwrap();
    assert!(store.current().show_all_domains);
}

// ── Credential slot ─────────────────────────────────────────────────

#[test]
fn test_scanned_credential_is_consumed_once() {
    let dir = tempfile::tempdir().unwrap();
    let slot = FileCredentialSlot::new(dir.path().join("cache").join("scanned-credential"));
    slot.put("abc123").unwrap();

    let handoff = CredentialHandoff::new(slot.clone());
    let mut form = GatewayForm::default();
    assert!(handoff.on_resume(&mut form));
    assert_eq!(form.api_key.expose_secret(), "abc123");

    assert!(!slot.path().exists());
    assert_eq!(slot.read().unwrap(), None);
}

#[test]
fn test_missing_slot_is_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let handoff = CredentialHandoff::new(FileCredentialSlot::new(dir.path().join("nothing")));
    let mut form = GatewayForm {
        api_key: SecretString::from("kept"),
        ..GatewayForm::default()
    };
    assert!(!handoff.on_resume(&mut form));
    assert_eq!(form.api_key.expose_secret(), "kept");
}
