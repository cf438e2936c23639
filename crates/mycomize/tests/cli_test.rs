//! Integration tests for the `mycomize` CLI binary.
//!
//! Argument parsing, help output, completions, local-only commands, and a
//! backend-bound command against a mock server.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `mycomize` binary with env isolation.
///
/// Clears all `MYCOMIZE_*` env vars and points every XDG directory into
/// `home` so tests never touch the user's real configuration.
fn mycomize_cmd(home: &TempDir) -> assert_cmd::Command {
    let root = home.path();
    let mut cmd = cargo_bin_cmd!("mycomize");
    cmd.env("HOME", root)
        .env("XDG_CONFIG_HOME", root.join("config"))
        .env("XDG_DATA_HOME", root.join("data"))
        .env("XDG_CACHE_HOME", root.join("cache"))
        .env_remove("MYCOMIZE_PROFILE")
        .env_remove("MYCOMIZE_BACKEND")
        .env_remove("MYCOMIZE_TOKEN")
        .env_remove("MYCOMIZE_USER")
        .env_remove("MYCOMIZE_OUTPUT")
        .env_remove("MYCOMIZE_INSECURE")
        .env_remove("MYCOMIZE_TIMEOUT")
        .env_remove("MYCOMIZE_GATEWAY_KEY")
        .env_remove("RUST_LOG");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let home = TempDir::new().unwrap();
    let output = mycomize_cmd(&home).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    let home = TempDir::new().unwrap();
    mycomize_cmd(&home).arg("--help").assert().success().stdout(
        predicate::str::contains("gateways")
            .and(predicate::str::contains("entities"))
            .and(predicate::str::contains("links"))
            .and(predicate::str::contains("filters")),
    );
}

#[test]
fn test_version_flag() {
    let home = TempDir::new().unwrap();
    mycomize_cmd(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("mycomize"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions() {
    let home = TempDir::new().unwrap();
    for shell in ["bash", "zsh", "fish"] {
        mycomize_cmd(&home)
            .args(["completions", shell])
            .assert()
            .success()
            .stdout(predicate::str::is_empty().not());
    }
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let home = TempDir::new().unwrap();
    let output = mycomize_cmd(&home).arg("foobar").output().unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("unrecognized") || text.contains("foobar"),
        "Expected error mentioning invalid subcommand:\n{text}"
    );
}

#[test]
fn test_gateways_list_without_config() {
    let home = TempDir::new().unwrap();
    mycomize_cmd(&home)
        .args(["gateways", "list"])
        .assert()
        .failure()
        .stderr(
            predicate::str::contains("config")
                .or(predicate::str::contains("Configuration"))
                .or(predicate::str::contains("profile")),
        );
}

#[test]
fn test_invalid_output_format() {
    let home = TempDir::new().unwrap();
    let output = mycomize_cmd(&home)
        .args(["--output", "invalid", "gateways", "list"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(
        text.contains("invalid") || text.contains("possible values"),
        "Expected error about valid output formats:\n{text}"
    );
}

#[test]
fn test_links_add_requires_stage() {
    let home = TempDir::new().unwrap();
    mycomize_cmd(&home)
        .args(["links", "add", "7", "sensor.tent_humidity", "--grow", "3"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--stage"));
}

#[test]
fn test_links_add_rejects_unknown_stage() {
    let home = TempDir::new().unwrap();
    mycomize_cmd(&home)
        .args([
            "links",
            "add",
            "7",
            "sensor.tent_humidity",
            "--grow",
            "3",
            "--stage",
            "pinning",
        ])
        .assert()
        .code(2);
}

#[test]
fn test_watch_rejects_zero_interval() {
    let home = TempDir::new().unwrap();
    mycomize_cmd(&home)
        .args(["watch", "7", "--interval", "0s"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("interval"));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_show_no_config() {
    // `config show` renders the default config when no file exists.
    let home = TempDir::new().unwrap();
    mycomize_cmd(&home)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[defaults]"));
}

#[test]
fn test_config_set_then_show() {
    let home = TempDir::new().unwrap();
    mycomize_cmd(&home)
        .args(["config", "set", "backend", "http://localhost:8000"])
        .assert()
        .success();
    mycomize_cmd(&home)
        .args(["config", "set", "probe_timeout", "5"])
        .assert()
        .success();

    mycomize_cmd(&home)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("backend = \"http://localhost:8000\"")
                .and(predicate::str::contains("probe_timeout = 5")),
        );
}

#[test]
fn test_config_set_unknown_key() {
    let home = TempDir::new().unwrap();
    mycomize_cmd(&home)
        .args(["config", "set", "controller", "x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown config key"));
}

#[test]
fn test_config_use_unknown_profile() {
    let home = TempDir::new().unwrap();
    mycomize_cmd(&home)
        .args(["config", "use", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope"));
}

#[test]
fn test_config_path_points_into_config_home() {
    let home = TempDir::new().unwrap();
    mycomize_cmd(&home)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

// ── Filters ─────────────────────────────────────────────────────────

#[test]
fn test_filters_persist_per_user() {
    let home = TempDir::new().unwrap();
    mycomize_cmd(&home)
        .args(["--user", "42", "filters", "set", "--domain", "sensor"])
        .assert()
        .success();

    let output = mycomize_cmd(&home)
        .args(["--user", "42", "-o", "json", "filters", "show"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let prefs: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(prefs["domains"], json!(["sensor"]));
    assert_eq!(prefs["showAllDomains"], json!(false));

    // Another user starts from the defaults.
    let output = mycomize_cmd(&home)
        .args(["--user", "7", "-o", "json", "filters", "show"])
        .output()
        .unwrap();
    let prefs: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(prefs["domains"], json!([]));
    assert_eq!(prefs["showAllDomains"], json!(true));
}

#[test]
fn test_filters_set_needs_a_dimension() {
    let home = TempDir::new().unwrap();
    mycomize_cmd(&home)
        .args(["filters", "set"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--domain"));
}

// ── Credential slot ─────────────────────────────────────────────────

#[test]
fn test_credential_stash_and_clear() {
    let home = TempDir::new().unwrap();
    mycomize_cmd(&home)
        .args(["credential", "stash", "abc123"])
        .assert()
        .success()
        .stderr(predicate::str::contains("--scanned"));
    mycomize_cmd(&home)
        .args(["credential", "clear"])
        .assert()
        .success();
}

#[test]
fn test_credential_stash_rejects_blank() {
    let home = TempDir::new().unwrap();
    mycomize_cmd(&home)
        .args(["credential", "stash"])
        .write_stdin("   \n")
        .assert()
        .failure();
}

// ── Backend-bound ───────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_gateways_list_against_backend() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/iot-gateways/"))
        .and(query_param("skip", "0"))
        .and(query_param("limit", "100"))
        .and(header("authorization", "Bearer session-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 7,
            "name": "Grow tent HA",
            "type": "home_assistant",
            "api_url": "http://hass.local:8123",
            "api_key": "eyJhbGciOiJIUzI1NiJ9.secret",
            "description": null,
            "is_active": true
        }])))
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    let output = mycomize_cmd(&home)
        .args([
            "--backend",
            &server.uri(),
            "--token",
            "session-token",
            "-o",
            "json",
            "gateways",
            "list",
        ])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(rows[0]["id"], json!(7));
    assert_eq!(rows[0]["name"], json!("Grow tent HA"));
    // The access token never leaves the process unmasked.
    assert_ne!(rows[0]["api_key"], json!("eyJhbGciOiJIUzI1NiJ9.secret"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_gateway_show_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/iot-gateways/99"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"detail": "Gateway not found"})),
        )
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    mycomize_cmd(&home)
        .args([
            "--backend",
            &server.uri(),
            "--token",
            "session-token",
            "gateways",
            "show",
            "99",
        ])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("gateways list"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_expired_session_exit_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/iot-gateways/"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    mycomize_cmd(&home)
        .args([
            "--backend",
            &server.uri(),
            "--token",
            "stale",
            "gateways",
            "list",
        ])
        .assert()
        .code(3);
}
