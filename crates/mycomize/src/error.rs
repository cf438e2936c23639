//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use mycomize_config::ConfigError;
use mycomize_core::{AuthScope, CoreError};

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const PARTIAL: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Gateway {gateway_id} is unreachable: {message}")]
    #[diagnostic(
        code(mycomize::gateway_unreachable),
        help(
            "Check that the gateway is running and reachable from this machine.\n\
             Try: mycomize gateways probe {gateway_id}"
        )
    )]
    GatewayUnreachable { gateway_id: String, message: String },

    #[error("Gateway {gateway_id} is not connected")]
    #[diagnostic(
        code(mycomize::not_connected),
        help("Probe it first: mycomize gateways probe {gateway_id}")
    )]
    NotConnected { gateway_id: String },

    #[error("Network error: {message}")]
    #[diagnostic(
        code(mycomize::network),
        help(
            "Check the backend URL with: mycomize config show\n\
             Gateway problems show up in: mycomize gateways probe <ID>"
        )
    )]
    Network { message: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Gateway {gateway_id} rejected its API key")]
    #[diagnostic(
        code(mycomize::gateway_auth),
        help(
            "Create a new long-lived access token on the gateway, then run:\n\
             mycomize gateways update {gateway_id} --key <TOKEN>"
        )
    )]
    GatewayAuth { gateway_id: String },

    #[error("Backend session expired or invalid")]
    #[diagnostic(
        code(mycomize::session_expired),
        help("Sign in again and store the new token with: mycomize config set-token")
    )]
    SessionExpired,

    #[error("No backend token configured for profile '{profile}'")]
    #[diagnostic(
        code(mycomize::no_credentials),
        help(
            "Configure credentials with: mycomize config init\n\
             Or set the MYCOMIZE_TOKEN environment variable."
        )
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(mycomize::not_found),
        help("Run: mycomize {list_command} to see what exists")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── Bulk ─────────────────────────────────────────────────────────
    #[error("{failed} of {total} entities failed")]
    #[diagnostic(
        code(mycomize::partial_failure),
        help("Re-run the command with only the failed entities to retry them.")
    )]
    PartialFailure { failed: usize, total: usize },

    // ── API ──────────────────────────────────────────────────────────
    #[error("API error: {message}")]
    #[diagnostic(code(mycomize::api_error))]
    ApiError { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(mycomize::validation))]
    Validation { field: String, reason: String },

    #[error("The request was abandoned: {reason}")]
    #[diagnostic(code(mycomize::abandoned))]
    Abandoned { reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(mycomize::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: mycomize config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Configuration file not found")]
    #[diagnostic(
        code(mycomize::no_config),
        help(
            "Create one with: mycomize config init\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(mycomize::config))]
    Config(Box<ConfigError>),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(mycomize::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(mycomize::timeout),
        help("Increase timeouts in your profile (probe_timeout, catalog_timeout).")
    )]
    Timeout { seconds: u64 },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {0}")]
    Render(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::GatewayUnreachable { .. }
            | Self::NotConnected { .. }
            | Self::Network { .. } => exit_code::CONNECTION,
            Self::GatewayAuth { .. } | Self::SessionExpired | Self::NoCredentials { .. } => {
                exit_code::AUTH
            }
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::PartialFailure { .. } => exit_code::PARTIAL,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation { field, message } => Self::Validation {
                field,
                reason: message,
            },

            CoreError::Authentication {
                scope: AuthScope::Gateway(id),
                ..
            } => Self::GatewayAuth {
                gateway_id: id.to_string(),
            },
            CoreError::Authentication {
                scope: AuthScope::Backend,
                ..
            } => Self::SessionExpired,

            CoreError::Network { message } => Self::Network { message },

            CoreError::Timeout { timeout_secs } => Self::Timeout {
                seconds: timeout_secs,
            },

            CoreError::NotProbed { gateway_id } | CoreError::NotConnected { gateway_id } => {
                Self::NotConnected {
                    gateway_id: gateway_id.to_string(),
                }
            }

            CoreError::Superseded { gateway_id } => Self::Abandoned {
                reason: format!("credentials of gateway {gateway_id} changed mid-fetch"),
            },
            CoreError::Cancelled => Self::Abandoned {
                reason: "cancelled".into(),
            },

            CoreError::NotFound {
                entity_type,
                identifier,
            } => Self::NotFound {
                list_command: list_command_for(&entity_type),
                resource_type: entity_type,
                identifier,
            },

            CoreError::PartialBulkFailure { succeeded, failed } => Self::PartialFailure {
                failed,
                total: succeeded + failed,
            },

            CoreError::Api { message, status } => Self::ApiError {
                message: match status {
                    Some(code) => format!("{message} (HTTP {code})"),
                    None => message,
                },
            },

            CoreError::Preferences { message } => Self::Validation {
                field: "preferences".into(),
                reason: message,
            },

            CoreError::Config { message } => Self::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::Internal(message) => Self::ApiError { message },
        }
    }
}

fn list_command_for(entity_type: &str) -> String {
    match entity_type {
        "gateway" => "gateways list".into(),
        "entity" => "entities linkable <GATEWAY>".into(),
        other => format!("{other}s list"),
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => Self::NoCredentials { profile },
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(Box::new(other)),
        }
    }
}
