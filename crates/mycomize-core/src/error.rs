// ── Core error types ──
//
// Domain errors for mycomize-core. Consumers never see raw HTTP status
// codes or JSON failures from a gateway: `CoreError::from_gateway` and
// the `From<mycomize_api::Error>` impl (backend surface) translate
// transport-layer errors into the variants below.

use std::fmt;

use thiserror::Error;

use crate::model::GatewayId;

/// Which credential an authentication failure refers to.
///
/// A rejected gateway token means the user must fix the gateway's API
/// key; a rejected backend session means the user must sign in again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScope {
    Gateway(GatewayId),
    Backend,
}

impl fmt::Display for AuthScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gateway(id) => write!(f, "gateway {id}"),
            Self::Backend => f.write_str("backend session"),
        }
    }
}

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Input errors ─────────────────────────────────────────────────
    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    // ── Connection errors ────────────────────────────────────────────
    #[error("Authentication rejected by {scope}: {message}")]
    Authentication { scope: AuthScope, message: String },

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Gateway {gateway_id} has not been verified by a successful probe")]
    NotProbed { gateway_id: GatewayId },

    #[error("Gateway {gateway_id} is not connected")]
    NotConnected { gateway_id: GatewayId },

    // ── Concurrency outcomes ─────────────────────────────────────────
    #[error("Catalog fetch for gateway {gateway_id} was superseded by a credential change")]
    Superseded { gateway_id: GatewayId },

    #[error("Operation cancelled")]
    Cancelled,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Entity not found: {entity_type} with id {identifier}")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    #[error("{failed} of {} items failed ({succeeded} succeeded)", .succeeded + .failed)]
    PartialBulkFailure { succeeded: usize, failed: usize },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Persistence / configuration ──────────────────────────────────
    #[error("Preference storage error: {message}")]
    Preferences { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Translate an error from a gateway's REST surface.
    ///
    /// Anything that is not an authentication rejection is reported as a
    /// network failure: a gateway that answers with a 5xx or garbage is
    /// as unusable as one that does not answer.
    pub fn from_gateway(gateway_id: GatewayId, err: mycomize_api::Error) -> Self {
        use mycomize_api::Error as E;
        match err {
            E::Authentication { message, .. } => Self::Authentication {
                scope: AuthScope::Gateway(gateway_id),
                message,
            },
            E::InvalidToken(message) => Self::validation("api_key", message),
            E::InvalidUrl(e) => Self::validation("base_url", e.to_string()),
            E::Timeout { timeout_secs } => Self::Timeout { timeout_secs },
            E::Tls(message) => Self::Config { message },
            other => Self::Network {
                message: other.to_string(),
            },
        }
    }

    /// `true` for failures where the remote could not be used at all.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Timeout { .. })
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// `true` when the backend session is no longer valid and the user
    /// has to sign in again.
    pub fn is_session_expired(&self) -> bool {
        matches!(
            self,
            Self::Authentication {
                scope: AuthScope::Backend,
                ..
            }
        )
    }
}

// ── Conversion from backend transport errors ────────────────────────

impl From<mycomize_api::Error> for CoreError {
    fn from(err: mycomize_api::Error) -> Self {
        use mycomize_api::Error as E;

        if err.is_not_found() {
            return Self::NotFound {
                entity_type: "resource".into(),
                identifier: err.to_string(),
            };
        }

        match err {
            E::Authentication { message, .. } => Self::Authentication {
                scope: AuthScope::Backend,
                message,
            },
            E::InvalidToken(message) => Self::Authentication {
                scope: AuthScope::Backend,
                message,
            },
            E::Timeout { timeout_secs } => Self::Timeout { timeout_secs },
            E::Transport(ref e) if e.is_timeout() => Self::Timeout { timeout_secs: 0 },
            E::Transport(ref e) if e.is_connect() || e.is_request() => Self::Network {
                message: e.to_string(),
            },
            E::Transport(e) => Self::Api {
                status: e.status().map(|s| s.as_u16()),
                message: e.to_string(),
            },
            E::InvalidUrl(e) => Self::Config {
                message: format!("invalid backend URL: {e}"),
            },
            E::Tls(message) => Self::Config { message },
            E::Api { status, message } => Self::Api {
                status: Some(status),
                message,
            },
            E::Deserialization { message, .. } => Self::Api {
                status: None,
                message: format!("unexpected response: {message}"),
            },
        }
    }
}
