// ── Runtime configuration ──
//
// Timeouts and TLS settings for the hub. The CLI builds a `HubConfig`
// from its profile and hands it in; core never reads config files.

use std::path::PathBuf;
use std::time::Duration;

use mycomize_api::{TlsMode, TransportConfig};

/// TLS verification strategy for gateway connections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed gateways on the LAN).
    DangerAcceptInvalid,
}

/// Configuration for a [`GatewayHub`](crate::GatewayHub).
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Ceiling for a single health probe.
    pub probe_timeout: Duration,
    /// Ceiling for a full catalog fetch.
    pub catalog_timeout: Duration,
    /// How often linked entities' live values are re-fetched.
    pub state_poll_interval: Duration,
    /// Transport-level ceiling for every request.
    pub request_timeout: Duration,
    pub tls: TlsVerification,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(8),
            catalog_timeout: Duration::from_secs(15),
            state_poll_interval: Duration::from_secs(30),
            request_timeout: Duration::from_secs(30),
            tls: TlsVerification::default(),
        }
    }
}

impl HubConfig {
    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: match &self.tls {
                TlsVerification::SystemDefaults => TlsMode::System,
                TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
                TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
            },
            timeout: self.request_timeout,
        }
    }
}
