use serde::Serialize;

/// Why a probe left a gateway disconnected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DisconnectReason {
    /// The gateway answered 401/403: the API key is wrong or revoked.
    Authentication,
    /// Unreachable, timed out, or answered with something unusable.
    Network,
}

/// Connection health of one gateway, recomputed per probe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConnectionStatus {
    #[default]
    Unknown,
    Connecting,
    Connected {
        latency_ms: u64,
        version: Option<String>,
    },
    Disconnected {
        reason: DisconnectReason,
    },
}

impl ConnectionStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }

    pub fn latency_ms(&self) -> Option<u64> {
        match self {
            Self::Connected { latency_ms, .. } => Some(*latency_ms),
            _ => None,
        }
    }

    pub fn version(&self) -> Option<&str> {
        match self {
            Self::Connected { version, .. } => version.as_deref(),
            _ => None,
        }
    }

    /// Short lowercase label: `unknown`, `connecting`, `connected`, `disconnected`.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Connecting => "connecting",
            Self::Connected { .. } => "connected",
            Self::Disconnected { .. } => "disconnected",
        }
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connected {
                latency_ms,
                version: Some(v),
            } => write!(f, "connected ({latency_ms} ms, v{v})"),
            Self::Connected { latency_ms, .. } => write!(f, "connected ({latency_ms} ms)"),
            Self::Disconnected {
                reason: DisconnectReason::Authentication,
            } => f.write_str("disconnected (invalid token)"),
            other => f.write_str(other.label()),
        }
    }
}
