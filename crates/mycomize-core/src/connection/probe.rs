// ── Connection probe ──
//
// One authenticated `GET /api/` per call, bounded by an explicit timeout.
// Network and auth failures are outcomes, not errors: repeated probes of
// an unreachable gateway keep reporting `disconnected`. No retries.

use std::sync::Arc;
use std::time::{Duration, Instant};

use mycomize_api::{GatewayClient, TransportConfig};
use serde::Serialize;
use tracing::{debug, warn};

use super::StatusBoard;
use crate::error::{AuthScope, CoreError};
use crate::model::{ConnectionStatus, DisconnectReason, Gateway, GatewayId};

/// Why a probe did not connect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeFailure {
    pub reason: DisconnectReason,
    pub message: String,
}

/// Result of one probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeReport {
    pub gateway_id: GatewayId,
    pub status: ConnectionStatus,
    pub latency_ms: Option<u64>,
    pub version: Option<String>,
    pub failure: Option<ProbeFailure>,
}

impl ProbeReport {
    pub fn is_connected(&self) -> bool {
        self.status.is_connected()
    }

    /// Turn a failed report into the matching error, for callers that
    /// want `?` semantics.
    pub fn into_result(self) -> Result<Self, CoreError> {
        match self.failure {
            None => Ok(self),
            Some(ProbeFailure {
                reason: DisconnectReason::Authentication,
                message,
            }) => Err(CoreError::Authentication {
                scope: AuthScope::Gateway(self.gateway_id),
                message,
            }),
            Some(ProbeFailure {
                reason: DisconnectReason::Network,
                message,
            }) => Err(CoreError::Network { message }),
        }
    }
}

/// Health checker for gateways.
pub struct ConnectionProbe {
    board: Arc<StatusBoard>,
    transport: TransportConfig,
    timeout: Duration,
}

impl ConnectionProbe {
    pub fn new(board: Arc<StatusBoard>, transport: TransportConfig, timeout: Duration) -> Self {
        Self {
            board,
            transport,
            timeout,
        }
    }

    /// Probe `gateway` and record the outcome on the status board.
    ///
    /// Only invalid input is an `Err`; see [`ProbeReport::into_result`].
    pub async fn probe(&self, gateway: &Gateway) -> Result<ProbeReport, CoreError> {
        gateway.validate_credentials()?;
        let client = GatewayClient::from_token(&gateway.base_url, &gateway.api_key, &self.transport)
            .map_err(|e| CoreError::from_gateway(gateway.id, e))?;

        let fingerprint = gateway.fingerprint();
        let ticket = self.board.begin_probe(gateway.id);
        debug!(gateway_id = %gateway.id, %fingerprint, url = %client.base_url(), "probing gateway");

        let started = Instant::now();
        let outcome = tokio::time::timeout(self.timeout, client.api_status()).await;
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let report = match outcome {
            Ok(Ok(api)) => ProbeReport {
                gateway_id: gateway.id,
                status: ConnectionStatus::Connected {
                    latency_ms,
                    version: api.version.clone(),
                },
                latency_ms: Some(latency_ms),
                version: api.version,
                failure: None,
            },
            Ok(Err(e)) => {
                let reason = if e.is_auth() {
                    DisconnectReason::Authentication
                } else {
                    DisconnectReason::Network
                };
                warn!(gateway_id = %gateway.id, error = %e, "probe failed");
                disconnected(gateway.id, reason, e.to_string())
            }
            Err(_) => {
                warn!(gateway_id = %gateway.id, timeout = ?self.timeout, "probe timed out");
                disconnected(
                    gateway.id,
                    DisconnectReason::Network,
                    format!("timed out after {}s", self.timeout.as_secs()),
                )
            }
        };

        self.board
            .finish_probe(ticket, fingerprint, report.status.clone());
        Ok(report)
    }
}

fn disconnected(gateway_id: GatewayId, reason: DisconnectReason, message: String) -> ProbeReport {
    ProbeReport {
        gateway_id,
        status: ConnectionStatus::Disconnected { reason },
        latency_ms: None,
        version: None,
        failure: Some(ProbeFailure { reason, message }),
    }
}
