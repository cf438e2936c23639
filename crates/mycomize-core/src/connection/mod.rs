// ── Connection health ──
//
// `StatusBoard` owns one `watch` channel per gateway plus the fingerprint
// that was last verified by a successful probe. The catalog consults it
// before fetching; the state refresher follows its channel.

mod probe;

pub use probe::{ConnectionProbe, ProbeFailure, ProbeReport};

use dashmap::DashMap;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::events::{EventBus, HubEvent};
use crate::fingerprint::CredentialFingerprint;
use crate::model::{ConnectionStatus, DisconnectReason, GatewayId};

struct Slot {
    status: watch::Sender<ConnectionStatus>,
    /// Fingerprint for which a probe last reported `connected`.
    verified: Option<CredentialFingerprint>,
    /// Bumped on credential change; stale probe results are dropped.
    epoch: u64,
}

impl Slot {
    fn new() -> Self {
        let (status, _) = watch::channel(ConnectionStatus::Unknown);
        Self {
            status,
            verified: None,
            epoch: 0,
        }
    }
}

/// Handed out by [`StatusBoard::begin_probe`]; identifies which
/// credential generation a probe result belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeTicket {
    gateway_id: GatewayId,
    epoch: u64,
}

/// Per-gateway connection status and verification record.
pub struct StatusBoard {
    slots: DashMap<GatewayId, Slot>,
    events: EventBus,
}

impl StatusBoard {
    pub fn new(events: EventBus) -> Self {
        Self {
            slots: DashMap::new(),
            events,
        }
    }

    pub fn status(&self, gateway_id: GatewayId) -> ConnectionStatus {
        self.slots
            .get(&gateway_id)
            .map(|slot| slot.status.borrow().clone())
            .unwrap_or_default()
    }

    /// Watch a gateway's status. The channel closes when the gateway is
    /// removed from the board.
    pub fn subscribe(&self, gateway_id: GatewayId) -> watch::Receiver<ConnectionStatus> {
        self.slots
            .entry(gateway_id)
            .or_insert_with(Slot::new)
            .status
            .subscribe()
    }

    /// `true` once a probe with exactly these credentials has connected.
    pub fn is_verified(&self, gateway_id: GatewayId, fingerprint: &CredentialFingerprint) -> bool {
        self.slots
            .get(&gateway_id)
            .is_some_and(|slot| slot.verified.as_ref() == Some(fingerprint))
    }

    /// Enter `connecting`. Every probe passes through here first, even
    /// when re-probing from a terminal state.
    pub fn begin_probe(&self, gateway_id: GatewayId) -> ProbeTicket {
        let epoch = {
            let slot = self.slots.entry(gateway_id).or_insert_with(Slot::new);
            slot.status.send_replace(ConnectionStatus::Connecting);
            slot.epoch
        };
        self.publish(gateway_id, ConnectionStatus::Connecting);
        ProbeTicket { gateway_id, epoch }
    }

    /// Record a probe result. Returns `false` (and changes nothing) when
    /// the credentials changed while the probe was in flight.
    pub fn finish_probe(
        &self,
        ticket: ProbeTicket,
        fingerprint: CredentialFingerprint,
        status: ConnectionStatus,
    ) -> bool {
        {
            let Some(mut slot) = self.slots.get_mut(&ticket.gateway_id) else {
                debug!(gateway_id = %ticket.gateway_id, "probe finished for removed gateway");
                return false;
            };
            if slot.epoch != ticket.epoch {
                debug!(
                    gateway_id = %ticket.gateway_id,
                    "discarding probe result for superseded credentials"
                );
                return false;
            }
            if status.is_connected() {
                slot.verified = Some(fingerprint);
            }
            slot.status.send_replace(status.clone());
        }
        info!(gateway_id = %ticket.gateway_id, %status, "connection status changed");
        self.publish(ticket.gateway_id, status);
        true
    }

    /// A connected gateway failed outside a probe (the token was revoked
    /// mid-session). Drops the verification so the next catalog fetch
    /// re-probes. No-op for a gateway that is not on the board.
    pub fn mark_disconnected(&self, gateway_id: GatewayId, reason: DisconnectReason) {
        let status = ConnectionStatus::Disconnected { reason };
        {
            let Some(mut slot) = self.slots.get_mut(&gateway_id) else {
                return;
            };
            slot.verified = None;
            slot.status.send_replace(status.clone());
        }
        info!(%gateway_id, %status, "connection status changed");
        self.publish(gateway_id, status);
    }

    /// Credentials changed: forget the verification, return to `unknown`
    /// and invalidate any probe still in flight.
    pub fn reset(&self, gateway_id: GatewayId) {
        {
            let mut slot = self.slots.entry(gateway_id).or_insert_with(Slot::new);
            slot.epoch += 1;
            slot.verified = None;
            slot.status.send_replace(ConnectionStatus::Unknown);
        }
        self.publish(gateway_id, ConnectionStatus::Unknown);
    }

    /// Drop the gateway. Dropping the sender closes every subscriber's
    /// channel, which is how watchers learn about removal.
    pub fn remove(&self, gateway_id: GatewayId) {
        self.slots.remove(&gateway_id);
    }

    fn publish(&self, gateway_id: GatewayId, status: ConnectionStatus) {
        self.events
            .publish(HubEvent::StatusChanged { gateway_id, status });
    }
}
