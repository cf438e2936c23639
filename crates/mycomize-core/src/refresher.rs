// ── Live state refresher ──
//
// One background task per gateway. It polls `GET /api/states` on a fixed
// interval, keeps only the gateway's linked entities, and publishes the
// result on a `watch` channel. A re-probe passing through `connecting`
// does not interrupt it; the task ends once the gateway is disconnected,
// reset to `unknown`, removed from the status board or cancelled. A
// gateway that rejects the token mid-session is marked disconnected here.

use std::collections::{BTreeSet, HashMap};
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use mycomize_api::{GatewayClient, TransportConfig};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn};

use crate::connection::StatusBoard;
use crate::error::CoreError;
use crate::events::{EventBus, HubEvent};
use crate::model::{ConnectionStatus, DisconnectReason, Gateway, GatewayId, LiveState};
use crate::store::LinkRecord;

/// Live values keyed by raw entity id.
pub type LiveSnapshot = Arc<HashMap<String, LiveState>>;

/// Spawns per-gateway polling tasks.
pub struct StateRefresher {
    board: Arc<StatusBoard>,
    events: EventBus,
    transport: TransportConfig,
    interval: Duration,
    timeout: Duration,
}

impl StateRefresher {
    pub fn new(
        board: Arc<StatusBoard>,
        events: EventBus,
        transport: TransportConfig,
        interval: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            board,
            events,
            transport,
            interval,
            timeout,
        }
    }

    /// Start polling `gateway`. `links` is the link table's snapshot
    /// channel; the linked set is re-read on every tick, so links added
    /// later are picked up without a restart.
    ///
    /// Fails with `NotConnected` unless the gateway is `connected` now.
    pub fn spawn(
        &self,
        gateway: &Gateway,
        links: watch::Receiver<Arc<Vec<LinkRecord>>>,
        parent: &CancellationToken,
    ) -> Result<RefresherHandle, CoreError> {
        gateway.validate_credentials()?;

        let mut status = self.board.subscribe(gateway.id);
        if !status.borrow_and_update().is_connected() {
            return Err(CoreError::NotConnected {
                gateway_id: gateway.id,
            });
        }

        let client = GatewayClient::from_token(&gateway.base_url, &gateway.api_key, &self.transport)
            .map_err(|e| CoreError::from_gateway(gateway.id, e))?;

        let (values_tx, values) = watch::channel(LiveSnapshot::default());
        let cancel = parent.child_token();

        let poller = Poller {
            gateway_id: gateway.id,
            board: Arc::clone(&self.board),
            client,
            timeout: self.timeout,
            links,
            values: values_tx,
            events: self.events.clone(),
        };
        let task = tokio::spawn(poller.run(self.interval, status, cancel.clone()));
        info!(gateway_id = %gateway.id, interval = ?self.interval, "state refresher started");

        Ok(RefresherHandle {
            gateway_id: gateway.id,
            values,
            cancel: cancel.clone(),
            task,
            _guard: cancel.drop_guard(),
        })
    }
}

/// Owner of one polling task. Dropping the handle cancels the task.
pub struct RefresherHandle {
    gateway_id: GatewayId,
    values: watch::Receiver<LiveSnapshot>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
    _guard: DropGuard,
}

impl RefresherHandle {
    pub fn gateway_id(&self) -> GatewayId {
        self.gateway_id
    }

    pub fn values(&self) -> watch::Receiver<LiveSnapshot> {
        self.values.clone()
    }

    pub fn latest(&self) -> LiveSnapshot {
        self.values.borrow().clone()
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Cancel and wait for the task to exit.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            warn!(gateway_id = %self.gateway_id, error = %e, "state refresher task panicked");
        }
    }
}

struct Poller {
    gateway_id: GatewayId,
    board: Arc<StatusBoard>,
    client: GatewayClient,
    timeout: Duration,
    links: watch::Receiver<Arc<Vec<LinkRecord>>>,
    values: watch::Sender<LiveSnapshot>,
    events: EventBus,
}

impl Poller {
    async fn run(
        self,
        interval: Duration,
        mut status: watch::Receiver<ConnectionStatus>,
        cancel: CancellationToken,
    ) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                () = ended(&mut status) => break,
                _ = ticker.tick() => {}
            }

            // An in-flight poll is abandoned the moment the gateway drops.
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                () = ended(&mut status) => break,
                flow = self.poll_once() => {
                    if flow.is_break() {
                        break;
                    }
                }
            }
        }

        info!(gateway_id = %self.gateway_id, "state refresher stopped");
    }

    async fn poll_once(&self) -> ControlFlow<()> {
        let wanted: BTreeSet<String> = self
            .links
            .borrow()
            .iter()
            .filter(|r| r.entity.gateway_id == self.gateway_id)
            .map(|r| r.entity.entity_name.clone())
            .collect();

        if wanted.is_empty() {
            if !self.values.borrow().is_empty() {
                self.values.send_replace(LiveSnapshot::default());
            }
            return ControlFlow::Continue(());
        }

        let states = match tokio::time::timeout(self.timeout, self.client.states()).await {
            Ok(Ok(states)) => states,
            Ok(Err(e)) if e.is_auth() => {
                warn!(gateway_id = %self.gateway_id, error = %e, "gateway rejected the token");
                self.board
                    .mark_disconnected(self.gateway_id, DisconnectReason::Authentication);
                return ControlFlow::Break(());
            }
            Ok(Err(e)) => {
                warn!(gateway_id = %self.gateway_id, error = %e, "state refresh failed");
                return ControlFlow::Continue(());
            }
            Err(_) => {
                warn!(gateway_id = %self.gateway_id, "state refresh timed out");
                return ControlFlow::Continue(());
            }
        };

        let snapshot: HashMap<String, LiveState> = states
            .iter()
            .filter(|raw| wanted.contains(&raw.entity_id))
            .map(|raw| (raw.entity_id.clone(), LiveState::from(raw)))
            .collect();
        let entity_count = snapshot.len();
        debug!(gateway_id = %self.gateway_id, entity_count, "live states refreshed");

        self.values.send_replace(Arc::new(snapshot));
        self.events.publish(HubEvent::LiveStatesPublished {
            gateway_id: self.gateway_id,
            entity_count,
        });
        ControlFlow::Continue(())
    }
}

/// Resolves when the gateway is disconnected, reset to `unknown` or
/// removed (sender dropped). `connecting` is transient.
async fn ended(status: &mut watch::Receiver<ConnectionStatus>) {
    loop {
        if status.changed().await.is_err() {
            return;
        }
        if matches!(
            *status.borrow_and_update(),
            ConnectionStatus::Disconnected { .. } | ConnectionStatus::Unknown
        ) {
            return;
        }
    }
}
