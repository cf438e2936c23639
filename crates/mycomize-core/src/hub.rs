// ── Gateway hub ──
//
// Facade that wires the components to one shared event bus, status board
// and link table, and owns the per-gateway refresher tasks. Every
// component can also be constructed on its own; the hub only saves the
// wiring.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::catalog::{CacheEntry, EntityCatalogCache};
use crate::config::HubConfig;
use crate::connection::{ConnectionProbe, ProbeReport, StatusBoard};
use crate::error::CoreError;
use crate::events::{EventBus, HubEvent};
use crate::link::{EntityLinkManager, LinkSink};
use crate::model::{ConnectionStatus, Entity, Gateway, GatewayId, GrowId};
use crate::refresher::{LiveSnapshot, RefresherHandle, StateRefresher};
use crate::store::{LinkRecord, LinkTable};

/// Cheaply cloneable entry point for consumers.
#[derive(Clone)]
pub struct GatewayHub {
    inner: Arc<HubInner>,
}

struct HubInner {
    config: HubConfig,
    events: EventBus,
    board: Arc<StatusBoard>,
    probe: ConnectionProbe,
    catalog: EntityCatalogCache,
    links: Arc<LinkTable>,
    refresher: StateRefresher,
    refreshers: Mutex<HashMap<GatewayId, RefresherHandle>>,
    /// Parent of every fetch and refresher; cancelled on shutdown.
    cancel: CancellationToken,
}

impl GatewayHub {
    pub fn new(config: HubConfig) -> Self {
        let events = EventBus::new();
        let board = Arc::new(StatusBoard::new(events.clone()));
        let transport = config.transport();

        let probe = ConnectionProbe::new(
            Arc::clone(&board),
            transport.clone(),
            config.probe_timeout,
        );
        let catalog = EntityCatalogCache::new(
            Arc::clone(&board),
            events.clone(),
            transport.clone(),
            config.catalog_timeout,
        );
        let refresher = StateRefresher::new(
            Arc::clone(&board),
            events.clone(),
            transport,
            config.state_poll_interval,
            config.catalog_timeout,
        );

        Self {
            inner: Arc::new(HubInner {
                config,
                events,
                board,
                probe,
                catalog,
                links: Arc::new(LinkTable::new()),
                refresher,
                refreshers: Mutex::new(HashMap::new()),
                cancel: CancellationToken::new(),
            }),
        }
    }

    pub fn config(&self) -> &HubConfig {
        &self.inner.config
    }

    /// Subscribe to hub events.
    pub fn events(&self) -> broadcast::Receiver<HubEvent> {
        self.inner.events.subscribe()
    }

    // ── Connection ───────────────────────────────────────────────────

    pub fn status(&self, gateway_id: GatewayId) -> ConnectionStatus {
        self.inner.board.status(gateway_id)
    }

    pub fn status_watch(&self, gateway_id: GatewayId) -> watch::Receiver<ConnectionStatus> {
        self.inner.board.subscribe(gateway_id)
    }

    pub async fn probe(&self, gateway: &Gateway) -> Result<ProbeReport, CoreError> {
        self.inner.probe.probe(gateway).await
    }

    /// The gateway's URL or API key was edited: forget its verification
    /// and cached catalog, and stop polling it until it is probed again.
    pub async fn credentials_changed(&self, gateway_id: GatewayId) {
        info!(%gateway_id, "gateway credentials changed");
        self.inner.board.reset(gateway_id);
        self.inner.catalog.invalidate(gateway_id);
        self.stop_refresher(gateway_id).await;
    }

    // ── Catalog ──────────────────────────────────────────────────────

    pub async fn catalog(
        &self,
        gateway: &Gateway,
        force_refresh: bool,
    ) -> Result<Arc<Vec<Entity>>, CoreError> {
        self.catalog_until(gateway, force_refresh, &self.inner.cancel.child_token())
            .await
    }

    /// Catalog fetch tied to a caller-owned token, e.g. a screen that may
    /// be torn down before the fetch completes.
    pub async fn catalog_until(
        &self,
        gateway: &Gateway,
        force_refresh: bool,
        cancel: &CancellationToken,
    ) -> Result<Arc<Vec<Entity>>, CoreError> {
        self.inner
            .catalog
            .fetch_catalog_until(gateway, force_refresh, cancel)
            .await
    }

    pub fn cached_catalog(&self, gateway_id: GatewayId) -> Option<CacheEntry> {
        self.inner.catalog.cached(gateway_id)
    }

    // ── Links ────────────────────────────────────────────────────────

    pub fn links(&self) -> &Arc<LinkTable> {
        &self.inner.links
    }

    /// A link manager writing through `sink` into the hub's link table.
    pub fn link_manager<S: LinkSink>(&self, sink: S) -> EntityLinkManager<S> {
        EntityLinkManager::new(sink, Arc::clone(&self.inner.links), self.inner.events.clone())
    }

    /// Replace the gateway's links with rows loaded from the backend.
    pub fn sync_links(&self, gateway_id: GatewayId, records: Vec<LinkRecord>) {
        let entities = records.iter().map(|r| r.entity.clone()).collect();
        debug!(%gateway_id, count = records.len(), "syncing links from backend");
        self.inner.links.replace_gateway(gateway_id, records);
        self.inner
            .events
            .publish(HubEvent::LinksChanged { entities });
    }

    /// A grow was deleted elsewhere; drop its links.
    pub fn grow_deleted(&self, grow_id: GrowId) -> usize {
        let removed = self.inner.links.remove_grow(grow_id);
        if removed > 0 {
            info!(%grow_id, removed, "dropped links of deleted grow");
            self.inner
                .events
                .publish(HubEvent::GrowUnlinked { grow_id, removed });
        }
        removed
    }

    // ── Live state ───────────────────────────────────────────────────

    /// Start (or restart) polling live values for the gateway's linked
    /// entities. Requires the gateway to be `connected`.
    pub async fn start_refresher(
        &self,
        gateway: &Gateway,
    ) -> Result<watch::Receiver<LiveSnapshot>, CoreError> {
        let handle =
            self.inner
                .refresher
                .spawn(gateway, self.inner.links.subscribe(), &self.inner.cancel)?;
        let values = handle.values();

        let previous = self.inner.refreshers.lock().await.insert(gateway.id, handle);
        if let Some(previous) = previous {
            previous.stop().await;
        }
        Ok(values)
    }

    pub async fn stop_refresher(&self, gateway_id: GatewayId) {
        let handle = self.inner.refreshers.lock().await.remove(&gateway_id);
        if let Some(handle) = handle {
            handle.stop().await;
        }
    }

    pub async fn is_refreshing(&self, gateway_id: GatewayId) -> bool {
        self.inner
            .refreshers
            .lock()
            .await
            .get(&gateway_id)
            .is_some_and(RefresherHandle::is_running)
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Forget everything about a deleted gateway.
    pub async fn remove_gateway(&self, gateway_id: GatewayId) {
        self.stop_refresher(gateway_id).await;
        self.inner.catalog.remove(gateway_id);
        let unlinked = self.inner.links.remove_gateway(gateway_id);
        self.inner.board.remove(gateway_id);
        info!(%gateway_id, unlinked, "gateway removed");
        self.inner
            .events
            .publish(HubEvent::GatewayRemoved { gateway_id });
    }

    /// Cancel in-flight fetches and stop every refresher.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        let handles: Vec<RefresherHandle> = self
            .inner
            .refreshers
            .lock()
            .await
            .drain()
            .map(|(_, h)| h)
            .collect();
        for handle in handles {
            handle.stop().await;
        }
        debug!("gateway hub shut down");
    }
}
