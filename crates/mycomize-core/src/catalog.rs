// ── Entity catalog cache ──
//
// One entry per gateway, tagged with the credential fingerprint it was
// fetched under. A fingerprint mismatch discards the entry outright. Every
// discard bumps the gateway's generation; a fetch that started under an
// older generation is dropped on completion instead of being stored.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use mycomize_api::{GatewayClient, TransportConfig};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::connection::StatusBoard;
use crate::error::CoreError;
use crate::events::{EventBus, HubEvent};
use crate::fingerprint::CredentialFingerprint;
use crate::model::{Entity, Gateway, GatewayId};

/// A cached catalog.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub gateway_id: GatewayId,
    pub fingerprint: CredentialFingerprint,
    pub entities: Arc<Vec<Entity>>,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Default)]
struct Slot {
    entry: Option<CacheEntry>,
    generation: u64,
}

/// Fetches and caches the full entity list of each gateway.
pub struct EntityCatalogCache {
    board: Arc<StatusBoard>,
    events: EventBus,
    transport: TransportConfig,
    timeout: Duration,
    slots: Mutex<HashMap<GatewayId, Slot>>,
}

impl EntityCatalogCache {
    pub fn new(
        board: Arc<StatusBoard>,
        events: EventBus,
        transport: TransportConfig,
        timeout: Duration,
    ) -> Self {
        Self {
            board,
            events,
            transport,
            timeout,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch the catalog, serving from cache when the credentials are
    /// unchanged and `force_refresh` is false.
    pub async fn fetch_catalog(
        &self,
        gateway: &Gateway,
        force_refresh: bool,
    ) -> Result<Arc<Vec<Entity>>, CoreError> {
        self.fetch_catalog_until(gateway, force_refresh, &CancellationToken::new())
            .await
    }

    /// Like [`fetch_catalog`](Self::fetch_catalog), abandoned when `cancel`
    /// fires. A cancelled fetch never touches the cache.
    pub async fn fetch_catalog_until(
        &self,
        gateway: &Gateway,
        force_refresh: bool,
        cancel: &CancellationToken,
    ) -> Result<Arc<Vec<Entity>>, CoreError> {
        gateway.validate_credentials()?;
        let fingerprint = gateway.fingerprint();

        let generation = {
            let mut slots = self.lock();
            let slot = slots.entry(gateway.id).or_default();

            let stale = slot
                .entry
                .as_ref()
                .is_some_and(|entry| entry.fingerprint != fingerprint);
            if stale {
                info!(gateway_id = %gateway.id, %fingerprint, "credentials changed, discarding cached catalog");
                slot.entry = None;
                slot.generation += 1;
                self.events.publish(HubEvent::CatalogInvalidated {
                    gateway_id: gateway.id,
                });
            }

            if !self.board.is_verified(gateway.id, &fingerprint) {
                return Err(CoreError::NotProbed {
                    gateway_id: gateway.id,
                });
            }

            if !force_refresh {
                if let Some(entry) = &slot.entry {
                    debug!(gateway_id = %gateway.id, count = entry.entities.len(), "serving cached catalog");
                    return Ok(Arc::clone(&entry.entities));
                }
            }
            slot.generation
        };

        let entities = tokio::select! {
            () = cancel.cancelled() => {
                debug!(gateway_id = %gateway.id, "catalog fetch abandoned");
                return Err(CoreError::Cancelled);
            }
            result = self.fetch_remote(gateway) => result?,
        };

        let entities = Arc::new(entities);
        {
            let mut slots = self.lock();
            let current = slots.get_mut(&gateway.id);
            let Some(slot) = current.filter(|slot| slot.generation == generation) else {
                debug!(gateway_id = %gateway.id, "discarding catalog fetched under old credentials");
                return Err(CoreError::Superseded {
                    gateway_id: gateway.id,
                });
            };
            slot.entry = Some(CacheEntry {
                gateway_id: gateway.id,
                fingerprint,
                entities: Arc::clone(&entities),
                fetched_at: Utc::now(),
            });
        }

        info!(gateway_id = %gateway.id, count = entities.len(), "catalog refreshed");
        self.events.publish(HubEvent::CatalogRefreshed {
            gateway_id: gateway.id,
            entity_count: entities.len(),
        });
        Ok(entities)
    }

    async fn fetch_remote(&self, gateway: &Gateway) -> Result<Vec<Entity>, CoreError> {
        let client = GatewayClient::from_token(&gateway.base_url, &gateway.api_key, &self.transport)
            .map_err(|e| CoreError::from_gateway(gateway.id, e))?;

        let states = tokio::time::timeout(self.timeout, client.states())
            .await
            .map_err(|_| CoreError::Timeout {
                timeout_secs: self.timeout.as_secs(),
            })?
            .map_err(|e| CoreError::from_gateway(gateway.id, e))?;

        let mut entities: Vec<Entity> = states
            .iter()
            .map(|raw| Entity::from_state(gateway.id, raw))
            .collect();
        entities.sort_by(|a, b| a.entity_name.cmp(&b.entity_name));
        entities.dedup_by(|a, b| a.entity_name == b.entity_name);
        Ok(entities)
    }

    /// Current entry, if any, regardless of fingerprint.
    pub fn cached(&self, gateway_id: GatewayId) -> Option<CacheEntry> {
        self.lock()
            .get(&gateway_id)
            .and_then(|slot| slot.entry.clone())
    }

    /// Drop the entry and orphan every in-flight fetch for `gateway_id`.
    /// Called when credentials are edited.
    pub fn invalidate(&self, gateway_id: GatewayId) {
        {
            let mut slots = self.lock();
            let slot = slots.entry(gateway_id).or_default();
            slot.entry = None;
            slot.generation += 1;
        }
        debug!(%gateway_id, "catalog invalidated");
        self.events
            .publish(HubEvent::CatalogInvalidated { gateway_id });
    }

    /// Forget the gateway's catalog. In-flight fetches finish as
    /// `Superseded`; the generation survives so a re-added gateway with
    /// the same id cannot adopt them.
    pub fn remove(&self, gateway_id: GatewayId) {
        let mut slots = self.lock();
        if let Some(slot) = slots.get_mut(&gateway_id) {
            slot.entry = None;
            slot.generation += 1;
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<GatewayId, Slot>> {
        // The map is left consistent between statements, so a poisoned
        // lock is still usable.
        self.slots
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
