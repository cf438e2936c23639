// ── Hub events ──
//
// Push notifications for non-UI observers. Status and live values also
// have `watch` channels; events are the cheap "something changed" signal.

use tokio::sync::broadcast;
use tracing::trace;

use crate::model::{ConnectionStatus, EntityRef, GatewayId, GrowId};

const EVENT_CHANNEL_SIZE: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub enum HubEvent {
    StatusChanged {
        gateway_id: GatewayId,
        status: ConnectionStatus,
    },
    CatalogRefreshed {
        gateway_id: GatewayId,
        entity_count: usize,
    },
    /// The cached catalog was dropped (credential change or removal).
    CatalogInvalidated { gateway_id: GatewayId },
    /// Link records changed; consumers re-derive linked/linkable partitions.
    LinksChanged { entities: Vec<EntityRef> },
    /// Links dropped because their grow was deleted.
    GrowUnlinked { grow_id: GrowId, removed: usize },
    LiveStatesPublished {
        gateway_id: GatewayId,
        entity_count: usize,
    },
    GatewayRemoved { gateway_id: GatewayId },
}

/// Cloneable handle on the broadcast channel shared by all components.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<HubEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        Self { tx }
    }

    pub fn publish(&self, event: HubEvent) {
        // No subscribers is fine.
        if self.tx.send(event).is_err() {
            trace!("event dropped: no subscribers");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HubEvent> {
        self.tx.subscribe()
    }
}
