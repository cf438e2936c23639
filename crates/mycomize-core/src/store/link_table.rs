// ── Reactive link table ──
//
// Arena of link records keyed by entity identity. At most one record per
// entity, so re-linking replaces instead of duplicating. Every mutation
// rebuilds the snapshot that `watch` subscribers receive.

use std::collections::BTreeSet;
use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::watch;

use crate::model::{EntityRef, GatewayId, GrowId, Stage};

/// Lifecycle of a record under optimistic updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkState {
    /// Confirmed by the backend.
    Active,
    /// Applied locally; the link request is in flight.
    PendingLink,
    /// Still linked; the unlink request is in flight.
    PendingUnlink,
}

impl LinkState {
    pub fn is_pending(self) -> bool {
        !matches!(self, Self::Active)
    }
}

/// One row of the join relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkRecord {
    pub entity: EntityRef,
    pub grow_id: GrowId,
    pub stage: Stage,
    pub state: LinkState,
}

impl LinkRecord {
    pub fn active(entity: EntityRef, grow_id: GrowId, stage: Stage) -> Self {
        Self {
            entity,
            grow_id,
            stage,
            state: LinkState::Active,
        }
    }
}

/// Concurrent, observable link storage.
pub struct LinkTable {
    by_entity: DashMap<EntityRef, LinkRecord>,

    /// Version counter, bumped on every mutation.
    version: watch::Sender<u64>,

    /// Sorted snapshot, rebuilt on mutation.
    snapshot: watch::Sender<Arc<Vec<LinkRecord>>>,
}

impl Default for LinkTable {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkTable {
    pub fn new() -> Self {
        let (version, _) = watch::channel(0u64);
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));

        Self {
            by_entity: DashMap::new(),
            version,
            snapshot,
        }
    }

    /// Insert or replace the record for `record.entity`. Returns the
    /// record it replaced.
    pub fn upsert(&self, record: LinkRecord) -> Option<LinkRecord> {
        let previous = self.by_entity.insert(record.entity.clone(), record);
        self.changed();
        previous
    }

    pub fn remove(&self, entity: &EntityRef) -> Option<LinkRecord> {
        let removed = self.by_entity.remove(entity).map(|(_, v)| v);
        if removed.is_some() {
            self.changed();
        }
        removed
    }

    /// Put back what was there before an optimistic change.
    pub fn restore(&self, entity: &EntityRef, previous: Option<LinkRecord>) {
        match previous {
            Some(record) => {
                self.upsert(record);
            }
            None => {
                self.remove(entity);
            }
        }
    }

    /// Change the state of an existing record. Returns `false` if absent.
    pub fn set_state(&self, entity: &EntityRef, state: LinkState) -> bool {
        let updated = match self.by_entity.get_mut(entity) {
            Some(mut record) => {
                record.state = state;
                true
            }
            None => false,
        };
        if updated {
            self.changed();
        }
        updated
    }

    pub fn get(&self, entity: &EntityRef) -> Option<LinkRecord> {
        self.by_entity.get(entity).map(|r| r.value().clone())
    }

    pub fn is_linked(&self, entity: &EntityRef) -> bool {
        self.by_entity.contains_key(entity)
    }

    pub fn for_gateway(&self, gateway_id: GatewayId) -> Vec<LinkRecord> {
        self.collect(|r| r.entity.gateway_id == gateway_id)
    }

    pub fn for_grow(&self, grow_id: GrowId) -> Vec<LinkRecord> {
        self.collect(|r| r.grow_id == grow_id)
    }

    pub fn for_stage(&self, grow_id: GrowId, stage: Stage) -> Vec<LinkRecord> {
        self.collect(|r| r.grow_id == grow_id && r.stage == stage)
    }

    /// Raw entity ids linked under `gateway_id`.
    pub fn linked_names(&self, gateway_id: GatewayId) -> BTreeSet<String> {
        self.by_entity
            .iter()
            .filter(|r| r.key().gateway_id == gateway_id)
            .map(|r| r.key().entity_name.clone())
            .collect()
    }

    /// Replace every record of `gateway_id` with `records`, keeping
    /// records that are mid-flight so a sync cannot undo an optimistic
    /// change before its request resolves.
    pub fn replace_gateway(&self, gateway_id: GatewayId, records: Vec<LinkRecord>) {
        let incoming: BTreeSet<EntityRef> = records.iter().map(|r| r.entity.clone()).collect();
        self.by_entity.retain(|key, record| {
            key.gateway_id != gateway_id || incoming.contains(key) || record.state.is_pending()
        });
        for record in records {
            let pending = self
                .by_entity
                .get(&record.entity)
                .is_some_and(|r| r.state.is_pending());
            if !pending {
                self.by_entity.insert(record.entity.clone(), record);
            }
        }
        self.changed();
    }

    /// Grow deleted: drop every link pointing at it.
    pub fn remove_grow(&self, grow_id: GrowId) -> usize {
        self.remove_where(|r| r.grow_id == grow_id)
    }

    /// Gateway deleted: drop every link of its entities.
    pub fn remove_gateway(&self, gateway_id: GatewayId) -> usize {
        self.remove_where(|r| r.entity.gateway_id == gateway_id)
    }

    pub fn snapshot(&self) -> Arc<Vec<LinkRecord>> {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<LinkRecord>>> {
        self.snapshot.subscribe()
    }

    pub fn version(&self) -> u64 {
        *self.version.borrow()
    }

    pub fn len(&self) -> usize {
        self.by_entity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_entity.is_empty()
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn collect(&self, pred: impl Fn(&LinkRecord) -> bool) -> Vec<LinkRecord> {
        let mut out: Vec<LinkRecord> = self
            .by_entity
            .iter()
            .filter(|r| pred(r.value()))
            .map(|r| r.value().clone())
            .collect();
        out.sort_by(|a, b| a.entity.cmp(&b.entity));
        out
    }

    fn remove_where(&self, pred: impl Fn(&LinkRecord) -> bool) -> usize {
        let before = self.by_entity.len();
        self.by_entity.retain(|_, record| !pred(record));
        let removed = before - self.by_entity.len();
        if removed > 0 {
            self.changed();
        }
        removed
    }

    fn changed(&self) {
        let mut values: Vec<LinkRecord> =
            self.by_entity.iter().map(|r| r.value().clone()).collect();
        values.sort_by(|a, b| a.entity.cmp(&b.entity));
        // `send_modify` updates unconditionally, even with zero receivers.
        self.snapshot.send_modify(|snap| *snap = Arc::new(values));
        self.version.send_modify(|v| *v += 1);
    }
}
