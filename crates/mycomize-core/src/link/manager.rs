use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::events::{EventBus, HubEvent};
use crate::model::{EntityRef, GrowId, Stage};
use crate::store::{LinkRecord, LinkState, LinkTable};

/// Where link decisions are persisted.
pub trait LinkSink: Send + Sync {
    fn link(
        &self,
        entity: &EntityRef,
        grow_id: GrowId,
        stage: Stage,
    ) -> impl Future<Output = Result<(), CoreError>> + Send;

    fn unlink(&self, entity: &EntityRef) -> impl Future<Output = Result<(), CoreError>> + Send;
}

/// One entity that could not be linked or unlinked.
#[derive(Debug)]
pub struct ItemFailure {
    pub entity: EntityRef,
    pub error: CoreError,
}

/// Aggregate result of a (possibly single-item) link or unlink.
#[derive(Debug, Default)]
pub struct BulkOutcome {
    pub succeeded: Vec<EntityRef>,
    pub failed: Vec<EntityRef>,
    pub errors: Vec<ItemFailure>,
}

impl BulkOutcome {
    /// Fully successful only when nothing failed.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    /// Collapse into a `Result` for callers that want `?`.
    ///
    /// An expired backend session wins over everything else so it can
    /// reach the session handler. A single-item failure returns that
    /// item's error; anything else becomes `PartialBulkFailure`.
    pub fn into_result(mut self) -> Result<Self, CoreError> {
        if self.is_success() {
            return Ok(self);
        }
        if let Some(pos) = self.errors.iter().position(|f| f.error.is_session_expired()) {
            return Err(self.errors.swap_remove(pos).error);
        }
        if self.total() == 1 {
            if let Some(failure) = self.errors.pop() {
                return Err(failure.error);
            }
        }
        Err(CoreError::PartialBulkFailure {
            succeeded: self.succeeded.len(),
            failed: self.failed.len(),
        })
    }

    fn record(&mut self, entity: EntityRef, result: Result<(), CoreError>) {
        match result {
            Ok(()) => self.succeeded.push(entity),
            Err(error) => {
                self.failed.push(entity.clone());
                self.errors.push(ItemFailure { entity, error });
            }
        }
    }
}

/// Link/unlink entities to a grow stage. Single and bulk share one path.
///
/// Best-effort per item: each entity is applied locally as pending,
/// submitted, then committed or rolled back independently of the others.
pub struct EntityLinkManager<S> {
    sink: S,
    table: Arc<LinkTable>,
    events: EventBus,
}

impl<S: LinkSink> EntityLinkManager<S> {
    pub fn new(sink: S, table: Arc<LinkTable>, events: EventBus) -> Self {
        Self {
            sink,
            table,
            events,
        }
    }

    pub fn table(&self) -> &Arc<LinkTable> {
        &self.table
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub async fn link(
        &self,
        entities: &[EntityRef],
        grow_id: GrowId,
        stage: Stage,
    ) -> Result<BulkOutcome, CoreError> {
        let entities = validate_entities(entities)?;
        if grow_id.0 <= 0 {
            return Err(CoreError::validation("grow_id", "a grow must be selected"));
        }

        let mut outcome = BulkOutcome::default();
        for entity in entities {
            let previous = self.table.upsert(LinkRecord {
                entity: entity.clone(),
                grow_id,
                stage,
                state: LinkState::PendingLink,
            });

            let result = self.sink.link(&entity, grow_id, stage).await;
            match &result {
                Ok(()) => {
                    self.table.set_state(&entity, LinkState::Active);
                    debug!(%entity, %grow_id, %stage, "linked");
                }
                Err(e) => {
                    warn!(%entity, error = %e, "link failed, rolling back");
                    self.table.restore(&entity, previous);
                }
            }
            outcome.record(entity, result);
        }

        self.finish("link", &outcome);
        Ok(outcome)
    }

    pub async fn unlink(&self, entities: &[EntityRef]) -> Result<BulkOutcome, CoreError> {
        let entities = validate_entities(entities)?;

        let mut outcome = BulkOutcome::default();
        for entity in entities {
            let previous = self.table.get(&entity);
            self.table.set_state(&entity, LinkState::PendingUnlink);

            let result = self.sink.unlink(&entity).await;
            match &result {
                Ok(()) => {
                    self.table.remove(&entity);
                    debug!(%entity, "unlinked");
                }
                Err(e) => {
                    warn!(%entity, error = %e, "unlink failed, rolling back");
                    self.table.restore(&entity, previous);
                }
            }
            outcome.record(entity, result);
        }

        self.finish("unlink", &outcome);
        Ok(outcome)
    }

    fn finish(&self, op: &str, outcome: &BulkOutcome) {
        info!(
            op,
            succeeded = outcome.succeeded.len(),
            failed = outcome.failed.len(),
            "link operation finished"
        );
        if !outcome.succeeded.is_empty() {
            self.events.publish(HubEvent::LinksChanged {
                entities: outcome.succeeded.clone(),
            });
        }
    }
}

/// Non-empty, no blank names, duplicates collapsed (first wins).
fn validate_entities(entities: &[EntityRef]) -> Result<Vec<EntityRef>, CoreError> {
    if entities.is_empty() {
        return Err(CoreError::validation(
            "entity_ids",
            "select at least one entity",
        ));
    }
    if entities.iter().any(|e| e.entity_name.trim().is_empty()) {
        return Err(CoreError::validation("entity_ids", "entity id is empty"));
    }

    let mut seen = BTreeSet::new();
    Ok(entities
        .iter()
        .filter(|e| seen.insert((*e).clone()))
        .cloned()
        .collect())
}
