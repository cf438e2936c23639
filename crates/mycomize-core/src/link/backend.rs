// Production link sink: the backend's per-entity link endpoints.
//
// Links hang off entity rows, so each entity needs a backend row id.
// Rows are looked up once per gateway and cached; an entity without a
// row is created on demand from whatever catalog metadata is known.

use std::sync::Arc;

use dashmap::DashMap;
use mycomize_api::BackendClient;
use mycomize_api::backend::{EntityCreate, EntityRecord, LinkRequest};
use tracing::{debug, warn};

use super::LinkSink;
use crate::error::CoreError;
use crate::model::{Entity, EntityRef, GatewayId, GrowId, Stage, domain_of};
use crate::store::LinkRecord;

pub struct BackendLinkSink {
    client: Arc<BackendClient>,
    /// Entity identity -> backend row id.
    rows: DashMap<EntityRef, i64>,
    /// Catalog metadata used when a row has to be created.
    known: DashMap<EntityRef, Entity>,
}

impl BackendLinkSink {
    pub fn new(client: Arc<BackendClient>) -> Self {
        Self {
            client,
            rows: DashMap::new(),
            known: DashMap::new(),
        }
    }

    pub fn client(&self) -> &Arc<BackendClient> {
        &self.client
    }

    /// Remember catalog metadata for entities that may need a row.
    pub fn remember(&self, entities: &[Entity]) {
        for entity in entities {
            self.known.insert(entity.entity_ref(), entity.clone());
        }
    }

    /// Load a gateway's entity rows and return their links.
    ///
    /// Also refreshes the row-id cache. Rows whose stage is not a known
    /// cultivation stage are skipped with a warning.
    pub async fn load_links(&self, gateway_id: GatewayId) -> Result<Vec<LinkRecord>, CoreError> {
        let rows = self.client.list_entities(gateway_id.0).await?;
        self.cache_rows(&rows);

        Ok(rows
            .iter()
            .filter_map(|row| {
                let grow_id = row.linked_grow_id?;
                let raw_stage = row.linked_stage.as_deref()?;
                match raw_stage.parse::<Stage>() {
                    Ok(stage) => Some(LinkRecord::active(
                        EntityRef::new(gateway_id, row.entity_name.clone()),
                        GrowId(grow_id),
                        stage,
                    )),
                    Err(_) => {
                        warn!(entity = %row.entity_name, stage = raw_stage, "ignoring link with unknown stage");
                        None
                    }
                }
            })
            .collect())
    }

    fn cache_rows(&self, rows: &[EntityRecord]) {
        for row in rows {
            self.rows.insert(
                EntityRef::new(GatewayId(row.gateway_id), row.entity_name.clone()),
                row.id,
            );
        }
    }

    async fn row_id(&self, entity: &EntityRef, create: bool) -> Result<i64, CoreError> {
        if let Some(id) = self.rows.get(entity) {
            return Ok(*id);
        }

        let rows = self.client.list_entities(entity.gateway_id.0).await?;
        self.cache_rows(&rows);
        if let Some(id) = self.rows.get(entity) {
            return Ok(*id);
        }

        if !create {
            return Err(CoreError::NotFound {
                entity_type: "entity".into(),
                identifier: entity.to_string(),
            });
        }

        let body = self.known.get(entity).map_or_else(
            || {
                let domain = domain_of(&entity.entity_name).to_owned();
                EntityCreate {
                    entity_name: entity.entity_name.clone(),
                    entity_type: domain.clone(),
                    friendly_name: None,
                    domain: Some(domain),
                    device_class: None,
                }
            },
            |known| EntityCreate {
                entity_name: known.entity_name.clone(),
                entity_type: known.domain.clone(),
                friendly_name: known.friendly_name.clone(),
                domain: Some(known.domain.clone()),
                device_class: known.device_class.clone(),
            },
        );

        debug!(%entity, "creating backend row before linking");
        let row = self.client.create_entity(entity.gateway_id.0, &body).await?;
        self.rows.insert(entity.clone(), row.id);
        Ok(row.id)
    }

    /// A 404 for a cached row id means the row vanished: report the
    /// entity instead of a bare URL, and forget the stale id.
    fn row_error(&self, entity: &EntityRef, err: mycomize_api::Error) -> CoreError {
        if err.is_not_found() {
            self.rows.remove(entity);
            CoreError::NotFound {
                entity_type: "entity".into(),
                identifier: entity.to_string(),
            }
        } else {
            err.into()
        }
    }
}

impl LinkSink for BackendLinkSink {
    async fn link(&self, entity: &EntityRef, grow_id: GrowId, stage: Stage) -> Result<(), CoreError> {
        let row_id = self.row_id(entity, true).await?;
        let body = LinkRequest {
            grow_id: grow_id.0,
            stage: stage.to_string(),
        };
        self.client
            .link_entity(entity.gateway_id.0, row_id, &body)
            .await
            .map_err(|e| self.row_error(entity, e))?;
        Ok(())
    }

    async fn unlink(&self, entity: &EntityRef) -> Result<(), CoreError> {
        let row_id = self.row_id(entity, false).await?;
        self.client
            .unlink_entity(entity.gateway_id.0, row_id)
            .await
            .map_err(|e| self.row_error(entity, e))?;
        Ok(())
    }
}
