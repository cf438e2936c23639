use std::collections::BTreeMap;

use serde::Serialize;

use super::FilterPreferences;
use crate::model::{Entity, GatewayId};
use crate::store::LinkTable;

/// Entities grouped by domain, each group sorted by display name.
pub type DomainGroups<'a> = BTreeMap<String, Vec<&'a Entity>>;

/// Entities grouped by gateway, then by domain.
pub type GatewayGroups<'a> = BTreeMap<GatewayId, DomainGroups<'a>>;

/// A pool split by whether each entity has a link.
#[derive(Debug, Default)]
pub struct Partition<'a> {
    pub linked: Vec<&'a Entity>,
    pub linkable: Vec<&'a Entity>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EntityCounts {
    pub linked: usize,
    pub linkable: usize,
}

pub fn partition<'a>(pool: &'a [Entity], links: &LinkTable) -> Partition<'a> {
    let (linked, linkable): (Vec<&Entity>, Vec<&Entity>) = pool
        .iter()
        .partition(|entity| links.is_linked(&entity.entity_ref()));
    Partition { linked, linkable }
}

pub fn counts(pool: &[Entity], links: &LinkTable) -> EntityCounts {
    let split = partition(pool, links);
    EntityCounts {
        linked: split.linked.len(),
        linkable: split.linkable.len(),
    }
}

/// Case-insensitive match on friendly name or raw id. An empty (or
/// whitespace-only) query matches everything.
pub fn matches_search(entity: &Entity, query: &str) -> bool {
    let query = query.trim();
    if query.is_empty() {
        return true;
    }
    let needle = query.to_lowercase();
    entity.entity_name.to_lowercase().contains(&needle)
        || entity
            .friendly_name
            .as_ref()
            .is_some_and(|name| name.to_lowercase().contains(&needle))
}

pub fn group_by_domain<'a>(entities: impl IntoIterator<Item = &'a Entity>) -> DomainGroups<'a> {
    let mut groups: DomainGroups<'a> = BTreeMap::new();
    for entity in entities {
        groups.entry(entity.domain.clone()).or_default().push(entity);
    }
    for group in groups.values_mut() {
        group.sort_by(|a, b| {
            a.display_name()
                .to_lowercase()
                .cmp(&b.display_name().to_lowercase())
                .then_with(|| a.entity_name.cmp(&b.entity_name))
        });
    }
    groups
}

pub fn group_linked<'a>(entities: impl IntoIterator<Item = &'a Entity>) -> GatewayGroups<'a> {
    let mut by_gateway: BTreeMap<GatewayId, Vec<&'a Entity>> = BTreeMap::new();
    for entity in entities {
        by_gateway.entry(entity.gateway_id).or_default().push(entity);
    }
    by_gateway
        .into_iter()
        .map(|(gateway_id, entities)| (gateway_id, group_by_domain(entities)))
        .collect()
}

/// Linked entities matching `query`, grouped by gateway then domain.
/// Filter preferences never hide a linked entity.
pub fn linked_view<'a>(pool: &'a [Entity], links: &LinkTable, query: &str) -> GatewayGroups<'a> {
    group_linked(
        partition(pool, links)
            .linked
            .into_iter()
            .filter(|e| matches_search(e, query)),
    )
}

/// Linkable entities passing `prefs` and `query`, grouped by domain.
pub fn linkable_view<'a>(
    pool: &'a [Entity],
    links: &LinkTable,
    prefs: &FilterPreferences,
    query: &str,
) -> DomainGroups<'a> {
    group_by_domain(
        partition(pool, links)
            .linkable
            .into_iter()
            .filter(|e| prefs.allows(e) && matches_search(e, query)),
    )
}
