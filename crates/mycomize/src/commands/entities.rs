//! Entity catalog command handlers.

use std::sync::Arc;

use serde::Serialize;
use tabled::Tabled;

use mycomize_core::filter::{self, DomainGroups, GatewayGroups};
use mycomize_core::{BackendLinkSink, Entity, Gateway, GatewayId, GrowId, LinkTable, Stage};

use crate::cli::{CatalogArgs, EntitiesArgs, EntitiesCommand, GlobalOpts};
use crate::config::{self, Session};
use crate::error::CliError;
use crate::output;

use super::util;

/// A probed gateway, its catalog, and its links loaded into the hub.
pub struct Pool {
    pub gateway: Gateway,
    pub entities: Arc<Vec<Entity>>,
    pub sink: BackendLinkSink,
}

/// Probe, fetch the catalog, and sync links for one gateway.
pub async fn open_pool(session: &Session, gateway: i64, refresh: bool) -> Result<Pool, CliError> {
    let gateway = session.connected_gateway(gateway).await?;
    let entities = session.hub.catalog(&gateway, refresh).await?;

    let sink = BackendLinkSink::new(Arc::clone(&session.backend));
    sink.remember(&entities);
    session.sync_links(&sink, gateway.id).await?;

    Ok(Pool {
        gateway,
        entities,
        sink,
    })
}

// ── Views ───────────────────────────────────────────────────────────

#[derive(Serialize)]
struct EntityView<'a> {
    gateway_id: GatewayId,
    entity_name: &'a str,
    domain: &'a str,
    friendly_name: Option<&'a str>,
    device_class: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    grow_id: Option<GrowId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stage: Option<Stage>,
}

impl<'a> EntityView<'a> {
    fn new(entity: &'a Entity, links: &LinkTable) -> Self {
        let link = links.get(&entity.entity_ref());
        Self {
            gateway_id: entity.gateway_id,
            entity_name: &entity.entity_name,
            domain: &entity.domain,
            friendly_name: entity.friendly_name.as_deref(),
            device_class: entity.device_class.as_deref(),
            grow_id: link.as_ref().map(|l| l.grow_id),
            stage: link.map(|l| l.stage),
        }
    }
}

#[derive(Tabled)]
struct EntityRow {
    #[tabled(rename = "Domain")]
    domain: String,
    #[tabled(rename = "Entity")]
    entity: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Class")]
    class: String,
}

impl From<&EntityView<'_>> for EntityRow {
    fn from(e: &EntityView<'_>) -> Self {
        Self {
            domain: e.domain.to_owned(),
            entity: e.entity_name.to_owned(),
            name: e.friendly_name.unwrap_or("-").to_owned(),
            class: e.device_class.unwrap_or("-").to_owned(),
        }
    }
}

#[derive(Tabled)]
struct LinkedRow {
    #[tabled(rename = "Gateway")]
    gateway: String,
    #[tabled(rename = "Domain")]
    domain: String,
    #[tabled(rename = "Entity")]
    entity: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Grow")]
    grow: String,
    #[tabled(rename = "Stage")]
    stage: String,
}

impl From<&EntityView<'_>> for LinkedRow {
    fn from(e: &EntityView<'_>) -> Self {
        Self {
            gateway: e.gateway_id.to_string(),
            domain: e.domain.to_owned(),
            entity: e.entity_name.to_owned(),
            name: e.friendly_name.unwrap_or("-").to_owned(),
            grow: e.grow_id.map(|g| g.to_string()).unwrap_or_default(),
            stage: e.stage.map(|s| s.label().to_owned()).unwrap_or_default(),
        }
    }
}

fn flatten_domains<'a>(groups: &DomainGroups<'a>, links: &LinkTable) -> Vec<EntityView<'a>> {
    groups
        .values()
        .flatten()
        .map(|e| EntityView::new(e, links))
        .collect()
}

fn flatten_gateways<'a>(groups: &GatewayGroups<'a>, links: &LinkTable) -> Vec<EntityView<'a>> {
    groups
        .values()
        .flat_map(|domains| flatten_domains(domains, links))
        .collect()
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    session: &Session,
    args: EntitiesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        EntitiesCommand::Linkable(CatalogArgs {
            gateway,
            search,
            refresh,
        }) => {
            let pool = open_pool(session, gateway, refresh).await?;
            let prefs = util::preference_store(&config::active_user(global))?.current();
            let links = session.hub.links();

            let groups = filter::linkable_view(&pool.entities, links, &prefs, &search);
            let views = flatten_domains(&groups, links);
            print_entities(global, &views, pool.entities.is_empty(), |e| {
                EntityRow::from(e)
            })
        }

        EntitiesCommand::Linked(CatalogArgs {
            gateway,
            search,
            refresh,
        }) => {
            let pool = open_pool(session, gateway, refresh).await?;
            let links = session.hub.links();

            let groups = filter::linked_view(&pool.entities, links, &search);
            let views = flatten_gateways(&groups, links);
            print_entities(global, &views, pool.entities.is_empty(), |e| {
                LinkedRow::from(e)
            })
        }

        EntitiesCommand::Counts { gateway } => {
            let pool = open_pool(session, gateway, false).await?;
            let counts = filter::counts(&pool.entities, session.hub.links());
            let out = output::render_single(
                &global.output,
                &counts,
                |c| format!("Linked:   {}\nLinkable: {}", c.linked, c.linkable),
                |c| format!("{} {}", c.linked, c.linkable),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}

fn print_entities<R: Tabled>(
    global: &GlobalOpts,
    views: &[EntityView<'_>],
    catalog_empty: bool,
    to_row: impl Fn(&EntityView<'_>) -> R,
) -> Result<(), CliError> {
    if catalog_empty && matches!(global.output, crate::cli::OutputFormat::Table) {
        if !global.quiet {
            eprintln!("No entities available on this gateway");
        }
        return Ok(());
    }
    let out = output::render_list(&global.output, views, to_row, |e| {
        e.entity_name.to_owned()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}
