//! Link command handlers.

use std::sync::Arc;

use serde::Serialize;
use tabled::Tabled;

use mycomize_core::{
    BackendLinkSink, BulkOutcome, CoreError, GatewayId, GrowId, LinkRecord, LinkState,
};

use crate::cli::{GlobalOpts, LinksArgs, LinksCommand};
use crate::config::Session;
use crate::error::CliError;
use crate::output;

use super::entities::open_pool;
use super::util;

/// Upper bound for "all gateways" when no gateway is given.
const GATEWAY_PAGE: u32 = 1000;

// ── Views ───────────────────────────────────────────────────────────

#[derive(Tabled)]
struct LinkRow {
    #[tabled(rename = "Gateway")]
    gateway: String,
    #[tabled(rename = "Entity")]
    entity: String,
    #[tabled(rename = "Grow")]
    grow: String,
    #[tabled(rename = "Stage")]
    stage: String,
    #[tabled(rename = "State")]
    state: String,
}

impl From<&LinkRecord> for LinkRow {
    fn from(r: &LinkRecord) -> Self {
        Self {
            gateway: r.entity.gateway_id.to_string(),
            entity: r.entity.entity_name.clone(),
            grow: r.grow_id.to_string(),
            stage: r.stage.label().to_owned(),
            state: match r.state {
                LinkState::Active => "active",
                LinkState::PendingLink => "linking",
                LinkState::PendingUnlink => "unlinking",
            }
            .into(),
        }
    }
}

#[derive(Serialize)]
struct FailedItem {
    entity: String,
    error: String,
}

#[derive(Serialize)]
struct OutcomeView {
    succeeded: Vec<String>,
    failed: Vec<FailedItem>,
}

impl From<&BulkOutcome> for OutcomeView {
    fn from(outcome: &BulkOutcome) -> Self {
        Self {
            succeeded: outcome
                .succeeded
                .iter()
                .map(|e| e.entity_name.clone())
                .collect(),
            failed: outcome
                .errors
                .iter()
                .map(|f| FailedItem {
                    entity: f.entity.entity_name.clone(),
                    error: f.error.to_string(),
                })
                .collect(),
        }
    }
}

fn outcome_detail(view: &OutcomeView, verb: &str) -> String {
    let mut lines: Vec<String> = view
        .succeeded
        .iter()
        .map(|e| format!("✓ {verb} {e}"))
        .collect();
    lines.extend(
        view.failed
            .iter()
            .map(|f| format!("✗ {}: {}", f.entity, f.error)),
    );
    lines.join("\n")
}

/// Print per-item results, then fail if any item failed.
fn report(outcome: BulkOutcome, verb: &str, global: &GlobalOpts) -> Result<(), CliError> {
    let view = OutcomeView::from(&outcome);
    let out = output::render_single(
        &global.output,
        &view,
        |v| outcome_detail(v, verb),
        |v| v.succeeded.join("\n"),
    )?;
    output::print_output(&out, global.quiet);
    outcome.into_result()?;
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    session: &Session,
    args: LinksArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        LinksCommand::List {
            gateway,
            grow,
            stage,
        } => {
            let gateway_ids = match gateway {
                Some(id) => vec![id],
                None => session
                    .backend
                    .list_gateways(0, GATEWAY_PAGE)
                    .await
                    .map_err(CoreError::from)?
                    .into_iter()
                    .map(|g| g.id)
                    .collect(),
            };

            let sink = BackendLinkSink::new(Arc::clone(&session.backend));
            for id in gateway_ids {
                session.sync_links(&sink, GatewayId(id)).await?;
            }

            let table = session.hub.links();
            let mut records = match (grow, stage) {
                (Some(grow), Some(stage)) => table.for_stage(GrowId(grow), stage),
                (Some(grow), None) => table.for_grow(GrowId(grow)),
                _ => table.snapshot().as_ref().clone(),
            };
            records.sort_by(|a, b| a.entity.cmp(&b.entity));

            let out = output::render_list(
                &global.output,
                &records,
                |r| LinkRow::from(r),
                |r| r.entity.entity_name.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        LinksCommand::Add {
            gateway,
            entities,
            grow,
            stage,
        } => {
            let pool = open_pool(session, gateway, false).await?;
            let refs = util::entity_refs(gateway, &entities);
            for entity in &refs {
                let known = pool
                    .entities
                    .iter()
                    .any(|e| e.entity_name == entity.entity_name);
                if !known && !global.quiet {
                    eprintln!(
                        "warning: {} is not in the catalog of gateway {}",
                        entity.entity_name, pool.gateway.id
                    );
                }
            }

            let manager = session.hub.link_manager(pool.sink);
            let outcome = manager.link(&refs, GrowId(grow), stage).await?;
            report(outcome, "linked", global)
        }

        LinksCommand::Remove { gateway, entities } => {
            // Unlink needs only backend rows, not a reachable gateway.
            let sink = BackendLinkSink::new(Arc::clone(&session.backend));
            session.sync_links(&sink, GatewayId(gateway)).await?;

            let refs = util::entity_refs(gateway, &entities);
            let manager = session.hub.link_manager(sink);
            let outcome = manager.unlink(&refs).await?;
            report(outcome, "unlinked", global)
        }
    }
}
