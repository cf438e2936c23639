//! `watch`: stream live values of a gateway's linked entities.

use std::collections::HashMap;
use std::time::Duration;

use tabled::Tabled;

use mycomize_core::{Entity, LiveSnapshot, LiveState};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::config::Session;
use crate::error::CliError;
use crate::output;

use super::entities::open_pool;

#[derive(Tabled)]
struct LiveRow {
    #[tabled(rename = "Entity")]
    entity: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Updated")]
    updated: String,
}

fn rows(states: &[&LiveState], names: &HashMap<String, String>) -> Vec<LiveRow> {
    states
        .iter()
        .map(|s| LiveRow {
            entity: s.entity_name.clone(),
            name: names
                .get(&s.entity_name)
                .cloned()
                .unwrap_or_else(|| "-".into()),
            value: s.value.to_string(),
            updated: s
                .last_updated
                .map(|t| t.format("%H:%M:%S").to_string())
                .unwrap_or_else(|| "-".into()),
        })
        .collect()
}

fn render(
    snapshot: &LiveSnapshot,
    names: &HashMap<String, String>,
    global: &GlobalOpts,
) -> Result<String, CliError> {
    let mut states: Vec<&LiveState> = snapshot.values().collect();
    states.sort_by(|a, b| a.entity_name.cmp(&b.entity_name));

    match global.output {
        OutputFormat::Table => {
            let stamp = chrono::Local::now().format("%H:%M:%S");
            let table = output::render_table(&rows(&states, names));
            Ok(format!("── {stamp} ──\n{table}"))
        }
        // One document per refresh so the stream stays line-parseable.
        OutputFormat::Json | OutputFormat::JsonCompact => serde_json::to_string(&states)
            .map_err(|e| CliError::Render(e.to_string())),
        OutputFormat::Yaml => output::render_yaml(&states),
        OutputFormat::Plain => Ok(states
            .iter()
            .map(|s| format!("{}\t{}", s.entity_name, s.value))
            .collect::<Vec<_>>()
            .join("\n")),
    }
}

pub async fn handle(args: WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let interval: Option<Duration> = args.interval.as_deref().copied();
    if interval.is_some_and(|i| i.is_zero()) {
        return Err(CliError::Validation {
            field: "interval".into(),
            reason: "must be greater than zero".into(),
        });
    }

    let session = Session::open_with(global, |cfg| {
        if let Some(interval) = interval {
            cfg.state_poll_interval = interval;
        }
    })?;
    let result = stream(&session, &args, global).await;
    session.hub.shutdown().await;
    result
}

async fn stream(session: &Session, args: &WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let pool = open_pool(session, args.gateway, false).await?;
    let gateway_id = pool.gateway.id;

    let linked = session.hub.links().linked_names(gateway_id);
    if linked.is_empty() {
        if !global.quiet {
            eprintln!("No linked entities on gateway {gateway_id}");
        }
        return Ok(());
    }

    let names: HashMap<String, String> = pool
        .entities
        .iter()
        .filter(|e| linked.contains(&e.entity_name))
        .filter_map(|e: &Entity| {
            e.friendly_name
                .clone()
                .map(|name| (e.entity_name.clone(), name))
        })
        .collect();

    let mut values = session.hub.start_refresher(&pool.gateway).await?;
    if !global.quiet {
        eprintln!(
            "Watching gateway {gateway_id} every {} (Ctrl-C to stop)",
            humantime::format_duration(session.hub.config().state_poll_interval)
        );
    }

    let mut printed = 0usize;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = values.changed() => {
                if changed.is_err() {
                    // The refresher ended: the gateway disconnected or was reset.
                    let status = session.hub.status(gateway_id);
                    tracing::info!(%gateway_id, status = %status.label(), "refresher stopped");
                    return Err(CliError::NotConnected {
                        gateway_id: gateway_id.to_string(),
                    });
                }
                let snapshot = values.borrow_and_update().clone();
                println!("{}", render(&snapshot, &names, global)?);
                printed += 1;
                if args.count.is_some_and(|n| printed >= n) {
                    break;
                }
            }
        }
    }
    Ok(())
}
