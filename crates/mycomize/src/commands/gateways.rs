//! Gateway command handlers.

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tabled::Tabled;

use mycomize_core::{
    ConnectionStatus, CoreError, CredentialHandoff, Gateway, GatewayForm, GatewayId, ProbeReport,
};

use crate::cli::{GatewaysArgs, GatewaysCommand, GlobalOpts};
use crate::config::{Session, probe_error};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Views ───────────────────────────────────────────────────────────

/// Serializable gateway with the key masked.
#[derive(Serialize)]
struct GatewayView {
    id: GatewayId,
    name: String,
    kind: String,
    base_url: String,
    api_key: String,
    description: Option<String>,
    is_active: bool,
    created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<ConnectionStatus>,
}

impl GatewayView {
    fn new(gateway: &Gateway, status: Option<ConnectionStatus>) -> Self {
        Self {
            id: gateway.id,
            name: gateway.name.clone(),
            kind: gateway.kind.to_string(),
            base_url: gateway.base_url.clone(),
            api_key: util::mask_secret(gateway.api_key.expose_secret()),
            description: gateway.description.clone(),
            is_active: gateway.is_active,
            created_at: gateway.created_at.map(|t| t.format("%Y-%m-%d %H:%M").to_string()),
            status,
        }
    }
}

#[derive(Tabled)]
struct GatewayRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "URL")]
    url: String,
    #[tabled(rename = "Active")]
    active: String,
    #[tabled(rename = "Created")]
    created: String,
}

impl From<&GatewayView> for GatewayRow {
    fn from(g: &GatewayView) -> Self {
        Self {
            id: g.id.to_string(),
            name: g.name.clone(),
            kind: g.kind.clone(),
            url: g.base_url.clone(),
            active: if g.is_active { "yes" } else { "no" }.into(),
            created: g.created_at.clone().unwrap_or_default(),
        }
    }
}

fn detail(g: &GatewayView, color: bool) -> String {
    let mut lines = vec![
        format!("ID:          {}", g.id),
        format!("Name:        {}", g.name),
        format!("Kind:        {}", g.kind),
        format!("URL:         {}", g.base_url),
        format!("API key:     {}", g.api_key),
        format!("Description: {}", g.description.as_deref().unwrap_or("-")),
        format!("Active:      {}", if g.is_active { "yes" } else { "no" }),
        format!("Created:     {}", g.created_at.as_deref().unwrap_or("-")),
    ];
    if let Some(ref status) = g.status {
        lines.push(format!("Status:      {}", output::status_label(status, color)));
    }
    lines.join("\n")
}

fn report_detail(r: &ProbeReport, color: bool) -> String {
    let mut lines = vec![
        format!("Gateway:  {}", r.gateway_id),
        format!("Status:   {}", output::status_label(&r.status, color)),
    ];
    if let Some(ms) = r.latency_ms {
        lines.push(format!("Latency:  {ms} ms"));
    }
    if let Some(ref v) = r.version {
        lines.push(format!("Version:  {v}"));
    }
    if let Some(ref failure) = r.failure {
        lines.push(format!("Error:    {}", failure.message));
    }
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

#[allow(clippy::too_many_lines)]
pub async fn handle(
    session: &Session,
    args: GatewaysArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let color = output::should_color(&global.color);

    match args.command {
        GatewaysCommand::List(list) => {
            let records = session
                .backend
                .list_gateways(list.skip, list.limit)
                .await
                .map_err(CoreError::from)?;
            let views = records
                .into_iter()
                .map(|r| Gateway::from_record(r).map(|g| GatewayView::new(&g, None)))
                .collect::<Result<Vec<_>, _>>()?;

            let out = output::render_list(&global.output, &views, |g| GatewayRow::from(g), |g| {
                g.id.to_string()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        GatewaysCommand::Show { id, probe } => {
            let gateway = session.gateway(id).await?;
            let status = if probe {
                Some(session.hub.probe(&gateway).await?.status)
            } else {
                None
            };
            let view = GatewayView::new(&gateway, status);
            let out = output::render_single(
                &global.output,
                &view,
                |g| detail(g, color),
                |g| g.id.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        GatewaysCommand::Create {
            name,
            url,
            key,
            description,
            no_probe,
        } => {
            let key = match key {
                Some(key) => key,
                None => util::prompt_secret("Gateway access token")?,
            };
            let form = GatewayForm {
                name,
                base_url: url,
                api_key: SecretString::from(key),
                description,
                ..GatewayForm::default()
            };
            form.validate()?;

            let record = session
                .backend
                .create_gateway(&form.to_create())
                .await
                .map_err(CoreError::from)?;
            let gateway = Gateway::from_record(record)?;
            if !global.quiet {
                eprintln!("Gateway {} created", gateway.id);
            }

            let status = if no_probe {
                None
            } else {
                Some(session.hub.probe(&gateway).await?.status)
            };
            let view = GatewayView::new(&gateway, status);
            let out = output::render_single(
                &global.output,
                &view,
                |g| detail(g, color),
                |g| g.id.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        GatewaysCommand::Update {
            id,
            name,
            url,
            key,
            description,
            scanned,
        } => {
            let current = session.gateway(id).await?;

            // The key field starts empty on edit; blank means "keep".
            let mut form = GatewayForm {
                api_key: SecretString::from(String::new()),
                ..GatewayForm::from_gateway(&current)
            };
            if let Some(name) = name {
                form.name = name;
            }
            if let Some(url) = url {
                form.base_url = url;
            }
            if let Some(description) = description {
                form.description = Some(description);
            }
            if let Some(key) = key {
                form.api_key = SecretString::from(key);
            }
            if scanned && !CredentialHandoff::new(util::credential_slot()).on_resume(&mut form) {
                return Err(CliError::Validation {
                    field: "scanned".into(),
                    reason: "no scanned credential is waiting; run `mycomize credential stash` first"
                        .into(),
                });
            }

            let mut check = form.clone();
            if check.api_key.expose_secret().trim().is_empty() {
                check.api_key = current.api_key.clone();
            }
            check.validate()?;

            let body = form.to_update(&current);
            let credentials_changed = body.api_url.is_some() || body.api_key.is_some();
            if body.name.is_none() && body.description.is_none() && !credentials_changed {
                if !global.quiet {
                    eprintln!("Nothing to change");
                }
                return Ok(());
            }

            let record = session
                .backend
                .update_gateway(id, &body)
                .await
                .map_err(CoreError::from)?;
            let updated = Gateway::from_record(record)?;

            let status = if credentials_changed {
                session.hub.credentials_changed(updated.id).await;
                Some(session.hub.probe(&updated).await?.status)
            } else {
                None
            };
            if !global.quiet {
                eprintln!("Gateway {id} updated");
            }

            let view = GatewayView::new(&updated, status);
            let out = output::render_single(
                &global.output,
                &view,
                |g| detail(g, color),
                |g| g.id.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        GatewaysCommand::Delete { id } => {
            let gateway = session.gateway(id).await?;
            if !util::confirm(
                &format!(
                    "Delete gateway '{}'? Its entities and links are removed too.",
                    gateway.name
                ),
                global.yes,
            )? {
                return Ok(());
            }
            session
                .backend
                .delete_gateway(id)
                .await
                .map_err(CoreError::from)?;
            session.hub.remove_gateway(gateway.id).await;
            if !global.quiet {
                eprintln!("Gateway {id} deleted");
            }
            Ok(())
        }

        GatewaysCommand::Probe { id } => {
            let gateway = session.gateway(id).await?;
            let report = session.hub.probe(&gateway).await?;

            let out = output::render_single(
                &global.output,
                &report,
                |r| report_detail(r, color),
                |r| r.status.label().to_owned(),
            )?;
            output::print_output(&out, global.quiet);

            match report.failure {
                Some(failure) => Err(probe_error(gateway.id, failure)),
                None => Ok(()),
            }
        }
    }
}
