//! Profile resolution: config file + global flags -> a ready `Session`.
//!
//! This is the single boundary where CLI flags and TOML profiles cross
//! into core types. Core never sees either.

use std::sync::Arc;

use secrecy::SecretString;

use mycomize_api::BackendClient;
use mycomize_config::{
    Config, Profile, backend_url, config_path, load_config_or_default, profile_to_hub_config,
    resolve_token,
};
use mycomize_core::{
    BackendLinkSink, CoreError, DisconnectReason, Gateway, GatewayHub, GatewayId, HubConfig,
    ProbeFailure,
};

use crate::cli::GlobalOpts;
use crate::error::CliError;

const FALLBACK_USER: &str = "local";

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// The active profile with CLI flag overrides applied.
///
/// Without a stored profile, `--backend` alone is enough to build one.
pub fn effective_profile(global: &GlobalOpts, config: &Config) -> Result<(String, Profile), CliError> {
    let name = active_profile_name(global, config);
    let mut profile = match config.profiles.get(&name) {
        Some(stored) => stored.clone(),
        None => {
            let backend = global.backend.clone().ok_or_else(|| CliError::NoConfig {
                path: config_path().display().to_string(),
            })?;
            Profile {
                backend,
                ..Profile::default()
            }
        }
    };

    if let Some(ref backend) = global.backend {
        profile.backend.clone_from(backend);
    }
    if let Some(ref user) = global.user {
        profile.user_id.clone_from(user);
    }
    if global.insecure {
        profile.insecure = Some(true);
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }
    Ok((name, profile))
}

/// User id that namespaces local state. Works without any profile.
pub fn active_user(global: &GlobalOpts) -> String {
    if let Some(ref user) = global.user {
        return user.clone();
    }
    let config = load_config_or_default();
    let name = active_profile_name(global, &config);
    config
        .profiles
        .get(&name)
        .map(|p| p.user_id.trim().to_owned())
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| FALLBACK_USER.into())
}

// ── Session ──────────────────────────────────────────────────────────

/// Everything a backend-bound command needs.
pub struct Session {
    pub hub: GatewayHub,
    pub backend: Arc<BackendClient>,
    pub profile_name: String,
}

impl Session {
    pub fn open(global: &GlobalOpts) -> Result<Self, CliError> {
        Self::open_with(global, |_| {})
    }

    /// Open a session, letting the command adjust the hub config first.
    pub fn open_with(
        global: &GlobalOpts,
        tweak: impl FnOnce(&mut HubConfig),
    ) -> Result<Self, CliError> {
        let config = load_config_or_default();
        let (profile_name, profile) = effective_profile(global, &config)?;

        let token = match global.token {
            Some(ref token) => SecretString::from(token.clone()),
            None => resolve_token(&profile, &profile_name)?,
        };

        let mut hub_config = profile_to_hub_config(&profile, &config.defaults);
        tweak(&mut hub_config);

        let url = backend_url(&profile)?;
        let backend = BackendClient::from_token(url.as_str(), &token, &hub_config.transport())
            .map_err(CoreError::from)?;
        tracing::debug!(profile = %profile_name, backend = %url, "session opened");

        Ok(Self {
            hub: GatewayHub::new(hub_config),
            backend: Arc::new(backend),
            profile_name,
        })
    }

    /// Fetch one gateway from the backend.
    pub async fn gateway(&self, id: i64) -> Result<Gateway, CliError> {
        let record = self.backend.get_gateway(id).await.map_err(|e| {
            if e.is_not_found() {
                CliError::NotFound {
                    resource_type: "gateway".into(),
                    identifier: id.to_string(),
                    list_command: "gateways list".into(),
                }
            } else {
                CoreError::from(e).into()
            }
        })?;
        Ok(Gateway::from_record(record)?)
    }

    /// Fetch a gateway and probe it; fails unless it ends up connected.
    ///
    /// Each CLI invocation starts with an empty status board, so anything
    /// that reads the catalog or live values has to probe first.
    pub async fn connected_gateway(&self, id: i64) -> Result<Gateway, CliError> {
        let gateway = self.gateway(id).await?;
        let report = self.hub.probe(&gateway).await?;
        if let Some(failure) = report.failure {
            return Err(probe_error(gateway.id, failure));
        }
        Ok(gateway)
    }

    /// Load a gateway's links from the backend into the hub's link table.
    pub async fn sync_links(
        &self,
        sink: &BackendLinkSink,
        gateway_id: GatewayId,
    ) -> Result<(), CliError> {
        let records = sink.load_links(gateway_id).await?;
        self.hub.sync_links(gateway_id, records);
        Ok(())
    }
}

/// The CLI error for a probe that did not connect.
pub fn probe_error(gateway_id: GatewayId, failure: ProbeFailure) -> CliError {
    match failure.reason {
        DisconnectReason::Authentication => CliError::GatewayAuth {
            gateway_id: gateway_id.to_string(),
        },
        DisconnectReason::Network => CliError::GatewayUnreachable {
            gateway_id: gateway_id.to_string(),
            message: failure.message,
        },
    }
}
