//! Shared helpers for command handlers.

use std::io::IsTerminal;

use mycomize_config::{
    FileCredentialSlot, JsonFilePreferences, credential_slot_path, preferences_path,
};
use mycomize_core::{EntityRef, FilterPreferenceStore, GatewayId};

use crate::error::CliError;

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: message.into(),
        });
    }
    dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(prompt_err)
}

/// Map a dialoguer / interactive I/O failure into CliError.
pub fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

/// Read a secret without echoing it.
pub fn prompt_secret(label: &str) -> Result<String, CliError> {
    dialoguer::Password::new()
        .with_prompt(label)
        .interact()
        .map_err(prompt_err)
}

/// The user's filter preferences, backed by their JSON file.
pub fn preference_store(
    user_id: &str,
) -> Result<FilterPreferenceStore<JsonFilePreferences>, CliError> {
    let backend = JsonFilePreferences::new(preferences_path(user_id));
    Ok(FilterPreferenceStore::load(backend, user_id)?)
}

pub fn credential_slot() -> FileCredentialSlot {
    FileCredentialSlot::new(credential_slot_path())
}

/// Command-line entity ids -> refs on one gateway.
pub fn entity_refs(gateway: i64, names: &[String]) -> Vec<EntityRef> {
    names
        .iter()
        .map(|name| EntityRef::new(GatewayId(gateway), name.trim()))
        .collect()
}

/// `abcd…wxyz` for display; short keys are fully masked.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "****".into();
    }
    let head: String = chars.iter().take(4).collect();
    let tail: String = chars.iter().skip(chars.len() - 4).collect();
    format!("{head}…{tail}")
}
