//! Credential slot handlers: the writer side of the scan handoff.

use std::io::Read;

use mycomize_core::CredentialSlot;

use crate::cli::{CredentialArgs, CredentialCommand, GlobalOpts};
use crate::error::CliError;

use super::util;

pub fn handle(args: CredentialArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let slot = util::credential_slot();

    match args.command {
        CredentialCommand::Stash { value } => {
            let value = match value {
                Some(value) => value,
                None => {
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf)?;
                    buf
                }
            };
            let value = value.trim();
            if value.is_empty() {
                return Err(CliError::Validation {
                    field: "value".into(),
                    reason: "scanned value is empty".into(),
                });
            }

            slot.put(value)?;
            tracing::debug!(path = %slot.path().display(), "credential stashed");
            if !global.quiet {
                eprintln!("Scanned key stashed; apply it with: mycomize gateways update <ID> --scanned");
            }
            Ok(())
        }

        CredentialCommand::Clear => {
            slot.clear()?;
            if !global.quiet {
                eprintln!("Credential slot cleared");
            }
            Ok(())
        }
    }
}
