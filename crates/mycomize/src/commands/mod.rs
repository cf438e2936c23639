//! Command dispatch: bridges CLI args -> hub calls -> output formatting.

pub mod config_cmd;
pub mod credential;
pub mod entities;
pub mod filters;
pub mod gateways;
pub mod links;
pub mod util;
pub mod watch;

use crate::cli::{Command, GlobalOpts};
use crate::config::Session;
use crate::error::CliError;

/// Dispatch a backend-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    // Watch tunes the poll interval before the hub exists.
    if let Command::Watch(args) = cmd {
        return watch::handle(args, global).await;
    }

    let session = Session::open(global)?;
    tracing::debug!(command = ?cmd, profile = %session.profile_name, "dispatching command");

    let result = match cmd {
        Command::Gateways(args) => gateways::handle(&session, args, global).await,
        Command::Entities(args) => entities::handle(&session, args, global).await,
        Command::Links(args) => links::handle(&session, args, global).await,
        Command::Watch(_)
        | Command::Config(_)
        | Command::Filters(_)
        | Command::Credential(_)
        | Command::Completions(_) => unreachable!("handled before dispatch"),
    };

    session.hub.shutdown().await;
    result
}
