//! Command handlers.

pub mod config_cmd;
pub mod detect;
pub mod sites;
pub mod status;
pub mod system;

use unigate_core::ConnectionManager;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a connection-backed command to its handler.
pub async fn dispatch(
    command: Command,
    manager: &ConnectionManager,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match command {
        Command::Status => status::handle(manager, global).await,
        Command::Detect => detect::handle(manager, global).await,
        Command::Sites(args) => sites::handle(manager, args, global).await,
        Command::Health => system::health(manager, global).await,
        Command::Sysinfo => system::sysinfo(manager, global).await,
        // Handled before a manager is built.
        Command::Config(_) => unreachable!("config commands do not use a connection"),
    }
}
