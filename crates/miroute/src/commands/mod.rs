//! Command dispatch: bridges CLI args -> polling engine -> output formatting.

pub mod devices;
pub mod status;
pub mod util;
pub mod watch;

use crate::cli::{Command, GlobalOpts};
use crate::config::Config;
use crate::error::CliError;

/// Dispatch a parsed command to the appropriate handler.
pub async fn dispatch(cmd: Command, config: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Watch(args) => watch::handle(config, global, args).await,
        Command::Status => status::handle(config, global).await,
        Command::Devices(args) => devices::handle(config, global, args).await,
    }
}
