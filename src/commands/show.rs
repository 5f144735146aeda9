//! Show command - displays information.

use anyhow::Result;

use isomenu::config::Config;

/// Show target for the show command.
pub enum ShowTarget {
    /// Show configuration
    Config,
}

/// Execute the show command.
pub fn cmd_show(target: ShowTarget, config: &Config) -> Result<()> {
    match target {
        ShowTarget::Config => config.print(),
    }
    Ok(())
}
