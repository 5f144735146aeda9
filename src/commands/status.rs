//! Status command - reports whether the menu needs regenerating.

use anyhow::{bail, Result};
use std::path::Path;

use isomenu::config::Config;
use isomenu::images;
use isomenu::rebuild;

use super::generate::menu_inputs;

/// Execute the status command.
pub fn cmd_status(config: &Config, output: Option<&Path>) -> Result<()> {
    let Some(output) = output else {
        bail!("No output file. Pass --output FILE or set ISOMENU_OUTPUT.");
    };
    let images = images::scan_images(&config.images_dir)?;
    let status = rebuild::menu_needs_regenerate(output, &menu_inputs(config, &images));

    println!("Images:  {} in {}", images.len(), config.images_dir.display());
    println!("Menu:    {} ({})", output.display(), status);
    Ok(())
}
