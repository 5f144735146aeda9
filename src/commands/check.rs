//! Check command - compares a fresh menu with an existing file.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;

use isomenu::config::Config;
use isomenu::diff;

use super::generate::run_generation;

const DIFF_CONTEXT: usize = 3;

/// Execute the check command.
///
/// Prints a unified diff and fails when the file would change.
pub fn cmd_check(config: &Config, against: Option<&Path>) -> Result<()> {
    let Some(against) = against else {
        bail!("Nothing to compare against. Pass --against FILE or set ISOMENU_OUTPUT.");
    };
    let existing = fs::read_to_string(against)
        .with_context(|| format!("Failed to read {}", against.display()))?;

    let (_, generation) = run_generation(config)?;
    let name = against.display().to_string();
    match diff::unified(&name, "generated", &existing, &generation.document, DIFF_CONTEXT) {
        None => {
            println!("{} is up to date", name);
            Ok(())
        }
        Some(text) => {
            print!("{}", text);
            generation.report.print_summary();
            bail!("{} differs from the generated menu", name);
        }
    }
}
