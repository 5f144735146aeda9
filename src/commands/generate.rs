//! Generate command - writes the GRUB menu.

use anyhow::{Context, Result};
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use isomenu::config::Config;
use isomenu::generate::{self, Generation};
use isomenu::images::{self, DiskImage};
use isomenu::overrides::OverrideTable;
use isomenu::rebuild::{self, MenuInputs};

/// Scan the images directory and render the menu for the current inputs.
pub(crate) fn run_generation(config: &Config) -> Result<(Vec<DiskImage>, Generation)> {
    let images = images::scan_images(&config.images_dir)?;
    let overrides = OverrideTable::load_or_empty(&config.overrides)
        .with_context(|| format!("Failed to load {}", config.overrides.display()))?;
    let settings = config
        .menu_settings()
        .with_context(|| format!("Failed to read footer {}", config.footer.display()))?;
    let generation = generate::generate(&images, &overrides, &settings);
    Ok((images, generation))
}

pub(crate) fn menu_inputs<'a>(config: &'a Config, images: &'a [DiskImage]) -> MenuInputs<'a> {
    MenuInputs {
        images_dir: &config.images_dir,
        images,
        iso_prefix: &config.iso_prefix,
        overrides: &config.overrides,
        footer: &config.footer,
    }
}

/// Execute the generate command.
pub fn cmd_generate(config: &Config, if_stale: bool) -> Result<()> {
    if if_stale {
        match &config.output {
            Some(output) => {
                let images = images::scan_images(&config.images_dir)?;
                let status = rebuild::menu_needs_regenerate(output, &menu_inputs(config, &images));
                if !status.is_stale() {
                    eprintln!("[SKIP] {} is up to date", output.display());
                    return Ok(());
                }
                eprintln!("Regenerating {} ({})", output.display(), status);
            }
            None => eprintln!("[WARN] --if-stale has no effect without an output file"),
        }
    }

    let (images, generation) = run_generation(config)?;

    match &config.output {
        Some(output) => {
            write_atomic(output, &generation.document)?;
            rebuild::cache_menu_hash(output, &menu_inputs(config, &images))
                .with_context(|| format!("Failed to record input hash for {}", output.display()))?;
            eprintln!("Wrote {}", output.display());
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(generation.document.as_bytes())
                .context("Failed to write menu to stdout")?;
            stdout.flush()?;
        }
    }

    generation.report.print_summary();
    Ok(())
}

/// Write through a temporary sibling so a failed run never leaves a
/// truncated menu behind.
fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = Path::new(&tmp);
    fs::write(tmp, contents).with_context(|| format!("Failed to write {}", tmp.display()))?;
    fs::rename(tmp, path)
        .with_context(|| format!("Failed to move {} into place", path.display()))?;
    Ok(())
}
