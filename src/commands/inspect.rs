//! Inspect command - shows what is inside ISO images.

use anyhow::{bail, Result};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use isomenu::inspect;
use isomenu::iso9660::IsoFs;

/// What to show for each image.
pub enum InspectTarget {
    /// The boot fragment the generator would use
    BootConfig,
    /// Contents of one file
    File(String),
    /// Listing of one directory
    List(String),
}

/// Execute the inspect command.
///
/// A failing image is reported and the rest are still inspected.
pub fn cmd_inspect(isos: &[PathBuf], target: InspectTarget) -> Result<()> {
    let mut failed = 0;
    for (index, iso) in isos.iter().enumerate() {
        if index > 0 {
            println!();
        }
        println!("# {}", iso.display());
        if let Err(e) = inspect_one(iso, &target) {
            eprintln!("[FAIL] {}: {}", iso.display(), e);
            failed += 1;
        }
    }
    if failed > 0 {
        bail!("{} of {} images could not be inspected", failed, isos.len());
    }
    Ok(())
}

fn inspect_one(iso: &Path, target: &InspectTarget) -> isomenu::Result<()> {
    match target {
        InspectTarget::BootConfig => {
            let fragment = inspect::inspect_image(iso)?;
            println!("{}", fragment);
        }
        InspectTarget::File(path) => {
            let mut fs = IsoFs::open(iso)?;
            let record = fs.get_path(path)?;
            let mut stdout = io::stdout().lock();
            fs.copy_file(&record, &mut stdout)?;
            stdout.flush()?;
        }
        InspectTarget::List(dir) => {
            let mut fs = IsoFs::open(iso)?;
            let record = fs.get_path(dir)?;
            for entry in fs.list_dir(&record)? {
                if entry.is_self_or_parent() {
                    continue;
                }
                println!("{}", entry.listing_name());
            }
        }
    }
    Ok(())
}
