//! Regeneration detection for the generated menu.
//!
//! The menu is stale when it is missing, when any input file is newer than
//! it, or when the hash of its inputs differs from the one recorded at the
//! last generation.

use std::fmt;
use std::path::Path;

use crate::cache;
use crate::error::Result;
use crate::images::DiskImage;

/// Everything a generated menu is derived from.
pub struct MenuInputs<'a> {
    pub images_dir: &'a Path,
    pub images: &'a [DiskImage],
    /// Images directory as GRUB sees it.
    pub iso_prefix: &'a str,
    pub overrides: &'a Path,
    pub footer: &'a Path,
}

impl MenuInputs<'_> {
    fn hash(&self) -> String {
        cache::hash_inputs(self.images, self.iso_prefix, &[self.overrides, self.footer])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Staleness {
    Fresh,
    Stale(String),
}

impl Staleness {
    pub fn is_stale(&self) -> bool {
        matches!(self, Staleness::Stale(_))
    }
}

impl fmt::Display for Staleness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Staleness::Fresh => f.write_str("up to date"),
            Staleness::Stale(reason) => write!(f, "stale: {}", reason),
        }
    }
}

/// Check if the menu at `output` needs to be regenerated.
pub fn menu_needs_regenerate(output: &Path, inputs: &MenuInputs<'_>) -> Staleness {
    if !output.exists() {
        return Staleness::Stale(format!("{} does not exist", output.display()));
    }

    let newer = [
        (inputs.overrides, "override table changed"),
        (inputs.footer, "footer changed"),
        (inputs.images_dir, "images directory changed"),
    ];
    for (source, reason) in newer {
        if cache::is_newer(source, output) {
            return Staleness::Stale(reason.to_string());
        }
    }

    let hash_file = cache::hash_file_for(output);
    match cache::read_cached_hash(&hash_file) {
        Some(cached) if cached == inputs.hash() => Staleness::Fresh,
        Some(_) => Staleness::Stale("inputs changed since last generation".to_string()),
        None => Staleness::Stale("no input hash recorded".to_string()),
    }
}

/// Record the input hash after a successful write of `output`.
pub fn cache_menu_hash(output: &Path, inputs: &MenuInputs<'_>) -> Result<()> {
    cache::write_cached_hash(&cache::hash_file_for(output), &inputs.hash())
}
