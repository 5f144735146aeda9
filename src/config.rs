//! Configuration management for isomenu.
//!
//! Reads configuration from environment variables (`main` loads `.env` into
//! the environment first). Command-line flags override both.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::generate::MenuSettings;

/// Default images directory, relative to the working directory.
pub const DEFAULT_IMAGES_DIR: &str = "ubuntu";
pub const DEFAULT_OVERRIDES: &str = "overrides.json";
pub const DEFAULT_FOOTER: &str = "footer.cfg";

/// isomenu configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory holding the ISO files (ISOMENU_IMAGES_DIR).
    pub images_dir: PathBuf,
    /// Override table file (ISOMENU_OVERRIDES).
    pub overrides: PathBuf,
    /// Images directory as GRUB sees it (ISOMENU_PREFIX).
    pub iso_prefix: String,
    /// Appended verbatim to the menu when it exists (ISOMENU_FOOTER).
    pub footer: PathBuf,
    /// Destination of `generate` (ISOMENU_OUTPUT); stdout when unset.
    pub output: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn load(base_dir: &Path) -> Self {
        Self::from_lookup(base_dir, |key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup(base_dir: &Path, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let images_dir = resolve(
            base_dir,
            &get("ISOMENU_IMAGES_DIR").unwrap_or_else(|| DEFAULT_IMAGES_DIR.to_string()),
        );
        let overrides = resolve(
            base_dir,
            &get("ISOMENU_OVERRIDES").unwrap_or_else(|| DEFAULT_OVERRIDES.to_string()),
        );
        let footer = resolve(
            base_dir,
            &get("ISOMENU_FOOTER").unwrap_or_else(|| DEFAULT_FOOTER.to_string()),
        );
        let iso_prefix = get("ISOMENU_PREFIX").unwrap_or_else(|| default_prefix(&images_dir));
        let output = get("ISOMENU_OUTPUT").map(|p| resolve(base_dir, &p));

        Self {
            images_dir,
            overrides,
            iso_prefix,
            footer,
            output,
        }
    }

    /// Point at a different images directory. The GRUB prefix follows it
    /// unless it was configured explicitly.
    pub fn set_images_dir(&mut self, base_dir: &Path, dir: &Path) {
        let follow = self.iso_prefix == default_prefix(&self.images_dir);
        self.images_dir = resolve(base_dir, &dir.to_string_lossy());
        if follow {
            self.iso_prefix = default_prefix(&self.images_dir);
        }
    }

    /// Settings for the generator; reads the footer file if present.
    pub fn menu_settings(&self) -> Result<MenuSettings> {
        let footer = if self.footer.is_file() {
            Some(fs::read_to_string(&self.footer)?)
        } else {
            None
        };
        Ok(MenuSettings {
            iso_prefix: self.iso_prefix.clone(),
            footer,
        })
    }

    /// Print configuration for debugging.
    pub fn print(&self) {
        println!("Configuration:");
        println!("  ISOMENU_IMAGES_DIR: {}", self.images_dir.display());
        println!("  ISOMENU_OVERRIDES:  {}", self.overrides.display());
        println!("  ISOMENU_PREFIX:     {}", self.iso_prefix);
        println!("  ISOMENU_FOOTER:     {}", self.footer.display());
        match &self.output {
            Some(output) => println!("  ISOMENU_OUTPUT:     {}", output.display()),
            None => println!("  ISOMENU_OUTPUT:     (stdout)"),
        }
        if self.images_dir.is_dir() {
            println!("  Images directory: FOUND");
        } else {
            println!("  Images directory: NOT FOUND");
        }
        if self.overrides.is_file() {
            println!("  Override table: FOUND");
        } else {
            println!("  Override table: NOT FOUND (every image will be inspected)");
        }
    }
}

/// Relative paths resolve against `base_dir`.
pub fn resolve(base_dir: &Path, value: &str) -> PathBuf {
    let path = PathBuf::from(value);
    if path.is_absolute() {
        path
    } else {
        base_dir.join(path)
    }
}

/// `/` + the images directory name, e.g. `/ubuntu`.
fn default_prefix(images_dir: &Path) -> String {
    match images_dir.file_name() {
        Some(name) => format!("/{}", name.to_string_lossy()),
        None => "/".to_string(),
    }
}
