//! ISO inspection - finds the kernel command line an installer image uses.
//!
//! Reads the image's own GRUB configuration straight out of the ISO9660
//! filesystem (no mounting) and picks the first kernel/initrd pair.

use std::fmt;
use std::io::{Read, Seek};
use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};
use crate::iso9660::IsoFs;

/// Boot configuration locations, most specific first.
///
/// `loopback.cfg` exists precisely for booting the ISO through `loopback`
/// and usually already carries `iso-scan/filename`.
pub const BOOT_CONFIG_PATHS: &[&str] = &[
    "/boot/grub/loopback.cfg",
    "/boot/grub/grub.cfg",
    "/EFI/BOOT/grub.cfg",
];

/// Boot configs larger than this are not GRUB menus.
pub const MAX_CONFIG_SIZE: u32 = 1024 * 1024;

const KERNEL_DIRECTIVES: &[&str] = &["linux", "linuxefi"];
const INITRD_DIRECTIVES: &[&str] = &["initrd", "initrdefi"];

/// Kernel, initrd, and arguments found in an image's boot configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootFragment {
    /// Kernel path inside the image, always starting with `/`.
    pub kernel: String,
    /// Initrd paths inside the image, each starting with `/`. Never empty.
    pub initrd: Vec<String>,
    /// Kernel arguments, sentinel included.
    pub args: String,
    /// Config file the fragment was read from.
    pub source: String,
}

impl fmt::Display for BootFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "source: {}", self.source)?;
        writeln!(f, "kernel: {}", self.kernel)?;
        writeln!(f, "initrd: {}", self.initrd.join(" "))?;
        write!(f, "args:   {}", self.args)
    }
}

/// Inspect an image file on disk.
pub fn inspect_image(path: &Path) -> Result<BootFragment> {
    let mut iso = IsoFs::open(path)?;
    inspect_iso(&mut iso).map_err(|e| match e {
        Error::NotFound(_) => Error::not_found(format!(
            "no boot configuration in {} (tried {})",
            path.display(),
            BOOT_CONFIG_PATHS.join(", ")
        )),
        other => other,
    })
}

/// Try every known config location of an opened volume in order.
pub fn inspect_iso<R: Read + Seek>(iso: &mut IsoFs<R>) -> Result<BootFragment> {
    for candidate in BOOT_CONFIG_PATHS {
        let record = match iso.get_path(candidate) {
            Ok(record) => record,
            Err(Error::NotFound(_)) => continue,
            Err(e) => return Err(e),
        };
        if record.is_dir() || record.size > MAX_CONFIG_SIZE {
            debug!(candidate, size = record.size, "not a usable boot config");
            continue;
        }

        let data = iso.read_file(&record)?;
        let text = String::from_utf8_lossy(&data);
        match scan_boot_config(&text, candidate) {
            Some(fragment) => return Ok(fragment),
            None => debug!(candidate, "no kernel directive"),
        }
    }
    Err(Error::not_found("no boot configuration"))
}

/// Scan GRUB config text for the first complete kernel + initrd pair.
///
/// Only `linux`/`initrd` (and their `efi` variants) are recognised; every
/// other line is skipped. A kernel directive is matched with the next initrd
/// directive in the same block.
pub fn scan_boot_config(text: &str, source: &str) -> Option<BootFragment> {
    let mut pending: Option<(String, String)> = None;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line.starts_with('}') {
            pending = None;
            continue;
        }

        let mut tokens = line.split_whitespace();
        let Some(directive) = tokens.next() else {
            continue;
        };

        if KERNEL_DIRECTIVES.contains(&directive) {
            pending = tokens
                .next()
                .and_then(normalize_path)
                .map(|kernel| (kernel, tokens.collect::<Vec<_>>().join(" ")));
        } else if INITRD_DIRECTIVES.contains(&directive) {
            let Some((kernel, args)) = pending.take() else {
                continue;
            };
            let initrd: Vec<String> = tokens.filter_map(normalize_path).collect();
            if initrd.is_empty() {
                continue;
            }
            return Some(BootFragment {
                kernel,
                initrd,
                args,
                source: source.to_string(),
            });
        }
    }
    None
}

/// Strip a GRUB device prefix like `(loop)` or `($root)`; keep only
/// absolute paths.
fn normalize_path(raw: &str) -> Option<String> {
    let path = match raw.strip_prefix('(') {
        Some(rest) => rest.split_once(')')?.1,
        None => raw,
    };
    if path.starts_with('/') && path.len() > 1 {
        Some(path.to_string())
    } else {
        None
    }
}
