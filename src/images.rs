//! Disk image enumeration.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// One ISO file in the images directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskImage {
    pub path: PathBuf,
    /// File name; lossily converted when it is not valid UTF-8.
    pub filename: String,
    pub size: u64,
    /// Why the file cannot be used at all (dangling link, undecodable name).
    /// Such images still get a visible skip marker in the menu.
    pub unusable: Option<String>,
}

impl DiskImage {
    /// Path GRUB sees for this image, e.g. `/ubuntu/<filename>`.
    pub fn grub_path(&self, prefix: &str) -> String {
        format!("{}/{}", prefix.trim_end_matches('/'), self.filename)
    }
}

/// List `*.iso` files directly inside `dir`, sorted by filename.
///
/// An absent or unreadable directory is fatal. `*.iso` entries that cannot
/// be used are still listed, with `unusable` set; other unreadable entries
/// are logged and skipped.
pub fn scan_images(dir: &Path) -> Result<Vec<DiskImage>> {
    // Open the directory first so a missing one surfaces as a directory error
    // rather than a walk error on the root entry.
    std::fs::read_dir(dir).map_err(|source| Error::Directory {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut images = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                match e.path().filter(|p| has_iso_extension(p)) {
                    Some(path) => {
                        let reason = match e.io_error() {
                            Some(io) => format!("cannot open image: {}", io),
                            None => format!("cannot open image: {}", e),
                        };
                        tracing::warn!(path = %path.display(), "{}", reason);
                        images.push(DiskImage {
                            filename: lossy_file_name(path),
                            path: path.to_path_buf(),
                            size: 0,
                            unusable: Some(reason),
                        });
                    }
                    None => tracing::warn!(error = %e, "skipping unreadable directory entry"),
                }
                continue;
            }
        };
        if !entry.file_type().is_file() || !has_iso_extension(entry.path()) {
            continue;
        }
        let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
        let unusable = match entry.file_name().to_str() {
            Some(_) => None,
            None => {
                tracing::warn!(path = %entry.path().display(), "image name is not valid UTF-8");
                Some("file name is not valid UTF-8".to_string())
            }
        };
        images.push(DiskImage {
            filename: lossy_file_name(entry.path()),
            path: entry.path().to_path_buf(),
            size,
            unusable,
        });
    }

    // sort_by_file_name compares OsStr; keep the documented byte order explicit
    images.sort_by(|a, b| a.filename.cmp(&b.filename));
    Ok(images)
}

fn lossy_file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn has_iso_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("iso"))
        .unwrap_or(false)
}
