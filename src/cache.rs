//! Input hashing - content-based staleness detection.
//!
//! Uses SHA256 hashes to detect actual content changes, not just mtimes.
//! Touching the override table without editing it does not force a rewrite
//! of the menu.

use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::Result;
use crate::images::DiskImage;

/// Hash everything the generated menu depends on.
///
/// Image files are represented by name and size (reading multi-gigabyte
/// ISOs to hash them is not worth it); other inputs by their content.
/// `iso_prefix` ends up in every entry, so it is part of the hash too.
/// A missing file hashes differently from an empty one.
pub fn hash_inputs(images: &[DiskImage], iso_prefix: &str, files: &[&Path]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(env!("CARGO_PKG_VERSION").as_bytes());
    hasher.update(b"\0prefix\0");
    hasher.update(iso_prefix.as_bytes());
    hasher.update(b"\0images\0");
    for image in images {
        hasher.update(image.filename.as_bytes());
        hasher.update(b"\0");
        hasher.update(image.size.to_le_bytes());
    }
    for path in files {
        hasher.update(b"\0file\0");
        match fs::read(path) {
            Ok(content) => {
                hasher.update(b"present\0");
                hasher.update(&content);
            }
            Err(e) => {
                if path.exists() {
                    warn!(path = %path.display(), error = %e, "failed to read input for hashing");
                }
                hasher.update(b"missing\0");
            }
        }
    }
    format!("{:x}", hasher.finalize())
}

/// Where the input hash of a generated file is kept: a hidden sibling.
pub fn hash_file_for(output: &Path) -> PathBuf {
    let name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "menu".to_string());
    output.with_file_name(format!(".{}.inputs.hash", name))
}

/// Read cached hash from a .hash file.
/// Returns None if the file doesn't exist or can't be read.
pub fn read_cached_hash(hash_file: &Path) -> Option<String> {
    if !hash_file.exists() {
        return None;
    }
    match fs::read_to_string(hash_file) {
        Ok(s) => Some(s.trim().to_string()),
        Err(e) => {
            warn!(
                path = %hash_file.display(),
                error = %e,
                "failed to read cached input hash (will regenerate)"
            );
            None
        }
    }
}

/// Write hash to a .hash file.
pub fn write_cached_hash(hash_file: &Path, hash: &str) -> Result<()> {
    if let Some(parent) = hash_file.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(hash_file, hash)?;
    Ok(())
}

/// Check if `source` is newer than `target`.
///
/// A missing target counts as older; a missing source never counts as newer.
pub fn is_newer(source: &Path, target: &Path) -> bool {
    if !target.exists() {
        return true;
    }
    if !source.exists() {
        return false;
    }

    let Ok(src_time) = source.metadata().and_then(|m| m.modified()) else {
        return true;
    };
    let Ok(tgt_time) = target.metadata().and_then(|m| m.modified()) else {
        return true;
    };

    src_time > tgt_time
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn image(name: &str, size: u64) -> DiskImage {
        DiskImage {
            path: PathBuf::from(name),
            filename: name.to_string(),
            size,
            unusable: None,
        }
    }

    #[test]
    fn test_hash_changes_with_image_set() {
        let a = hash_inputs(&[image("a.iso", 1)], "/ubuntu", &[]);
        let b = hash_inputs(&[image("a.iso", 1), image("b.iso", 1)], "/ubuntu", &[]);
        let c = hash_inputs(&[image("a.iso", 2)], "/ubuntu", &[]);
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, hash_inputs(&[image("a.iso", 1)], "/isos", &[]));
        assert_eq!(a, hash_inputs(&[image("a.iso", 1)], "/ubuntu", &[]));
    }

    #[test]
    fn test_hash_distinguishes_missing_and_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("overrides.json");
        let missing = hash_inputs(&[], "/ubuntu", &[&path]);
        fs::write(&path, "").unwrap();
        let empty = hash_inputs(&[], "/ubuntu", &[&path]);
        assert_ne!(missing, empty);
    }

    #[test]
    fn test_hash_file_location() {
        assert_eq!(
            hash_file_for(Path::new("/mnt/boot/grub/grub.cfg")),
            PathBuf::from("/mnt/boot/grub/.grub.cfg.inputs.hash")
        );
    }

    #[test]
    fn test_cached_hash_roundtrip() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("sub/.x.inputs.hash");
        assert_eq!(read_cached_hash(&file), None);
        write_cached_hash(&file, "abc\n").unwrap();
        assert_eq!(read_cached_hash(&file).as_deref(), Some("abc"));
    }
}
