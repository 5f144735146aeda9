//! Override table - hand-verified kernel command lines per image.
//!
//! Automated inspection sometimes yields arguments that do not boot on their
//! own, so a human records the working command line here once per image.
//! The file is versioned JSON:
//!
//! ```json
//! {
//!   "version": 1,
//!   "images": {
//!     "ubuntu-20.04-desktop-amd64.iso": "file=/cdrom/preseed/ubuntu.seed maybe-ubiquity quiet splash ---",
//!     "ubuntu-18.04.3-live-server-amd64.iso": {
//!       "cmdline": "boot=casper quiet ---",
//!       "notes": ["Tested in KVM, works"]
//!     }
//!   }
//! }
//! ```

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// The only override file format version understood.
pub const FORMAT_VERSION: u32 = 1;

/// A verified entry for one image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Override {
    /// Kernel arguments, sentinel included. Used verbatim apart from the
    /// scan-filename injection.
    pub cmdline: String,
    #[serde(default)]
    pub kernel: Option<String>,
    #[serde(default)]
    pub initrd: Option<Vec<String>>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
    /// Test status lines, rendered as comments in the entry.
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

impl Override {
    pub fn cmdline(cmdline: impl Into<String>) -> Self {
        Self {
            cmdline: cmdline.into(),
            ..Self::default()
        }
    }
}

/// Either a bare command line or the full object.
#[derive(Deserialize)]
#[serde(untagged)]
enum OverrideRepr {
    Cmdline(String),
    Full(Override),
}

impl From<OverrideRepr> for Override {
    fn from(repr: OverrideRepr) -> Self {
        match repr {
            OverrideRepr::Cmdline(cmdline) => Override::cmdline(cmdline),
            OverrideRepr::Full(full) => full,
        }
    }
}

/// Exact-filename mapping to verified overrides.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OverrideTable {
    pub version: u32,
    #[serde(default, deserialize_with = "unique_images")]
    images: BTreeMap<String, Override>,
}

impl Default for OverrideTable {
    fn default() -> Self {
        Self {
            version: FORMAT_VERSION,
            images: BTreeMap::new(),
        }
    }
}

impl OverrideTable {
    /// Load the table from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::Overrides {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::parse(&text).map_err(|reason| Error::Overrides {
            path: path.to_path_buf(),
            reason,
        })
    }

    /// Load the table, or start empty when the file does not exist.
    pub fn load_or_empty(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "no override table, every image will be inspected");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn parse(text: &str) -> std::result::Result<Self, String> {
        let table: OverrideTable = serde_json::from_str(text).map_err(|e| e.to_string())?;
        if table.version != FORMAT_VERSION {
            return Err(format!(
                "unsupported override table version {} (expected {})",
                table.version, FORMAT_VERSION
            ));
        }
        Ok(table)
    }

    /// Exact filename lookup.
    pub fn get(&self, filename: &str) -> Option<&Override> {
        self.images.get(filename)
    }

    pub fn insert(&mut self, filename: impl Into<String>, entry: Override) {
        self.images.insert(filename.into(), entry);
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

fn unique_images<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<String, Override>, D::Error>
where
    D: Deserializer<'de>,
{
    struct UniqueImages;

    impl<'de> Visitor<'de> for UniqueImages {
        type Value = BTreeMap<String, Override>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of image filenames to command lines or override objects")
        }

        fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut images = BTreeMap::new();
            while let Some((filename, repr)) = map.next_entry::<String, OverrideRepr>()? {
                if images.contains_key(&filename) {
                    return Err(de::Error::custom(format!(
                        "duplicate image entry: {}",
                        filename
                    )));
                }
                images.insert(filename, Override::from(repr));
            }
            Ok(images)
        }
    }

    deserializer.deserialize_map(UniqueImages)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_and_detailed_entries() {
        let table = OverrideTable::parse(
            r#"{
                "version": 1,
                "images": {
                    "a.iso": "quiet ---",
                    "b.iso": {
                        "cmdline": "boot=casper ---",
                        "kernel": "/casper/vmlinuz.efi",
                        "initrd": ["/casper/initrd.lz"],
                        "group": "Old",
                        "notes": ["Tested in KVM, works"]
                    }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.get("a.iso"), Some(&Override::cmdline("quiet ---")));
        let b = table.get("b.iso").unwrap();
        assert_eq!(b.kernel.as_deref(), Some("/casper/vmlinuz.efi"));
        assert_eq!(b.group.as_deref(), Some("Old"));
        assert_eq!(b.notes, vec!["Tested in KVM, works".to_string()]);
    }

    #[test]
    fn test_lookup_is_exact() {
        let table =
            OverrideTable::parse(r#"{"version": 1, "images": {"A.iso": "x"}}"#).unwrap();
        assert!(table.get("A.iso").is_some());
        assert!(table.get("a.iso").is_none());
        assert!(table.get("A.iso ").is_none());
    }

    #[test]
    fn test_duplicate_keys_rejected() {
        let err = OverrideTable::parse(
            r#"{"version": 1, "images": {"a.iso": "x", "a.iso": "y"}}"#,
        )
        .unwrap_err();
        assert!(err.contains("duplicate image entry: a.iso"), "{}", err);
    }

    #[test]
    fn test_wrong_version_rejected() {
        let err = OverrideTable::parse(r#"{"version": 2, "images": {}}"#).unwrap_err();
        assert!(err.contains("version 2"));
    }

    #[test]
    fn test_unknown_fields_rejected() {
        assert!(OverrideTable::parse(r#"{"version": 1, "imgs": {}}"#).is_err());
        assert!(OverrideTable::parse(
            r#"{"version": 1, "images": {"a.iso": {"cmdline": "x", "kernal": "/k"}}}"#
        )
        .is_err());
    }

    #[test]
    fn test_missing_images_is_empty() {
        let table = OverrideTable::parse(r#"{"version": 1}"#).unwrap();
        assert!(table.is_empty());
    }
}
