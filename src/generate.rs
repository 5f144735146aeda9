//! Menu generation.
//!
//! For each image, in filename order:
//! 1. an override table entry wins unconditionally;
//! 2. otherwise the image's own boot config is inspected;
//! 3. otherwise a bare entry is emitted and flagged for manual review.
//!
//! Images that are not valid ISO9660 (and have no override), that cannot be
//! opened, or whose path cannot be written on a GRUB command line are skipped
//! with a visible marker. Nothing here is fatal: per-image problems end up as
//! warnings in the report.

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, warn};

use crate::cmdline::{inject_scan_filename, unsafe_path_char};
use crate::error::{Error, Result};
use crate::images::DiskImage;
use crate::inspect::{self, BootFragment};
use crate::menu::{self, Block, MenuEntry, Origin, Skipped, DEFAULT_INITRD, DEFAULT_KERNEL};
use crate::naming;
use crate::overrides::{Override, OverrideTable};

/// Rendering settings that are not per-image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuSettings {
    /// Directory of the images as GRUB sees it, e.g. `/ubuntu`.
    pub iso_prefix: String,
    /// Appended verbatim after the generated entries.
    pub footer: Option<String>,
}

impl Default for MenuSettings {
    fn default() -> Self {
        Self {
            iso_prefix: "/ubuntu".to_string(),
            footer: None,
        }
    }
}

/// Source of boot fragments. The ISO reader in production, canned data in tests.
pub trait Inspector {
    fn inspect(&self, image: &DiskImage) -> Result<BootFragment>;
}

/// Reads the boot configuration out of the image file.
#[derive(Debug, Default, Clone, Copy)]
pub struct IsoInspector;

impl Inspector for IsoInspector {
    fn inspect(&self, image: &DiskImage) -> Result<BootFragment> {
        inspect::inspect_image(&image.path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// Entry emitted, but its arguments are unverified.
    ManualReview,
    /// No entry emitted.
    Skipped,
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarningKind::ManualReview => f.write_str("manual review"),
            WarningKind::Skipped => f.write_str("skipped"),
        }
    }
}

/// A per-image problem that did not stop the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub filename: String,
    pub kind: WarningKind,
    pub detail: String,
}

/// Outcome of a generation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationReport {
    /// One block per image, in filename order.
    pub blocks: Vec<Block>,
    pub warnings: Vec<Warning>,
}

impl GenerationReport {
    pub fn entries(&self) -> impl Iterator<Item = &MenuEntry> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Entry(entry) => Some(entry),
            Block::Skipped(_) => None,
        })
    }

    pub fn entry(&self, filename: &str) -> Option<&MenuEntry> {
        self.entries().find(|e| e.filename == filename)
    }

    pub fn count(&self, kind: WarningKind) -> usize {
        self.warnings.iter().filter(|w| w.kind == kind).count()
    }

    fn count_origin(&self, matches: impl Fn(&Origin) -> bool) -> usize {
        self.entries().filter(|e| matches(&e.origin)).count()
    }

    /// Print the end-of-run summary to stderr.
    pub fn print_summary(&self) {
        eprintln!(
            "Generated {} entries ({} from overrides, {} extracted, {} need review, {} skipped)",
            self.entries().count(),
            self.count_origin(|o| *o == Origin::Override),
            self.count_origin(|o| matches!(o, Origin::Extracted(_))),
            self.count(WarningKind::ManualReview),
            self.count(WarningKind::Skipped),
        );
        for warning in &self.warnings {
            eprintln!(
                "  [WARN] {} ({}): {}",
                warning.filename, warning.kind, warning.detail
            );
        }
    }
}

/// The rendered configuration and what went into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub document: String,
    pub report: GenerationReport,
}

/// Generate the menu, inspecting image files on disk.
pub fn generate(images: &[DiskImage], overrides: &OverrideTable, settings: &MenuSettings) -> Generation {
    generate_with(&IsoInspector, images, overrides, settings)
}

/// Generate the menu with a custom inspector.
pub fn generate_with<I: Inspector>(
    inspector: &I,
    images: &[DiskImage],
    overrides: &OverrideTable,
    settings: &MenuSettings,
) -> Generation {
    let mut sorted: Vec<&DiskImage> = images.iter().collect();
    sorted.sort_by(|a, b| a.filename.cmp(&b.filename));

    let mut resolved = Vec::with_capacity(sorted.len());
    let mut warnings = Vec::new();
    for image in sorted {
        let (item, warning) = resolve(inspector, image, overrides.get(&image.filename), settings);
        if let Some(warning) = warning {
            warn!(image = %warning.filename, kind = %warning.kind, "{}", warning.detail);
            warnings.push(warning);
        }
        resolved.push(item);
    }

    collapse_singleton_groups(&mut resolved);
    let blocks: Vec<Block> = resolved.into_iter().map(|r| r.block).collect();
    let document = menu::render_document(&blocks, settings.footer.as_deref());

    Generation {
        document,
        report: GenerationReport { blocks, warnings },
    }
}

struct Resolved {
    block: Block,
    /// Group set by the override table rather than derived from the filename.
    explicit_group: bool,
}

fn resolve<I: Inspector>(
    inspector: &I,
    image: &DiskImage,
    verified: Option<&Override>,
    settings: &MenuSettings,
) -> (Resolved, Option<Warning>) {
    let iso_path = image.grub_path(&settings.iso_prefix);

    if let Some(reason) = &image.unusable {
        return skip(image, reason.clone());
    }
    if let Some(c) = unsafe_path_char(&iso_path) {
        return skip(
            image,
            format!("path {:?} contains {:?}, which GRUB would split or expand; rename the file", iso_path, c),
        );
    }

    if let Some(verified) = verified {
        debug!(image = %image.filename, "using override table entry");
        let entry = override_entry(inspector, image, verified, iso_path);
        let explicit_group = verified.group.is_some();
        return (
            Resolved {
                block: Block::Entry(entry),
                explicit_group,
            },
            None,
        );
    }

    match inspector.inspect(image) {
        Ok(fragment) => {
            debug!(image = %image.filename, source = %fragment.source, "extracted boot arguments");
            let entry = MenuEntry {
                filename: image.filename.clone(),
                title: naming::title_for(&image.filename),
                group: naming::group_for(&image.filename),
                cmdline: inject_scan_filename(&fragment.args, &iso_path),
                iso_path,
                kernel: fragment.kernel,
                initrd: fragment.initrd,
                notes: vec![
                    "Untested".to_string(),
                    format!("Arguments extracted from {}", fragment.source),
                ],
                comment: naming::comment_for(&image.filename),
                origin: Origin::Extracted(fragment.source),
            };
            (derived(Block::Entry(entry)), None)
        }
        Err(e @ Error::Format(_)) => skip(image, e.to_string()),
        Err(e) => {
            let detail = format!("{}; kernel arguments are unverified", e);
            let entry = MenuEntry {
                filename: image.filename.clone(),
                title: naming::title_for(&image.filename),
                group: naming::group_for(&image.filename),
                cmdline: inject_scan_filename("", &iso_path),
                iso_path,
                kernel: DEFAULT_KERNEL.to_string(),
                initrd: vec![DEFAULT_INITRD.to_string()],
                notes: vec![format!("NEEDS MANUAL REVIEW: {}", detail)],
                comment: naming::comment_for(&image.filename),
                origin: Origin::Fallback,
            };
            let warning = Warning {
                filename: image.filename.clone(),
                kind: WarningKind::ManualReview,
                detail,
            };
            (derived(Block::Entry(entry)), Some(warning))
        }
    }
}

fn skip(image: &DiskImage, reason: String) -> (Resolved, Option<Warning>) {
    let warning = Warning {
        filename: image.filename.clone(),
        kind: WarningKind::Skipped,
        detail: reason.clone(),
    };
    let block = Block::Skipped(Skipped {
        filename: image.filename.clone(),
        reason,
    });
    (derived(block), Some(warning))
}

fn derived(block: Block) -> Resolved {
    Resolved {
        block,
        explicit_group: false,
    }
}

/// Build an entry from a verified override.
///
/// Kernel and initrd paths come from the override, else from the image, else
/// the casper defaults. The command line is always the override's.
fn override_entry<I: Inspector>(
    inspector: &I,
    image: &DiskImage,
    verified: &Override,
    iso_path: String,
) -> MenuEntry {
    let needs_paths = verified.kernel.is_none() || verified.initrd.is_none();
    let fragment = if needs_paths {
        inspector
            .inspect(image)
            .map_err(|e| debug!(image = %image.filename, error = %e, "no paths from image, using defaults"))
            .ok()
    } else {
        None
    };

    let kernel = verified
        .kernel
        .clone()
        .or_else(|| fragment.as_ref().map(|f| f.kernel.clone()))
        .unwrap_or_else(|| DEFAULT_KERNEL.to_string());
    let initrd = verified
        .initrd
        .clone()
        .or_else(|| fragment.map(|f| f.initrd))
        .unwrap_or_else(|| vec![DEFAULT_INITRD.to_string()]);

    let notes = if verified.notes.is_empty() {
        vec!["Untested".to_string()]
    } else {
        verified.notes.clone()
    };

    MenuEntry {
        filename: image.filename.clone(),
        title: verified
            .title
            .clone()
            .unwrap_or_else(|| naming::title_for(&image.filename)),
        group: verified
            .group
            .clone()
            .or_else(|| naming::group_for(&image.filename)),
        cmdline: inject_scan_filename(&verified.cmdline, &iso_path),
        iso_path,
        kernel,
        initrd,
        notes,
        comment: verified
            .comment
            .clone()
            .or_else(|| naming::comment_for(&image.filename)),
        origin: Origin::Override,
    }
}

/// A filename-derived group needs at least two members to become a submenu.
fn collapse_singleton_groups(resolved: &mut [Resolved]) {
    let mut members: HashMap<String, usize> = HashMap::new();
    for item in resolved.iter() {
        if let Block::Entry(MenuEntry { group: Some(group), .. }) = &item.block {
            *members.entry(group.clone()).or_default() += 1;
        }
    }
    for item in resolved.iter_mut() {
        if item.explicit_group {
            continue;
        }
        if let Block::Entry(entry) = &mut item.block {
            let single = entry
                .group
                .as_ref()
                .map(|g| members.get(g).copied().unwrap_or(0) < 2)
                .unwrap_or(false);
            if single {
                entry.group = None;
            }
        }
    }
}
