//! GRUB menu entries and document rendering.

use std::fmt::Write as _;

/// GRUB variable holding the image path inside each entry.
pub const LOOPBACK_VARIABLE: &str = "isofile";

/// Kernel used when neither an override nor the image names one.
pub const DEFAULT_KERNEL: &str = "/casper/vmlinuz";
pub const DEFAULT_INITRD: &str = "/casper/initrd";

const HEADER: &str = "\
#
# Generated by isomenu. Do not edit by hand: change the override table
# and regenerate.
#
# Notes for adding new entries:
# - copy the ISO into the images directory, then run `isomenu inspect <iso>`
# - if the extracted arguments don't boot, add a verified command line to
#   the override table; iso-scan/filename must come before the -- or ---
#   (some ISOs have a loopback.cfg that already has it)
#
# Testing in KVM:
# - udisksctl unmount -b /dev/sdb1
# - sudo setfacl -m user:$USER:rw /dev/sdb
# - kvm -m 2048 -k en-us -drive format=raw,file=/dev/sdb
#   (if arrow keys don't work in the GRUB menu, use Ctrl-N/P)
# - udisksctl mount -b /dev/sdb1
#

";

/// Where an entry's kernel arguments came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// Hand-verified override table entry.
    Override,
    /// Read from the given config file inside the image.
    Extracted(String),
    /// Nothing known; only the scan argument. Needs manual review.
    Fallback,
}

/// One bootable image in the menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuEntry {
    pub filename: String,
    pub title: String,
    pub group: Option<String>,
    /// Image path as GRUB sees it.
    pub iso_path: String,
    pub kernel: String,
    pub initrd: Vec<String>,
    /// Final kernel arguments, scan-filename argument included.
    pub cmdline: String,
    /// Test status lines.
    pub notes: Vec<String>,
    pub comment: Option<String>,
    pub origin: Origin,
}

impl MenuEntry {
    pub fn needs_review(&self) -> bool {
        self.origin == Origin::Fallback
    }

    /// The `linux ...` line, without indentation.
    pub fn kernel_line(&self) -> String {
        let mut line = format!("linux (loop){}", self.kernel);
        if !self.cmdline.is_empty() {
            line.push(' ');
            line.push_str(&self.cmdline);
        }
        line
    }

    /// The `initrd ...` line, without indentation.
    pub fn initrd_line(&self) -> String {
        let mut line = String::from("initrd");
        for path in &self.initrd {
            let _ = write!(line, " (loop){}", path);
        }
        line
    }

    pub fn render(&self, out: &mut String) {
        let _ = writeln!(out, "menuentry \"{}\" {{", escape(&self.title));
        for note in &self.notes {
            comment_line(out, note);
        }
        let _ = writeln!(out, "    set {}=\"{}\"", LOOPBACK_VARIABLE, escape(&self.iso_path));
        let _ = writeln!(out, "    loopback loop ${}", LOOPBACK_VARIABLE);
        if let Some(comment) = &self.comment {
            comment_line(out, comment);
        }
        let _ = writeln!(out, "    {}", self.kernel_line());
        let _ = writeln!(out, "    {}", self.initrd_line());
        out.push_str("}\n\n");
    }
}

/// An image that produced no entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    pub filename: String,
    pub reason: String,
}

impl Skipped {
    pub fn render(&self, out: &mut String) {
        let _ = writeln!(
            out,
            "## SKIPPED {}: {}",
            single_line(&self.filename),
            single_line(&self.reason)
        );
        out.push_str("## Needs manual review: add it to the override table to include it.\n\n");
    }
}

/// One unit of output, in image order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Entry(MenuEntry),
    Skipped(Skipped),
}

impl Block {
    pub fn filename(&self) -> &str {
        match self {
            Block::Entry(entry) => &entry.filename,
            Block::Skipped(skipped) => &skipped.filename,
        }
    }
}

/// Render the complete configuration.
///
/// Blocks keep their order. A group becomes one submenu placed where its
/// first member would have been.
pub fn render_document(blocks: &[Block], footer: Option<&str>) -> String {
    let mut out = String::from(HEADER);
    let mut emitted_groups: Vec<&str> = Vec::new();

    for block in blocks {
        match block {
            Block::Skipped(skipped) => skipped.render(&mut out),
            Block::Entry(entry) => match entry.group.as_deref() {
                None => entry.render(&mut out),
                Some(group) if emitted_groups.contains(&group) => {}
                Some(group) => {
                    emitted_groups.push(group);
                    render_submenu(&mut out, group, blocks);
                }
            },
        }
    }

    if let Some(footer) = footer {
        out.push_str(footer.trim_end());
        out.push('\n');
    }

    let trimmed = out.trim_end().len();
    out.truncate(trimmed);
    out.push('\n');
    out
}

fn render_submenu(out: &mut String, group: &str, blocks: &[Block]) {
    let mut entries = String::new();
    for block in blocks {
        if let Block::Entry(entry) = block {
            if entry.group.as_deref() == Some(group) {
                entry.render(&mut entries);
            }
        }
    }
    let _ = write!(
        out,
        "submenu \"{} >\" {{\n\n{}\n\n}} # end of submenu\n\n",
        escape(group),
        entries.trim_end()
    );
}

fn comment_line(out: &mut String, text: &str) {
    for line in text.lines() {
        let line = line.trim_end();
        if !line.is_empty() {
            let _ = writeln!(out, "    # {}", line);
        }
    }
}

/// Control characters would end a comment line early.
fn single_line(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_control() { '?' } else { c })
        .collect()
}

/// Escape a string for a double-quoted GRUB word.
fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '"' | '\\' | '$') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
