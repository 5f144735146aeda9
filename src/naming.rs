//! Display names from the release filename convention.
//!
//! Installer images are expected to follow
//! `<distro>-<version>-<variant>-<arch>.iso`, e.g.
//! `ubuntu-18.04.3-live-server-amd64.iso`. Anything else is shown under its
//! file stem with no group.

use regex::Regex;
use std::sync::LazyLock;

static RELEASE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<distro>[a-z]+)-(?P<version>\d+\.\d+(?:\.\d+)?)-(?P<variant>.+)-(?P<arch>[a-z0-9_]+)\.iso$")
        .expect("release name pattern is valid")
});

/// Distributions that follow Ubuntu's LTS cadence.
const UBUNTU_FAMILY: &[&str] = &["ubuntu", "kubuntu", "xubuntu", "lubuntu", "edubuntu"];

const ARCHES: &[(&str, &str)] = &[("amd64", "x86-64"), ("i386", "x86"), ("arm64", "ARM64")];

const VARIANTS: &[(&str, &str)] = &[
    ("desktop", "desktop livecd"),
    ("live-server", "server livecd"),
];

const DESKTOP_COMMENT: &str =
    "NB: add only-ubiquity to kernel command line prior to --- to launch just the installer";

/// A filename split along the release convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseName {
    pub distro: String,
    pub version: String,
    pub variant: String,
    pub arch: String,
}

impl ReleaseName {
    pub fn parse(filename: &str) -> Option<Self> {
        let caps = RELEASE_NAME.captures(filename)?;
        Some(Self {
            distro: caps["distro"].to_string(),
            version: caps["version"].to_string(),
            variant: caps["variant"].to_string(),
            arch: caps["arch"].to_string(),
        })
    }

    /// Ubuntu-family LTS: every even year's April release (8.04, 10.04, ...).
    pub fn is_lts(&self) -> bool {
        if !UBUNTU_FAMILY.contains(&self.distro.as_str()) {
            return false;
        }
        let mut parts = self.version.split('.');
        let major = parts.next().and_then(|p| p.parse::<u32>().ok());
        let minor = parts.next().and_then(|p| p.parse::<u32>().ok());
        matches!((major, minor), (Some(major), Some(4)) if major % 2 == 0)
    }

    /// `NN.NN` without the point release.
    pub fn release(&self) -> &str {
        match self.version.match_indices('.').nth(1) {
            Some((idx, _)) => &self.version[..idx],
            None => &self.version,
        }
    }

    fn distro_label(&self) -> String {
        let mut chars = self.distro.chars();
        match chars.next() {
            Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
            None => String::new(),
        }
    }

    fn lts_suffix(&self) -> &'static str {
        if self.is_lts() {
            " LTS"
        } else {
            ""
        }
    }

    /// e.g. `Ubuntu 18.04.3 LTS (x86-64 server livecd)`.
    pub fn title(&self) -> String {
        format!(
            "{} {}{} ({} {})",
            self.distro_label(),
            self.version,
            self.lts_suffix(),
            lookup(ARCHES, &self.arch),
            lookup(VARIANTS, &self.variant),
        )
    }

    /// e.g. `Ubuntu 18.04 LTS`.
    pub fn group(&self) -> String {
        format!("{} {}{}", self.distro_label(), self.release(), self.lts_suffix())
    }
}

fn lookup<'a>(table: &[(&str, &'a str)], key: &'a str) -> &'a str {
    table
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| *v)
        .unwrap_or(key)
}

/// Menu title for an image filename.
pub fn title_for(filename: &str) -> String {
    match ReleaseName::parse(filename) {
        Some(name) => name.title(),
        None => file_stem(filename).to_string(),
    }
}

/// Release group for an image filename, if it follows the convention.
pub fn group_for(filename: &str) -> Option<String> {
    ReleaseName::parse(filename).map(|name| name.group())
}

/// Usage hint shown inside the entry, if any.
pub fn comment_for(filename: &str) -> Option<String> {
    let name = ReleaseName::parse(filename)?;
    (UBUNTU_FAMILY.contains(&name.distro.as_str()) && name.variant == "desktop")
        .then(|| DESKTOP_COMMENT.to_string())
}

fn file_stem(filename: &str) -> &str {
    match filename.rsplit_once('.') {
        Some((stem, ext)) if ext.eq_ignore_ascii_case("iso") && !stem.is_empty() => stem,
        _ => filename,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_live_server() {
        let name = ReleaseName::parse("ubuntu-18.04.3-live-server-amd64.iso").unwrap();
        assert_eq!(name.distro, "ubuntu");
        assert_eq!(name.version, "18.04.3");
        assert_eq!(name.variant, "live-server");
        assert_eq!(name.arch, "amd64");
        assert_eq!(name.release(), "18.04");
    }

    #[test]
    fn test_titles() {
        assert_eq!(
            title_for("ubuntu-19.10-desktop-amd64.iso"),
            "Ubuntu 19.10 (x86-64 desktop livecd)"
        );
        assert_eq!(
            title_for("ubuntu-18.04.3-live-server-amd64.iso"),
            "Ubuntu 18.04.3 LTS (x86-64 server livecd)"
        );
        assert_eq!(
            title_for("ubuntu-16.04.6-server-amd64.iso"),
            "Ubuntu 16.04.6 LTS (x86-64 server)"
        );
        assert_eq!(title_for("memtest86.iso"), "memtest86");
        assert_eq!(title_for("Fedora-Workstation-Live-x86_64-39-1.5.iso"), "Fedora-Workstation-Live-x86_64-39-1.5");
    }

    #[test]
    fn test_lts_cadence() {
        let lts = |f: &str| ReleaseName::parse(f).unwrap().is_lts();
        assert!(lts("ubuntu-20.04-desktop-amd64.iso"));
        assert!(lts("kubuntu-22.04.1-desktop-amd64.iso"));
        assert!(!lts("ubuntu-19.04-desktop-amd64.iso"));
        assert!(!lts("ubuntu-20.10-desktop-amd64.iso"));
        assert!(!lts("debian-10.04-netinst-amd64.iso"));
    }

    #[test]
    fn test_groups() {
        assert_eq!(
            group_for("ubuntu-18.04.3-desktop-amd64.iso").as_deref(),
            Some("Ubuntu 18.04 LTS")
        );
        assert_eq!(group_for("ubuntu-19.10-desktop-amd64.iso").as_deref(), Some("Ubuntu 19.10"));
        assert_eq!(group_for("random.iso"), None);
    }

    #[test]
    fn test_desktop_comment() {
        assert!(comment_for("ubuntu-20.04-desktop-amd64.iso").unwrap().contains("only-ubiquity"));
        assert_eq!(comment_for("ubuntu-20.04-live-server-amd64.iso"), None);
        assert_eq!(comment_for("random.iso"), None);
    }
}
