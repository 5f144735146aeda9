//! Error types for isomenu.
//!
//! Per-image errors (`Format`, `NotFound`) are downgraded to warnings by the
//! generator. `Directory` and output write failures abort the run.

use std::io;
use std::path::PathBuf;

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The file is not a structurally valid ISO9660 volume.
    #[error("invalid ISO9660 image: {0}")]
    Format(String),

    /// A path inside the image, or a boot configuration, does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The images directory is missing or unreadable.
    #[error("cannot read images directory {}: {source}", path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The override table could not be loaded.
    #[error("cannot load override table {}: {reason}", path.display())]
    Overrides { path: PathBuf, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn format(msg: impl Into<String>) -> Self {
        Error::Format(msg.into())
    }

    pub(crate) fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }

    /// True for `NotFound`.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// True for `Format`.
    pub fn is_format(&self) -> bool {
        matches!(self, Error::Format(_))
    }
}

/// Map short reads to `Format`: a truncated image is malformed, not an I/O fault.
pub(crate) fn truncated(err: io::Error, what: &str) -> Error {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        Error::format(format!("{} truncated", what))
    } else {
        Error::Io(err)
    }
}
