//! isomenu library exports.
//!
//! Generates a GRUB loopback menu for a directory of live ISO images and
//! inspects ISO9660 images without mounting them. The `isomenu` binary is a
//! thin CLI over these modules; integration tests use them directly.

pub mod cache;
pub mod cmdline;
pub mod config;
pub mod diff;
pub mod error;
pub mod generate;
pub mod images;
pub mod inspect;
pub mod iso9660;
pub mod menu;
pub mod naming;
pub mod overrides;
pub mod rebuild;

pub use error::{Error, Result};
