//! CLI command handlers.
//!
//! Each submodule handles a specific CLI command:
//! - `generate` - Write the GRUB menu
//! - `check` - Diff a fresh menu against an existing file
//! - `inspect` - Show boot configs, files, or directories inside ISOs
//! - `status` - Report whether the menu is stale
//! - `show` - Display information

mod check;
pub mod generate;
pub mod inspect;
pub mod show;
mod status;

pub use check::cmd_check;
pub use generate::cmd_generate;
pub use inspect::cmd_inspect;
pub use show::cmd_show;
pub use status::cmd_status;
