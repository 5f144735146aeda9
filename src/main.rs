//! isomenu - GRUB loopback menu generator for live ISO images.
//!
//! Scans a directory of ISO files and writes a `grub.cfg` that boots each of
//! them via `loopback`, using verified command lines from the override table
//! where available and the image's own boot config otherwise.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::env;
use std::path::PathBuf;

use isomenu::config::Config;

#[derive(Parser)]
#[command(name = "isomenu")]
#[command(version)]
#[command(about = "GRUB loopback menu generator for live ISO images")]
#[command(
    after_help = "QUICK START:\n  isomenu generate -o boot/grub/grub.cfg  Write the menu\n  isomenu check --against boot/grub/grub.cfg  Show what would change\n  isomenu inspect ubuntu/*.iso            Show extracted boot arguments\n  isomenu show config                     Print effective configuration"
)]
struct Cli {
    /// Directory holding the ISO images (overrides ISOMENU_IMAGES_DIR)
    #[arg(long, global = true)]
    images_dir: Option<PathBuf>,

    /// Override table file (overrides ISOMENU_OVERRIDES)
    #[arg(long, global = true)]
    overrides: Option<PathBuf>,

    /// Images directory as GRUB sees it (overrides ISOMENU_PREFIX)
    #[arg(long, global = true)]
    prefix: Option<String>,

    /// Log every per-image decision
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the menu (stdout unless an output file is configured)
    Generate {
        /// Output file (overrides ISOMENU_OUTPUT)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Do nothing when the output is up to date
        #[arg(long)]
        if_stale: bool,
    },

    /// Diff a freshly generated menu against an existing file
    Check {
        /// File to compare against (default: the configured output)
        #[arg(long)]
        against: Option<PathBuf>,
    },

    /// Show the boot configuration found inside ISO images
    Inspect {
        /// ISO files to inspect
        #[arg(required = true)]
        isos: Vec<PathBuf>,

        /// Print this file from the image instead
        #[arg(long, conflicts_with = "ls")]
        path: Option<String>,

        /// List this directory of the image instead
        #[arg(long)]
        ls: Option<String>,
    },

    /// Report whether the menu needs regenerating
    Status {
        /// Generated file to check (overrides ISOMENU_OUTPUT)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show information
    Show {
        #[command(subcommand)]
        what: ShowTarget,
    },
}

#[derive(Subcommand)]
enum ShowTarget {
    /// Show current configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load .env if present
    dotenvy::dotenv().ok();

    let log_level = if cli.verbose { "debug" } else { "warn" };
    let env_filter = env::var("RUST_LOG").unwrap_or_else(|_| log_level.to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from(env_filter))
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let base_dir = env::current_dir()?;
    let mut config = Config::load(&base_dir);
    if let Some(dir) = &cli.images_dir {
        config.set_images_dir(&base_dir, dir);
    }
    if let Some(overrides) = &cli.overrides {
        config.overrides = base_dir.join(overrides);
    }
    if let Some(prefix) = cli.prefix {
        config.iso_prefix = prefix;
    }

    match cli.command {
        Commands::Generate { output, if_stale } => {
            if let Some(output) = output {
                config.output = Some(base_dir.join(output));
            }
            commands::cmd_generate(&config, if_stale)?;
        }

        Commands::Check { against } => {
            let against = against
                .map(|p| base_dir.join(p))
                .or_else(|| config.output.clone());
            commands::cmd_check(&config, against.as_deref())?;
        }

        Commands::Inspect { isos, path, ls } => {
            let target = match (path, ls) {
                (Some(path), _) => commands::inspect::InspectTarget::File(path),
                (None, Some(dir)) => commands::inspect::InspectTarget::List(dir),
                (None, None) => commands::inspect::InspectTarget::BootConfig,
            };
            commands::cmd_inspect(&isos, target)?;
        }

        Commands::Status { output } => {
            let output = output
                .map(|p| base_dir.join(p))
                .or_else(|| config.output.clone());
            commands::cmd_status(&config, output.as_deref())?;
        }

        Commands::Show { what } => {
            let show_target = match what {
                ShowTarget::Config => commands::show::ShowTarget::Config,
            };
            commands::cmd_show(show_target, &config)?;
        }
    }

    Ok(())
}
