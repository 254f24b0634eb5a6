//! Command-line definitions and handlers.
//!
//! `camscout` runs a single command: discover cameras, resolve their
//! credentials, inspect them and report the inventory.

mod scan;

pub use scan::ScanCommand;

use crate::config::Settings;
use crate::error::CliResult;
use clap::Parser;
use std::path::PathBuf;

/// camscout - ONVIF camera discovery and credential audit.
///
/// Finds cameras through WS-Discovery multicast and an active sweep of the
/// local subnets, then tries explicit, default and operator-supplied
/// credentials on each device and reports what every camera exposes.
#[derive(Parser, Debug)]
#[command(name = "camscout")]
#[command(author = "HueCodes <huecodes@proton.me>")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Discover ONVIF cameras and audit their credentials", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub scan: ScanCommand,

    /// Enable verbose output
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,

    /// Path to custom settings file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Load settings and execute the scan.
    pub async fn run(&self) -> CliResult<()> {
        let settings = Settings::load(self.config.as_deref())?;
        self.scan.execute(&settings, self.quiet).await
    }
}

/// Output format for results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// JSON structured output
    Json,
    /// CSV format for data analysis
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Table => write!(f, "table"),
            Self::Json => write!(f, "json"),
            Self::Csv => write!(f, "csv"),
        }
    }
}
