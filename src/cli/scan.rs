//! Scan command implementation.
//!
//! Wires settings and flags into discovery, credential resolution,
//! inspection and output.

use crate::auth::{explicit_pair, CredentialPrompt, TerminalPrompt};
use crate::cli::OutputFormat;
use crate::config::Settings;
use crate::discovery::{Discovery, DiscoveryConfig, DiscoveryMode, MulticastScanner, RangeScanner};
use crate::error::{CliError, CliResult};
use crate::inventory::{build_inventory, Inventory};
use crate::network::SystemAttachments;
use crate::onvif::OnvifClient;
use crate::output;
use crate::scan::{self, Collaborators, RunConfig};
use crate::types::PortList;
use clap::Args;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

/// Discover cameras and audit their credentials.
#[derive(Args, Debug)]
pub struct ScanCommand {
    /// Discovery strategy
    #[arg(short, long, value_enum, default_value = "auto")]
    pub mode: DiscoveryMode,

    /// Subnet to sweep in CIDR notation (default: subnets of local interfaces)
    #[arg(short, long, value_name = "CIDR")]
    pub subnet: Option<String>,

    /// Username to try before the default credentials
    #[arg(short, long, env = "CAMSCOUT_USER")]
    pub user: Option<String>,

    /// Password to try before the default credentials
    #[arg(short, long, env = "CAMSCOUT_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// File the JSON inventory is exported to
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format for results
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Multicast listen window in milliseconds
    #[arg(short = 't', long, value_name = "MS")]
    pub timeout: Option<u64>,

    /// Additional multicast probes per interface
    #[arg(long)]
    pub retries: Option<u32>,

    /// HTTP probe timeout during the range sweep in milliseconds
    #[arg(long, value_name = "MS")]
    pub probe_timeout: Option<u64>,

    /// Maximum number of hosts probed concurrently
    #[arg(short, long)]
    pub concurrency: Option<usize>,

    /// Candidate ports probed on every host (e.g., "80,8080,8000")
    #[arg(long)]
    pub ports: Option<String>,

    /// Hosts started per second during the sweep (0 = unlimited)
    #[arg(short, long)]
    pub rate: Option<u32>,

    /// Network interface to discover on (default: all)
    #[arg(short, long)]
    pub interface: Option<String>,

    /// Port of the ONVIF device service
    #[arg(long)]
    pub onvif_port: Option<u16>,

    /// Never prompt for credentials
    #[arg(long)]
    pub no_interactive: bool,

    /// Skip profile, stream and PTZ queries
    #[arg(long)]
    pub no_inspect: bool,
}

impl ScanCommand {
    /// Execute the scan command.
    pub async fn execute(&self, settings: &Settings, quiet: bool) -> CliResult<()> {
        let config = self.run_config(settings)?;
        let ports = match &self.ports {
            Some(spec) => PortList::parse(spec)?,
            None => settings.port_list()?,
        };
        debug!(ports = %ports, "Candidate ports");

        let show_progress = !quiet && self.format == OutputFormat::Table;
        let range = RangeScanner::new()?
            .with_ports(ports)
            .with_signature(settings.signature())
            .with_rate_limit(self.rate.unwrap_or(settings.rate_limit))
            .with_progress(show_progress);
        let discovery = Discovery::with_scanners(MulticastScanner::new(), range);

        let attachments = match &self.interface {
            Some(name) => SystemAttachments::for_interface(name.as_str()),
            None => SystemAttachments::new(),
        };
        let inspector = OnvifClient::new(
            self.onvif_port.unwrap_or(settings.onvif_port),
            settings.inspect_timeout(),
        )?;
        let terminal = TerminalPrompt::new();
        let prompt: &dyn CredentialPrompt = &terminal;

        if !quiet && self.format == OutputFormat::Table {
            output::print_scan_header(&config.discovery.mode.to_string(), self.subnet.as_deref());
        }

        let report = scan::run(
            &config,
            Collaborators {
                discovery: &discovery,
                attachments: &attachments,
                inspector: &inspector,
                prompt: Some(prompt),
            },
        )
        .await;

        if report.addresses.is_empty() && !quiet {
            output::print_warning("No devices found.");
        }

        let cameras = build_inventory(report.resolutions, !self.no_inspect).await;
        let inventory = Inventory::new(report.started_at, cameras);

        output::print_inventory(&inventory, self.format)?;

        let path = self.output.clone().unwrap_or_else(|| settings.output_file.clone());
        let exported = output::export_json(&inventory.cameras, &path);

        if !quiet {
            output::print_info(&inventory.summary());
            if exported {
                output::print_success(&format!("Inventory saved to {}", path.display()));
            } else {
                output::print_error(&format!("Could not save inventory to {}", path.display()));
            }
        }

        Ok(())
    }

    /// Merge flags over settings.
    fn run_config(&self, settings: &Settings) -> CliResult<RunConfig> {
        let max_concurrency = self.concurrency.unwrap_or(settings.max_concurrency);
        if max_concurrency == 0 {
            return Err(CliError::Other("concurrency must be at least 1".to_string()));
        }

        let multicast_timeout = self
            .timeout
            .map_or_else(|| settings.multicast_timeout(), Duration::from_millis);
        let probe_timeout = self
            .probe_timeout
            .map_or_else(|| settings.probe_timeout(), Duration::from_millis);
        if multicast_timeout.is_zero() || probe_timeout.is_zero() {
            return Err(CliError::Other("timeouts must be positive".to_string()));
        }

        let explicit = explicit_pair(self.user.as_deref(), self.password.as_deref());
        if explicit.is_none() && (self.user.is_some() || self.password.is_some()) {
            warn!("Both --user and --password are needed for explicit credentials, ignoring");
        }

        Ok(RunConfig {
            discovery: DiscoveryConfig {
                mode: self.mode,
                subnet: self.subnet.clone(),
                multicast_timeout,
                retries: self.retries.unwrap_or(settings.multicast_retries),
                probe_timeout,
                max_concurrency,
            },
            explicit,
            default_credentials: settings.default_credentials.clone(),
            interactive: !self.no_interactive,
        })
    }
}
