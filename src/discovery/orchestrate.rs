//! Discovery orchestration.

use super::multicast::MulticastScanner;
use super::range::{parse_subnet, HttpProber, RangeScanner, ServiceProber};
use crate::error::DiscoveryResult;
use crate::network::NetworkAttachments;
use crate::types::Subnet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::net::Ipv4Addr;
use std::time::Duration;
use tracing::{info, warn};

/// Which discovery strategies to run.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryMode {
    /// Multicast, plus a range sweep of every known subnet.
    #[default]
    Auto,
    /// Multicast only.
    #[value(alias = "ws-discovery")]
    Multicast,
    /// Range sweep only.
    #[value(alias = "ip-range")]
    Range,
}

impl DiscoveryMode {
    fn uses_multicast(self) -> bool {
        matches!(self, Self::Auto | Self::Multicast)
    }

    fn uses_range(self) -> bool {
        matches!(self, Self::Auto | Self::Range)
    }
}

impl fmt::Display for DiscoveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Multicast => write!(f, "multicast"),
            Self::Range => write!(f, "range"),
        }
    }
}

impl std::str::FromStr for DiscoveryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "multicast" | "ws-discovery" => Ok(Self::Multicast),
            "range" | "ip-range" => Ok(Self::Range),
            _ => Err(format!("unknown discovery mode: {}", s)),
        }
    }
}

/// Parameters of one discovery run.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    pub mode: DiscoveryMode,
    /// Subnet to sweep. Range mode sweeps only this one when given; auto mode
    /// adds it to the detected local subnets.
    pub subnet: Option<String>,
    /// Listen window after each multicast probe.
    pub multicast_timeout: Duration,
    /// Additional multicast probes per attachment point.
    pub retries: u32,
    /// Timeout of each HTTP probe during the sweep.
    pub probe_timeout: Duration,
    /// Hosts probed concurrently during the sweep.
    pub max_concurrency: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            mode: DiscoveryMode::Auto,
            subnet: None,
            multicast_timeout: Duration::from_secs(2),
            retries: 1,
            probe_timeout: Duration::from_secs(1),
            max_concurrency: 50,
        }
    }
}

/// Runs the discovery strategies and merges their results.
pub struct Discovery<P = HttpProber> {
    multicast: MulticastScanner,
    range: RangeScanner<P>,
}

impl Discovery<HttpProber> {
    /// Discovery against the real network with default scanners.
    pub fn new() -> DiscoveryResult<Self> {
        Ok(Self::with_scanners(MulticastScanner::new(), RangeScanner::new()?))
    }
}

impl<P: ServiceProber> Discovery<P> {
    pub fn with_scanners(multicast: MulticastScanner, range: RangeScanner<P>) -> Self {
        Self { multicast, range }
    }

    /// Discover devices according to `config.mode`.
    ///
    /// Scanner failures never surface here; each scanner absorbs its own
    /// errors and this returns the union of whatever they found.
    pub async fn orchestrate(
        &self,
        config: &DiscoveryConfig,
        attachments: &dyn NetworkAttachments,
    ) -> BTreeSet<Ipv4Addr> {
        let mut found = BTreeSet::new();

        if config.mode.uses_multicast() {
            let points = attachments.local_addresses();
            info!(attachment_points = points.len(), "Starting multicast discovery");

            let hosts = self
                .multicast
                .discover(Some(points.as_slice()), config.multicast_timeout, config.retries)
                .await;
            info!(found = hosts.len(), "Multicast discovery complete");
            found.extend(hosts);
        }

        if config.mode.uses_range() {
            let subnets = subnets_to_sweep(config, attachments);
            if subnets.is_empty() {
                info!("No subnet given or detected, skipping range scan");
            }

            for subnet in subnets {
                let hosts = self
                    .range
                    .scan_subnet(subnet, config.probe_timeout, config.max_concurrency)
                    .await;
                found.extend(hosts);
            }
        }

        info!(mode = %config.mode, devices = found.len(), "Discovery complete");
        found
    }
}

/// Subnets the range sweep covers, each once.
///
/// In range mode an explicit subnet replaces the detected ones; auto mode
/// sweeps the explicit subnet alongside them.
fn subnets_to_sweep(config: &DiscoveryConfig, attachments: &dyn NetworkAttachments) -> Vec<Subnet> {
    let mut subnets = Vec::new();

    if let Some(explicit) = &config.subnet {
        match parse_subnet(explicit) {
            Ok(subnet) => subnets.push(subnet),
            Err(e) => warn!(subnet = %explicit, error = %e, "Skipping range scan"),
        }
    }

    if config.subnet.is_none() || config.mode == DiscoveryMode::Auto {
        subnets.extend(
            attachments
                .local_subnets()
                .into_iter()
                .filter_map(|net| Subnet::from_network(net).ok()),
        );
    }

    subnets.sort_by_key(|subnet| (subnet.network().network(), subnet.network().prefix()));
    subnets.dedup();
    subnets
}
