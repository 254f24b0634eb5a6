//! End-to-end run: discovery, then credential resolution.

use crate::auth::{CredentialPrompt, CredentialResolver, DeviceInspector, Resolution};
use crate::discovery::{Discovery, DiscoveryConfig, ServiceProber};
use crate::network::NetworkAttachments;
use crate::types::{default_credentials, Credentials};
use chrono::{DateTime, Utc};
use std::net::Ipv4Addr;
use tracing::info;

/// What a run does.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub discovery: DiscoveryConfig,
    /// Pair tried before the defaults, when both halves were supplied.
    pub explicit: Option<Credentials>,
    pub default_credentials: Vec<Credentials>,
    /// Whether the operator may be prompted.
    pub interactive: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            discovery: DiscoveryConfig::default(),
            explicit: None,
            default_credentials: default_credentials(),
            interactive: true,
        }
    }
}

/// External pieces a run talks to.
pub struct Collaborators<'a, P, I> {
    pub discovery: &'a Discovery<P>,
    pub attachments: &'a dyn NetworkAttachments,
    pub inspector: &'a I,
    pub prompt: Option<&'a dyn CredentialPrompt>,
}

/// Everything a run produced.
#[derive(Debug)]
pub struct ScanReport<S> {
    pub started_at: DateTime<Utc>,
    /// Discovered addresses, sorted.
    pub addresses: Vec<Ipv4Addr>,
    /// One resolution per address, in address order.
    pub resolutions: Vec<Resolution<S>>,
}

/// Discover devices and resolve credentials for each of them.
///
/// Never fails: unreachable networks and rejected credentials only make
/// the report shorter or its outcomes less successful.
pub async fn run<P, I>(config: &RunConfig, with: Collaborators<'_, P, I>) -> ScanReport<I::Session>
where
    P: ServiceProber,
    I: DeviceInspector,
{
    let started_at = Utc::now();

    let addresses: Vec<Ipv4Addr> = with
        .discovery
        .orchestrate(&config.discovery, with.attachments)
        .await
        .into_iter()
        .collect();

    if addresses.is_empty() {
        info!("No devices found");
        return ScanReport {
            started_at,
            addresses,
            resolutions: Vec::new(),
        };
    }
    info!(devices = addresses.len(), "Resolving credentials");

    let resolver = CredentialResolver::new(config.explicit.clone())
        .with_defaults(config.default_credentials.clone());
    let prompt = with.prompt.filter(|_| config.interactive);

    let resolutions = resolver
        .resolve_all(addresses.iter().copied(), with.inspector, prompt)
        .await;

    let authenticated = resolutions
        .iter()
        .filter(|r| r.outcome.is_authenticated())
        .count();
    if authenticated == 0 {
        info!("No devices authenticated");
    }

    ScanReport {
        started_at,
        addresses,
        resolutions,
    }
}
