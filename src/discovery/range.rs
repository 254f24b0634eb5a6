//! Active range scanner.
//!
//! Sweeps every usable host of an IPv4 CIDR block, checking a fixed ordered
//! list of candidate ports for something that answers like an ONVIF device
//! service. A bounded stream (`buffer_unordered`) caps the number of hosts
//! in flight.

use super::rate_limiter::RateLimiter;
use crate::error::{DiscoveryError, DiscoveryResult};
use crate::types::{Port, PortList, ScanTarget, Subnet, TargetError};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, trace, warn};

/// Timeout of the TCP reachability check done before each HTTP probe.
pub const CONNECT_CHECK_TIMEOUT: Duration = Duration::from_millis(200);

/// Path of the ONVIF device management service.
pub const DEVICE_SERVICE_PATH: &str = "/onvif/device_service";

/// HTTP statuses that mark a port as hosting a device service.
///
/// A device answering the unauthenticated `GET` with an auth challenge, a
/// SOAP fault or a method error still reveals the service, so the default
/// list goes well beyond `200`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSignature {
    statuses: Vec<u16>,
}

impl ServiceSignature {
    /// Statuses accepted by the default signature.
    pub const DEFAULT_STATUSES: [u16; 5] = [200, 400, 401, 405, 500];

    /// Signature accepting exactly the given statuses.
    pub fn new(statuses: impl IntoIterator<Item = u16>) -> Self {
        let mut statuses: Vec<u16> = statuses.into_iter().collect();
        statuses.sort_unstable();
        statuses.dedup();
        Self { statuses }
    }

    /// Whether `status` identifies a device service.
    pub fn matches(&self, status: u16) -> bool {
        self.statuses.binary_search(&status).is_ok()
    }

    /// Accepted statuses, ascending.
    pub fn statuses(&self) -> &[u16] {
        &self.statuses
    }
}

impl Default for ServiceSignature {
    fn default() -> Self {
        Self::new(Self::DEFAULT_STATUSES)
    }
}

/// Network operations performed by the range scanner.
#[async_trait]
pub trait ServiceProber: Send + Sync {
    /// Whether a TCP connection to `addr` succeeds within `timeout`.
    async fn port_open(&self, addr: SocketAddrV4, timeout: Duration) -> bool;

    /// HTTP status of `GET http://<addr>/onvif/device_service`.
    async fn service_status(&self, addr: SocketAddrV4, timeout: Duration) -> DiscoveryResult<u16>;
}

/// Prober talking to the real network.
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: reqwest::Client,
}

impl HttpProber {
    /// Create a prober with its own HTTP client.
    ///
    /// Proxies are disabled; LAN devices must be reached directly.
    pub fn new() -> DiscoveryResult<Self> {
        let client = reqwest::Client::builder()
            .no_proxy()
            .build()
            .map_err(|e| DiscoveryError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ServiceProber for HttpProber {
    async fn port_open(&self, addr: SocketAddrV4, connect_timeout: Duration) -> bool {
        matches!(
            timeout(connect_timeout, TcpStream::connect(addr)).await,
            Ok(Ok(_))
        )
    }

    async fn service_status(&self, addr: SocketAddrV4, probe_timeout: Duration) -> DiscoveryResult<u16> {
        let url = format!("http://{}:{}{}", addr.ip(), addr.port(), DEVICE_SERVICE_PATH);

        let response = self
            .client
            .get(&url)
            .timeout(probe_timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DiscoveryError::Timeout
                } else {
                    DiscoveryError::Transport(e.to_string())
                }
            })?;

        Ok(response.status().as_u16())
    }
}

/// Validate a subnet given on the command line or in settings.
///
/// Blocks larger than [`Subnet::MAX_ADDRESSES`] are refused rather than
/// truncated.
pub fn parse_subnet(subnet: &str) -> DiscoveryResult<Subnet> {
    Subnet::parse(subnet).map_err(|e| match e {
        TargetError::CidrTooLarge(size, max) => DiscoveryError::Config(format!(
            "subnet {} is too large to sweep ({} addresses, max {})",
            subnet.trim(),
            size,
            max
        )),
        other => DiscoveryError::Config(other.to_string()),
    })
}

/// Concurrent sweep of a subnet for device services.
pub struct RangeScanner<P = HttpProber> {
    prober: P,
    ports: Arc<[Port]>,
    signature: ServiceSignature,
    rate_limiter: Option<RateLimiter>,
    show_progress: bool,
}

impl RangeScanner<HttpProber> {
    /// Scanner probing the real network with the default ports and signature.
    pub fn new() -> DiscoveryResult<Self> {
        Ok(Self::with_prober(HttpProber::new()?))
    }
}

impl<P: ServiceProber> RangeScanner<P> {
    /// Scanner using a custom prober.
    pub fn with_prober(prober: P) -> Self {
        Self {
            prober,
            ports: PortList::default().into_vec().into(),
            signature: ServiceSignature::default(),
            rate_limiter: None,
            show_progress: false,
        }
    }

    /// Override the candidate ports (probe order is list order).
    pub fn with_ports(mut self, ports: PortList) -> Self {
        self.ports = ports.into_vec().into();
        self
    }

    /// Override the service signature.
    pub fn with_signature(mut self, signature: ServiceSignature) -> Self {
        self.signature = signature;
        self
    }

    /// Limit how many hosts are started per second; 0 means unlimited.
    pub fn with_rate_limit(mut self, hosts_per_second: u32) -> Self {
        self.rate_limiter = RateLimiter::new(hosts_per_second);
        self
    }

    /// Show a progress bar on stderr while sweeping.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Candidate ports in probe order.
    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    /// Sweep `subnet` and return the hosts that look like devices, sorted.
    ///
    /// An unparseable or oversized subnet is logged and yields nothing.
    pub async fn scan(
        &self,
        subnet: &str,
        per_probe_timeout: Duration,
        max_concurrency: usize,
    ) -> Vec<Ipv4Addr> {
        match parse_subnet(subnet) {
            Ok(subnet) => {
                self.scan_subnet(subnet, per_probe_timeout, max_concurrency)
                    .await
            }
            Err(e) => {
                warn!(subnet, error = %e, "Skipping range scan");
                Vec::new()
            }
        }
    }

    /// Sweep an already validated subnet.
    pub async fn scan_subnet(
        &self,
        subnet: Subnet,
        per_probe_timeout: Duration,
        max_concurrency: usize,
    ) -> Vec<Ipv4Addr> {
        info!(
            %subnet,
            hosts = subnet.host_count(),
            ports = self.ports.len(),
            "Starting range scan"
        );

        let progress = self.show_progress.then(|| progress_bar(subnet.host_count()));

        let mut found: Vec<Ipv4Addr> = stream::iter(subnet.hosts())
            .map(|host| {
                let target = ScanTarget::new(host, Arc::clone(&self.ports));
                let progress = progress.clone();

                async move {
                    if let Some(limiter) = &self.rate_limiter {
                        limiter.wait().await;
                    }

                    let hit = self.probe_host(&target, per_probe_timeout).await;

                    if let Some(pb) = &progress {
                        pb.inc(1);
                        if hit {
                            pb.set_message(format!("found {}", target));
                        }
                    }
                    hit.then_some(target.host)
                }
            })
            .buffer_unordered(max_concurrency.max(1))
            .filter_map(|hit| async move { hit })
            .collect()
            .await;

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }

        found.sort_unstable();
        info!(%subnet, found = found.len(), "Range scan complete");
        found
    }

    /// Check the candidate ports of one host in order; stop at the first hit.
    async fn probe_host(&self, target: &ScanTarget, per_probe_timeout: Duration) -> bool {
        for port in target.ports.iter() {
            let addr = SocketAddrV4::new(target.host, port.as_u16());

            if !self.prober.port_open(addr, CONNECT_CHECK_TIMEOUT).await {
                continue;
            }

            match self.prober.service_status(addr, per_probe_timeout).await {
                Ok(status) if self.signature.matches(status) => {
                    debug!(address = %target.host, port = %port, status, "Device service found");
                    return true;
                }
                Ok(status) => {
                    trace!(address = %target.host, port = %port, status, "Status does not match")
                }
                Err(e) => trace!(address = %target.host, port = %port, error = %e, "Probe failed"),
            }
        }
        false
    }
}

fn progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
    {
        pb.set_style(style.progress_chars("=>-"));
    }
    pb
}
