//! Local network attachment enumeration.
//!
//! Discovery needs two things from the host: the IPv4 addresses to send
//! multicast probes from, and the subnets to sweep when no explicit subnet
//! is given. Both come from the up, non-loopback interfaces reported by
//! `pnet::datalink`.

use ipnetwork::Ipv4Network;
use pnet::datalink;
use pnet::ipnetwork::IpNetwork;
use std::net::Ipv4Addr;
use tracing::info;

use crate::types::Subnet;

/// Source of local attachment information.
///
/// Empty results mean "no information", never an error.
pub trait NetworkAttachments: Send + Sync {
    /// IPv4 addresses usable as multicast attachment points.
    fn local_addresses(&self) -> Vec<Ipv4Addr>;

    /// Subnets the host is directly attached to.
    fn local_subnets(&self) -> Vec<Ipv4Network>;
}

/// Attachments of the running system.
#[derive(Debug, Clone, Default)]
pub struct SystemAttachments {
    interface: Option<String>,
}

impl SystemAttachments {
    /// Use every up, non-loopback interface.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict enumeration to a single named interface.
    pub fn for_interface(name: impl Into<String>) -> Self {
        Self {
            interface: Some(name.into()),
        }
    }

    fn ipv4_networks(&self) -> Vec<Ipv4Network> {
        datalink::interfaces()
            .into_iter()
            .filter(|iface| iface.is_up() && !iface.is_loopback())
            .filter(|iface| self.interface.as_deref().map_or(true, |name| iface.name == name))
            .flat_map(|iface| iface.ips)
            .filter_map(|ip| match ip {
                IpNetwork::V4(net) => Ipv4Network::new(net.ip(), net.prefix()).ok(),
                IpNetwork::V6(_) => None,
            })
            .filter(|net| !net.ip().is_loopback() && !net.ip().is_link_local())
            .collect()
    }
}

impl NetworkAttachments for SystemAttachments {
    fn local_addresses(&self) -> Vec<Ipv4Addr> {
        let mut addresses: Vec<Ipv4Addr> = self.ipv4_networks().iter().map(|n| n.ip()).collect();
        addresses.sort_unstable();
        addresses.dedup();
        addresses
    }

    fn local_subnets(&self) -> Vec<Ipv4Network> {
        sweepable_subnets(self.ipv4_networks())
    }
}

/// Fixed attachment information, for tests and explicit overrides.
#[derive(Debug, Clone, Default)]
pub struct StaticAttachments {
    addresses: Vec<Ipv4Addr>,
    subnets: Vec<Ipv4Network>,
}

impl StaticAttachments {
    pub fn new(addresses: Vec<Ipv4Addr>, subnets: Vec<Ipv4Network>) -> Self {
        Self { addresses, subnets }
    }

    /// No addresses and no subnets.
    pub fn empty() -> Self {
        Self::default()
    }
}

impl NetworkAttachments for StaticAttachments {
    fn local_addresses(&self) -> Vec<Ipv4Addr> {
        self.addresses.clone()
    }

    fn local_subnets(&self) -> Vec<Ipv4Network> {
        self.subnets.clone()
    }
}

/// Normalise interface networks to their base address and drop the ones
/// too large to sweep. Sorted, without repeats.
///
/// Anything wider than a /16 is dropped whole, so a host on a /8 corporate
/// network gets no automatic range sweep at all. An explicit subnet is the
/// way to sweep part of such a network.
pub fn sweepable_subnets(networks: impl IntoIterator<Item = Ipv4Network>) -> Vec<Ipv4Network> {
    let mut subnets: Vec<Ipv4Network> = networks
        .into_iter()
        .filter_map(|net| match Subnet::from_network(net) {
            Ok(subnet) => Some(subnet.network()),
            Err(e) => {
                info!(network = %net, error = %e, "Local network too large to sweep, skipping");
                None
            }
        })
        .collect();

    subnets.sort_by_key(|net| (net.network(), net.prefix()));
    subnets.dedup();
    subnets
}
