//! Subnet and scan target types.
//!
//! The range scanner takes IPv4 CIDR blocks as input and hands each worker
//! a `ScanTarget`: one host plus the ports to probe on it.

use ipnetwork::Ipv4Network;
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use std::sync::Arc;

use super::Port;

/// Error type for subnet parsing.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TargetError {
    #[error("invalid CIDR notation: {0}")]
    InvalidCidr(String),
    #[error("only IPv4 subnets can be scanned: {0}")]
    NotIpv4(String),
    #[error("CIDR range too large: {0} addresses (max: {1})")]
    CidrTooLarge(u64, u64),
}

/// An IPv4 CIDR block to sweep.
///
/// Parsing is lenient about host bits: `192.168.1.17/24` denotes the same
/// block as `192.168.1.0/24`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subnet(Ipv4Network);

impl Subnet {
    /// Maximum number of addresses allowed in a subnet (a /16).
    pub const MAX_ADDRESSES: u64 = 65536;

    /// Parse a subnet from CIDR notation.
    pub fn parse(s: &str) -> Result<Self, TargetError> {
        let s = s.trim();
        let (addr, prefix) = s
            .split_once('/')
            .ok_or_else(|| TargetError::InvalidCidr(s.to_string()))?;

        let addr: Ipv4Addr = addr.trim().parse().map_err(|_| {
            if addr.contains(':') {
                TargetError::NotIpv4(s.to_string())
            } else {
                TargetError::InvalidCidr(s.to_string())
            }
        })?;
        let prefix: u8 = prefix
            .trim()
            .parse()
            .map_err(|_| TargetError::InvalidCidr(s.to_string()))?;

        let network =
            Ipv4Network::new(addr, prefix).map_err(|_| TargetError::InvalidCidr(s.to_string()))?;
        Self::from_network(network)
    }

    /// Wrap an already parsed network, normalising it to its base address.
    pub fn from_network(network: Ipv4Network) -> Result<Self, TargetError> {
        let size = address_count(network.prefix());
        if size > Self::MAX_ADDRESSES {
            return Err(TargetError::CidrTooLarge(size, Self::MAX_ADDRESSES));
        }

        Ipv4Network::new(network.network(), network.prefix())
            .map(Self)
            .map_err(|_| TargetError::InvalidCidr(network.to_string()))
    }

    /// The underlying network.
    pub fn network(&self) -> Ipv4Network {
        self.0
    }

    /// Usable host addresses of this subnet.
    ///
    /// The network and broadcast addresses are excluded for prefixes shorter
    /// than /31; a /31 yields both of its addresses and a /32 its single one.
    pub fn hosts(&self) -> impl Iterator<Item = Ipv4Addr> {
        let net = self.0;
        let network = net.network();
        let broadcast = net.broadcast();
        let point_to_point = net.prefix() >= 31;

        net.iter()
            .filter(move |ip| point_to_point || (*ip != network && *ip != broadcast))
    }

    /// Number of usable host addresses.
    pub fn host_count(&self) -> u64 {
        let size = address_count(self.0.prefix());
        if self.0.prefix() >= 31 {
            size
        } else {
            size - 2
        }
    }
}

impl FromStr for Subnet {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Subnet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn address_count(prefix: u8) -> u64 {
    1u64 << (32 - u32::from(prefix.min(32)))
}

/// One host and the ordered ports a range-scan worker probes on it.
#[derive(Debug, Clone)]
pub struct ScanTarget {
    /// Host being probed.
    pub host: Ipv4Addr,
    /// Candidate ports in probe order, shared between workers.
    pub ports: Arc<[Port]>,
}

impl ScanTarget {
    /// Create a new scan target.
    pub fn new(host: Ipv4Addr, ports: Arc<[Port]>) -> Self {
        Self { host, ports }
    }
}

impl fmt::Display for ScanTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cidr() {
        let subnet = Subnet::parse("192.168.1.0/24").unwrap();
        assert_eq!(subnet.network().prefix(), 24);
        assert_eq!(subnet.to_string(), "192.168.1.0/24");
    }

    #[test]
    fn test_parse_normalises_host_bits() {
        let subnet = Subnet::parse("192.168.1.17/24").unwrap();
        assert_eq!(subnet.to_string(), "192.168.1.0/24");
    }

    #[test]
    fn test_parse_invalid() {
        for input in ["", "10.0.0.0", "10.0.0.0/33", "10.0.0/24", "abc/24", "10.0.0.0/x"] {
            assert!(
                matches!(Subnet::parse(input), Err(TargetError::InvalidCidr(_))),
                "{input} should be rejected"
            );
        }
        assert!(matches!(Subnet::parse("fe80::/64"), Err(TargetError::NotIpv4(_))));
    }

    #[test]
    fn test_cidr_too_large() {
        assert!(matches!(
            Subnet::parse("10.0.0.0/8"),
            Err(TargetError::CidrTooLarge(_, _))
        ));
        assert!(Subnet::parse("10.0.0.0/16").is_ok());
    }

    #[test]
    fn test_hosts_exclude_network_and_broadcast() {
        for cidr in ["10.0.0.0/24", "192.168.7.64/26", "172.16.0.0/30", "10.1.0.0/20"] {
            let subnet = Subnet::parse(cidr).unwrap();
            let net = subnet.network();
            let hosts: Vec<Ipv4Addr> = subnet.hosts().collect();

            assert!(!hosts.contains(&net.network()), "{cidr} network address leaked");
            assert!(!hosts.contains(&net.broadcast()), "{cidr} broadcast address leaked");
            assert_eq!(hosts.len() as u64, subnet.host_count());
        }
    }

    #[test]
    fn test_hosts_small_prefixes() {
        let slash24: Vec<Ipv4Addr> = Subnet::parse("10.0.0.0/24").unwrap().hosts().collect();
        assert_eq!(slash24.len(), 254);
        assert_eq!(slash24[0], Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(slash24[253], Ipv4Addr::new(10, 0, 0, 254));

        let slash31: Vec<Ipv4Addr> = Subnet::parse("10.0.0.0/31").unwrap().hosts().collect();
        assert_eq!(slash31, vec![Ipv4Addr::new(10, 0, 0, 0), Ipv4Addr::new(10, 0, 0, 1)]);

        let slash32: Vec<Ipv4Addr> = Subnet::parse("127.0.0.1/32").unwrap().hosts().collect();
        assert_eq!(slash32, vec![Ipv4Addr::LOCALHOST]);
    }
}
