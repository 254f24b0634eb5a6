//! WS-Discovery multicast scanner.
//!
//! Sends probes to the discovery group from one or more local attachment
//! points and collects every device that answers within the listen window.
//!
//! # Socket setup
//!
//! Each attempt owns one UDP socket built with `socket2` so the multicast
//! options can be set before binding:
//!
//! - TTL 1, probes never leave the local segment
//! - loopback enabled, so a device on the scanning host answers too
//! - outgoing interface pinned to the attachment point when one is given

use super::probe::{build_probe, candidate_hosts, decode_response, WS_DISCOVERY_GROUP};
use crate::error::DiscoveryResult;
use futures::future::join_all;
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::collections::BTreeSet;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::{debug, warn};

const MAX_DATAGRAM: usize = 65_535;

/// Multicast discovery over WS-Discovery.
#[derive(Debug, Clone)]
pub struct MulticastScanner {
    group: SocketAddrV4,
}

impl MulticastScanner {
    /// Scanner targeting the standard `239.255.255.250:3702` group.
    pub fn new() -> Self {
        Self {
            group: WS_DISCOVERY_GROUP,
        }
    }

    /// Send probes to another destination instead of the standard group.
    pub fn with_group(mut self, group: SocketAddrV4) -> Self {
        self.group = group;
        self
    }

    /// Discover devices answering a probe.
    ///
    /// With no attachment points (or an empty list) a single attempt runs on
    /// the system's default multicast route. Otherwise one attempt runs per
    /// point, concurrently, and the results are merged. Each attempt sends
    /// `retries + 1` probes and after every send listens until a receive
    /// times out.
    pub async fn discover(
        &self,
        attachment_points: Option<&[Ipv4Addr]>,
        per_attempt_timeout: Duration,
        retries: u32,
    ) -> BTreeSet<Ipv4Addr> {
        let points = match attachment_points {
            Some(points) if !points.is_empty() => points,
            _ => return self.attempt(None, per_attempt_timeout, retries).await,
        };

        let attempts = points
            .iter()
            .map(|point| self.attempt(Some(*point), per_attempt_timeout, retries));

        join_all(attempts).await.into_iter().flatten().collect()
    }

    /// One full send/listen attempt from a single attachment point.
    async fn attempt(
        &self,
        interface: Option<Ipv4Addr>,
        per_attempt_timeout: Duration,
        retries: u32,
    ) -> BTreeSet<Ipv4Addr> {
        let mut found = BTreeSet::new();

        let socket = match open_socket(interface) {
            Ok(socket) => socket,
            Err(e) => {
                warn!(
                    interface = ?interface,
                    error = %e,
                    "Could not open multicast socket, skipping attachment point"
                );
                return found;
            }
        };

        let destination = SocketAddr::V4(self.group);
        let mut buf = vec![0u8; MAX_DATAGRAM];

        for round in 0..=retries {
            let probe = build_probe();
            if let Err(e) = socket.send_to(probe.as_bytes(), destination).await {
                warn!(interface = ?interface, error = %e, "Failed to send discovery probe");
                break;
            }
            debug!(
                interface = ?interface,
                round,
                message_id = %probe.id(),
                "Sent discovery probe"
            );

            loop {
                match timeout(per_attempt_timeout, socket.recv_from(&mut buf)).await {
                    Ok(Ok((len, sender))) => match decode_response(&buf[..len]) {
                        Ok(uris) => {
                            let hosts = candidate_hosts(&uris, sender);
                            debug!(%sender, ?hosts, "Discovery response");
                            found.extend(hosts);
                        }
                        Err(e) => debug!(%sender, error = %e, "Skipping undecodable datagram"),
                    },
                    Ok(Err(e)) => {
                        debug!(interface = ?interface, error = %e, "Receive failed, ending round");
                        break;
                    }
                    // Listen window elapsed.
                    Err(_) => break,
                }
            }
        }

        found
    }
}

impl Default for MulticastScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the UDP socket used for one attempt.
fn open_socket(interface: Option<Ipv4Addr>) -> DiscoveryResult<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_multicast_ttl_v4(1)?;
    socket.set_multicast_loop_v4(true)?;

    let local = interface.unwrap_or(Ipv4Addr::UNSPECIFIED);
    if let Some(iface) = interface {
        socket.set_multicast_if_v4(&iface)?;
    }
    socket.bind(&SockAddr::from(SocketAddrV4::new(local, 0)))?;
    socket.set_nonblocking(true)?;

    let socket: std::net::UdpSocket = socket.into();
    Ok(UdpSocket::from_std(socket)?)
}
