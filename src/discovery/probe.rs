//! WS-Discovery probe codec.
//!
//! Builds the SOAP 1.2 `Probe` message sent to the multicast group and
//! extracts service addresses (`XAddrs`) from `ProbeMatch` responses.
//! Everything here is pure; the scanners own the sockets.

use crate::error::{DiscoveryError, DiscoveryResult};
use crate::types::MessageId;
use crate::xml;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, SocketAddrV4};

/// The well-known WS-Discovery multicast group and port.
pub const WS_DISCOVERY_GROUP: SocketAddrV4 =
    SocketAddrV4::new(Ipv4Addr::new(239, 255, 255, 250), 3702);

const DISCOVERY_TO: &str = "urn:schemas-xmlsoap-org:ws:2005:04:discovery";
const PROBE_ACTION: &str = "http://schemas.xmlsoap.org/ws/2005/04/discovery/Probe";

/// An encoded probe together with its message id.
#[derive(Debug, Clone)]
pub struct ProbeMessage {
    id: MessageId,
    body: String,
}

impl ProbeMessage {
    /// Message id carried in the WS-Addressing header.
    ///
    /// Responses are not correlated against it; any `ProbeMatch` received
    /// during the listen window is accepted.
    pub fn id(&self) -> MessageId {
        self.id
    }

    /// Wire bytes of the envelope.
    pub fn as_bytes(&self) -> &[u8] {
        self.body.as_bytes()
    }

    /// The envelope as text.
    pub fn as_str(&self) -> &str {
        &self.body
    }
}

/// Build a probe for `NetworkVideoTransmitter` devices with a fresh message id.
pub fn build_probe() -> ProbeMessage {
    let id = MessageId::new();
    let body = format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8"?>"#,
            r#"<e:Envelope xmlns:e="http://www.w3.org/2003/05/soap-envelope""#,
            r#" xmlns:w="http://schemas.xmlsoap.org/ws/2004/08/addressing""#,
            r#" xmlns:d="http://schemas.xmlsoap.org/ws/2005/04/discovery""#,
            r#" xmlns:dn="http://www.onvif.org/ver10/network/wsdl">"#,
            "<e:Header>",
            "<w:MessageID>{id}</w:MessageID>",
            r#"<w:To e:mustUnderstand="true">{to}</w:To>"#,
            r#"<w:Action e:mustUnderstand="true">{action}</w:Action>"#,
            "</e:Header>",
            "<e:Body>",
            "<d:Probe><d:Types>dn:NetworkVideoTransmitter</d:Types></d:Probe>",
            "</e:Body>",
            "</e:Envelope>",
        ),
        id = id.urn(),
        to = DISCOVERY_TO,
        action = PROBE_ACTION,
    );

    ProbeMessage { id, body }
}

/// Extract every service URI from a probe response.
///
/// The `XAddrs` element is matched case-insensitively under any namespace
/// prefix and its content split on whitespace. Returns an error for
/// payloads that are not UTF-8 or not well-formed XML; a well-formed
/// response without `XAddrs` yields an empty list.
pub fn decode_response(payload: &[u8]) -> DiscoveryResult<Vec<String>> {
    let text = std::str::from_utf8(payload)
        .map_err(|e| DiscoveryError::Protocol(format!("payload is not UTF-8: {}", e)))?;
    let doc = xml::parse(text).map_err(|e| DiscoveryError::Protocol(e.to_string()))?;

    Ok(doc
        .descendants()
        .filter(|e| e.name().eq_ignore_ascii_case("xaddrs"))
        .flat_map(|e| e.text().split_whitespace())
        .map(str::to_owned)
        .collect())
}

/// Infallible form of [`decode_response`]: malformed payloads yield no URIs.
pub fn parse_response(payload: &[u8]) -> Vec<String> {
    decode_response(payload).unwrap_or_default()
}

/// IPv4 hosts named by the service URIs, in order and without repeats.
///
/// When no URI names an IPv4 host the responder's own address is the only
/// candidate.
pub fn candidate_hosts(uris: &[String], sender: SocketAddr) -> Vec<Ipv4Addr> {
    let mut hosts: Vec<Ipv4Addr> = Vec::new();

    for uri in uris {
        let host = reqwest::Url::parse(uri)
            .ok()
            .and_then(|url| url.host_str().and_then(|h| h.parse::<Ipv4Addr>().ok()));

        if let Some(host) = host {
            if !hosts.contains(&host) {
                hosts.push(host);
            }
        }
    }

    if hosts.is_empty() {
        if let IpAddr::V4(ip) = sender.ip() {
            hosts.push(ip);
        }
    }
    hosts
}
