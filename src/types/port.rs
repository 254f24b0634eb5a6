//! Port types with validation and parsing.
//!
//! The `Port` newtype ensures values are always valid port numbers (1-65535).
//! `PortList` is an ordered, duplicate-free list of candidate ports.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A validated network port number (1-65535).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct Port(u16);

impl Port {
    /// Minimum valid port number.
    pub const MIN: u16 = 1;
    /// Maximum valid port number.
    pub const MAX: u16 = 65535;

    /// Create a new Port from a u16, returning None if invalid.
    #[inline]
    pub const fn new(port: u16) -> Option<Self> {
        if port >= Self::MIN {
            Some(Self(port))
        } else {
            None
        }
    }

    /// Get the raw port number.
    #[inline]
    pub const fn as_u16(self) -> u16 {
        self.0
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u16> for Port {
    type Error = PortError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(PortError::OutOfRange(value))
    }
}

impl From<Port> for u16 {
    fn from(port: Port) -> Self {
        port.0
    }
}

/// Error type for port parsing and validation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PortError {
    #[error("port {0} is out of valid range (1-65535)")]
    OutOfRange(u16),
    #[error("invalid port number: {0}")]
    InvalidFormat(String),
    #[error("invalid port range: start ({0}) > end ({1})")]
    InvalidRange(u16, u16),
    #[error("empty port specification")]
    Empty,
}

/// Ports probed on every host by the range scanner, in probe order.
pub const DEFAULT_CANDIDATE_PORTS: [u16; 6] = [80, 8080, 8000, 8888, 5005, 37777];

/// An ordered list of ports without duplicates.
///
/// Unlike a plain port set, the order given by the user is kept: the range
/// scanner stops at the first port that answers, so order decides which
/// port is tried first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortList(Vec<Port>);

impl PortList {
    /// Build a list from raw values, dropping duplicates but keeping order.
    pub fn from_values(values: &[u16]) -> Result<Self, PortError> {
        let mut ports = Vec::with_capacity(values.len());
        for &value in values {
            let port = Port::try_from(value)?;
            if !ports.contains(&port) {
                ports.push(port);
            }
        }

        if ports.is_empty() {
            return Err(PortError::Empty);
        }
        Ok(Self(ports))
    }

    /// Parse a specification like "80,8080,8000-8002".
    pub fn parse(spec: &str) -> Result<Self, PortError> {
        let mut values = Vec::new();

        for part in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            if let Some((start, end)) = part.split_once('-') {
                let start = parse_port_number(start)?;
                let end = parse_port_number(end)?;
                if start > end {
                    return Err(PortError::InvalidRange(start, end));
                }
                values.extend(start..=end);
            } else {
                values.push(parse_port_number(part)?);
            }
        }

        Self::from_values(&values)
    }

    /// The ports, in probe order.
    pub fn ports(&self) -> &[Port] {
        &self.0
    }

    /// Consume the list.
    pub fn into_vec(self) -> Vec<Port> {
        self.0
    }
}

impl Default for PortList {
    fn default() -> Self {
        Self(
            DEFAULT_CANDIDATE_PORTS
                .iter()
                .copied()
                .filter_map(Port::new)
                .collect(),
        )
    }
}

impl FromStr for PortList {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PortList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(Port::to_string).collect();
        write!(f, "{}", parts.join(","))
    }
}

fn parse_port_number(s: &str) -> Result<u16, PortError> {
    let s = s.trim();
    s.parse::<u16>()
        .map_err(|_| PortError::InvalidFormat(s.to_string()))
        .and_then(|p| Port::try_from(p).map(Port::as_u16))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_validation() {
        assert!(Port::new(0).is_none());
        assert_eq!(Port::new(80).unwrap().as_u16(), 80);
        assert!(matches!(Port::try_from(0), Err(PortError::OutOfRange(0))));
    }

    #[test]
    fn test_default_candidates_keep_order() {
        let values: Vec<u16> = PortList::default().ports().iter().map(|p| p.as_u16()).collect();
        assert_eq!(values, vec![80, 8080, 8000, 8888, 5005, 37777]);
    }

    #[test]
    fn test_parse_keeps_order_and_dedups() {
        let list = PortList::parse("8080, 80,8080,81-82").unwrap();
        assert_eq!(list.to_string(), "8080,80,81,82");
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(PortList::parse("90-80"), Err(PortError::InvalidRange(90, 80))));
        assert!(matches!(PortList::parse("http"), Err(PortError::InvalidFormat(_))));
        assert!(matches!(PortList::parse("0"), Err(PortError::OutOfRange(0))));
        assert!(matches!(PortList::parse(""), Err(PortError::Empty)));
    }
}
