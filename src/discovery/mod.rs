//! Device discovery.
//!
//! Two strategies find candidate devices:
//!
//! - [`multicast`]: WS-Discovery probes sent to the multicast group
//! - [`range`]: an active sweep of a CIDR block for the device service
//!
//! [`orchestrate`] runs them according to the selected [`DiscoveryMode`]
//! and merges what they find into one sorted, duplicate-free set.

pub mod multicast;
pub mod orchestrate;
pub mod probe;
pub mod range;
pub mod rate_limiter;

pub use multicast::MulticastScanner;
pub use orchestrate::{Discovery, DiscoveryConfig, DiscoveryMode};
pub use probe::{build_probe, candidate_hosts, decode_response, parse_response, ProbeMessage};
pub use range::{HttpProber, RangeScanner, ServiceProber, ServiceSignature};
pub use rate_limiter::RateLimiter;
