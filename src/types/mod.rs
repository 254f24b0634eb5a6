//! Core type definitions using newtype patterns for type safety.
//!
//! These types prevent common logic errors by making invalid states unrepresentable
//! at compile time.

mod credentials;
mod message_id;
mod port;
mod target;

pub use credentials::{default_credentials, CredentialTier, Credentials, DEFAULT_CREDENTIALS};
pub use message_id::{MessageId, MessageIdError};
pub use port::{Port, PortError, PortList, DEFAULT_CANDIDATE_PORTS};
pub use target::{ScanTarget, Subnet, TargetError};
