//! # camscout - ONVIF camera discovery and credential audit
//!
//! camscout finds IP cameras on the local network and works out which
//! credentials they accept.
//!
//! ## Features
//!
//! - **WS-Discovery**: multicast probes on every attached interface
//! - **Active Range Scan**: concurrent HTTP sweep of local subnets for ONVIF
//!   device services
//! - **Tiered Credentials**: explicit pair, factory defaults, then the operator
//! - **Inspection**: device identity, media profiles with RTSP URIs, PTZ
//! - **Multiple Output Formats**: table, JSON and CSV, plus a JSON export
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use camscout::discovery::{Discovery, DiscoveryConfig};
//! use camscout::network::SystemAttachments;
//! use camscout::onvif::OnvifClient;
//! use camscout::scan::{self, Collaborators, RunConfig};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let discovery = Discovery::new()?;
//!     let inspector = OnvifClient::new(80, Duration::from_secs(5))?;
//!     let attachments = SystemAttachments::new();
//!
//!     let report = scan::run(
//!         &RunConfig::default(),
//!         Collaborators {
//!             discovery: &discovery,
//!             attachments: &attachments,
//!             inspector: &inspector,
//!             prompt: None,
//!         },
//!     )
//!     .await;
//!
//!     for resolution in &report.resolutions {
//!         println!("{} {:?}", resolution.address, resolution.outcome);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`types`] - Core type definitions with newtype patterns for type safety
//! - [`discovery`] - WS-Discovery codec, multicast and range scanners
//! - [`network`] - Local interface and subnet detection
//! - [`auth`] - Tiered credential resolution
//! - [`onvif`] - SOAP client for device, media and PTZ services
//! - [`scan`] - Discovery followed by resolution, as one run
//! - [`inventory`] - Per-device records built from a run
//! - [`config`] - Settings file handling
//! - [`error`] - Error types
//! - [`output`] - Output formatting utilities

pub mod auth;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod error;
pub mod inventory;
pub mod network;
pub mod onvif;
pub mod output;
pub mod scan;
pub mod types;
pub mod xml;

// Re-export commonly used types
pub use auth::{AuthOutcome, CredentialResolver, DeviceInspector, Resolution};
pub use discovery::{Discovery, DiscoveryConfig, DiscoveryMode};
pub use error::{AuthError, CliError, DiscoveryError};
pub use inventory::{CameraRecord, Inventory};
pub use scan::{run, RunConfig, ScanReport};
pub use types::{Credentials, Port, PortList, Subnet};
