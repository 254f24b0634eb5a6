//! Scan inventory: one record per discovered address.
//!
//! Authenticated devices carry what inspection found; every other address
//! gets a placeholder so the inventory always accounts for every device
//! discovery turned up. Passwords never make it into a record.

use crate::auth::{AuthOutcome, Resolution};
use crate::onvif::{
    CameraDetails, DeviceIdentity, DeviceSession, InspectionStatus, PtzInfo, StreamProfile,
};
use crate::types::CredentialTier;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use tracing::info;

/// Authentication result as recorded in the inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthStatus {
    Authenticated,
    Failed,
    Skipped,
}

impl From<&AuthOutcome> for AuthStatus {
    fn from(outcome: &AuthOutcome) -> Self {
        match outcome {
            AuthOutcome::Authenticated(_) => Self::Authenticated,
            AuthOutcome::Failed => Self::Failed,
            AuthOutcome::Skipped => Self::Skipped,
        }
    }
}

impl fmt::Display for AuthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authenticated => write!(f, "authenticated"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

/// Inventory entry for one address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraRecord {
    pub ip: Ipv4Addr,
    pub auth_status: AuthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_tier: Option<CredentialTier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub identity: DeviceIdentity,
    pub profiles: Vec<StreamProfile>,
    pub ptz: PtzInfo,
    pub inspection_status: InspectionStatus,
}

impl CameraRecord {
    /// Record for an address without a session.
    pub fn placeholder(ip: Ipv4Addr, auth_status: AuthStatus) -> Self {
        Self {
            ip,
            auth_status,
            credential_tier: None,
            username: None,
            identity: DeviceIdentity::default(),
            profiles: Vec::new(),
            ptz: PtzInfo::unsupported(),
            inspection_status: InspectionStatus::Unauthenticated,
        }
    }

    /// Record for an authenticated device.
    pub fn authenticated(
        ip: Ipv4Addr,
        tier: Option<CredentialTier>,
        username: impl Into<String>,
        details: CameraDetails,
    ) -> Self {
        Self {
            ip,
            auth_status: AuthStatus::Authenticated,
            credential_tier: tier,
            username: Some(username.into()),
            identity: details.identity,
            profiles: details.profiles,
            ptz: details.ptz,
            inspection_status: details.status,
        }
    }

    pub fn manufacturer(&self) -> &str {
        self.identity.manufacturer.as_deref().unwrap_or("Unknown")
    }

    pub fn model(&self) -> &str {
        self.identity.model.as_deref().unwrap_or("Unknown")
    }

    /// Profiles with a known RTSP URI.
    pub fn stream_count(&self) -> usize {
        self.profiles.iter().filter(|p| p.rtsp_uri.is_some()).count()
    }
}

/// Result of a complete run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inventory {
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub cameras: Vec<CameraRecord>,
}

impl Inventory {
    pub fn new(started_at: DateTime<Utc>, cameras: Vec<CameraRecord>) -> Self {
        Self {
            started_at,
            completed_at: Utc::now(),
            cameras,
        }
    }

    pub fn authenticated(&self) -> usize {
        self.cameras
            .iter()
            .filter(|c| c.auth_status == AuthStatus::Authenticated)
            .count()
    }

    pub fn duration_ms(&self) -> i64 {
        (self.completed_at - self.started_at).num_milliseconds()
    }

    /// One-line summary of the run.
    pub fn summary(&self) -> String {
        format!(
            "{} device(s) found, {} authenticated [{:.2}s]",
            self.cameras.len(),
            self.authenticated(),
            self.duration_ms() as f64 / 1000.0
        )
    }
}

/// An authenticated session the inventory can read camera details from.
#[async_trait]
pub trait CameraSession: Send + Sync {
    /// Username the session was opened with.
    fn username(&self) -> &str;

    /// Identity read when the session was opened.
    fn identity(&self) -> &DeviceIdentity;

    /// Query profiles, streams and PTZ support.
    async fn inspect(&self) -> CameraDetails;
}

#[async_trait]
impl CameraSession for DeviceSession {
    fn username(&self) -> &str {
        &self.credentials().username
    }

    fn identity(&self) -> &DeviceIdentity {
        DeviceSession::identity(self)
    }

    async fn inspect(&self) -> CameraDetails {
        DeviceSession::inspect(self).await
    }
}

/// Turn resolutions into inventory records, inspecting authenticated
/// devices when `inspect` is set.
pub async fn build_inventory<S: CameraSession>(
    resolutions: Vec<Resolution<S>>,
    inspect: bool,
) -> Vec<CameraRecord> {
    let mut records = Vec::with_capacity(resolutions.len());

    for resolution in resolutions {
        let status = AuthStatus::from(&resolution.outcome);
        let record = match resolution.session {
            Some(session) => {
                let details = if inspect {
                    info!(address = %resolution.address, "Inspecting camera");
                    session.inspect().await
                } else {
                    CameraDetails {
                        identity: session.identity().clone(),
                        profiles: Vec::new(),
                        ptz: PtzInfo::unsupported(),
                        status: InspectionStatus::IncompleteData,
                    }
                };
                CameraRecord::authenticated(
                    resolution.address,
                    resolution.tier,
                    session.username(),
                    details,
                )
            }
            None => CameraRecord::placeholder(resolution.address, status),
        };
        records.push(record);
    }

    records
}
