//! Application settings and paths.
//!
//! Settings live in `settings.json` under the XDG config directory
//! (`~/.config/camscout` on Linux) unless a file is given explicitly.
//! Every field is optional; missing ones take the built-in defaults and
//! command-line flags override whatever the file says.

use crate::discovery::ServiceSignature;
use crate::error::{ConfigError, ConfigResult};
use crate::types::{default_credentials, Credentials, PortList, DEFAULT_CANDIDATE_PORTS};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Application directory paths following the XDG Base Directory Specification.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Configuration directory (~/.config/camscout)
    pub config_dir: PathBuf,
}

impl Paths {
    /// Locate the directories of the current user.
    pub fn new() -> ConfigResult<Self> {
        let project = ProjectDirs::from("com", "camscout", "camscout")
            .ok_or(ConfigError::DirectoryNotFound)?;

        Ok(Self {
            config_dir: project.config_dir().to_path_buf(),
        })
    }

    /// Get the path to the settings file.
    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("settings.json")
    }
}

/// Tunables of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Listen window after each multicast probe, in milliseconds.
    pub multicast_timeout_ms: u64,
    /// Additional multicast probes per attachment point.
    pub multicast_retries: u32,
    /// HTTP probe timeout during the range sweep, in milliseconds.
    pub probe_timeout_ms: u64,
    /// Hosts probed concurrently during the range sweep.
    pub max_concurrency: usize,
    /// Hosts started per second during the sweep, 0 for unlimited.
    pub rate_limit: u32,
    /// Ports checked on every host, in order.
    pub candidate_ports: Vec<u16>,
    /// HTTP statuses that identify a device service.
    pub signature_statuses: Vec<u16>,
    /// Factory credentials tried on every device, in order.
    pub default_credentials: Vec<Credentials>,
    /// Port of the ONVIF device service.
    pub onvif_port: u16,
    /// Timeout of each ONVIF request, in milliseconds.
    pub inspect_timeout_ms: u64,
    /// File the JSON inventory is exported to.
    pub output_file: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            multicast_timeout_ms: 2000,
            multicast_retries: 1,
            probe_timeout_ms: 1000,
            max_concurrency: 50,
            rate_limit: 0,
            candidate_ports: DEFAULT_CANDIDATE_PORTS.to_vec(),
            signature_statuses: ServiceSignature::DEFAULT_STATUSES.to_vec(),
            default_credentials: default_credentials(),
            onvif_port: 80,
            inspect_timeout_ms: 5000,
            output_file: PathBuf::from("cameras.json"),
        }
    }
}

impl Settings {
    /// Load settings from `path`, or from the default location.
    ///
    /// An explicit file must exist; a missing default file (or no home
    /// directory at all) means built-in defaults.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        if let Some(path) = path {
            return Self::load_from(path);
        }

        let file = match Paths::new() {
            Ok(paths) => paths.settings_file(),
            Err(e) => {
                debug!(error = %e, "No configuration directory, using default settings");
                return Ok(Self::default());
            }
        };

        if !file.exists() {
            debug!(path = %file.display(), "No settings file, using defaults");
            return Ok(Self::default());
        }
        Self::load_from(&file)
    }

    /// Load and validate settings from a specific file.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let settings: Self =
            serde_json::from_str(&content).map_err(|e| ConfigError::InvalidFormat(e.to_string()))?;
        settings.validate()?;

        debug!(path = %path.display(), "Loaded settings");
        Ok(settings)
    }

    /// Reject values no run could work with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_concurrency == 0 {
            return Err(invalid("max_concurrency", "must be at least 1"));
        }
        if self.multicast_timeout_ms == 0 {
            return Err(invalid("multicast_timeout_ms", "must be positive"));
        }
        if self.probe_timeout_ms == 0 {
            return Err(invalid("probe_timeout_ms", "must be positive"));
        }
        if self.inspect_timeout_ms == 0 {
            return Err(invalid("inspect_timeout_ms", "must be positive"));
        }
        if self.onvif_port == 0 {
            return Err(invalid("onvif_port", "must be between 1 and 65535"));
        }
        self.port_list()?;
        if self.signature_statuses.is_empty() {
            return Err(invalid("signature_statuses", "must not be empty"));
        }
        if let Some(status) = self
            .signature_statuses
            .iter()
            .find(|s| !(100..=599).contains(*s))
        {
            return Err(invalid(
                "signature_statuses",
                format!("{} is not an HTTP status", status),
            ));
        }
        if self.default_credentials.iter().any(|c| c.username.is_empty()) {
            return Err(invalid("default_credentials", "usernames must not be empty"));
        }
        Ok(())
    }

    /// Candidate ports as a validated list.
    pub fn port_list(&self) -> ConfigResult<PortList> {
        PortList::from_values(&self.candidate_ports)
            .map_err(|e| invalid("candidate_ports", e.to_string()))
    }

    /// Service signature built from the configured statuses.
    pub fn signature(&self) -> ServiceSignature {
        ServiceSignature::new(self.signature_statuses.iter().copied())
    }

    pub fn multicast_timeout(&self) -> Duration {
        Duration::from_millis(self.multicast_timeout_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn inspect_timeout(&self) -> Duration {
        Duration::from_millis(self.inspect_timeout_ms)
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        reason: reason.into(),
    }
}
