//! Credential pairs and credential tiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A username/password pair.
///
/// `Debug` redacts the password so credentials can appear in log fields.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl Credentials {
    /// Create a new credential pair.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Common factory credentials, tried in this order.
pub const DEFAULT_CREDENTIALS: &[(&str, &str)] = &[
    ("admin", "admin"),
    ("admin", ""),
    ("admin", "12345"),
    ("admin", "123456"),
    ("admin", "password"),
    ("root", "root"),
    ("root", ""),
    ("user", "user"),
    ("guest", "guest"),
    ("service", "service"),
    ("operator", "operator"),
];

/// The built-in default credential list.
pub fn default_credentials() -> Vec<Credentials> {
    DEFAULT_CREDENTIALS
        .iter()
        .map(|(user, pass)| Credentials::new(*user, *pass))
        .collect()
}

/// Stage of the authentication escalation a credential pair came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialTier {
    /// Supplied by the user on the command line.
    Explicit,
    /// Taken from the default credential list.
    Default,
    /// Typed in by the operator when prompted.
    Interactive,
}

impl fmt::Display for CredentialTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Explicit => write!(f, "explicit"),
            Self::Default => write!(f, "default"),
            Self::Interactive => write!(f, "interactive"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_password() {
        let creds = Credentials::new("admin", "hunter2");
        let shown = format!("{:?}", creds);
        assert!(shown.contains("admin"));
        assert!(!shown.contains("hunter2"));
    }

    #[test]
    fn test_default_list_order() {
        let defaults = default_credentials();
        assert_eq!(defaults[0], Credentials::new("admin", "admin"));
        assert_eq!(defaults[1], Credentials::new("admin", ""));
        assert_eq!(defaults.len(), DEFAULT_CREDENTIALS.len());
    }

    #[test]
    fn test_missing_password_deserializes_empty() {
        let creds: Credentials = serde_json::from_str(r#"{"username":"root"}"#).unwrap();
        assert_eq!(creds, Credentials::new("root", ""));
    }
}
