//! Provisioning Module
//!
//! Persistence of the upstream network credentials that the `router`/`wifi`
//! command changes.
//!
//! ## File Format
//! ```text
//! ┌──────────┬──────────┬──────────────────────────────┐
//! │ CRC (4)  │ Len (4)  │ bincode(WifiCredentials)     │
//! └──────────┴──────────┴──────────────────────────────┘
//! ```

mod store;
mod file;

pub use store::{ensure_credentials, CredentialStore, MemoryCredentialStore};
pub use file::FileCredentialStore;

use serde::{Deserialize, Serialize};

use crate::error::{HubError, Result};

/// Longest accepted SSID (bytes)
pub const MAX_SSID_LEN: usize = 32;

/// Longest accepted passphrase (bytes)
pub const MAX_PASSWORD_LEN: usize = 64;

/// SSID stored on first boot when nothing has been provisioned
pub const DEFAULT_ROUTER_SSID: &str = "308";

/// Passphrase stored on first boot when nothing has been provisioned
pub const DEFAULT_ROUTER_PASSWORD: &str = "308308308";

/// Upstream network credentials
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiCredentials {
    pub ssid: String,
    pub password: String,
}

impl WifiCredentials {
    /// Validate and build credentials
    pub fn new(ssid: impl Into<String>, password: impl Into<String>) -> Result<Self> {
        let ssid = ssid.into();
        let password = password.into();

        if ssid.is_empty() || ssid.len() > MAX_SSID_LEN {
            return Err(HubError::Storage(format!(
                "SSID must be 1..={} bytes, got {}",
                MAX_SSID_LEN,
                ssid.len()
            )));
        }
        if password.len() > MAX_PASSWORD_LEN {
            return Err(HubError::Storage(format!(
                "Password must be at most {} bytes, got {}",
                MAX_PASSWORD_LEN,
                password.len()
            )));
        }

        Ok(Self { ssid, password })
    }
}

impl Default for WifiCredentials {
    fn default() -> Self {
        Self {
            ssid: DEFAULT_ROUTER_SSID.to_string(),
            password: DEFAULT_ROUTER_PASSWORD.to_string(),
        }
    }
}
