//! Credential store trait and in-memory implementation

use parking_lot::Mutex;

use crate::error::Result;

use super::WifiCredentials;

/// Persistence collaborator for the provisioning command
pub trait CredentialStore: Send + Sync {
    /// Persist new credentials, replacing any previous ones
    fn store_credentials(&self, credentials: &WifiCredentials) -> Result<()>;

    /// Load the persisted credentials, `None` if nothing was stored yet
    fn load_credentials(&self) -> Result<Option<WifiCredentials>>;
}

/// Credentials kept in memory only
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    credentials: Mutex<Option<WifiCredentials>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn store_credentials(&self, credentials: &WifiCredentials) -> Result<()> {
        *self.credentials.lock() = Some(credentials.clone());
        Ok(())
    }

    fn load_credentials(&self) -> Result<Option<WifiCredentials>> {
        Ok(self.credentials.lock().clone())
    }
}

/// Load the stored credentials, storing `defaults` first if none are usable
///
/// An unreadable record is treated like a missing one and overwritten.
pub fn ensure_credentials(
    store: &dyn CredentialStore,
    defaults: &WifiCredentials,
) -> Result<WifiCredentials> {
    match store.load_credentials() {
        Ok(Some(credentials)) => return Ok(credentials),
        Ok(None) => {
            tracing::info!("No stored credentials, provisioning defaults");
        }
        Err(e) => {
            tracing::warn!("Stored credentials unreadable ({}), provisioning defaults", e);
        }
    }

    store.store_credentials(defaults)?;
    Ok(defaults.clone())
}
