//! File-backed credential store
//!
//! Single checksummed record, replaced atomically on every store.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::{HubError, Result};

use super::{CredentialStore, WifiCredentials};

/// Record header: crc (4) + len (4)
const RECORD_HEADER_SIZE: usize = 8;

/// Credentials persisted to one file
pub struct FileCredentialStore {
    /// Record file path
    path: PathBuf,

    /// Serializes writers so temp files never interleave
    write_lock: Mutex<()>,
}

impl FileCredentialStore {
    /// Use `path` as the record file; parent directories are created on store
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Record file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Encode credentials as crc + len + bincode payload
    fn encode_record(credentials: &WifiCredentials) -> Result<Vec<u8>> {
        let payload = bincode::serialize(credentials)?;
        let crc = crc32fast::hash(&payload);

        let mut record = Vec::with_capacity(RECORD_HEADER_SIZE + payload.len());
        record.extend_from_slice(&crc.to_le_bytes());
        record.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        record.extend_from_slice(&payload);
        Ok(record)
    }

    /// Verify and decode a record
    fn decode_record(bytes: &[u8]) -> Result<WifiCredentials> {
        if bytes.len() < RECORD_HEADER_SIZE {
            return Err(HubError::Storage(format!(
                "Credential record truncated: {} bytes",
                bytes.len()
            )));
        }

        let crc = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let len = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
        let payload = &bytes[RECORD_HEADER_SIZE..];

        if payload.len() != len {
            return Err(HubError::Storage(format!(
                "Credential record length mismatch: declared {}, found {}",
                len,
                payload.len()
            )));
        }

        let actual = crc32fast::hash(payload);
        if actual != crc {
            return Err(HubError::Storage(format!(
                "Credential record checksum mismatch: expected {:08x}, got {:08x}",
                crc, actual
            )));
        }

        Ok(bincode::deserialize(payload)?)
    }
}

impl CredentialStore for FileCredentialStore {
    fn store_credentials(&self, credentials: &WifiCredentials) -> Result<()> {
        let record = Self::encode_record(credentials)?;
        let _guard = self.write_lock.lock();

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        // Write to a sibling temp file, then rename over the record
        let tmp_path = self.path.with_extension("tmp");
        {
            let mut file: File = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp_path)?;
            file.write_all(&record)?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;

        tracing::debug!("Stored credentials for SSID {:?}", credentials.ssid);
        Ok(())
    }

    fn load_credentials(&self) -> Result<Option<WifiCredentials>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let bytes = fs::read(&self.path)?;
        Self::decode_record(&bytes).map(Some)
    }
}
