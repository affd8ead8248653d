use std::io::Write;
use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Result;

/// Refresh this long before the recorded expiry so a token that is about to
/// lapse never gets attached to an outgoing request.
pub const EXPIRY_SKEW_MINUTES: i64 = 5;

/// The persisted OAuth state: one record per deployment, the sole source of
/// truth for authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub account_id: String,
}

impl Credential {
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Pure comparison; a credential inside the skew window counts as expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now + Duration::minutes(EXPIRY_SKEW_MINUTES) >= self.expires_at
    }
}

/// Durable read/write of exactly one [`Credential`].
///
/// Writes go through a uniquely named temp file followed by a rename, so a
/// concurrent reader sees either the old record or the new one, never a
/// partially written file.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    /// Store under the platform config dir, like the rest of the tooling:
    /// `~/.config/basecamp-mcp/credentials.json` on Linux.
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("basecamp-mcp");
        Self {
            path: config_dir.join("credentials.json"),
        }
    }

    pub fn at_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Current credential, or `None` if nothing has ever been stored.
    /// Unreadable or malformed storage is an error, not an absence: the
    /// caller cannot safely guess credential state.
    pub fn read(&self) -> Result<Option<Credential>> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let credential = serde_json::from_str(&data)?;
        Ok(Some(credential))
    }

    /// Atomically replace the stored credential.
    pub fn write(&self, credential: &Credential) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let data = serde_json::to_string_pretty(credential)?;
        let tmp_path = self
            .path
            .with_extension(format!("json.{}", Uuid::now_v7().simple()));

        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(0o600)
            .open(&tmp_path)?;
        file.write_all(data.as_bytes())?;
        file.sync_all()?;
        drop(file);

        if let Err(err) = std::fs::rename(&tmp_path, &self.path) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(err.into());
        }
        Ok(())
    }

    /// Remove the stored credential. Only ever driven by an explicit user
    /// action (`bcq auth logout`); expiry alone never deletes state.
    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

#[cfg(not(unix))]
trait OpenOptionsExt {
    fn mode(&mut self, _mode: u32) -> &mut Self;
}

#[cfg(not(unix))]
impl OpenOptionsExt for std::fs::OpenOptions {
    fn mode(&mut self, _mode: u32) -> &mut Self {
        self
    }
}
