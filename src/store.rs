use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Subtracted from the declared token lifetime so we always consider a token
/// expired slightly before Spotify would reject it.
pub const EXPIRY_SAFETY_BUFFER_MS: i64 = 60_000;

const TOKEN_FILE: &str = "spotify-tokens.json";

/// The one credential record this app persists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRecord {
    pub access_token: String,
    pub refresh_token: String,
    /// Epoch milliseconds, already reduced by the safety buffer.
    pub expires_at: i64,
}

impl TokenRecord {
    /// Build a record from a token response issued at `issued_at_ms` with a
    /// declared lifetime of `expires_in` seconds.
    pub fn issued(
        access_token: String,
        refresh_token: String,
        expires_in: u64,
        issued_at_ms: i64,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_at: issued_at_ms + (expires_in as i64) * 1000 - EXPIRY_SAFETY_BUFFER_MS,
        }
    }

    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.expires_at <= now_ms
    }
}

/// Durable store for exactly one `TokenRecord`.
///
/// Read failures never propagate to the caller; a broken cache degrades to
/// "no cached credential" and the user logs in again.
pub struct TokenStore {
    dir: PathBuf,
}

impl TokenStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Fixed per-user location, `~/.vinyl-companion`.
    pub fn default_location() -> AppResult<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| AppError::Config("Cannot find home directory".into()))?;
        Ok(Self::new(home.join(".vinyl-companion")))
    }

    fn path(&self) -> PathBuf {
        self.dir.join(TOKEN_FILE)
    }

    /// Persist the record, replacing any prior one. Writes to a temp file and
    /// renames it so `load` never observes a partial write.
    pub fn save(&self, record: &TokenRecord) -> AppResult<()> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| AppError::StoreWrite(e.to_string()))?;
        let content = serde_json::to_string_pretty(record)?;
        let tmp = self.dir.join(format!("{}.tmp", TOKEN_FILE));
        std::fs::write(&tmp, content).map_err(|e| AppError::StoreWrite(e.to_string()))?;
        std::fs::rename(&tmp, self.path()).map_err(|e| AppError::StoreWrite(e.to_string()))?;
        log::info!("Tokens saved to cache");
        Ok(())
    }

    /// Load the cached record, or `None` when the file is missing, unreadable
    /// or malformed. Expired records are still returned; their refresh token
    /// may be usable.
    pub fn load(&self) -> Option<TokenRecord> {
        let path = self.path();
        if !path.exists() {
            return None;
        }
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                log::warn!("Error loading tokens: {}", e);
                return None;
            }
        };
        match serde_json::from_str(&content) {
            Ok(record) => Some(record),
            Err(e) => {
                log::warn!("Malformed token cache, ignoring: {}", e);
                None
            }
        }
    }

    /// Remove the stored record. Idempotent: clearing an empty store is a no-op.
    pub fn clear(&self) -> AppResult<()> {
        let path = self.path();
        if path.exists() {
            std::fs::remove_file(&path).map_err(|e| AppError::StoreWrite(e.to_string()))?;
            log::info!("Token cache cleared");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (TokenStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        (TokenStore::new(dir.path().join("creds")), dir)
    }

    #[test]
    fn issued_applies_safety_buffer() {
        let record = TokenRecord::issued("at".into(), "rt".into(), 3600, 1_000_000);
        assert_eq!(record.expires_at, 1_000_000 + 3_600_000 - 60_000);
        assert!(!record.is_expired(record.expires_at - 1));
        assert!(record.is_expired(record.expires_at));
    }

    #[test]
    fn save_then_load_round_trips() {
        let (store, _dir) = store();
        let record = TokenRecord::issued("access".into(), "refresh".into(), 3600, 42);
        store.save(&record).unwrap();
        assert_eq!(store.load(), Some(record));
    }

    #[test]
    fn load_returns_expired_records() {
        let (store, _dir) = store();
        let record = TokenRecord {
            access_token: "stale".into(),
            refresh_token: "refresh".into(),
            expires_at: 0,
        };
        store.save(&record).unwrap();
        assert_eq!(store.load(), Some(record));
    }

    #[test]
    fn load_missing_file_is_none() {
        let (store, _dir) = store();
        assert_eq!(store.load(), None);
    }

    #[test]
    fn load_malformed_file_is_none() {
        let (store, _dir) = store();
        std::fs::create_dir_all(store.dir.clone()).unwrap();
        std::fs::write(store.path(), "not json").unwrap();
        assert_eq!(store.load(), None);
    }

    #[test]
    fn clear_is_idempotent() {
        let (store, _dir) = store();
        let record = TokenRecord::issued("a".into(), "r".into(), 60, 0);
        store.save(&record).unwrap();
        store.clear().unwrap();
        assert_eq!(store.load(), None);
        store.clear().unwrap();
        store.clear().unwrap();
    }
}
