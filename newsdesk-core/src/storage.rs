use std::io;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::error::PersistenceError;

/// Key under which the favorites collection is stored.
pub const FAVORITES_KEY: &str = "favorites";

/// Key-value persistence with one JSON document per key.
#[derive(Debug, Clone)]
pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `<data dir>/newsdesk`, if the platform has one.
    pub fn default_location() -> Option<Self> {
        dirs::data_dir().map(|dir| Self::new(dir.join("newsdesk")))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Replaces the value stored under `key`.
    ///
    /// The document is written to a sibling `.json.tmp` file and renamed over
    /// the target, so readers never observe a partial file.
    pub async fn save<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<(), PersistenceError> {
        let bytes = serde_json::to_vec_pretty(value).map_err(|_| PersistenceError::EncodingFailed)?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| PersistenceError::SaveFailed(e.to_string()))?;
        tokio::fs::write(&tmp, &bytes).await.map_err(|e| {
            warn!(error = %e, path = %tmp.display(), "failed to write temp file");
            PersistenceError::SaveFailed(e.to_string())
        })?;
        tokio::fs::rename(&tmp, &path).await.map_err(|e| {
            warn!(error = %e, path = %path.display(), "failed to replace stored file");
            PersistenceError::SaveFailed(e.to_string())
        })?;

        debug!(key, bytes = bytes.len(), "saved");
        Ok(())
    }

    /// Reads the value stored under `key`.
    ///
    /// A missing or corrupt main file falls back to a leftover `.json.tmp`
    /// from an interrupted save, when one parses.
    pub async fn load<T: DeserializeOwned>(&self, key: &str) -> Result<T, PersistenceError> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return read_tmp(&tmp)
                    .await
                    .ok_or_else(|| PersistenceError::LoadFailed("File does not exist".into()));
            }
            Err(e) => return Err(PersistenceError::LoadFailed(e.to_string())),
        };

        match serde_json::from_slice::<T>(&bytes) {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!(error = %e, path = %path.display(), "failed to parse JSON, trying tmp fallback");
                read_tmp(&tmp).await.ok_or(PersistenceError::DecodingFailed)
            }
        }
    }

    /// Removes the value under `key`. Deleting an absent key succeeds.
    pub async fn delete(&self, key: &str) -> Result<(), PersistenceError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PersistenceError::DeleteFailed(e.to_string())),
        }
    }

    pub async fn exists(&self, key: &str) -> bool {
        tokio::fs::try_exists(self.path_for(key))
            .await
            .unwrap_or(false)
    }
}

async fn read_tmp<T: DeserializeOwned>(tmp: &Path) -> Option<T> {
    let bytes = tokio::fs::read(tmp).await.ok()?;
    match serde_json::from_slice(&bytes) {
        Ok(value) => {
            debug!(path = %tmp.display(), "recovered from leftover temp file");
            Some(value)
        }
        Err(e) => {
            warn!(error = %e, path = %tmp.display(), "leftover temp file is not valid JSON");
            None
        }
    }
}
