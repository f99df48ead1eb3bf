use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use alloy::primitives::hex;
use futures::future::BoxFuture;
use tokio::{fs::File, io::AsyncWriteExt};

use crate::storage::{LogStorage, StorageError, SubscriberState};

/// Stores each subscriber's state as a JSON file in one directory.
///
/// File names are the hex-encoded subscriber key, so any key is a valid file name. Writes go to
/// a temporary file that is then renamed over the record, which replaces it atomically on the
/// same filesystem.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    dir: PathBuf,
}

impl JsonFileStorage {
    /// Open (and create if needed) the storage directory.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;
        debug!(dir = %dir.display(), "Opened JSON file storage");
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", hex::encode(key)))
    }
}

/// Persist the directory entry created by a rename. Directories cannot be opened for syncing on
/// Windows.
#[cfg(unix)]
async fn sync_dir(dir: &Path) -> Result<(), StorageError> {
    File::open(dir).await?.sync_all().await?;
    Ok(())
}

#[cfg(not(unix))]
async fn sync_dir(_dir: &Path) -> Result<(), StorageError> {
    Ok(())
}

impl LogStorage for JsonFileStorage {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<SubscriberState>, StorageError>> {
        Box::pin(async move {
            let bytes = match tokio::fs::read(self.path_for(key)).await {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
                Err(e) => return Err(e.into()),
            };
            Ok(Some(serde_json::from_slice(&bytes)?))
        })
    }

    fn set<'a>(
        &'a self,
        key: &'a str,
        state: SubscriberState,
    ) -> BoxFuture<'a, Result<(), StorageError>> {
        Box::pin(async move {
            let path = self.path_for(key);
            let tmp = path.with_extension("json.tmp");
            let bytes = serde_json::to_vec(&state)?;
            let mut file = File::create(&tmp).await?;
            file.write_all(&bytes).await?;
            // The record must be on disk before the rename makes it visible.
            file.sync_all().await?;
            drop(file);
            tokio::fs::rename(&tmp, &path).await?;
            sync_dir(&self.dir).await?;
            trace!(key = key, safe_block = ?state.safe_block, "Persisted subscriber state");
            Ok(())
        })
    }
}
