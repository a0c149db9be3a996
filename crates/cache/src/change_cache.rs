use crate::error::{CacheError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;

pub const CHANGE_CACHE_SCHEMA_VERSION: u32 = 1;

/// Change signature of the last successfully indexed content of a file.
///
/// A record is created or overwritten only after a successful index, so it
/// never reflects a partial state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileRecord {
    pub content_hash: String,
    pub mtime_ms: u64,
    pub size: u64,
    pub chunk_count: usize,
    pub indexed_at_unix_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChangeCacheStats {
    pub indexed_files: usize,
    pub total_chunks: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedChangeCache {
    schema_version: u32,
    records: BTreeMap<String, FileRecord>,
}

/// Persistent filepath → change-signature store used as a delta-detection
/// pre-filter.
///
/// Change detection compares filesystem mtime and size against the last
/// recorded value; it never re-hashes file bytes at scan time, so
/// modifications inside one filesystem clock tick can be missed.
/// Unreadable or missing files report as changed, which forces a reindex
/// attempt that fails naturally downstream.
pub struct ChangeCache {
    path: PathBuf,
    records: RwLock<BTreeMap<String, FileRecord>>,
}

impl ChangeCache {
    /// Open the cache at `path`, loading existing records. A missing file
    /// starts empty; an unreadable or corrupt file is a construction error.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let records = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let persisted: PersistedChangeCache = serde_json::from_slice(&bytes)?;
                if persisted.schema_version != CHANGE_CACHE_SCHEMA_VERSION {
                    return Err(CacheError::Corrupt(format!(
                        "unsupported change cache schema_version {} (expected {CHANGE_CACHE_SCHEMA_VERSION})",
                        persisted.schema_version
                    )));
                }
                persisted.records
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(err.into()),
        };

        log::debug!(
            "Opened change cache at {} ({} records)",
            path.display(),
            records.len()
        );

        Ok(Self {
            path,
            records: RwLock::new(records),
        })
    }

    /// Check whether a single file changed since its last recorded index.
    pub async fn is_changed(&self, filepath: &str) -> bool {
        let recorded = {
            let records = self.records.read().await;
            records.get(filepath).map(|r| (r.mtime_ms, r.size))
        };

        let Some((mtime_ms, size)) = recorded else {
            return true;
        };

        match file_signature(filepath).await {
            Ok(current) => current != (mtime_ms, size),
            Err(_) => true,
        }
    }

    /// Filter `paths` down to the files whose mtime/size differ from the
    /// last recorded value, or that have no record at all.
    pub async fn filter_changed<S: AsRef<str>>(&self, paths: &[S]) -> Vec<String> {
        let mut changed = Vec::new();
        let records = self.records.read().await;

        for path in paths {
            let path = path.as_ref();
            let Some(record) = records.get(path) else {
                changed.push(path.to_string());
                continue;
            };

            match file_signature(path).await {
                Ok(current) if current == (record.mtime_ms, record.size) => {}
                _ => changed.push(path.to_string()),
            }
        }

        changed
    }

    /// Record the change signature of a freshly indexed file.
    pub async fn record(
        &self,
        filepath: &str,
        content_hash: &str,
        mtime_ms: u64,
        size: u64,
        chunk_count: usize,
    ) -> Result<()> {
        {
            let mut records = self.records.write().await;
            records.insert(
                filepath.to_string(),
                FileRecord {
                    content_hash: content_hash.to_string(),
                    mtime_ms,
                    size,
                    chunk_count,
                    indexed_at_unix_ms: unix_ms_now(),
                },
            );
        }
        self.save().await
    }

    /// Drop the record for a file (after deletion from the index).
    pub async fn remove(&self, filepath: &str) -> Result<()> {
        let removed = {
            let mut records = self.records.write().await;
            records.remove(filepath).is_some()
        };
        if removed {
            self.save().await?;
        }
        Ok(())
    }

    /// Look up the stored record for a file.
    pub async fn get(&self, filepath: &str) -> Option<FileRecord> {
        self.records.read().await.get(filepath).cloned()
    }

    pub async fn stats(&self) -> ChangeCacheStats {
        let records = self.records.read().await;
        ChangeCacheStats {
            indexed_files: records.len(),
            total_chunks: records.values().map(|r| r.chunk_count).sum(),
        }
    }

    /// Remove all records.
    pub async fn clear(&self) -> Result<()> {
        {
            let mut records = self.records.write().await;
            records.clear();
        }
        self.save().await
    }

    async fn save(&self) -> Result<()> {
        let persisted = {
            let records = self.records.read().await;
            PersistedChangeCache {
                schema_version: CHANGE_CACHE_SCHEMA_VERSION,
                records: records.clone(),
            }
        };

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec(&persisted)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

/// Current (mtime_ms, size) signature of a file on disk.
pub async fn file_signature(path: impl AsRef<Path>) -> std::io::Result<(u64, u64)> {
    let meta = tokio::fs::metadata(path.as_ref()).await?;
    let mtime_ms = meta
        .modified()?
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);
    Ok((mtime_ms, meta.len()))
}

/// Stable content hash used in [`FileRecord`]s and embedding cache keys.
#[must_use]
pub fn hash_content(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(32);
    for byte in &digest[..16] {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

fn unix_ms_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
