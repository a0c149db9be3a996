use crate::error::{Result, StoreError};
use crate::store::{l2_distance, VectorStore, ARCH_BOOST_FACTOR, SEARCH_OVERFETCH};
use crate::types::{SearchHit, VectorRecord};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

pub const STORE_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct PersistedStore {
    schema_version: u32,
    files: BTreeMap<String, Vec<VectorRecord>>,
}

/// Exact-scan vector store persisted as one JSON snapshot.
///
/// Suitable for single-process corpora up to the low hundreds of thousands
/// of records; beyond that a backend with a real ANN index should sit
/// behind the same trait.
pub struct JsonVectorStore {
    path: PathBuf,
    files: RwLock<BTreeMap<String, Vec<VectorRecord>>>,
}

impl JsonVectorStore {
    /// Open the store at `path`, loading existing records. A missing file
    /// starts empty; corrupt state is a construction error.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let files = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let persisted: PersistedStore = serde_json::from_slice(&bytes)?;
                if persisted.schema_version != STORE_SCHEMA_VERSION {
                    return Err(StoreError::Corrupt(format!(
                        "unsupported store schema_version {} (expected {STORE_SCHEMA_VERSION})",
                        persisted.schema_version
                    )));
                }
                persisted.files
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(err.into()),
        };

        log::info!(
            "Opened vector store at {} ({} files)",
            path.display(),
            files.len()
        );

        Ok(Self {
            path,
            files: RwLock::new(files),
        })
    }

    async fn save(&self) -> Result<()> {
        let persisted = {
            let files = self.files.read().await;
            PersistedStore {
                schema_version: STORE_SCHEMA_VERSION,
                files: files.clone(),
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

#[async_trait]
impl VectorStore for JsonVectorStore {
    async fn upsert_file(&self, filepath: &str, records: Vec<VectorRecord>) -> Result<()> {
        // Delete, persist, then insert and persist again. The window
        // between the two saves is the documented crash risk; callers
        // retry the file on the next scan because its change record is
        // only written after this returns.
        {
            let mut files = self.files.write().await;
            files.remove(filepath);
        }
        self.save().await?;

        if !records.is_empty() {
            let mut files = self.files.write().await;
            files.insert(filepath.to_string(), records);
        }
        self.save().await
    }

    async fn search(
        &self,
        vector: &[f32],
        limit: usize,
        file_type: Option<&str>,
    ) -> Result<Vec<SearchHit>> {
        let files = self.files.read().await;

        let mut candidates: Vec<SearchHit> = files
            .values()
            .flatten()
            .filter(|record| file_type.map_or(true, |ft| record.file_type == ft))
            .map(|record| {
                let distance = l2_distance(vector, &record.vector);
                SearchHit {
                    record: record.clone(),
                    distance,
                    ranking_distance: distance,
                }
            })
            .collect();

        candidates.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        candidates.truncate(limit.saturating_mul(SEARCH_OVERFETCH));

        for hit in &mut candidates {
            if hit.record.is_architecture_node {
                hit.ranking_distance = hit.distance / ARCH_BOOST_FACTOR;
            }
        }
        candidates.sort_by(|a, b| a.ranking_distance.total_cmp(&b.ranking_distance));
        candidates.truncate(limit);

        Ok(candidates)
    }

    async fn update_summary(&self, filepath: &str, summary: &str) -> Result<()> {
        let updated = {
            let mut files = self.files.write().await;
            match files.get_mut(filepath) {
                Some(records) => {
                    for record in records.iter_mut() {
                        record.summary = summary.to_string();
                    }
                    true
                }
                None => false,
            }
        };

        if updated {
            self.save().await?;
        }
        Ok(())
    }

    async fn delete_file(&self, filepath: &str) -> Result<()> {
        let removed = {
            let mut files = self.files.write().await;
            files.remove(filepath).is_some()
        };
        if removed {
            self.save().await?;
        }
        Ok(())
    }

    async fn list_filepaths(&self) -> Result<Vec<String>> {
        let files = self.files.read().await;
        Ok(files.keys().cloned().collect())
    }

    async fn row_count(&self) -> Result<usize> {
        let files = self.files.read().await;
        Ok(files.values().map(Vec::len).sum())
    }

    async fn file_count(&self) -> Result<usize> {
        let files = self.files.read().await;
        Ok(files.len())
    }

    async fn optimize(&self) -> Result<()> {
        // A JSON snapshot has nothing to compact; rewriting it keeps the
        // on-disk form dense after heavy churn.
        self.save().await
    }

    async fn clear(&self) -> Result<()> {
        {
            let mut files = self.files.write().await;
            files.clear();
        }
        self.save().await
    }
}
