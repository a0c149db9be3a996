use crate::change_cache::hash_content;
use crate::error::Result;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const CACHE_MAGIC: &[u8; 4] = b"VC01";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EmbeddingCacheStats {
    pub entries: usize,
    pub size_bytes: u64,
}

/// Content-addressed persistent vector store.
///
/// Keys are stable hashes of the exact embedding text; the model tag is a
/// directory component, so switching models never serves stale vectors.
/// One vector per unique (text, model). Entries are never evicted by
/// policy; the store is bounded only by disk. Corrupt entries decode as a
/// miss.
#[derive(Clone, Debug)]
pub struct EmbeddingCache {
    base_dir: PathBuf,
    model_dir: PathBuf,
}

impl EmbeddingCache {
    /// Create a cache rooted at `base_dir`, namespaced by `model`.
    #[must_use]
    pub fn new(base_dir: impl AsRef<Path>, model: &str) -> Self {
        let base_dir = base_dir.as_ref().to_path_buf();
        let model_dir = base_dir.join(safe_component(model));
        Self {
            base_dir,
            model_dir,
        }
    }

    /// Stable key for a text. Equal bytes always map to the same key, so
    /// duplicate text across files resolves to one stored vector.
    #[must_use]
    pub fn hash_text(text: &str) -> String {
        hash_content(text.as_bytes())
    }

    fn vector_path(&self, hash: &str) -> PathBuf {
        let (shard_a, shard_b) = shard_dirs(hash);
        self.model_dir
            .join(shard_a)
            .join(shard_b)
            .join(format!("{hash}.bin"))
    }

    /// Fetch one cached vector. Any read or decode failure is a miss.
    pub async fn get(&self, hash: &str) -> Option<Vec<f32>> {
        let path = self.vector_path(hash);
        let bytes = tokio::fs::read(&path).await.ok()?;
        decode_vector(&bytes)
    }

    /// Fetch many vectors in one pass; the result maps only the hashes
    /// that were present and intact.
    pub async fn get_batch<S: AsRef<str>>(&self, hashes: &[S]) -> HashMap<String, Vec<f32>> {
        let mut found = HashMap::new();
        for hash in hashes {
            let hash = hash.as_ref();
            if found.contains_key(hash) {
                continue;
            }
            if let Some(vector) = self.get(hash).await {
                found.insert(hash.to_string(), vector);
            }
        }
        found
    }

    /// Store one vector. Existing entries are kept as-is, since equal keys
    /// imply equal text.
    pub async fn put(&self, hash: &str, vector: &[f32]) -> Result<()> {
        let path = self.vector_path(hash);
        if path.exists() {
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = encode_vector(vector);
        let tmp = path.with_extension("bin.tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        if tokio::fs::rename(&tmp, &path).await.is_err() {
            let _ = tokio::fs::remove_file(&tmp).await;
        }
        Ok(())
    }

    /// Store many vectors.
    pub async fn put_batch(&self, items: &[(String, Vec<f32>)]) -> Result<()> {
        for (hash, vector) in items {
            self.put(hash, vector).await?;
        }
        Ok(())
    }

    /// Entry count and byte total, computed by walking the model directory.
    pub async fn stats(&self) -> EmbeddingCacheStats {
        let root = self.model_dir.clone();
        tokio::task::spawn_blocking(move || {
            let mut stats = EmbeddingCacheStats::default();
            walk_stats(&root, &mut stats);
            stats
        })
        .await
        .unwrap_or_default()
    }

    /// Remove all vectors for this model tag.
    pub async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_dir_all(&self.model_dir).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Root directory shared by all model tags.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

fn safe_component(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.') {
            out.push(ch);
        } else {
            out.push('_');
        }
    }
    if out.is_empty() {
        "_".to_string()
    } else {
        out
    }
}

fn shard_dirs(hash: &str) -> (String, String) {
    let a = hash.get(0..2).unwrap_or("00").to_string();
    let b = hash.get(2..4).unwrap_or("00").to_string();
    (a, b)
}

fn encode_vector(vector: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + vector.len() * 4);
    out.extend_from_slice(CACHE_MAGIC);
    #[allow(clippy::cast_possible_truncation)]
    let dim = vector.len() as u32;
    out.extend_from_slice(&dim.to_le_bytes());
    for v in vector {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

fn decode_vector(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.len() < 8 || &bytes[0..4] != CACHE_MAGIC {
        return None;
    }
    let dim = u32::from_le_bytes(bytes[4..8].try_into().ok()?) as usize;
    let expected_len = 8usize.saturating_add(dim.saturating_mul(4));
    if bytes.len() != expected_len {
        return None;
    }
    let mut vector = Vec::with_capacity(dim);
    for i in 0..dim {
        let start = 8 + i * 4;
        let end = start + 4;
        let val = f32::from_le_bytes(bytes[start..end].try_into().ok()?);
        vector.push(val);
    }
    Some(vector)
}

fn walk_stats(root: &Path, stats: &mut EmbeddingCacheStats) {
    let Ok(read_dir) = std::fs::read_dir(root) else {
        return;
    };
    for entry in read_dir.flatten() {
        let Ok(meta) = entry.metadata() else {
            continue;
        };
        if meta.is_dir() {
            walk_stats(&entry.path(), stats);
            continue;
        }
        stats.entries += 1;
        stats.size_bytes += meta.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[tokio::test]
    async fn roundtrip_single_vector() {
        let temp = tempdir().unwrap();
        let cache = EmbeddingCache::new(temp.path(), "nomic-embed-text");

        let hash = EmbeddingCache::hash_text("search_document: fn main() {}");
        let vector = vec![0.25_f32, -1.5, 3.0];
        cache.put(&hash, &vector).await.unwrap();

        assert_eq!(cache.get(&hash).await, Some(vector));
    }

    #[tokio::test]
    async fn identical_text_shares_one_entry() {
        let temp = tempdir().unwrap();
        let cache = EmbeddingCache::new(temp.path(), "m");

        let a = EmbeddingCache::hash_text("let shared = true;");
        let b = EmbeddingCache::hash_text("let shared = true;");
        assert_eq!(a, b);

        cache.put(&a, &[1.0, 2.0]).await.unwrap();
        cache.put(&b, &[9.0, 9.0]).await.unwrap();

        // First write wins; equal keys imply equal text.
        assert_eq!(cache.get(&a).await, Some(vec![1.0, 2.0]));
        assert_eq!(cache.stats().await.entries, 1);
    }

    #[tokio::test]
    async fn batch_lookup_is_partial() {
        let temp = tempdir().unwrap();
        let cache = EmbeddingCache::new(temp.path(), "m");

        let known = EmbeddingCache::hash_text("known");
        cache.put(&known, &[0.5]).await.unwrap();

        let missing = EmbeddingCache::hash_text("missing");
        let found = cache.get_batch(&[known.clone(), missing]).await;

        assert_eq!(found.len(), 1);
        assert_eq!(found.get(&known), Some(&vec![0.5]));
    }

    #[tokio::test]
    async fn corrupt_entry_is_a_miss() {
        let temp = tempdir().unwrap();
        let cache = EmbeddingCache::new(temp.path(), "m");

        let hash = EmbeddingCache::hash_text("text");
        cache.put(&hash, &[1.0, 2.0, 3.0]).await.unwrap();

        let path = cache.vector_path(&hash);
        tokio::fs::write(&path, b"garbage").await.unwrap();
        assert_eq!(cache.get(&hash).await, None);

        // Truncated payload under a valid header is also a miss.
        let mut bytes = encode_vector(&[1.0, 2.0, 3.0]);
        bytes.truncate(bytes.len() - 2);
        tokio::fs::write(&path, &bytes).await.unwrap();
        assert_eq!(cache.get(&hash).await, None);
    }

    #[tokio::test]
    async fn models_are_namespaced() {
        let temp = tempdir().unwrap();
        let small = EmbeddingCache::new(temp.path(), "model-small");
        let large = EmbeddingCache::new(temp.path(), "model-large");

        let hash = EmbeddingCache::hash_text("same text");
        small.put(&hash, &[1.0]).await.unwrap();

        assert_eq!(large.get(&hash).await, None);
    }

    #[tokio::test]
    async fn clear_removes_everything() {
        let temp = tempdir().unwrap();
        let cache = EmbeddingCache::new(temp.path(), "m");

        for i in 0..5 {
            let hash = EmbeddingCache::hash_text(&format!("text {i}"));
            cache.put(&hash, &[i as f32]).await.unwrap();
        }
        assert_eq!(cache.stats().await.entries, 5);

        cache.clear().await.unwrap();
        assert_eq!(cache.stats().await.entries, 0);
    }

    #[test]
    fn model_tag_is_sanitized() {
        assert_eq!(safe_component("nomic/embed:v1.5"), "nomic_embed_v1.5");
        assert_eq!(safe_component(""), "_");
    }
}
