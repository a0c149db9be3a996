use crate::error::Result;
use crate::types::{SearchHit, VectorRecord};
use async_trait::async_trait;

/// Architecture nodes rank as if their distance were divided by this
/// factor.
pub const ARCH_BOOST_FACTOR: f32 = 1.5;

/// Candidates fetched per requested result before boost re-ranking.
pub const SEARCH_OVERFETCH: usize = 3;

/// Narrow interface to the vector database.
///
/// The store is treated as externally synchronized; callers add no locking
/// beyond the per-file delete-then-insert sequencing.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Replace all records for `filepath` with `records`.
    ///
    /// This is delete-then-insert, not transactionally atomic: a crash
    /// between the two steps can leave a file's old records deleted
    /// without replacements. Callers keep the file marked changed until a
    /// successful upsert so the next scan retries.
    async fn upsert_file(&self, filepath: &str, records: Vec<VectorRecord>) -> Result<()>;

    /// Rank records by distance to `vector`, optionally filtered by file
    /// type. `SEARCH_OVERFETCH * limit` candidates are fetched by raw
    /// distance, architecture nodes are boosted by [`ARCH_BOOST_FACTOR`],
    /// and the top `limit` of the re-ranked list is returned.
    async fn search(
        &self,
        vector: &[f32],
        limit: usize,
        file_type: Option<&str>,
    ) -> Result<Vec<SearchHit>>;

    /// Write the cold-path summary onto every record of `filepath`.
    async fn update_summary(&self, filepath: &str, summary: &str) -> Result<()>;

    /// Delete all records for `filepath`.
    async fn delete_file(&self, filepath: &str) -> Result<()>;

    /// All filepaths currently present.
    async fn list_filepaths(&self) -> Result<Vec<String>>;

    /// Total number of records.
    async fn row_count(&self) -> Result<usize>;

    /// Number of distinct files.
    async fn file_count(&self) -> Result<usize>;

    /// Backend maintenance (compaction, index rebuild). Best-effort.
    async fn optimize(&self) -> Result<()>;

    /// Drop all data.
    async fn clear(&self) -> Result<()>;
}

/// L2 distance between two vectors; mismatched dimensions rank last.
#[must_use]
pub(crate) fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::MAX;
    }
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum::<f32>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn l2_distance_basics() {
        assert_eq!(l2_distance(&[0.0, 0.0], &[3.0, 4.0]), 5.0);
        assert_eq!(l2_distance(&[1.0], &[1.0]), 0.0);
        assert_eq!(l2_distance(&[1.0], &[1.0, 2.0]), f32::MAX);
    }
}
