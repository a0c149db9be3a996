use serde::{Deserialize, Serialize};

/// One persisted chunk with its embedding vector.
///
/// For a given filepath, all prior records are deleted and the new set is
/// inserted together; no partial-file state is retrievable outside the
/// delete→insert crash window documented on
/// [`crate::VectorStore::upsert_file`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VectorRecord {
    pub id: String,
    pub content: String,
    pub filepath: String,
    pub context_header: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub is_architecture_node: bool,
    pub vector: Vec<f32>,
    pub file_type: String,
}

/// A ranked search result.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub record: VectorRecord,
    /// Raw L2 distance between query and record vectors.
    pub distance: f32,
    /// Distance after the architecture-node boost; results are ordered by
    /// this value.
    pub ranking_distance: f32,
}
