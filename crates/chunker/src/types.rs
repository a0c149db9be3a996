use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A contiguous slice of a source file selected for independent embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkUnit {
    /// Stable identifier derived from filepath, line range, and content.
    pub id: String,

    /// The raw chunk content.
    pub content: String,

    /// Source file path.
    pub filepath: String,

    /// Namespace/type/member chain, e.g. `namespace App > class Foo > method Bar`.
    pub context_header: String,

    /// Structural kind of this chunk.
    pub chunk_kind: ChunkKind,

    /// Start line (1-indexed).
    pub start_line: usize,

    /// End line (1-indexed, inclusive).
    pub end_line: usize,

    /// Whether the content matches framework-signal patterns (DI, routing,
    /// configuration) used for relevance boosting at search time.
    pub is_architecture_node: bool,

    /// The exact text submitted to the embedding provider.
    pub embedding_text: String,

    /// Natural-language summary filled in by the cold path, if any.
    #[serde(default)]
    pub summary: String,

    /// File type tag, e.g. `cs` or `rs`.
    pub file_type: String,
}

impl ChunkUnit {
    /// Number of lines covered by this chunk.
    #[must_use]
    pub const fn line_count(&self) -> usize {
        self.end_line.saturating_sub(self.start_line) + 1
    }

    /// Check if chunk covers a specific line.
    #[must_use]
    pub const fn contains_line(&self, line: usize) -> bool {
        line >= self.start_line && line <= self.end_line
    }
}

/// Structural kind of a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ChunkKind {
    /// Type declaration (class, struct, interface, enum).
    Class,
    /// Method or free function body.
    Method,
    /// Property accessor block.
    Property,
    /// Fallback window over unstructured content.
    Block,
    /// File declaration plus imports.
    FileHeader,
}

impl ChunkKind {
    /// Human-readable name, used in context headers and embedding text.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Method => "method",
            Self::Property => "property",
            Self::Block => "block",
            Self::FileHeader => "file_header",
        }
    }

    /// Member kinds are emitted even below the minimum chunk size; window
    /// and header chunks are not.
    #[must_use]
    pub const fn is_member(self) -> bool {
        matches!(self, Self::Class | Self::Method | Self::Property)
    }
}

/// Stable chunk id for a (filepath, line range, content) triple.
///
/// Identical content at the same location always hashes to the same id, so
/// reindexing an unchanged file produces the same ids across runs.
#[must_use]
pub fn chunk_id(filepath: &str, start_line: usize, end_line: usize, content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(filepath.as_bytes());
    hasher.update(b":");
    hasher.update(start_line.to_string().as_bytes());
    hasher.update(b":");
    hasher.update(end_line.to_string().as_bytes());
    hasher.update(b":");
    hasher.update(content.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(32);
    for byte in &digest[..16] {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_id_stable() {
        let a = chunk_id("src/Foo.cs", 1, 10, "public class Foo {}");
        let b = chunk_id("src/Foo.cs", 1, 10, "public class Foo {}");
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn test_chunk_id_varies_with_inputs() {
        let base = chunk_id("src/Foo.cs", 1, 10, "x");
        assert_ne!(base, chunk_id("src/Bar.cs", 1, 10, "x"));
        assert_ne!(base, chunk_id("src/Foo.cs", 2, 10, "x"));
        assert_ne!(base, chunk_id("src/Foo.cs", 1, 10, "y"));
    }

    #[test]
    fn test_line_count() {
        let chunk = ChunkUnit {
            id: String::new(),
            content: String::new(),
            filepath: "test.cs".to_string(),
            context_header: String::new(),
            chunk_kind: ChunkKind::Block,
            start_line: 10,
            end_line: 15,
            is_architecture_node: false,
            embedding_text: String::new(),
            summary: String::new(),
            file_type: "cs".to_string(),
        };
        assert_eq!(chunk.line_count(), 6);
        assert!(chunk.contains_line(10));
        assert!(chunk.contains_line(15));
        assert!(!chunk.contains_line(16));
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(ChunkKind::FileHeader.as_str(), "file_header");
        assert_eq!(ChunkKind::Method.as_str(), "method");
        assert!(ChunkKind::Property.is_member());
        assert!(!ChunkKind::Block.is_member());
    }
}
