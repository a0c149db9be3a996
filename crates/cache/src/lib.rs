//! # Librarian Cache
//!
//! Persistent caching for delta indexing and embedding reuse.
//!
//! Two independent stores live here:
//!
//! - [`ChangeCache`] records one change signature per indexed file
//!   (content hash, mtime, size, chunk count) and answers "which of these
//!   paths changed since the last successful index?" without re-hashing
//!   file bytes.
//! - [`EmbeddingCache`] is a content-addressed vector store keyed by a
//!   stable hash of the exact embedding text, so identical text across
//!   files and runs resolves to one stored vector. It is never evicted by
//!   policy; growth is bounded only by disk.
//!
//! Both persist with atomic tmp-file + rename writes and treat corrupt
//! entries as misses rather than errors.

mod change_cache;
mod embedding_cache;
mod error;

pub use change_cache::{file_signature, hash_content, ChangeCache, ChangeCacheStats, FileRecord};
pub use embedding_cache::{EmbeddingCache, EmbeddingCacheStats};
pub use error::{CacheError, Result};
