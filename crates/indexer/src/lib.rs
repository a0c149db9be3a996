//! # Librarian Indexer
//!
//! Incremental indexing of a source tree into a vector store.
//!
//! ## Pipeline
//!
//! ```text
//! FS event / scan
//!     │
//!     ├──> ChangeCache (delta filter: mtime/size signature)
//!     │
//!     ├──> Chunker registry (structural chunks + re-split oversized)
//!     │
//!     ├──> EmbeddingEngine (cache-checked, rate-limited)
//!     │
//!     ├──> VectorStore.upsert_file (delete-then-insert)
//!     │
//!     └──> ChangeCache.record (only after a successful upsert)
//! ```
//!
//! The [`WatchScheduler`] drives the pipeline from filesystem events: a
//! synchronous hot path per event, and a debounced cold path that writes
//! LLM-generated summaries back to the store once edit activity settles.
//!
//! ## Example
//!
//! ```no_run
//! use librarian_cache::{ChangeCache, EmbeddingCache};
//! use librarian_chunker::{ChunkerConfig, ChunkerRegistry};
//! use librarian_embedder::{EmbeddingEngine, EngineConfig, OllamaConfig, OllamaProvider};
//! use librarian_indexer::{IndexingPipeline, PipelineConfig};
//! use librarian_store::JsonVectorStore;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let provider = Arc::new(OllamaProvider::new(OllamaConfig::default())?);
//!     let engine = Arc::new(EmbeddingEngine::new(
//!         provider,
//!         Some(EmbeddingCache::new(".librarian/cache", "nomic-embed-text")),
//!         EngineConfig::default(),
//!     ));
//!     let store = Arc::new(JsonVectorStore::open(".librarian/store.json").await?);
//!     let change_cache = Arc::new(ChangeCache::open(".librarian/files.json").await?);
//!     let registry = Arc::new(ChunkerRegistry::with_defaults(ChunkerConfig::default()));
//!
//!     let pipeline = Arc::new(IndexingPipeline::new(
//!         registry,
//!         engine,
//!         store,
//!         change_cache,
//!         PipelineConfig::default(),
//!     ));
//!
//!     let stats = pipeline
//!         .process_directory(Path::new("."), 8, true)
//!         .await?;
//!     println!("{stats}");
//!     Ok(())
//! }
//! ```

mod architect;
mod error;
mod index_lock;
mod pipeline;
mod scanner;
mod stats;
mod watcher;

pub use architect::ArchitectAnalyzer;
pub use error::{IndexerError, Result};
pub use index_lock::{acquire_index_lock, try_acquire_index_lock, IndexLock};
pub use pipeline::{FileOutcome, IndexingPipeline, PipelineConfig};
pub use scanner::{FileScanner, IGNORED_SCOPES};
pub use stats::IndexStats;
pub use watcher::{SchedulerHealth, WatchConfig, WatchScheduler};
