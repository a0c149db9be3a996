use crate::config::ChunkerConfig;
use crate::csharp::CSharpChunker;
use crate::rust::RustChunker;
use crate::types::ChunkUnit;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Contract implemented by every language-specific chunker.
///
/// Dispatch is capability-based: the registry maps extensions to chunker
/// instances behind this one trait, and adding a language means adding a
/// registry entry, not a new code path.
pub trait LanguageChunker: Send + Sync {
    /// Human-readable language name, e.g. `C#`.
    fn language_name(&self) -> &'static str;

    /// File extensions this chunker handles, lowercase without the dot.
    fn extensions(&self) -> &'static [&'static str];

    /// Framework-signal substrings that mark a chunk as an architecture
    /// node for relevance boosting. Each language brings its own list.
    fn architecture_indicators(&self) -> &'static [&'static str];

    /// Split file content into ordered chunks. An empty file yields an
    /// empty result; malformed sources degrade to windowed blocks.
    fn chunk_file(&self, filepath: &str, content: &str) -> Vec<ChunkUnit>;
}

/// Registry mapping file extensions to chunker implementations.
///
/// Constructed once at startup and passed to consumers; there is no global
/// instance.
pub struct ChunkerRegistry {
    by_extension: HashMap<String, Arc<dyn LanguageChunker>>,
}

impl ChunkerRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            by_extension: HashMap::new(),
        }
    }

    /// Create a registry with all built-in chunkers registered.
    #[must_use]
    pub fn with_defaults(config: ChunkerConfig) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(CSharpChunker::new(config.clone())));
        registry.register(Arc::new(RustChunker::new(config)));
        registry
    }

    /// Register a chunker for every extension it reports.
    pub fn register(&mut self, chunker: Arc<dyn LanguageChunker>) {
        for ext in chunker.extensions() {
            self.by_extension
                .insert((*ext).to_lowercase(), chunker.clone());
        }
    }

    /// Find the chunker for a path, by extension. `None` means the file
    /// type is unsupported and should be skipped.
    #[must_use]
    pub fn chunker_for(&self, path: impl AsRef<Path>) -> Option<Arc<dyn LanguageChunker>> {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|ext| ext.to_str())?
            .to_lowercase();
        self.by_extension.get(&ext).cloned()
    }

    /// Check whether a file type is supported.
    #[must_use]
    pub fn is_supported(&self, path: impl AsRef<Path>) -> bool {
        self.chunker_for(path).is_some()
    }

    /// All supported extensions, sorted for deterministic output.
    #[must_use]
    pub fn supported_extensions(&self) -> Vec<String> {
        let mut extensions: Vec<String> = self.by_extension.keys().cloned().collect();
        extensions.sort();
        extensions
    }
}

impl Default for ChunkerRegistry {
    fn default() -> Self {
        Self::with_defaults(ChunkerConfig::default())
    }
}
