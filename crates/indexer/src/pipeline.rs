use crate::scanner::FileScanner;
use crate::stats::IndexStats;
use crate::Result;
use librarian_cache::{file_signature, hash_content, ChangeCache};
use librarian_chunker::{ChunkUnit, ChunkerRegistry};
use librarian_embedder::{split_text_to_fit, EmbeddingEngine, DOCUMENT_PREFIX};
use librarian_store::{VectorRecord, VectorStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Pipeline tuning knobs.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Provider text-length limit; chunks whose embedding text exceeds it
    /// are re-split before dispatch.
    pub max_text_length: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_text_length: 1500,
        }
    }
}

/// Outcome of processing one file. Errors are data, never panics or
/// propagated failures, so one bad file cannot abort a batch.
#[derive(Debug, Clone, Default)]
pub struct FileOutcome {
    pub succeeded: bool,
    pub chunk_count: usize,
    /// File type has no registered chunker; not an error.
    pub skipped: bool,
    /// Embeddings substituted with zero vectors inside an otherwise
    /// successful file.
    pub embed_failures: usize,
    /// The failure was provider overload, expected to be transient.
    pub overload: bool,
    pub error: Option<String>,
}

impl FileOutcome {
    fn success(chunk_count: usize, embed_failures: usize) -> Self {
        Self {
            succeeded: true,
            chunk_count,
            embed_failures,
            ..Self::default()
        }
    }

    fn skip() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }

    fn failure(message: String, overload: bool) -> Self {
        Self {
            overload,
            error: Some(message),
            ..Self::default()
        }
    }
}

/// Stateless per-file orchestrator: chunk, re-split oversized chunks,
/// cache-checked embed, upsert, then record the change signature.
///
/// The pipeline owns neither cache; it holds references to both plus the
/// vector store handle, all injected at construction.
pub struct IndexingPipeline {
    registry: Arc<ChunkerRegistry>,
    engine: Arc<EmbeddingEngine>,
    store: Arc<dyn VectorStore>,
    change_cache: Arc<ChangeCache>,
    config: PipelineConfig,
}

impl IndexingPipeline {
    #[must_use]
    pub fn new(
        registry: Arc<ChunkerRegistry>,
        engine: Arc<EmbeddingEngine>,
        store: Arc<dyn VectorStore>,
        change_cache: Arc<ChangeCache>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            registry,
            engine,
            store,
            change_cache,
            config,
        }
    }

    /// Check if the file type has a registered chunker.
    #[must_use]
    pub fn is_supported(&self, path: impl AsRef<Path>) -> bool {
        self.registry.is_supported(path)
    }

    /// Extensions the pipeline can index, for scanner construction.
    #[must_use]
    pub fn supported_extensions(&self) -> Vec<String> {
        self.registry.supported_extensions()
    }

    /// Filter `paths` down to files changed since their last successful
    /// index.
    pub async fn filter_changed(&self, paths: &[PathBuf]) -> Vec<PathBuf> {
        let displays: Vec<String> = paths
            .iter()
            .map(|p| p.to_string_lossy().to_string())
            .collect();
        let changed = self.change_cache.filter_changed(&displays).await;
        changed.into_iter().map(PathBuf::from).collect()
    }

    /// Process a single file end to end.
    ///
    /// Every step is caught and converted into the returned outcome. The
    /// change record is written only after a successful upsert, so a file
    /// that failed mid-way stays "changed" and retries on the next scan.
    pub async fn process_file(&self, path: &Path) -> FileOutcome {
        let display = path.to_string_lossy().to_string();

        let Some(chunker) = self.registry.chunker_for(path) else {
            log::debug!("Skipping unsupported file type: {display}");
            return FileOutcome::skip();
        };

        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(err) => return FileOutcome::failure(format!("read {display}: {err}"), false),
        };
        let content = String::from_utf8_lossy(&bytes).into_owned();

        let (mtime_ms, size) = match file_signature(path).await {
            Ok(signature) => signature,
            Err(err) => return FileOutcome::failure(format!("stat {display}: {err}"), false),
        };
        let content_hash = hash_content(&bytes);

        let chunks = chunker.chunk_file(&display, &content);
        if chunks.is_empty() {
            // Nothing retrievable in the new content: drop stale records
            // and remember the state so the file is not rescanned forever.
            if let Err(err) = self.store.delete_file(&display).await {
                return FileOutcome::failure(format!("delete {display}: {err}"), false);
            }
            if let Err(err) = self
                .change_cache
                .record(&display, &content_hash, mtime_ms, size, 0)
                .await
            {
                log::warn!("Change cache update failed for {display}: {err}");
            }
            return FileOutcome::success(0, 0);
        }

        let chunks = self.resplit_oversized(chunks);
        let texts: Vec<String> = chunks.iter().map(|c| c.embedding_text.clone()).collect();

        let batch = match self.engine.embed_batch(&texts, DOCUMENT_PREFIX).await {
            Ok(batch) => batch,
            Err(err) => {
                let overload = err.is_overload();
                return FileOutcome::failure(format!("embed {display}: {err}"), overload);
            }
        };
        if !batch.is_fully_successful() {
            log::warn!(
                "{} of {} embeddings failed for {display}; zero vectors substituted",
                batch.failure_count(),
                texts.len()
            );
        }

        let records: Vec<VectorRecord> = chunks
            .iter()
            .zip(&batch.vectors)
            .map(|(chunk, vector)| VectorRecord {
                id: chunk.id.clone(),
                content: chunk.content.clone(),
                filepath: chunk.filepath.clone(),
                context_header: chunk.context_header.clone(),
                summary: chunk.summary.clone(),
                is_architecture_node: chunk.is_architecture_node,
                vector: vector.clone(),
                file_type: chunk.file_type.clone(),
            })
            .collect();

        let chunk_count = records.len();
        if let Err(err) = self.store.upsert_file(&display, records).await {
            return FileOutcome::failure(format!("upsert {display}: {err}"), false);
        }

        // Only now does the file count as indexed; a cache write failure
        // merely costs one redundant reindex later.
        if let Err(err) = self
            .change_cache
            .record(&display, &content_hash, mtime_ms, size, chunk_count)
            .await
        {
            log::warn!("Change cache update failed for {display}: {err}");
        }

        FileOutcome::success(chunk_count, batch.failure_count())
    }

    /// Fan `process_file` out over a bounded worker pool.
    ///
    /// Outcomes are aggregated on the calling task as workers complete, in
    /// no particular order.
    pub async fn process_files_batch(
        self: &Arc<Self>,
        paths: &[PathBuf],
        concurrency: usize,
    ) -> IndexStats {
        let start = Instant::now();
        let mut stats = IndexStats::new();
        if paths.is_empty() {
            return stats;
        }

        let workers = Arc::new(Semaphore::new(concurrency.max(1)));
        let mut join_set: JoinSet<(PathBuf, FileOutcome)> = JoinSet::new();

        for path in paths {
            let pipeline = self.clone();
            let workers = workers.clone();
            let path = path.clone();
            join_set.spawn(async move {
                let _permit = workers
                    .acquire_owned()
                    .await
                    .unwrap_or_else(|_| unreachable!("worker semaphore closed"));
                let outcome = pipeline.process_file(&path).await;
                (path, outcome)
            });
        }

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((_, outcome)) if outcome.skipped => stats.add_skipped(),
                Ok((_, outcome)) if outcome.succeeded => stats.add_success(outcome.chunk_count),
                Ok((path, outcome)) => {
                    let message = outcome
                        .error
                        .unwrap_or_else(|| format!("unknown error for {}", path.display()));
                    stats.add_failure(&message, outcome.overload);
                }
                Err(err) => stats.add_failure(&format!("indexing worker panicked: {err}"), false),
            }
        }

        stats.time_ms = start.elapsed().as_millis() as u64;
        log::info!("Batch complete: {stats}");
        stats
    }

    /// Scan `root`, optionally delta-filter, and index everything found.
    pub async fn process_directory(
        self: &Arc<Self>,
        root: &Path,
        concurrency: usize,
        delta: bool,
    ) -> Result<IndexStats> {
        let scanner = FileScanner::new(root, self.supported_extensions());
        let mut paths = tokio::task::spawn_blocking(move || scanner.scan())
            .await
            .map_err(|err| crate::IndexerError::Other(format!("scan task failed: {err}")))?;

        if delta {
            let before = paths.len();
            paths = self.filter_changed(&paths).await;
            let unchanged = before - paths.len();
            if unchanged > 0 {
                log::info!("Delta scan: skipping {unchanged} unchanged files");
            }
        }

        Ok(self.process_files_batch(&paths, concurrency).await)
    }

    /// Split any chunk whose embedding text exceeds the provider limit
    /// into ordered sibling chunks over its raw content.
    ///
    /// Part ids and headers are derived from the original; the
    /// architecture flag stays on part 1 only so one signal is not counted
    /// once per part.
    fn resplit_oversized(&self, chunks: Vec<ChunkUnit>) -> Vec<ChunkUnit> {
        let mut out = Vec::with_capacity(chunks.len());

        for chunk in chunks {
            if chunk.embedding_text.len() <= self.config.max_text_length {
                out.push(chunk);
                continue;
            }

            let parts = split_text_to_fit(&chunk.content, self.config.max_text_length);
            let total = parts.len();
            log::debug!(
                "Split oversized chunk into {total} parts: {}",
                chunk.context_header
            );

            for (i, part) in parts.into_iter().enumerate() {
                let number = i + 1;
                let header = format!("{} [part {number}/{total}]", chunk.context_header);
                let embedding_text = format!("{}\n{header}\n{part}", chunk.filepath);
                let summary = if number == 1 || chunk.summary.is_empty() {
                    chunk.summary.clone()
                } else {
                    format!("{} (continued)", chunk.summary)
                };

                out.push(ChunkUnit {
                    id: format!("{}_part{number}", chunk.id),
                    content: part,
                    filepath: chunk.filepath.clone(),
                    context_header: header,
                    chunk_kind: chunk.chunk_kind,
                    start_line: chunk.start_line,
                    end_line: chunk.end_line,
                    is_architecture_node: chunk.is_architecture_node && number == 1,
                    embedding_text,
                    summary,
                    file_type: chunk.file_type.clone(),
                });
            }
        }

        out
    }

    /// Handle to the change cache, shared with schedulers.
    #[must_use]
    pub fn change_cache(&self) -> &Arc<ChangeCache> {
        &self.change_cache
    }

    /// Handle to the embedding engine, for query-time embedding.
    #[must_use]
    pub fn engine(&self) -> &Arc<EmbeddingEngine> {
        &self.engine
    }
}
