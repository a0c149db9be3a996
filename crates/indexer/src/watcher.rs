use crate::architect::ArchitectAnalyzer;
use crate::error::{IndexerError, Result};
use crate::pipeline::IndexingPipeline;
use librarian_store::VectorStore;
use notify::{Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex as TokioMutex, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Instant, MissedTickBehavior};

/// Scheduler tuning knobs.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Quiet interval before a pending file goes to the cold path.
    pub debounce: Duration,

    /// Cold-path sweep cadence.
    pub tick_interval: Duration,

    /// Worker bound for cold-path analysis.
    pub cold_workers: usize,

    /// Path substrings that are never indexed from events.
    pub ignore_patterns: Vec<String>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_secs(5),
            tick_interval: Duration::from_secs(1),
            cold_workers: 4,
            ignore_patterns: vec![
                "/bin/".to_string(),
                "/obj/".to_string(),
                "/.git/".to_string(),
                "/.vs/".to_string(),
                "/node_modules/".to_string(),
                "/target/".to_string(),
            ],
        }
    }
}

/// Live scheduler state, published on every transition.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchedulerHealth {
    /// Files waiting out the cold-path debounce.
    pub pending_cold: usize,
    /// Hot-path files indexed since start.
    pub hot_processed: u64,
    /// Cold-path analyses completed since start.
    pub cold_processed: u64,
    /// Consecutive hot-path failures.
    pub consecutive_failures: u32,
    pub last_error: Option<String>,
}

enum SchedulerCommand {
    FileEvent(PathBuf),
    Shutdown,
}

/// Filesystem-driven dual-path scheduler.
///
/// Create/modify events (after an ignore-list and extension filter) run
/// the indexing pipeline synchronously per event for low-latency freshness
/// (hot path), and independently mark the file pending for deep analysis.
/// A background tick loop drains files whose last event is older than the
/// debounce interval into a bounded worker pool that generates a summary
/// via the LLM provider and writes it back to the store (cold path).
/// Rescheduling an already-pending file bumps its timestamp, coalescing
/// edit bursts into one analysis.
///
/// Shutdown is cooperative: stop accepting events, let in-flight work
/// finish. No ordering is guaranteed across files or across rapid
/// successive events on the same file; the last completed write wins.
#[derive(Clone)]
pub struct WatchScheduler {
    inner: Arc<WatchSchedulerInner>,
}

struct WatchSchedulerInner {
    command_tx: mpsc::Sender<SchedulerCommand>,
    health_tx: watch::Sender<SchedulerHealth>,
    loop_handle: TokioMutex<Option<JoinHandle<()>>>,
    watcher: std::sync::Mutex<Option<RecommendedWatcher>>,
}

impl WatchScheduler {
    /// Watch `root` recursively and start the scheduler loop.
    pub fn start(
        root: &Path,
        pipeline: Arc<IndexingPipeline>,
        architect: Arc<ArchitectAnalyzer>,
        store: Arc<dyn VectorStore>,
        config: WatchConfig,
    ) -> Result<Self> {
        let (command_tx, command_rx) = mpsc::channel(1024);
        let (health_tx, _health_rx) = watch::channel(SchedulerHealth::default());

        let watcher = create_fs_watcher(root, command_tx.clone())?;

        let handle = spawn_scheduler_loop(
            pipeline,
            architect,
            store,
            config,
            command_rx,
            health_tx.clone(),
        );

        Ok(Self {
            inner: Arc::new(WatchSchedulerInner {
                command_tx,
                health_tx,
                loop_handle: TokioMutex::new(Some(handle)),
                watcher: std::sync::Mutex::new(Some(watcher)),
            }),
        })
    }

    /// Inject a file event by hand, exactly as if the watcher reported it.
    pub async fn trigger_file(&self, path: impl Into<PathBuf>) -> Result<()> {
        self.inner
            .command_tx
            .send(SchedulerCommand::FileEvent(path.into()))
            .await
            .map_err(|err| IndexerError::Other(format!("scheduler is stopped: {err}")))
    }

    /// Stop accepting events and wait for in-flight work to finish.
    pub async fn shutdown(&self) -> Result<()> {
        // Drop the watcher first so no further events arrive.
        if let Ok(mut guard) = self.inner.watcher.lock() {
            guard.take();
        }
        let _ = self.inner.command_tx.send(SchedulerCommand::Shutdown).await;

        let handle = {
            let mut guard = self.inner.loop_handle.lock().await;
            guard.take()
        };
        if let Some(handle) = handle {
            handle
                .await
                .map_err(|err| IndexerError::Other(format!("scheduler loop panicked: {err}")))?;
        }
        Ok(())
    }

    #[must_use]
    pub fn health_snapshot(&self) -> SchedulerHealth {
        self.inner.health_tx.subscribe().borrow().clone()
    }

    #[must_use]
    pub fn health_stream(&self) -> watch::Receiver<SchedulerHealth> {
        self.inner.health_tx.subscribe()
    }
}

fn create_fs_watcher(
    root: &Path,
    command_tx: mpsc::Sender<SchedulerCommand>,
) -> Result<RecommendedWatcher> {
    let mut watcher = RecommendedWatcher::new(
        move |result: notify::Result<Event>| match result {
            Ok(event) => {
                if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                    return;
                }
                for path in event.paths {
                    let _ = command_tx.blocking_send(SchedulerCommand::FileEvent(path));
                }
            }
            Err(err) => log::warn!("Watcher error: {err}"),
        },
        NotifyConfig::default(),
    )
    .map_err(|err| IndexerError::Other(format!("watcher init failed: {err}")))?;

    watcher
        .watch(root, RecursiveMode::Recursive)
        .map_err(|err| IndexerError::Other(format!("watch {} failed: {err}", root.display())))?;

    Ok(watcher)
}

fn spawn_scheduler_loop(
    pipeline: Arc<IndexingPipeline>,
    architect: Arc<ArchitectAnalyzer>,
    store: Arc<dyn VectorStore>,
    config: WatchConfig,
    mut command_rx: mpsc::Receiver<SchedulerCommand>,
    health_tx: watch::Sender<SchedulerHealth>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut pending: HashMap<PathBuf, Instant> = HashMap::new();
        let mut health = SchedulerHealth::default();

        let mut tick = tokio::time::interval(config.tick_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let cold_workers = Arc::new(Semaphore::new(config.cold_workers.max(1)));
        let mut cold_tasks: JoinSet<(PathBuf, std::result::Result<(), String>)> = JoinSet::new();

        loop {
            tokio::select! {
                command = command_rx.recv() => {
                    match command {
                        Some(SchedulerCommand::FileEvent(path)) => {
                            if !is_relevant_event(&path, &config.ignore_patterns, &pipeline) {
                                continue;
                            }

                            // Hot path: synchronous per-event reindex.
                            let outcome = pipeline.process_file(&path).await;
                            if outcome.succeeded {
                                health.hot_processed += 1;
                                health.consecutive_failures = 0;
                                log::info!(
                                    "[hot] Indexed {} ({} chunks)",
                                    path.display(),
                                    outcome.chunk_count
                                );
                            } else if !outcome.skipped {
                                health.consecutive_failures += 1;
                                health.last_error = outcome.error.clone();
                                log::warn!(
                                    "[hot] Failed to index {}: {}",
                                    path.display(),
                                    outcome.error.as_deref().unwrap_or("unknown error")
                                );
                            }

                            // Cold path: (re)schedule; bumping the timestamp
                            // coalesces edit bursts into one analysis.
                            pending.insert(path, Instant::now());
                            publish_health(&health_tx, &health, pending.len());
                        }
                        Some(SchedulerCommand::Shutdown) | None => break,
                    }
                }
                _ = tick.tick() => {
                    let due: Vec<PathBuf> = pending
                        .iter()
                        .filter(|(_, scheduled)| scheduled.elapsed() >= config.debounce)
                        .map(|(path, _)| path.clone())
                        .collect();

                    for path in due {
                        pending.remove(&path);
                        let architect = architect.clone();
                        let store = store.clone();
                        let workers = cold_workers.clone();
                        cold_tasks.spawn(async move {
                            let _permit = workers
                                .acquire_owned()
                                .await
                                .unwrap_or_else(|_| unreachable!("cold worker semaphore closed"));
                            let result = run_cold_analysis(&architect, store.as_ref(), &path).await;
                            (path, result)
                        });
                    }
                    publish_health(&health_tx, &health, pending.len());
                }
                Some(joined) = cold_tasks.join_next(), if !cold_tasks.is_empty() => {
                    record_cold_result(joined, &mut health);
                    publish_health(&health_tx, &health, pending.len());
                }
            }
        }

        // Cooperative shutdown: no new events, in-flight analyses finish.
        while let Some(joined) = cold_tasks.join_next().await {
            record_cold_result(joined, &mut health);
        }
        publish_health(&health_tx, &health, pending.len());
        log::info!("Scheduler stopped");
    })
}

fn record_cold_result(
    joined: std::result::Result<(PathBuf, std::result::Result<(), String>), tokio::task::JoinError>,
    health: &mut SchedulerHealth,
) {
    match joined {
        Ok((path, Ok(()))) => {
            health.cold_processed += 1;
            log::info!("[cold] Summary updated for {}", path.display());
        }
        Ok((path, Err(err))) => {
            health.last_error = Some(err.clone());
            log::warn!("[cold] Analysis failed for {}: {err}", path.display());
        }
        Err(err) => log::error!("Cold-path worker panicked: {err}"),
    }
}

fn is_relevant_event(
    path: &Path,
    ignore_patterns: &[String],
    pipeline: &IndexingPipeline,
) -> bool {
    let display = path.to_string_lossy();
    if ignore_patterns.iter().any(|pattern| display.contains(pattern.as_str())) {
        return false;
    }
    if !pipeline.is_supported(path) {
        return false;
    }
    std::fs::metadata(path).map(|meta| meta.is_file()).unwrap_or(false)
}

async fn run_cold_analysis(
    architect: &ArchitectAnalyzer,
    store: &dyn VectorStore,
    path: &Path,
) -> std::result::Result<(), String> {
    let display = path.to_string_lossy().to_string();

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|err| format!("read {display}: {err}"))?;
    let content = String::from_utf8_lossy(&bytes).into_owned();

    let structural = ArchitectAnalyzer::detect_structure(&content);
    log::debug!(
        "[cold] Analyzing {display} (structural: {structural})"
    );

    let summary = architect
        .generate_summary(&content)
        .await
        .map_err(|err| err.to_string())?;
    if summary.is_empty() {
        return Ok(());
    }

    store
        .update_summary(&display, &summary)
        .await
        .map_err(|err| format!("update summary {display}: {err}"))
}

fn publish_health(
    health_tx: &watch::Sender<SchedulerHealth>,
    health: &SchedulerHealth,
    pending_cold: usize,
) {
    let mut snapshot = health.clone();
    snapshot.pending_cold = pending_cold;
    let _ = health_tx.send(snapshot);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::PipelineConfig;
    use librarian_cache::{ChangeCache, EmbeddingCache};
    use librarian_chunker::{ChunkerConfig, ChunkerRegistry};
    use librarian_embedder::{EmbeddingEngine, EngineConfig, StubProvider};
    use librarian_store::JsonVectorStore;
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        /// Test files live outside the watched root so only manual
        /// triggers reach the scheduler and event counts stay exact.
        files: PathBuf,
        scheduler: WatchScheduler,
        store: Arc<JsonVectorStore>,
        llm: Arc<StubProvider>,
    }

    async fn fixture(debounce: Duration) -> Fixture {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("project");
        tokio::fs::create_dir_all(&root).await.unwrap();
        let files = temp.path().join("files");
        tokio::fs::create_dir_all(&files).await.unwrap();

        let provider = Arc::new(StubProvider::new(8));
        let engine = Arc::new(EmbeddingEngine::new(
            provider,
            Some(EmbeddingCache::new(temp.path().join("cache"), "stub")),
            EngineConfig {
                requests_per_second: 0.0,
                ..EngineConfig::default()
            },
        ));
        let store = Arc::new(
            JsonVectorStore::open(temp.path().join("store.json"))
                .await
                .unwrap(),
        );
        let change_cache = Arc::new(
            ChangeCache::open(temp.path().join("files.json"))
                .await
                .unwrap(),
        );
        let registry = Arc::new(ChunkerRegistry::with_defaults(ChunkerConfig::default()));
        let pipeline = Arc::new(IndexingPipeline::new(
            registry,
            engine,
            store.clone(),
            change_cache,
            PipelineConfig::default(),
        ));

        let llm = Arc::new(StubProvider::new(8));
        let architect = Arc::new(ArchitectAnalyzer::new(llm.clone()));

        let scheduler = WatchScheduler::start(
            &root,
            pipeline,
            architect,
            store.clone(),
            WatchConfig {
                debounce,
                tick_interval: Duration::from_millis(20),
                cold_workers: 2,
                ..WatchConfig::default()
            },
        )
        .unwrap();

        Fixture {
            _temp: temp,
            files,
            scheduler,
            store,
            llm,
        }
    }

    async fn wait_until(
        scheduler: &WatchScheduler,
        deadline: Duration,
        predicate: impl Fn(&SchedulerHealth) -> bool,
    ) -> SchedulerHealth {
        let started = Instant::now();
        loop {
            let health = scheduler.health_snapshot();
            if predicate(&health) {
                return health;
            }
            assert!(
                started.elapsed() < deadline,
                "timed out waiting for scheduler state: {health:?}"
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    const SAMPLE_CS: &str = "using System;\n\nnamespace App\n{\n    public class Widget\n    {\n        public int Size { get; set; }\n\n        public string Describe(string label)\n        {\n            return $\"{label}: {Size}\";\n        }\n    }\n}\n";

    #[tokio::test]
    async fn hot_path_indexes_on_event_and_cold_path_summarizes() {
        let fx = fixture(Duration::from_millis(50)).await;

        let file = fx.files.join("Widget.cs");
        tokio::fs::write(&file, SAMPLE_CS).await.unwrap();
        fx.scheduler.trigger_file(&file).await.unwrap();

        wait_until(&fx.scheduler, Duration::from_secs(5), |h| {
            h.hot_processed == 1
        })
        .await;
        assert!(fx.store.row_count().await.unwrap() > 0);

        wait_until(&fx.scheduler, Duration::from_secs(5), |h| {
            h.cold_processed == 1
        })
        .await;

        let hits = fx.store.search(&[0.0; 8], 10, None).await.unwrap();
        assert!(hits.iter().all(|hit| !hit.record.summary.is_empty()));

        fx.scheduler.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn edit_bursts_coalesce_into_one_analysis() {
        let fx = fixture(Duration::from_millis(100)).await;

        let file = fx.files.join("Widget.cs");
        tokio::fs::write(&file, SAMPLE_CS).await.unwrap();

        for _ in 0..5 {
            fx.scheduler.trigger_file(&file).await.unwrap();
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        wait_until(&fx.scheduler, Duration::from_secs(5), |h| {
            h.cold_processed >= 1
        })
        .await;
        // Give any spurious second analysis a chance to run before
        // asserting it never happened.
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(fx.scheduler.health_snapshot().cold_processed, 1);
        assert_eq!(fx.llm.generate_calls(), 1);

        fx.scheduler.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn irrelevant_events_are_filtered() {
        let fx = fixture(Duration::from_millis(50)).await;

        let ignored_dir = fx.files.join("bin");
        tokio::fs::create_dir_all(&ignored_dir).await.unwrap();
        let ignored = ignored_dir.join("Generated.cs");
        tokio::fs::write(&ignored, SAMPLE_CS).await.unwrap();
        fx.scheduler.trigger_file(&ignored).await.unwrap();

        let unsupported = fx.files.join("notes.txt");
        tokio::fs::write(&unsupported, "plain text").await.unwrap();
        fx.scheduler.trigger_file(&unsupported).await.unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;
        let health = fx.scheduler.health_snapshot();
        assert_eq!(health.hot_processed, 0);
        assert_eq!(health.pending_cold, 0);

        fx.scheduler.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn shutdown_waits_for_inflight_cold_work() {
        let fx = fixture(Duration::from_millis(30)).await;

        let file = fx.files.join("Widget.cs");
        tokio::fs::write(&file, SAMPLE_CS).await.unwrap();
        fx.scheduler.trigger_file(&file).await.unwrap();

        // Let the debounce expire so the cold task is submitted.
        wait_until(&fx.scheduler, Duration::from_secs(5), |h| {
            h.hot_processed == 1
        })
        .await;
        tokio::time::sleep(Duration::from_millis(60)).await;

        fx.scheduler.shutdown().await.unwrap();
        assert!(fx.scheduler.health_snapshot().cold_processed <= 1);
    }
}
