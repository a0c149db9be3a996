use serde::{Deserialize, Serialize};

/// How many error messages are kept verbatim; the counters keep counting.
const MAX_SAMPLED_ERRORS: usize = 10;

/// Aggregated outcome of an indexing run.
///
/// Overload failures are counted separately from other errors: they are
/// expected to be transient and resolve by re-running, so operators read
/// them differently.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexStats {
    /// Files indexed successfully.
    pub files: usize,

    /// Chunks produced across all files.
    pub chunks: usize,

    /// Files whose processing failed.
    pub failed: usize,

    /// Files skipped because no chunker supports their type.
    pub skipped: usize,

    /// Failures attributed to provider overload.
    pub overload_errors: usize,

    /// Wall-clock duration in milliseconds.
    pub time_ms: u64,

    /// Sampled error details; only the first few are kept verbatim.
    pub errors: Vec<String>,
}

impl IndexStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_success(&mut self, chunks: usize) {
        self.files += 1;
        self.chunks += chunks;
    }

    pub fn add_skipped(&mut self) {
        self.skipped += 1;
    }

    pub fn add_failure(&mut self, message: &str, overload: bool) {
        self.failed += 1;
        if overload {
            self.overload_errors += 1;
        }
        if self.errors.len() < MAX_SAMPLED_ERRORS {
            self.errors.push(message.to_string());
        }
    }
}

impl std::fmt::Display for IndexStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Files: {} | Chunks: {} | Failed: {} ({} overload) | Skipped: {} | {}ms",
            self.files, self.chunks, self.failed, self.overload_errors, self.skipped, self.time_ms
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn error_sampling_is_bounded() {
        let mut stats = IndexStats::new();
        for i in 0..50 {
            stats.add_failure(&format!("error {i}"), i % 2 == 0);
        }

        assert_eq!(stats.failed, 50);
        assert_eq!(stats.overload_errors, 25);
        assert_eq!(stats.errors.len(), MAX_SAMPLED_ERRORS);
    }

    #[test]
    fn display_is_compact() {
        let mut stats = IndexStats::new();
        stats.add_success(7);
        stats.time_ms = 120;
        let line = stats.to_string();
        assert!(line.contains("Files: 1"));
        assert!(line.contains("Chunks: 7"));
    }
}
