use serde::{Deserialize, Serialize};

/// Configuration for structural chunking behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkerConfig {
    /// Maximum lines per chunk before windowing kicks in.
    pub max_chunk_lines: usize,

    /// Lines of overlap between consecutive windows.
    pub overlap_lines: usize,

    /// Maximum embedding text length in characters (provider limit).
    pub max_text_length: usize,

    /// Minimum chunk size in characters; smaller window chunks are dropped.
    pub min_chunk_chars: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chunk_lines: 15,
            overlap_lines: 3,
            max_text_length: 1500,
            min_chunk_chars: 50,
        }
    }
}

impl ChunkerConfig {
    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_chunk_lines == 0 {
            return Err("max_chunk_lines must be > 0".to_string());
        }

        if self.overlap_lines >= self.max_chunk_lines {
            return Err(format!(
                "overlap_lines ({}) must be less than max_chunk_lines ({})",
                self.overlap_lines, self.max_chunk_lines
            ));
        }

        if self.max_text_length == 0 {
            return Err("max_text_length must be > 0".to_string());
        }

        Ok(())
    }
}
