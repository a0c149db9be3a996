//! Pre-splitting of oversized inputs at natural boundaries.

/// Split `text` into ordered sub-texts that each fit within `max_length`
/// characters.
///
/// Embedding models enforce strict token limits and code tokenizes densely,
/// so instead of truncating (and losing data) the text is split at newline
/// boundaries first, falling back to word boundaries for single long
/// lines. Each sub-text is embedded separately and all of them stay
/// searchable.
#[must_use]
pub fn split_text_to_fit(text: &str, max_length: usize) -> Vec<String> {
    if text.len() <= max_length {
        return vec![text.to_string()];
    }

    // Leave room for part headers added by callers.
    let chunk_size = max_length.saturating_sub(50).max(1);

    let mut chunks: Vec<String> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_len = 0usize;

    for line in text.split('\n') {
        let line_len = line.len() + 1;

        if line_len > chunk_size {
            if !current.is_empty() {
                chunks.push(current.join("\n"));
                current.clear();
                current_len = 0;
            }

            // Single line too long for one chunk: split it by words.
            let mut word_chunk: Vec<&str> = Vec::new();
            let mut word_len = 0usize;
            for word in line.split_whitespace() {
                let len = word.len() + 1;
                if word_len + len > chunk_size {
                    if !word_chunk.is_empty() {
                        chunks.push(word_chunk.join(" "));
                    }
                    word_chunk = vec![word];
                    word_len = len;
                } else {
                    word_chunk.push(word);
                    word_len += len;
                }
            }
            if !word_chunk.is_empty() {
                chunks.push(word_chunk.join(" "));
            }
        } else if current_len + line_len > chunk_size {
            if !current.is_empty() {
                chunks.push(current.join("\n"));
            }
            current = vec![line];
            current_len = line_len;
        } else {
            current.push(line);
            current_len += line_len;
        }
    }

    if !current.is_empty() {
        chunks.push(current.join("\n"));
    }

    if chunks.len() > 1 {
        log::debug!(
            "Split oversized text into {} parts (original: {} chars)",
            chunks.len(),
            text.len()
        );
    }

    chunks
}
