//! Shared chunk emission helpers used by every language chunker.

use crate::config::ChunkerConfig;
use crate::types::{chunk_id, ChunkKind, ChunkUnit};

/// Format the text submitted to the embedding provider. The context header
/// keeps the fragment meaningful outside its file.
pub(crate) fn embedding_text(
    context_header: &str,
    filepath: &str,
    kind: ChunkKind,
    content: &str,
) -> String {
    format!(
        "Context: {context_header}\nFile: {filepath}\nType: {}\n\n{content}",
        kind.as_str()
    )
}

/// Truncate content that exceeds the provider text limit. Oversized chunks
/// are normally re-split upstream; this is the lossy last resort.
pub(crate) fn truncate_content(content: &str, max_text_length: usize) -> String {
    if content.len() <= max_text_length {
        return content.to_string();
    }
    let mut cut = max_text_length;
    while cut > 0 && !content.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}\n... [truncated]", &content[..cut])
}

/// Build a single chunk, truncating and flagging architecture signals.
#[allow(clippy::too_many_arguments)]
pub(crate) fn make_chunk(
    config: &ChunkerConfig,
    filepath: &str,
    content: &str,
    start_line: usize,
    end_line: usize,
    context_header: &str,
    kind: ChunkKind,
    file_type: &str,
    arch_indicators: &[&str],
) -> ChunkUnit {
    let content = truncate_content(content, config.max_text_length);
    let is_arch = arch_indicators.iter().any(|ind| content.contains(ind));

    ChunkUnit {
        id: chunk_id(filepath, start_line, end_line, &content),
        embedding_text: embedding_text(context_header, filepath, kind, &content),
        content,
        filepath: filepath.to_string(),
        context_header: context_header.to_string(),
        chunk_kind: kind,
        start_line,
        end_line,
        is_architecture_node: is_arch,
        summary: String::new(),
        file_type: file_type.to_string(),
    }
}

/// Split content into fixed-size windows with overlap.
///
/// `start_line` is the 1-indexed line of `lines[0]` in the source file. When
/// more than one window is produced, each header gets a `(part N)` suffix.
/// Windows under `min_chunk_chars` are dropped.
#[allow(clippy::too_many_arguments)]
pub(crate) fn windowed_chunks(
    config: &ChunkerConfig,
    filepath: &str,
    lines: &[&str],
    start_line: usize,
    context_header: &str,
    kind: ChunkKind,
    file_type: &str,
    arch_indicators: &[&str],
) -> Vec<ChunkUnit> {
    let mut chunks = Vec::new();
    if lines.is_empty() {
        return chunks;
    }

    let window = config.max_chunk_lines;
    let step = window.saturating_sub(config.overlap_lines).max(1);
    let multi_part = lines.len() > window;

    let mut i = 0;
    let mut part = 1;
    loop {
        let end_idx = (i + window).min(lines.len());
        let content = lines[i..end_idx].join("\n");

        let header = if multi_part {
            format!("{context_header} (part {part})")
        } else {
            context_header.to_string()
        };

        if content.len() >= config.min_chunk_chars {
            chunks.push(make_chunk(
                config,
                filepath,
                &content,
                start_line + i,
                start_line + end_idx - 1,
                &header,
                kind,
                file_type,
                arch_indicators,
            ));
        }

        if end_idx == lines.len() {
            break;
        }
        i += step;
        part += 1;
    }

    chunks
}
