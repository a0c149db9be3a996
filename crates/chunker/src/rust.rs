use crate::config::ChunkerConfig;
use crate::emit::{make_chunk, windowed_chunks};
use crate::registry::LanguageChunker;
use crate::types::{ChunkKind, ChunkUnit};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

static MOD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:pub\s+)?mod\s+(\w+)\s*\{").expect("mod pattern"));

static TYPE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:pub(?:\([^)]*\))?\s+)?(?:struct|enum|trait|union)\s+(\w+)")
        .expect("type pattern")
});

static IMPL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^impl(?:<[^>]*>)?\s+([\w:]+)").expect("impl pattern"));

static FN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^(?:pub(?:\([^)]*\))?\s+)?(?:const\s+)?(?:async\s+)?(?:unsafe\s+)?(?:extern\s+"[^"]*"\s+)?fn\s+(\w+)"#,
    )
    .expect("fn pattern")
});

/// Framework signals for Rust sources: entry points, routing, service
/// wiring, configuration loading.
const ARCH_INDICATORS: &[&str] = &[
    "fn main(",
    "#[tokio::main]",
    "#[actix_web::main]",
    "Router::new",
    ".route(",
    "HttpServer::new",
    "ServiceBuilder::new",
    "clap::Parser",
    "#[command(",
    "Config::builder",
    "envy::from_env",
];

#[derive(Debug)]
struct Member {
    kind: ChunkKind,
    name: String,
    owner: Option<String>,
    start: usize,
    end: Option<usize>,
}

#[derive(Debug, Default)]
struct Structure {
    module: Option<String>,
    first_type_start: Option<usize>,
    members: Vec<Member>,
}

/// Rust chunker splitting files at type/impl/function boundaries with the
/// same forward brace scan the C# chunker uses.
pub struct RustChunker {
    config: ChunkerConfig,
}

impl RustChunker {
    #[must_use]
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    fn parse_structure(lines: &[&str]) -> Structure {
        let mut structure = Structure::default();
        let mut brace_depth: i32 = 0;
        let mut current_owner: Option<String> = None;
        let mut current_owner_depth: i32 = 0;

        for (i, line) in lines.iter().enumerate() {
            let stripped = line.trim();

            if structure.module.is_none() {
                if let Some(caps) = MOD_RE.captures(stripped) {
                    structure.module = Some(caps[1].to_string());
                }
            }

            if let Some(caps) = TYPE_RE.captures(stripped) {
                if structure.first_type_start.is_none() {
                    structure.first_type_start = Some(i);
                }
                if !stripped.ends_with(';') {
                    current_owner = Some(caps[1].to_string());
                    current_owner_depth = brace_depth;
                }
                structure.members.push(Member {
                    kind: ChunkKind::Class,
                    name: caps[1].to_string(),
                    owner: None,
                    start: i,
                    end: None,
                });
            } else if let Some(caps) = IMPL_RE.captures(stripped) {
                current_owner = Some(caps[1].to_string());
                current_owner_depth = brace_depth;
            } else if let Some(caps) = FN_RE.captures(stripped) {
                if !stripped.ends_with(';') {
                    structure.members.push(Member {
                        kind: ChunkKind::Method,
                        name: caps[1].to_string(),
                        owner: current_owner.clone(),
                        start: i,
                        end: None,
                    });
                }
            }

            brace_depth += count_braces(stripped);

            if current_owner.is_some() && brace_depth <= current_owner_depth {
                current_owner = None;
            }
        }

        structure.members.sort_by_key(|member| member.start);
        Self::find_member_ends(lines, &mut structure);
        structure
    }

    fn find_member_ends(lines: &[&str], structure: &mut Structure) {
        let starts: Vec<usize> = structure.members.iter().map(|member| member.start).collect();

        for (idx, member) in structure.members.iter_mut().enumerate() {
            let mut brace_count: i32 = 0;
            let mut in_body = false;

            for (j, line) in lines.iter().enumerate().skip(member.start) {
                let stripped = line.trim();
                brace_count += count_braces(stripped);

                if stripped.contains('{') {
                    in_body = true;
                }

                // Tuple structs and unit declarations end at the semicolon
                // before any brace shows up.
                if !in_body && stripped.ends_with(';') {
                    member.end = Some(j);
                    break;
                }

                if in_body && brace_count == 0 {
                    member.end = Some(j);
                    break;
                }
            }

            if member.end.is_none() {
                member.end = starts
                    .get(idx + 1)
                    .map(|next| next.saturating_sub(1))
                    .or(Some(lines.len() - 1));
            }
        }
    }

    fn chunk_by_members(
        &self,
        filepath: &str,
        lines: &[&str],
        structure: &Structure,
    ) -> Vec<ChunkUnit> {
        let mut chunks = Vec::new();

        for member in &structure.members {
            let start = member.start;
            let end = member.end.unwrap_or(lines.len() - 1).min(lines.len() - 1);

            let mut context_parts = Vec::new();
            if let Some(module) = &structure.module {
                context_parts.push(format!("mod {module}"));
            }
            if let Some(owner) = &member.owner {
                context_parts.push(format!("impl {owner}"));
            }
            let kind_word = match member.kind {
                ChunkKind::Method => "fn",
                _ => "type",
            };
            context_parts.push(format!("{kind_word} {}", member.name));
            let context_header = context_parts.join(" > ");

            let member_lines = &lines[start..=end];
            if member_lines.len() > self.config.max_chunk_lines {
                chunks.extend(windowed_chunks(
                    &self.config,
                    filepath,
                    member_lines,
                    start + 1,
                    &context_header,
                    member.kind,
                    "rs",
                    ARCH_INDICATORS,
                ));
            } else {
                let content = member_lines.join("\n");
                chunks.push(make_chunk(
                    &self.config,
                    filepath,
                    &content,
                    start + 1,
                    end + 1,
                    &context_header,
                    member.kind,
                    "rs",
                    ARCH_INDICATORS,
                ));
            }
        }

        chunks
    }

    fn header_chunk(
        &self,
        filepath: &str,
        lines: &[&str],
        structure: &Structure,
    ) -> Option<ChunkUnit> {
        let first_type = structure.first_type_start?;
        if first_type == 0 {
            return None;
        }

        let content = lines[..first_type].join("\n");
        if content.len() < self.config.min_chunk_chars {
            return None;
        }

        let mut context_header = format!("FILE: {}", file_name(filepath));
        if let Some(module) = &structure.module {
            context_header.push_str(&format!(" > mod {module}"));
        }
        context_header.push_str(" (declaration)");

        Some(make_chunk(
            &self.config,
            filepath,
            &content,
            1,
            first_type,
            &context_header,
            ChunkKind::FileHeader,
            "rs",
            ARCH_INDICATORS,
        ))
    }
}

impl LanguageChunker for RustChunker {
    fn language_name(&self) -> &'static str {
        "Rust"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["rs"]
    }

    fn architecture_indicators(&self) -> &'static [&'static str] {
        ARCH_INDICATORS
    }

    fn chunk_file(&self, filepath: &str, content: &str) -> Vec<ChunkUnit> {
        let lines: Vec<&str> = content.lines().collect();
        if lines.is_empty() {
            return Vec::new();
        }

        let structure = Self::parse_structure(&lines);

        let mut chunks = if structure.members.is_empty() {
            let context_header = structure
                .module
                .as_ref()
                .map_or_else(|| file_name(filepath), |module| format!("mod {module}"));
            windowed_chunks(
                &self.config,
                filepath,
                &lines,
                1,
                &context_header,
                ChunkKind::Block,
                "rs",
                ARCH_INDICATORS,
            )
        } else {
            self.chunk_by_members(filepath, &lines, &structure)
        };

        if let Some(header) = self.header_chunk(filepath, &lines, &structure) {
            chunks.insert(0, header);
        }

        chunks
    }
}

fn count_braces(line: &str) -> i32 {
    let opens = line.matches('{').count() as i32;
    let closes = line.matches('}').count() as i32;
    opens - closes
}

fn file_name(filepath: &str) -> String {
    Path::new(filepath)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(filepath)
        .to_string()
}
