use crate::config::ChunkerConfig;
use crate::emit::{make_chunk, windowed_chunks};
use crate::registry::LanguageChunker;
use crate::types::{ChunkKind, ChunkUnit};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

static NAMESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^namespace\s+([\w.]+)").expect("namespace pattern"));

static TYPE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:public|private|internal|protected)?\s*(?:static|sealed|abstract|partial)?\s*(?:class|interface|struct|record|enum)\s+(\w+)",
    )
    .expect("type pattern")
});

static METHOD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:public|private|protected|internal)?\s*(?:static|virtual|override|async|abstract)?\s*[\w<>\[\],\s]+\s+(\w+)\s*\([^)]*\)",
    )
    .expect("method pattern")
});

static PROPERTY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:public|private|protected|internal)?\s*(?:static|virtual|override)?\s*[\w<>\[\],\s]+\s+(\w+)\s*\{\s*(?:get|set)",
    )
    .expect("property pattern")
});

/// Framework signals that mark a chunk as an architecture node: DI
/// registration, routing/middleware attributes, configuration markers.
const ARCH_INDICATORS: &[&str] = &[
    "IServiceCollection",
    "IApplicationBuilder",
    "IConfiguration",
    "builder.Services",
    "app.Use",
    "services.Add",
    "[ApiController]",
    "[HttpGet",
    "[HttpPost",
    "[HttpPut",
    "[HttpDelete",
    "[Route(",
    "[Authorize",
    "DependencyInjection",
    "Startup",
    "Program.cs",
    "appsettings",
];

#[derive(Debug)]
struct TypeDecl {
    name: String,
    start: usize,
    depth: i32,
}

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
    namespace: Option<String>,
    types: Vec<TypeDecl>,
    members: Vec<Member>,
}

/// C# chunker splitting files at class/method/property boundaries.
///
/// A single forward scan tracks brace depth to find type scopes; member
/// ends are located by counting braces forward until net zero after the
/// first opening brace, clamped to the next member otherwise.
pub struct CSharpChunker {
    config: ChunkerConfig,
}

impl CSharpChunker {
    #[must_use]
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    fn parse_structure(lines: &[&str]) -> Structure {
        let mut structure = Structure::default();
        let mut brace_depth: i32 = 0;
        let mut current_type: Option<String> = None;
        let mut current_type_depth: i32 = 0;

        for (i, line) in lines.iter().enumerate() {
            let stripped = line.trim();

            if let Some(caps) = NAMESPACE_RE.captures(stripped) {
                structure.namespace = Some(caps[1].to_string());
            }

            if let Some(caps) = TYPE_RE.captures(stripped) {
                let name = caps[1].to_string();
                current_type = Some(name.clone());
                current_type_depth = brace_depth;
                structure.types.push(TypeDecl {
                    name,
                    start: i,
                    depth: brace_depth,
                });
            }

            if current_type.is_some()
                && stripped.contains('(')
                && stripped.contains(')')
                && !stripped.ends_with(';')
            {
                if let Some(caps) = METHOD_RE.captures(stripped) {
                    structure.members.push(Member {
                        kind: ChunkKind::Method,
                        name: caps[1].to_string(),
                        owner: current_type.clone(),
                        start: i,
                        end: None,
                    });
                }
            }

            if current_type.is_some() {
                if let Some(caps) = PROPERTY_RE.captures(stripped) {
                    structure.members.push(Member {
                        kind: ChunkKind::Property,
                        name: caps[1].to_string(),
                        owner: current_type.clone(),
                        start: i,
                        end: None,
                    });
                }
            }

            brace_depth += count_braces(stripped);

            // Close the innermost type when its scope unwinds.
            if let Some(last) = structure.types.last() {
                if brace_depth < last.depth && current_type_depth >= brace_depth {
                    current_type = None;
                }
            }
        }

        structure.members.sort_by_key(|member| member.start);
        Self::find_member_ends(lines, &mut structure);
        structure
    }

    /// Scan forward from each member, counting braces until net zero after
    /// the first opening brace. Absent a balanced body, clamp to one line
    /// before the next member (or EOF).
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
            if let Some(ns) = &structure.namespace {
                context_parts.push(format!("namespace {ns}"));
            }
            if let Some(owner) = &member.owner {
                context_parts.push(format!("class {owner}"));
            }
            context_parts.push(format!("{} {}", member.kind.as_str(), member.name));
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
                    "cs",
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
                    "cs",
                    ARCH_INDICATORS,
                ));
            }
        }

        chunks
    }

    fn chunk_by_lines(
        &self,
        filepath: &str,
        lines: &[&str],
        structure: &Structure,
    ) -> Vec<ChunkUnit> {
        let mut context_parts = Vec::new();
        if let Some(ns) = &structure.namespace {
            context_parts.push(format!("namespace {ns}"));
        }
        if let Some(first) = structure.types.first() {
            context_parts.push(format!("class {}", first.name));
        }
        let context_header = if context_parts.is_empty() {
            file_name(filepath)
        } else {
            context_parts.join(" > ")
        };

        windowed_chunks(
            &self.config,
            filepath,
            lines,
            1,
            &context_header,
            ChunkKind::Block,
            "cs",
            ARCH_INDICATORS,
        )
    }

    /// Chunk covering the file declaration and imports, emitted when a type
    /// was found and the header exceeds the minimum size.
    fn header_chunk(
        &self,
        filepath: &str,
        lines: &[&str],
        structure: &Structure,
    ) -> Option<ChunkUnit> {
        let first_type = structure.types.first()?;

        let mut header_end = first_type.start;
        let scan_limit = (first_type.start + 10).min(lines.len());
        for (i, line) in lines.iter().enumerate().take(scan_limit).skip(first_type.start) {
            if line.contains('{') {
                header_end = i + 1;
                break;
            }
        }

        if header_end == 0 {
            return None;
        }

        let content = lines[..header_end].join("\n");
        if content.len() < self.config.min_chunk_chars {
            return None;
        }

        let mut context_header = format!("FILE: {}", file_name(filepath));
        if let Some(ns) = &structure.namespace {
            context_header.push_str(&format!(" > namespace {ns}"));
        }
        context_header.push_str(&format!(" > class {} (declaration)", first_type.name));

        Some(make_chunk(
            &self.config,
            filepath,
            &content,
            1,
            header_end,
            &context_header,
            ChunkKind::FileHeader,
            "cs",
            ARCH_INDICATORS,
        ))
    }
}

impl LanguageChunker for CSharpChunker {
    fn language_name(&self) -> &'static str {
        "C#"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["cs", "csx"]
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
            self.chunk_by_lines(filepath, &lines, &structure)
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

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const FOO_CS: &str = r#"using System;
using System.Collections.Generic;

namespace Sample.App
{
    public class Foo
    {
        public int Baz { get; set; }

        public string Bar(string name)
        {
            var greeting = $"Hello {name}";
            return greeting;
        }
    }
}
"#;

    fn chunker() -> CSharpChunker {
        CSharpChunker::new(ChunkerConfig::default())
    }

    #[test]
    fn class_with_method_and_property_yields_three_chunks() {
        let chunks = chunker().chunk_file("src/Foo.cs", FOO_CS);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].chunk_kind, ChunkKind::FileHeader);
        assert_eq!(
            chunks[0].context_header,
            "FILE: Foo.cs > namespace Sample.App > class Foo (declaration)"
        );

        let property = chunks
            .iter()
            .find(|c| c.chunk_kind == ChunkKind::Property)
            .expect("property chunk");
        assert_eq!(
            property.context_header,
            "namespace Sample.App > class Foo > property Baz"
        );

        let method = chunks
            .iter()
            .find(|c| c.chunk_kind == ChunkKind::Method)
            .expect("method chunk");
        assert_eq!(
            method.context_header,
            "namespace Sample.App > class Foo > method Bar"
        );
        assert!(method.content.contains("return greeting;"));

        for chunk in &chunks {
            assert_eq!(chunk.file_type, "cs");
        }
    }

    #[test]
    fn chunking_is_deterministic() {
        let first = chunker().chunk_file("src/Foo.cs", FOO_CS);
        let second = chunker().chunk_file("src/Foo.cs", FOO_CS);
        assert_eq!(first, second);
    }

    #[test]
    fn empty_file_yields_no_chunks() {
        assert!(chunker().chunk_file("src/Empty.cs", "").is_empty());
    }

    #[test]
    fn structureless_file_falls_back_to_windowing() {
        let lines: Vec<String> = (0..40)
            .map(|i| format!("Console.WriteLine(\"line number {i}\");"))
            .collect();
        let content = lines.join("\n");
        let chunks = chunker().chunk_file("src/Script.cs", &content);

        assert!(!chunks.is_empty());
        assert!(chunks.iter().all(|c| c.chunk_kind == ChunkKind::Block));
        // ceil((40 - 3) / (15 - 3)) overlapping windows.
        assert_eq!(chunks.len(), 4);
        for line in 1..=40usize {
            assert!(chunks.iter().any(|c| c.contains_line(line)));
        }
    }

    #[test]
    fn unterminated_method_clamps_to_eof() {
        let content = "namespace A\n{\n    public class B\n    {\n        public void Broken(int x)\n        {\n            var y = x + 1;\n";
        let chunks = chunker().chunk_file("src/Broken.cs", content);

        let method = chunks
            .iter()
            .find(|c| c.chunk_kind == ChunkKind::Method)
            .expect("method chunk");
        assert_eq!(method.end_line, content.lines().count());
    }

    #[test]
    fn oversized_method_is_windowed_with_part_headers() {
        let mut body = String::from("namespace A\n{\n    public class B\n    {\n        public void Big()\n        {\n");
        for i in 0..30 {
            body.push_str(&format!("            var value{i} = {i};\n"));
        }
        body.push_str("        }\n    }\n}\n");

        let chunks = chunker().chunk_file("src/Big.cs", &body);
        let parts: Vec<&ChunkUnit> = chunks
            .iter()
            .filter(|c| c.chunk_kind == ChunkKind::Method)
            .collect();

        assert!(parts.len() > 1);
        assert!(parts[0].context_header.ends_with("(part 1)"));
        assert!(parts[1].context_header.ends_with("(part 2)"));

        // Overlapping parts still cover the whole member.
        let member_start = parts.iter().map(|c| c.start_line).min().unwrap();
        let member_end = parts.iter().map(|c| c.end_line).max().unwrap();
        for line in member_start..=member_end {
            assert!(parts.iter().any(|c| c.contains_line(line)));
        }
    }

    #[test]
    fn architecture_signals_are_flagged() {
        let content = r#"using Microsoft.Extensions.DependencyInjection;

namespace Api
{
    public class Startup
    {
        public void ConfigureServices(IServiceCollection services)
        {
            services.AddControllers();
        }
    }
}
"#;
        let chunks = chunker().chunk_file("src/Startup.cs", content);
        assert!(chunks.iter().any(|c| c.is_architecture_node));
    }

    #[test]
    fn plain_code_is_not_flagged() {
        let chunks = chunker().chunk_file("src/Foo.cs", FOO_CS);
        assert!(chunks.iter().all(|c| !c.is_architecture_node));
    }

    #[test]
    fn embedding_text_is_bounded() {
        let long_line = "x".repeat(4000);
        let content = format!("namespace A\n{{\n    public class B\n    {{\n        public void M()\n        {{\n            var s = \"{long_line}\";\n        }}\n    }}\n}}\n");
        let config = ChunkerConfig::default();
        let limit = config.max_text_length;
        let chunks = CSharpChunker::new(config).chunk_file("src/Long.cs", &content);

        for chunk in chunks {
            // Header lines add a small constant on top of truncated content.
            assert!(chunk.embedding_text.len() <= limit + 200);
        }
    }
}
