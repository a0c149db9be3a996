use crate::error::{IndexerError, Result};
use librarian_embedder::LlmProvider;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

/// Structural signals checked by the cold path: DI registration,
/// middleware, entry-point attributes, configuration access.
static ARCH_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"builder\.Services\.",
        r"app\.UseMiddleware",
        r"\[ApiController\]",
        r"\[Route\(.*\)\]",
        r"\[HttpGet\]",
        r"IConfiguration",
        r"appsettings\.json",
        r"fn main\(",
        r"Router::new",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("architecture pattern"))
    .collect()
});

/// How much source is handed to the model; the interesting declarations
/// sit at the top of a file.
const SUMMARY_INPUT_BUDGET: usize = 8000;

/// Cold-path analyzer: structural pattern detection plus an LLM-generated
/// natural-language summary of a file's role.
pub struct ArchitectAnalyzer {
    llm: Arc<dyn LlmProvider>,
    max_tokens: u32,
    temperature: f32,
}

impl ArchitectAnalyzer {
    #[must_use]
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            llm,
            max_tokens: 2048,
            temperature: 0.7,
        }
    }

    /// Override generation parameters.
    #[must_use]
    pub fn with_generation(llm: Arc<dyn LlmProvider>, max_tokens: u32, temperature: f32) -> Self {
        Self {
            llm,
            max_tokens,
            temperature,
        }
    }

    /// Whether the content matches any structural architecture signal.
    #[must_use]
    pub fn detect_structure(content: &str) -> bool {
        ARCH_PATTERNS
            .iter()
            .any(|pattern| pattern.is_match(content))
    }

    /// Generate a dependency/role summary for one file's content.
    pub async fn generate_summary(&self, content: &str) -> Result<String> {
        let mut budget = SUMMARY_INPUT_BUDGET.min(content.len());
        while budget > 0 && !content.is_char_boundary(budget) {
            budget -= 1;
        }

        let prompt = format!(
            "Analyze this class. Identify:\n\
             1) The services it injects (inter-service dependencies)\n\
             2) The interfaces it implements\n\
             3) Any data stores it modifies.\n\
             Output as concise bullet points.\n\nCode:\n{}",
            &content[..budget]
        );

        let summary = self
            .llm
            .generate(&prompt, self.max_tokens, self.temperature)
            .await
            .map_err(|err| IndexerError::Other(format!("summary generation failed: {err}")))?;

        Ok(summary.trim().to_string())
    }
}
