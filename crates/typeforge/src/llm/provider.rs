//! Generative model trait and types.

use serde::{Deserialize, Serialize};

use crate::error::{ForgeError, Result};

/// Which outputs the model is asked for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Steering {
    /// Ask for examples that must match.
    pub positive: bool,
    /// Ask for examples that must not match.
    pub negative: bool,
    /// The model may revise the value pattern.
    pub pattern_improvement: bool,
    /// The model may revise the header patterns; examples are column headers.
    pub header_improvement: bool,
}

/// A candidate rejected by an earlier attempt, fed back to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedExample {
    pub example: String,
    /// True when it was proposed as a positive example.
    pub positive: bool,
    pub pattern: String,
}

/// Everything the model sees for one attempt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationPrompt {
    pub semantic_type_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Operator steering text ("include international names", ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_description: Option<String>,
    /// The pattern(s) examples are validated against on this attempt.
    pub current_patterns: Vec<String>,
    #[serde(default)]
    pub existing_positive: Vec<String>,
    #[serde(default)]
    pub existing_negative: Vec<String>,
    pub steering: Steering,
    /// Retrieved knowledge, most relevant first.
    #[serde(default)]
    pub context_snippets: Vec<String>,
    /// Candidates earlier attempts had to discard.
    #[serde(default)]
    pub rejected: Vec<RejectedExample>,
    /// 1-based attempt number.
    pub attempt: u32,
    pub positive_needed: usize,
    pub negative_needed: usize,
}

/// What the model returned for one attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelBatch {
    #[serde(default, alias = "positive_examples", alias = "newPositiveContentExamples")]
    pub positive_examples: Vec<String>,
    #[serde(default, alias = "negative_examples", alias = "newNegativeContentExamples")]
    pub negative_examples: Vec<String>,
    #[serde(
        default,
        alias = "improvedPattern",
        alias = "improved_pattern",
        skip_serializing_if = "Option::is_none"
    )]
    pub revised_pattern: Option<String>,
    #[serde(default, alias = "headerPatterns", alias = "header_patterns")]
    pub revised_header_patterns: Vec<String>,
    #[serde(default, alias = "explanation", skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

impl ModelBatch {
    pub fn new(
        positives: impl IntoIterator<Item = impl Into<String>>,
        negatives: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            positive_examples: positives.into_iter().map(Into::into).collect(),
            negative_examples: negatives.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_revised_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.revised_pattern = Some(pattern.into());
        self
    }

    pub fn with_header_patterns(
        mut self,
        patterns: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.revised_header_patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = Some(rationale.into());
        self
    }
}

/// Configuration for LLM providers.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Model to use (e.g., "claude-sonnet-4-20250514").
    pub model: String,

    /// Maximum tokens in response.
    pub max_tokens: usize,

    /// Temperature for generation (0.0-1.0).
    pub temperature: f64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 2048,
            temperature: 0.3,
        }
    }
}

/// Trait for generative model collaborators.
///
/// Implementations must be thread-safe (Send + Sync) so one provider can
/// serve concurrent generation requests. A call may block for a long time;
/// it is the only suspension point of the generation loop.
pub trait ExampleModel: Send + Sync {
    /// Produce one batch of candidate examples.
    fn generate(&self, prompt: &GenerationPrompt) -> Result<ModelBatch>;

    /// Get the configuration for this provider.
    fn config(&self) -> &LlmConfig;

    /// Get the name of this provider (for logging/debugging).
    fn name(&self) -> &str;
}

/// Parse a model batch from raw model output, handling markdown code blocks.
pub fn parse_model_batch(response: &str) -> Result<ModelBatch> {
    let json_str = if response.contains("```json") {
        response
            .split("```json")
            .nth(1)
            .and_then(|s| s.split("```").next())
            .map(|s| s.trim())
            .unwrap_or(response)
    } else if response.contains("```") {
        response
            .split("```")
            .nth(1)
            .map(|s| s.trim())
            .unwrap_or(response)
    } else {
        response.trim()
    };

    serde_json::from_str(json_str)
        .map_err(|e| ForgeError::Provider(format!("Failed to parse LLM JSON response: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_from_markdown() {
        let response = r#"Here you go:
```json
{
    "positiveExamples": ["Maria", "Jose"],
    "negativeExamples": ["123"],
    "improvedPattern": "^[A-Z][a-z]+$",
    "explanation": "Capitalised words"
}
```"#;

        let batch = parse_model_batch(response).unwrap();
        assert_eq!(batch.positive_examples, vec!["Maria", "Jose"]);
        assert_eq!(batch.negative_examples, vec!["123"]);
        assert_eq!(batch.revised_pattern.as_deref(), Some("^[A-Z][a-z]+$"));
        assert_eq!(batch.rationale.as_deref(), Some("Capitalised words"));
    }

    #[test]
    fn test_parse_plain_json_with_missing_fields() {
        let batch = parse_model_batch(r#"{"headerPatterns": ["(?i).*first.*"]}"#).unwrap();
        assert!(batch.positive_examples.is_empty());
        assert_eq!(batch.revised_header_patterns, vec!["(?i).*first.*"]);
    }

    #[test]
    fn test_parse_garbage_is_provider_error() {
        let err = parse_model_batch("I cannot help with that").unwrap_err();
        assert!(matches!(err, ForgeError::Provider(_)));
    }
}
