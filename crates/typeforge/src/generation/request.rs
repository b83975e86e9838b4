//! Generation request and response types.

use serde::{Deserialize, Serialize};

use crate::error::{ForgeError, Result};
use crate::pattern::PatternMatcher;

/// Which generation flow a request selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GenerationMode {
    /// Examples for a fixed value pattern.
    Examples,
    /// The model may revise the value pattern.
    PatternImprovement,
    /// Examples are column headers; the model may revise the header patterns.
    HeaderImprovement,
}

/// A request for validated examples.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    /// Value pattern, or comma-separated header patterns in header mode.
    ///
    /// Only top-level commas separate header patterns, so `\d{2,4}` and
    /// `[a,b]` stay whole. Escape a literal comma as `\,`.
    pub regex_pattern: String,
    pub semantic_type_name: String,
    #[serde(default)]
    pub existing_positive_examples: Vec<String>,
    #[serde(default)]
    pub existing_negative_examples: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub generate_positive_only: bool,
    #[serde(default)]
    pub generate_negative_only: bool,
    #[serde(default, alias = "isPatternImprovement")]
    pub pattern_improvement: bool,
    #[serde(default, alias = "isHeaderPatternImprovement")]
    pub header_pattern_improvement: bool,
    /// Attempt bound; the generator default applies when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    /// Knowledge domain queried for context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

impl GenerationRequest {
    pub fn new(semantic_type_name: impl Into<String>, regex_pattern: impl Into<String>) -> Self {
        Self {
            semantic_type_name: semantic_type_name.into(),
            regex_pattern: regex_pattern.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_user_description(mut self, text: impl Into<String>) -> Self {
        self.user_description = Some(text.into());
        self
    }

    pub fn with_existing_positive(
        mut self,
        examples: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.existing_positive_examples = examples.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_existing_negative(
        mut self,
        examples: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.existing_negative_examples = examples.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn in_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn positive_only(mut self) -> Self {
        self.generate_positive_only = true;
        self
    }

    pub fn negative_only(mut self) -> Self {
        self.generate_negative_only = true;
        self
    }

    pub fn improving_pattern(mut self) -> Self {
        self.pattern_improvement = true;
        self
    }

    pub fn improving_headers(mut self) -> Self {
        self.header_pattern_improvement = true;
        self
    }

    pub fn mode(&self) -> GenerationMode {
        if self.header_pattern_improvement {
            GenerationMode::HeaderImprovement
        } else if self.pattern_improvement {
            GenerationMode::PatternImprovement
        } else {
            GenerationMode::Examples
        }
    }

    pub fn wants_positive(&self) -> bool {
        !self.generate_negative_only
    }

    pub fn wants_negative(&self) -> bool {
        !self.generate_positive_only
    }

    /// The pattern(s) examples are validated against before any revision.
    pub fn initial_patterns(&self) -> Vec<String> {
        match self.mode() {
            GenerationMode::HeaderImprovement => split_header_patterns(&self.regex_pattern),
            _ => vec![self.regex_pattern.trim().to_string()],
        }
    }

    /// Reject malformed requests before any collaborator is called.
    pub fn validate(&self, matcher: &dyn PatternMatcher, retry_ceiling: u32) -> Result<()> {
        if self.semantic_type_name.trim().is_empty() {
            return Err(invalid("semanticTypeName must not be blank"));
        }
        if self.regex_pattern.trim().is_empty() {
            return Err(invalid("regexPattern must not be blank"));
        }
        if self.generate_positive_only && self.generate_negative_only {
            return Err(invalid(
                "generatePositiveOnly and generateNegativeOnly are mutually exclusive",
            ));
        }
        if self.pattern_improvement && self.header_pattern_improvement {
            return Err(invalid(
                "patternImprovement and headerPatternImprovement are mutually exclusive",
            ));
        }
        if let Some(max) = self.max_retries {
            if max == 0 || max > retry_ceiling {
                return Err(invalid(format!(
                    "maxRetries must be between 1 and {}, got {}",
                    retry_ceiling, max
                )));
            }
        }

        let patterns = self.initial_patterns();
        if patterns.is_empty() {
            return Err(invalid("no header patterns given"));
        }
        if let Some(bad) = patterns.iter().find(|p| !matcher.is_valid(p)) {
            return Err(invalid(format!("'{}' is not a valid pattern", bad)));
        }

        let has_text = [&self.description, &self.user_description]
            .iter()
            .any(|t| t.as_deref().is_some_and(|s| !s.trim().is_empty()));
        if !has_text
            && self.existing_positive_examples.is_empty()
            && self.existing_negative_examples.is_empty()
        {
            return Err(invalid(
                "a description, user description or existing examples are required",
            ));
        }
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> ForgeError {
    ForgeError::InvalidRequest(message.into())
}

/// Split the comma-separated header pattern list used in header mode.
///
/// Commas inside groups, character classes, counted repetitions or after a
/// backslash belong to the pattern.
pub fn split_header_patterns(raw: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut escaped = false;

    for c in raw.chars() {
        if escaped {
            escaped = false;
            current.push(c);
            continue;
        }
        match c {
            '\\' => escaped = true,
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(std::mem::take(&mut current));
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    parts.push(current);

    parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}

/// Per-direction counts. `validated + failed == generated` for each direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationSummary {
    pub total_positive_generated: usize,
    pub total_negative_generated: usize,
    pub positive_examples_validated: usize,
    pub negative_examples_validated: usize,
    pub positive_examples_failed: usize,
    pub negative_examples_failed: usize,
}

impl ValidationSummary {
    pub fn is_reconciled(&self) -> bool {
        self.positive_examples_validated + self.positive_examples_failed
            == self.total_positive_generated
            && self.negative_examples_validated + self.negative_examples_failed
                == self.total_negative_generated
    }
}

/// How the attempt loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    Validated,
    Exhausted,
    Cancelled,
}

/// A candidate that did not make it into the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscardedExample {
    pub example: String,
    pub positive: bool,
    pub reason: String,
}

/// Accumulated result of a generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResponse {
    pub positive_examples: Vec<String>,
    pub negative_examples: Vec<String>,
    pub attempts_used: u32,
    pub validation_successful: bool,
    pub outcome: Outcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub validation_summary: ValidationSummary,
    /// The pattern(s) every returned example was validated against,
    /// comma-separated in header mode.
    pub final_pattern: String,
    /// Set in pattern-improvement mode when the pattern changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_regex_pattern: Option<String>,
    /// Set in header mode when the header patterns changed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub updated_header_patterns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub discarded_examples: Vec<DiscardedExample>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::RegexMatcher;

    fn base() -> GenerationRequest {
        GenerationRequest::new("NAME.FIRST", "^[A-Z][a-z]+$").with_description("First names")
    }

    #[test]
    fn test_valid_request() {
        assert!(base().validate(&RegexMatcher::new(), 10).is_ok());
    }

    #[test]
    fn test_rejects_caller_mistakes() {
        let matcher = RegexMatcher::new();
        let cases = [
            GenerationRequest::new(" ", "^a$").with_description("x"),
            GenerationRequest::new("A", "  ").with_description("x"),
            GenerationRequest::new("A", "([a-z").with_description("x"),
            base().positive_only().negative_only(),
            base().improving_pattern().improving_headers(),
            base().with_max_retries(0),
            base().with_max_retries(11),
            GenerationRequest::new("A", "^a$"),
        ];
        for request in cases {
            assert!(
                matches!(
                    request.validate(&matcher, 10),
                    Err(ForgeError::InvalidRequest(_))
                ),
                "accepted {:?}",
                request
            );
        }
    }

    #[test]
    fn test_existing_examples_stand_in_for_description() {
        let request = GenerationRequest::new("A", "^a+$").with_existing_positive(["aaa"]);
        assert!(request.validate(&RegexMatcher::new(), 10).is_ok());
    }

    #[test]
    fn test_header_patterns_split_on_commas() {
        let request = GenerationRequest::new("NAME.FIRST", "(?i)first.*, (?i)fname ,")
            .improving_headers();
        assert_eq!(request.mode(), GenerationMode::HeaderImprovement);
        assert_eq!(request.initial_patterns(), vec!["(?i)first.*", "(?i)fname"]);
    }

    #[test]
    fn test_header_pattern_split_keeps_nested_commas() {
        assert_eq!(
            split_header_patterns(r"(?i)emp_\d{2,4}, [a,b]x, (one|two,three), a\,b"),
            vec![r"(?i)emp_\d{2,4}", "[a,b]x", "(one|two,three)", r"a\,b"]
        );

        let request = GenerationRequest::new("IDENTIFIER.EMPLOYEE_ID", r"(?i)emp_\d{2,4},(?i)staff")
            .with_description("Employee number")
            .improving_headers();
        assert!(request.validate(&RegexMatcher::new(), 10).is_ok());
        assert_eq!(request.initial_patterns(), vec![r"(?i)emp_\d{2,4}", "(?i)staff"]);
    }

    #[test]
    fn test_legacy_flag_names() {
        let request: GenerationRequest = serde_json::from_str(
            r#"{"regexPattern": "^a$", "semanticTypeName": "A", "isPatternImprovement": true, "maxRetries": 2}"#,
        )
        .unwrap();
        assert_eq!(request.mode(), GenerationMode::PatternImprovement);
        assert_eq!(request.max_retries, Some(2));
    }

    #[test]
    fn test_summary_reconciliation() {
        let summary = ValidationSummary {
            total_positive_generated: 3,
            positive_examples_validated: 2,
            positive_examples_failed: 1,
            ..ValidationSummary::default()
        };
        assert!(summary.is_reconciled());
        let broken = ValidationSummary {
            negative_examples_failed: 1,
            ..summary
        };
        assert!(!broken.is_reconciled());
    }
}
