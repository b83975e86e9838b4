//! Prompt templates for LLM interactions.

use super::provider::GenerationPrompt;

/// System prompt shared by all providers.
pub fn system_prompt() -> &'static str {
    "You help data engineers define semantic types: reusable classifiers that recognise \
     what a column of tabular data represents. You write precise regular expressions and \
     realistic example values. Always answer with a single JSON object and nothing else."
}

fn bullet_list(items: &[String], empty: &str) -> String {
    if items.is_empty() {
        return empty.to_string();
    }
    items
        .iter()
        .map(|s| format!("  - \"{}\"", s))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the prompt for one generation attempt.
pub fn example_generation_prompt(prompt: &GenerationPrompt) -> String {
    let steering = &prompt.steering;
    let subject = if steering.header_improvement {
        "column header names"
    } else {
        "data values"
    };
    let pattern_label = if steering.header_improvement {
        "Current header patterns"
    } else {
        "Current value pattern"
    };

    let mut task = Vec::new();
    if steering.positive {
        task.push(format!(
            "- Propose at least {} {} that MUST fully match the pattern.",
            prompt.positive_needed, subject
        ));
    }
    if steering.negative {
        task.push(format!(
            "- Propose at least {} {} that must NOT match the pattern but look plausible.",
            prompt.negative_needed, subject
        ));
    }
    if steering.pattern_improvement {
        task.push(
            "- Improve the value pattern to follow the guidance; return it as \"improvedPattern\"."
                .to_string(),
        );
    }
    if steering.header_improvement {
        task.push(
            "- Improve the header patterns to follow the guidance; return them as \"headerPatterns\"."
                .to_string(),
        );
    }

    let rejected = if prompt.rejected.is_empty() {
        "None".to_string()
    } else {
        prompt
            .rejected
            .iter()
            .map(|r| {
                format!(
                    "  - \"{}\" was proposed as {} but {} \"{}\"",
                    r.example,
                    if r.positive { "positive" } else { "negative" },
                    if r.positive { "does not match" } else { "matches" },
                    r.pattern
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        r#"Generate examples for a semantic type (attempt {attempt}).

## Semantic Type
- Name: {name}
- Description: {description}
- {pattern_label}: {patterns}

## Guidance
{guidance}

## Existing Positive Examples
{positives}

## Existing Negative Examples
{negatives}

## Relevant Knowledge
{context}

## Rejected Earlier
{rejected}

## Task
{task}

Respond with a JSON object:
{{
  "positiveExamples": ["..."],
  "negativeExamples": ["..."],
  "improvedPattern": null or "regex",
  "headerPatterns": [] or ["regex", ...],
  "explanation": "One or two sentences on what you changed and why"
}}"#,
        attempt = prompt.attempt,
        name = prompt.semantic_type_name,
        description = prompt.description.as_deref().unwrap_or("Not provided"),
        pattern_label = pattern_label,
        patterns = prompt.current_patterns.join(", "),
        guidance = prompt.user_description.as_deref().unwrap_or("None"),
        positives = bullet_list(&prompt.existing_positive, "None"),
        negatives = bullet_list(&prompt.existing_negative, "None"),
        context = bullet_list(&prompt.context_snippets, "None"),
        rejected = rejected,
        task = task.join("\n"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::provider::{RejectedExample, Steering};

    #[test]
    fn test_prompt_includes_context_and_feedback() {
        let prompt = GenerationPrompt {
            semantic_type_name: "NAME.FIRST".to_string(),
            current_patterns: vec!["^[A-Z][a-z]+$".to_string()],
            steering: Steering {
                positive: true,
                negative: true,
                ..Steering::default()
            },
            context_snippets: vec!["first_name: header synonyms tokens (first|name)".to_string()],
            rejected: vec![RejectedExample {
                example: "123".to_string(),
                positive: true,
                pattern: "^[A-Z][a-z]+$".to_string(),
            }],
            attempt: 2,
            positive_needed: 5,
            negative_needed: 5,
            ..GenerationPrompt::default()
        };

        let text = example_generation_prompt(&prompt);
        assert!(text.contains("attempt 2"));
        assert!(text.contains("first|name"));
        assert!(text.contains("\"123\" was proposed as positive but does not match"));
        assert!(text.contains("MUST fully match"));
        assert!(!text.contains("improvedPattern\"."));
    }

    #[test]
    fn test_header_mode_wording() {
        let prompt = GenerationPrompt {
            semantic_type_name: "NAME.FIRST".to_string(),
            current_patterns: vec!["(?i)first.*".to_string(), "(?i)fname".to_string()],
            steering: Steering {
                positive: true,
                negative: true,
                header_improvement: true,
                ..Steering::default()
            },
            attempt: 1,
            ..GenerationPrompt::default()
        };
        let text = example_generation_prompt(&prompt);
        assert!(text.contains("Current header patterns: (?i)first.*, (?i)fname"));
        assert!(text.contains("column header names"));
        assert!(text.contains("\"headerPatterns\"."));
    }
}
