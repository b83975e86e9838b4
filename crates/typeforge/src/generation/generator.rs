//! The call-validate-retry loop.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ForgeError, Result};
use crate::knowledge::RetrievalCache;
use crate::llm::{ExampleModel, GenerationPrompt, ModelBatch, RejectedExample, Steering};
use crate::pattern::{matches_any, PatternMatcher};

use super::cancel::CancelToken;
use super::request::{
    DiscardedExample, GenerationMode, GenerationRequest, GenerationResponse, Outcome,
    ValidationSummary,
};

/// Most recent rejections repeated back to the model.
const FEEDBACK_LIMIT: usize = 20;

/// Configuration for the example generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Attempt bound when a request does not set one.
    pub default_max_retries: u32,

    /// Largest attempt bound a request may ask for.
    pub max_retries_ceiling: u32,

    /// Validated positives needed for success.
    pub positive_target: usize,

    /// Validated negatives needed for success.
    pub negative_target: usize,

    /// Snippets retrieved per attempt.
    pub context_top_k: usize,

    /// Knowledge domain used when a request names none.
    pub default_domain: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            default_max_retries: 3,
            max_retries_ceiling: 10,
            positive_target: 5,
            negative_target: 5,
            context_top_k: 5,
            default_domain: "banking".to_string(),
        }
    }
}

impl GeneratorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_retries_ceiling == 0 {
            return Err(ForgeError::Config(
                "max_retries_ceiling must be at least 1".to_string(),
            ));
        }
        if self.default_max_retries == 0 || self.default_max_retries > self.max_retries_ceiling {
            return Err(ForgeError::Config(format!(
                "default_max_retries must be between 1 and {}",
                self.max_retries_ceiling
            )));
        }
        if self.positive_target == 0 || self.negative_target == 0 {
            return Err(ForgeError::Config(
                "example targets must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// States of the attempt loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationState {
    Idle,
    AttemptInFlight { attempt: u32 },
    Retry,
    Validated,
    Exhausted,
    Cancelled,
}

impl GenerationState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Validated | Self::Exhausted | Self::Cancelled)
    }
}

/// Drives a generative model until enough examples validate.
pub struct ExampleGenerator {
    model: Arc<dyn ExampleModel>,
    matcher: Arc<dyn PatternMatcher>,
    knowledge: Option<Arc<RetrievalCache>>,
    config: GeneratorConfig,
}

impl ExampleGenerator {
    pub fn new(model: Arc<dyn ExampleModel>, matcher: Arc<dyn PatternMatcher>) -> Self {
        Self {
            model,
            matcher,
            knowledge: None,
            config: GeneratorConfig::default(),
        }
    }

    /// Query `cache` for context before each attempt.
    pub fn with_knowledge(mut self, cache: Arc<RetrievalCache>) -> Self {
        self.knowledge = Some(cache);
        self
    }

    pub fn with_config(mut self, config: GeneratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn generate_validated_examples(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse> {
        self.generate_with_cancel(request, &CancelToken::new())
    }

    /// Run the attempt loop, checking `cancel` between attempts.
    ///
    /// Fails only for malformed requests or a cancellation observed before
    /// the first attempt. Every other outcome is a response.
    pub fn generate_with_cancel(
        &self,
        request: &GenerationRequest,
        cancel: &CancelToken,
    ) -> Result<GenerationResponse> {
        request.validate(self.matcher.as_ref(), self.config.max_retries_ceiling)?;

        let max_retries = request
            .max_retries
            .unwrap_or(self.config.default_max_retries);
        let mut run = Run::new(request, &self.config);
        info!(
            "Generating examples for {} ({:?}, up to {} attempts)",
            request.semantic_type_name, run.mode, max_retries
        );

        let mut state = GenerationState::Idle;
        while !state.is_terminal() {
            let next = match state {
                GenerationState::Idle if cancel.is_cancelled() => {
                    return Err(ForgeError::Cancelled(format!(
                        "generation for {} cancelled before the first attempt",
                        request.semantic_type_name
                    )));
                }
                GenerationState::Idle => GenerationState::AttemptInFlight { attempt: 1 },
                GenerationState::Retry if cancel.is_cancelled() => GenerationState::Cancelled,
                GenerationState::Retry if run.attempts >= max_retries => {
                    GenerationState::Exhausted
                }
                GenerationState::Retry => GenerationState::AttemptInFlight {
                    attempt: run.attempts + 1,
                },
                GenerationState::AttemptInFlight { attempt } => {
                    self.run_attempt(&mut run, request, attempt);
                    if run.targets_met() {
                        GenerationState::Validated
                    } else {
                        GenerationState::Retry
                    }
                }
                terminal => terminal,
            };
            debug!("{:?} -> {:?}", state, next);
            state = next;
        }

        let response = run.finish(request, state);
        info!(
            "Finished {} after {} attempt(s): {:?}, {} positive / {} negative validated",
            request.semantic_type_name,
            response.attempts_used,
            response.outcome,
            response.positive_examples.len(),
            response.negative_examples.len()
        );
        Ok(response)
    }

    fn run_attempt(&self, run: &mut Run, request: &GenerationRequest, attempt: u32) {
        run.attempts = attempt;
        let prompt = run.prompt(request, attempt, self.context_for(request));

        match self.model.generate(&prompt) {
            Ok(batch) => run.absorb(self.matcher.as_ref(), batch),
            Err(e) => {
                warn!(
                    "Attempt {} for {} failed at {}: {}",
                    attempt,
                    request.semantic_type_name,
                    self.model.name(),
                    e
                );
                run.last_error = Some(e.to_string());
            }
        }
    }

    fn context_for(&self, request: &GenerationRequest) -> Vec<String> {
        let Some(cache) = &self.knowledge else {
            return Vec::new();
        };
        let domain = request
            .domain
            .as_deref()
            .unwrap_or(&self.config.default_domain);
        let query = [
            Some(request.semantic_type_name.as_str()),
            request.description.as_deref(),
            request.user_description.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");

        cache
            .search(domain, &query, self.config.context_top_k)
            .into_iter()
            .map(|hit| hit.text)
            .collect()
    }
}

#[derive(Debug, Default)]
struct Direction {
    requested: bool,
    target: usize,
    validated: Vec<String>,
    generated: usize,
    failed: usize,
}

impl Direction {
    fn new(requested: bool, target: usize) -> Self {
        Self {
            requested,
            target,
            ..Self::default()
        }
    }

    fn met(&self) -> bool {
        !self.requested || self.validated.len() >= self.target
    }
}

/// Accumulated state of one request.
struct Run {
    mode: GenerationMode,
    initial_patterns: Vec<String>,
    patterns: Vec<String>,
    positive: Direction,
    negative: Direction,
    seen: HashSet<(bool, String)>,
    rejected: Vec<RejectedExample>,
    discarded: Vec<DiscardedExample>,
    attempts: u32,
    rationale: Option<String>,
    last_error: Option<String>,
}

fn accepts(matcher: &dyn PatternMatcher, patterns: &[String], example: &str, positive: bool) -> bool {
    matches_any(matcher, patterns, example) == positive
}

impl Run {
    fn new(request: &GenerationRequest, config: &GeneratorConfig) -> Self {
        let patterns = request.initial_patterns();
        Self {
            mode: request.mode(),
            initial_patterns: patterns.clone(),
            patterns,
            positive: Direction::new(request.wants_positive(), config.positive_target),
            negative: Direction::new(request.wants_negative(), config.negative_target),
            seen: HashSet::new(),
            rejected: Vec::new(),
            discarded: Vec::new(),
            attempts: 0,
            rationale: None,
            last_error: None,
        }
    }

    fn targets_met(&self) -> bool {
        self.positive.met() && self.negative.met()
    }

    fn prompt(&self, request: &GenerationRequest, attempt: u32, context: Vec<String>) -> GenerationPrompt {
        let skip = self.rejected.len().saturating_sub(FEEDBACK_LIMIT);
        GenerationPrompt {
            semantic_type_name: request.semantic_type_name.clone(),
            description: request.description.clone(),
            user_description: request.user_description.clone(),
            current_patterns: self.patterns.clone(),
            existing_positive: request
                .existing_positive_examples
                .iter()
                .chain(&self.positive.validated)
                .cloned()
                .collect(),
            existing_negative: request
                .existing_negative_examples
                .iter()
                .chain(&self.negative.validated)
                .cloned()
                .collect(),
            steering: Steering {
                positive: self.positive.requested,
                negative: self.negative.requested,
                pattern_improvement: self.mode == GenerationMode::PatternImprovement,
                header_improvement: self.mode == GenerationMode::HeaderImprovement,
            },
            context_snippets: context,
            rejected: self.rejected[skip..].to_vec(),
            attempt,
            positive_needed: self.positive.target.saturating_sub(self.positive.validated.len()),
            negative_needed: self.negative.target.saturating_sub(self.negative.validated.len()),
        }
    }

    fn absorb(&mut self, matcher: &dyn PatternMatcher, batch: ModelBatch) {
        if let Some(rationale) = batch.rationale.filter(|r| !r.trim().is_empty()) {
            self.rationale = Some(rationale);
        }

        match self.mode {
            GenerationMode::PatternImprovement => {
                let revised = batch
                    .revised_pattern
                    .as_deref()
                    .map(str::trim)
                    .filter(|p| !p.is_empty());
                if let Some(revised) = revised {
                    if matcher.is_valid(revised) {
                        self.adopt_patterns(matcher, vec![revised.to_string()]);
                    } else {
                        warn!("Model proposed an invalid pattern '{}'; keeping current", revised);
                        self.last_error =
                            Some(format!("model proposed an invalid pattern: {}", revised));
                    }
                }
            }
            GenerationMode::HeaderImprovement => {
                let proposed: Vec<String> = batch
                    .revised_header_patterns
                    .iter()
                    .map(|p| p.trim())
                    .filter(|p| !p.is_empty())
                    .map(String::from)
                    .collect();
                if proposed.is_empty() {
                    self.derive_header_patterns(matcher, &batch.positive_examples);
                } else {
                    let (valid, invalid): (Vec<String>, Vec<String>) =
                        proposed.into_iter().partition(|p| matcher.is_valid(p));
                    for p in &invalid {
                        warn!("Dropping invalid header pattern '{}'", p);
                    }
                    if !valid.is_empty() {
                        self.adopt_patterns(matcher, valid);
                    }
                }
            }
            GenerationMode::Examples => {
                if batch.revised_pattern.is_some() {
                    debug!("Ignoring revised pattern outside pattern-improvement mode");
                }
            }
        }

        if self.positive.requested {
            for candidate in &batch.positive_examples {
                self.consider(matcher, candidate, true);
            }
        }
        if self.negative.requested {
            for candidate in &batch.negative_examples {
                self.consider(matcher, candidate, false);
            }
        }
    }

    /// Widen the header patterns to cover positive headers the model proposed
    /// without supplying patterns for them.
    fn derive_header_patterns(&mut self, matcher: &dyn PatternMatcher, positives: &[String]) {
        let mut next = self.patterns.clone();
        for example in positives.iter().map(|e| e.trim()).filter(|e| !e.is_empty()) {
            if matches_any(matcher, &next, example) {
                continue;
            }
            next.push(format!("(?i).*{}.*", regex::escape(example)));
        }
        if next.len() > self.patterns.len() {
            debug!(
                "Derived {} header pattern(s) from examples",
                next.len() - self.patterns.len()
            );
            self.adopt_patterns(matcher, next);
        }
    }

    /// Switch to `patterns`, re-validating everything accepted so far.
    fn adopt_patterns(&mut self, matcher: &dyn PatternMatcher, patterns: Vec<String>) {
        if patterns == self.patterns {
            return;
        }
        info!("Adopting revised pattern(s): {}", patterns.join(", "));
        self.patterns = patterns;

        let Self {
            patterns,
            positive,
            negative,
            discarded,
            ..
        } = self;
        for (direction, is_positive) in [(positive, true), (negative, false)] {
            let before = std::mem::take(&mut direction.validated);
            for example in before {
                if accepts(matcher, patterns, &example, is_positive) {
                    direction.validated.push(example);
                } else {
                    direction.failed += 1;
                    discarded.push(DiscardedExample {
                        example,
                        positive: is_positive,
                        reason: "no longer valid under the revised pattern".to_string(),
                    });
                }
            }
        }
    }

    fn consider(&mut self, matcher: &dyn PatternMatcher, candidate: &str, positive: bool) {
        let example = candidate.trim();
        if example.is_empty() || !self.seen.insert((positive, example.to_string())) {
            return;
        }

        let valid = accepts(matcher, &self.patterns, example, positive);
        let direction = if positive {
            &mut self.positive
        } else {
            &mut self.negative
        };
        direction.generated += 1;
        if valid {
            direction.validated.push(example.to_string());
            return;
        }

        direction.failed += 1;
        let pattern = self.patterns.join(", ");
        self.discarded.push(DiscardedExample {
            example: example.to_string(),
            positive,
            reason: if positive {
                format!("does not match {}", pattern)
            } else {
                format!("matches {}", pattern)
            },
        });
        self.rejected.push(RejectedExample {
            example: example.to_string(),
            positive,
            pattern,
        });
    }

    fn summary(&self) -> ValidationSummary {
        ValidationSummary {
            total_positive_generated: self.positive.generated,
            total_negative_generated: self.negative.generated,
            positive_examples_validated: self.positive.validated.len(),
            negative_examples_validated: self.negative.validated.len(),
            positive_examples_failed: self.positive.failed,
            negative_examples_failed: self.negative.failed,
        }
    }

    fn finish(self, request: &GenerationRequest, state: GenerationState) -> GenerationResponse {
        let outcome = match state {
            GenerationState::Validated => Outcome::Validated,
            GenerationState::Cancelled => Outcome::Cancelled,
            _ => Outcome::Exhausted,
        };
        let summary = self.summary();

        let error = match outcome {
            Outcome::Validated => None,
            Outcome::Cancelled => Some(format!(
                "cancelled after {} attempt(s)",
                self.attempts
            )),
            Outcome::Exhausted => {
                let mut message = format!(
                    "targets not met after {} attempt(s): {} positive and {} negative examples validated",
                    self.attempts,
                    self.positive.validated.len(),
                    self.negative.validated.len()
                );
                if let Some(last) = &self.last_error {
                    message.push_str(&format!("; last error: {}", last));
                }
                Some(message)
            }
        };

        let changed = self.patterns != self.initial_patterns;
        let updated_regex_pattern = (changed && self.mode == GenerationMode::PatternImprovement)
            .then(|| self.patterns.join(", "));
        let updated_header_patterns = if changed && self.mode == GenerationMode::HeaderImprovement {
            self.patterns.clone()
        } else {
            Vec::new()
        };

        if !summary.is_reconciled() {
            warn!("Validation summary for {} does not reconcile", request.semantic_type_name);
        }

        GenerationResponse {
            positive_examples: self.positive.validated,
            negative_examples: self.negative.validated,
            attempts_used: self.attempts,
            validation_successful: outcome == Outcome::Validated,
            outcome,
            error,
            validation_summary: summary,
            final_pattern: self.patterns.join(", "),
            updated_regex_pattern,
            updated_header_patterns,
            rationale: self.rationale,
            discarded_examples: self.discarded,
        }
    }
}
