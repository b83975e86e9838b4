//! Mock LLM provider for testing.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use crate::error::{ForgeError, Result};

use super::provider::{ExampleModel, GenerationPrompt, LlmConfig, ModelBatch};

/// Mock LLM provider that returns predictable responses for testing.
///
/// Scripted responses are served in order; once the script runs out the last
/// response is repeated. Without a script the mock replays the request's
/// existing examples as fresh candidates. Every prompt received is recorded.
pub struct MockProvider {
    config: LlmConfig,
    script: Mutex<VecDeque<std::result::Result<ModelBatch, String>>>,
    last: Mutex<Option<std::result::Result<ModelBatch, String>>>,
    prompts: Mutex<Vec<GenerationPrompt>>,
}

impl MockProvider {
    /// Create a new mock provider.
    pub fn new() -> Self {
        Self::with_config(LlmConfig::default())
    }

    /// Create with custom configuration.
    pub fn with_config(config: LlmConfig) -> Self {
        Self {
            config,
            script: Mutex::new(VecDeque::new()),
            last: Mutex::new(None),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful response.
    pub fn respond_with(self, batch: ModelBatch) -> Self {
        self.push(Ok(batch));
        self
    }

    /// Queue a provider failure.
    pub fn fail_with(self, message: impl Into<String>) -> Self {
        self.push(Err(message.into()));
        self
    }

    fn push(&self, item: std::result::Result<ModelBatch, String>) {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(item);
    }

    /// Prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<GenerationPrompt> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of `generate` calls so far.
    pub fn call_count(&self) -> usize {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn next_response(&self) -> Option<std::result::Result<ModelBatch, String>> {
        let next = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        match next {
            Some(item) => {
                *last = Some(item.clone());
                Some(item)
            }
            None => last.clone(),
        }
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ExampleModel for MockProvider {
    fn generate(&self, prompt: &GenerationPrompt) -> Result<ModelBatch> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(prompt.clone());

        match self.next_response() {
            Some(Ok(batch)) => Ok(batch),
            Some(Err(message)) => Err(ForgeError::Provider(message)),
            None => Ok(ModelBatch::new(
                prompt.existing_positive.iter().cloned(),
                prompt.existing_negative.iter().cloned(),
            )
            .with_rationale("Replayed existing examples")),
        }
    }

    fn config(&self) -> &LlmConfig {
        &self.config
    }

    fn name(&self) -> &str {
        "mock"
    }
}
