//! Generative model integration for example generation.
//!
//! The generator talks to models only through [`ExampleModel`], one blocking
//! call per attempt. Prompts carry the type definition, steering flags,
//! retrieved knowledge and the candidates earlier attempts had to reject.
//!
//! # Supported Providers
//!
//! - **Anthropic** - Claude models via API (requires `ANTHROPIC_API_KEY`)
//! - **Ollama** - Local models, no API key needed (requires Ollama installed)
//! - **Mock** - Scripted responses for tests and offline runs
//!
//! # Example
//!
//! ```no_run
//! use typeforge::{OllamaProvider, TypeForge};
//!
//! let forge = TypeForge::new().with_model(OllamaProvider::new().unwrap());
//! ```

mod anthropic;
mod mock;
mod ollama;
mod prompts;
mod provider;

pub use anthropic::AnthropicProvider;
pub use mock::MockProvider;
pub use ollama::OllamaProvider;
pub use prompts::{example_generation_prompt, system_prompt};
pub use provider::{
    parse_model_batch, ExampleModel, GenerationPrompt, LlmConfig, ModelBatch, RejectedExample,
    Steering,
};
