//! TypeForge: LLM-assisted generation and validation of semantic column types.
//!
//! A semantic type is a reusable classifier that tags a data column as a
//! real-world concept (employee IDs, first names, card networks, ...). TypeForge
//! helps define them: it mines hints from sample data, indexes them for
//! retrieval, drives a generative model through a bounded validate-and-retry
//! loop, and checks candidates against an existing catalog to avoid duplicates.
//!
//! # Example
//!
//! ```no_run
//! use typeforge::{AnthropicProvider, GenerationRequest, TypeForge};
//!
//! let forge = TypeForge::new().with_model(AnthropicProvider::from_env().unwrap());
//! forge.initialize_domain("banking");
//!
//! let request = GenerationRequest::new("NAME.FIRST", "^[A-Z][a-z]+$")
//!     .with_description("A person's given name");
//! let response = forge.generate_validated_examples(&request).unwrap();
//!
//! println!("Validated: {:?}", response.positive_examples);
//! ```

pub mod catalog;
pub mod error;
pub mod generation;
pub mod knowledge;
pub mod llm;
pub mod pattern;
pub mod similarity;
pub mod types;

mod forge;

pub use crate::forge::{ForgeConfig, TypeForge};
pub use catalog::{CatalogStore, InMemoryCatalog};
pub use error::{ForgeError, Result};
pub use generation::{
    CancelToken, ExampleGenerator, GenerationRequest, GenerationResponse, GeneratorConfig,
    Outcome, ValidationSummary,
};
pub use knowledge::{CacheConfig, DatasetMiner, KnowledgeBase, MinerConfig, RetrievalCache, SearchHit};
pub use llm::{AnthropicProvider, ExampleModel, MockProvider, ModelBatch, OllamaProvider};
pub use pattern::{PatternMatcher, RegexMatcher};
pub use similarity::{ComparatorConfig, SimilarityComparator, SimilarityResult};
pub use types::{CustomSemanticType, PluginType, Threshold};
