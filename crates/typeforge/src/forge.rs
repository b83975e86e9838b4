//! Main TypeForge struct and public API.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::catalog::CatalogStore;
use crate::error::{ForgeError, Result};
use crate::generation::{
    CancelToken, ExampleGenerator, GenerationRequest, GenerationResponse, GeneratorConfig,
};
use crate::knowledge::{
    CacheConfig, DatasetMiner, KnowledgeBase, MinerConfig, RetrievalCache, SearchHit,
    TabularSource,
};
use crate::llm::ExampleModel;
use crate::pattern::{PatternMatcher, RegexMatcher};
use crate::similarity::{ComparatorConfig, SimilarityComparator, SimilarityResult};
use crate::types::{validate_examples, CustomSemanticType, ExampleReport};

/// Configuration for the whole pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ForgeConfig {
    pub cache: CacheConfig,
    pub miner: MinerConfig,
    pub generator: GeneratorConfig,
    pub comparator: ComparatorConfig,
}

impl ForgeConfig {
    /// Load from a JSON file; missing sections keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| ForgeError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: ForgeConfig = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.cache.validate()?;
        self.miner.validate()?;
        self.generator.validate()?;
        self.comparator.validate()
    }
}

/// The semantic type pipeline: knowledge, generation and duplicate checks.
pub struct TypeForge {
    config: ForgeConfig,
    knowledge: KnowledgeBase,
    matcher: Arc<dyn PatternMatcher>,
    model: Option<Arc<dyn ExampleModel>>,
    comparator: SimilarityComparator,
}

impl TypeForge {
    /// Create a new instance with default configuration.
    pub fn new() -> Self {
        Self::with_config(ForgeConfig::default())
    }

    /// Create an instance with custom configuration.
    pub fn with_config(config: ForgeConfig) -> Self {
        let miner = DatasetMiner::new(config.miner.clone());
        let knowledge = KnowledgeBase::new(Arc::new(RetrievalCache::new()), miner);
        let comparator = SimilarityComparator::with_config(config.comparator.clone());

        Self {
            config,
            knowledge,
            matcher: Arc::new(RegexMatcher::new()),
            model: None,
            comparator,
        }
    }

    /// Add the generative model used for example generation.
    pub fn with_model(self, model: impl ExampleModel + 'static) -> Self {
        self.with_shared_model(Arc::new(model))
    }

    /// Like [`with_model`](Self::with_model), keeping a handle for the caller.
    pub fn with_shared_model(mut self, model: Arc<dyn ExampleModel>) -> Self {
        self.model = Some(model);
        self
    }

    /// Replace the pattern engine.
    pub fn with_matcher(mut self, matcher: impl PatternMatcher + 'static) -> Self {
        self.matcher = Arc::new(matcher);
        self
    }

    /// Mine from `source` instead of the configured dataset files.
    pub fn with_dataset(mut self, source: impl TabularSource + 'static) -> Self {
        let miner = DatasetMiner::with_source(self.config.miner.clone(), source);
        self.knowledge = KnowledgeBase::new(self.knowledge.cache().clone(), miner);
        self
    }

    pub fn config(&self) -> &ForgeConfig {
        &self.config
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    pub fn cache(&self) -> &Arc<RetrievalCache> {
        self.knowledge.cache()
    }

    pub fn matcher(&self) -> &dyn PatternMatcher {
        self.matcher.as_ref()
    }

    /// Rebuild a knowledge domain from seeds and the dataset.
    pub fn initialize_domain(&self, domain: &str) -> usize {
        self.knowledge.initialize_domain(domain)
    }

    pub fn mine_knowledge_snippets(&self) -> Vec<String> {
        self.knowledge.miner().mine_knowledge_snippets()
    }

    /// Search a domain, returning the configured default number of hits.
    pub fn search(&self, domain: &str, query: &str) -> Vec<SearchHit> {
        self.knowledge
            .retrieve(domain, query, self.config.cache.default_top_k)
    }

    pub fn generate_validated_examples(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse> {
        self.generate_with_cancel(request, &CancelToken::new())
    }

    pub fn generate_with_cancel(
        &self,
        request: &GenerationRequest,
        cancel: &CancelToken,
    ) -> Result<GenerationResponse> {
        self.generator()?.generate_with_cancel(request, cancel)
    }

    fn generator(&self) -> Result<ExampleGenerator> {
        let model = self.model.clone().ok_or_else(|| {
            ForgeError::Config("no example model configured".to_string())
        })?;
        Ok(ExampleGenerator::new(model, self.matcher.clone())
            .with_knowledge(self.cache().clone())
            .with_config(self.config.generator.clone()))
    }

    /// Closest existing type in `catalog`, if any.
    pub fn compare(
        &self,
        candidate: &CustomSemanticType,
        catalog: &dyn CatalogStore,
    ) -> Option<SimilarityResult> {
        self.comparator.compare(candidate, &catalog.list_all())
    }

    pub fn validate_examples(
        &self,
        definition: &CustomSemanticType,
        positives: &[String],
        negatives: &[String],
    ) -> ExampleReport {
        validate_examples(definition, positives, negatives, self.matcher.as_ref())
    }
}

impl Default for TypeForge {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use crate::llm::{MockProvider, ModelBatch};
    use std::path::PathBuf;

    fn offline_config() -> ForgeConfig {
        ForgeConfig {
            miner: MinerConfig {
                dataset_path: PathBuf::from("/nonexistent/a.csv"),
                fallback_path: PathBuf::from("/nonexistent/b.csv"),
                ..MinerConfig::default()
            },
            ..ForgeConfig::default()
        }
    }

    #[test]
    fn test_generation_needs_a_model() {
        let forge = TypeForge::with_config(offline_config());
        let request = GenerationRequest::new("NAME.FIRST", "^[A-Z][a-z]+$").with_description("x");
        assert!(matches!(
            forge.generate_validated_examples(&request),
            Err(ForgeError::Config(_))
        ));
    }

    #[test]
    fn test_generation_sees_seeded_knowledge() {
        let mock = Arc::new(MockProvider::new().respond_with(ModelBatch::new(["VISA"], ["visa"])));
        let forge = TypeForge::with_config(offline_config()).with_shared_model(mock.clone());
        forge.initialize_domain("banking");

        let request = GenerationRequest::new("CARD.TYPE", "^[A-Z]+$")
            .with_description("Card network such as visa or amex")
            .with_max_retries(1);
        let response = forge.generate_validated_examples(&request).unwrap();

        assert_eq!(response.positive_examples, vec!["VISA"]);
        assert!(
            mock.prompts()[0]
                .context_snippets
                .iter()
                .any(|s| s.contains("visa, mastercard"))
        );
    }

    #[test]
    fn test_compare_against_store() {
        let forge = TypeForge::with_config(offline_config());
        let catalog = InMemoryCatalog::new();
        let existing = CustomSemanticType::list("CARD.TYPE", "Card network", ["VISA", "AMEX"]);
        catalog.put(existing.clone()).unwrap();

        let result = forge.compare(&existing, &catalog).unwrap();
        assert_eq!(result.existing_type, "CARD.TYPE");
        assert!(result.recommend_use_existing);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = ForgeConfig::default();
        config.comparator.recommend_threshold = 1.5;
        assert!(config.validate().is_err());
        assert!(ForgeConfig::default().validate().is_ok());
    }
}
