//! Generation-time knowledge: the retrieval cache, the dataset miner and
//! curated seed snippets.

mod cache;
mod miner;
mod seed;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::error::{ForgeError, Result};

pub use cache::{normalize, tokenize, Document, Metadata, RetrievalCache, SearchHit};
pub use miner::{
    header_tokens, mine_rows, split_naive, ColumnSplit, CsvFileSource, DatasetMiner, MinerConfig,
    TabularSource,
};
pub use seed::seed_snippets;

/// Retrieval defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Hits returned when a caller does not ask for a specific number.
    pub default_top_k: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { default_top_k: 5 }
    }
}

impl CacheConfig {
    pub fn validate(&self) -> Result<()> {
        if self.default_top_k == 0 {
            return Err(ForgeError::Config(
                "cache default_top_k must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Curates snippets per domain and indexes them into a shared cache.
pub struct KnowledgeBase {
    cache: Arc<RetrievalCache>,
    miner: DatasetMiner,
}

impl KnowledgeBase {
    pub fn new(cache: Arc<RetrievalCache>, miner: DatasetMiner) -> Self {
        Self { cache, miner }
    }

    pub fn cache(&self) -> &Arc<RetrievalCache> {
        &self.cache
    }

    pub fn miner(&self) -> &DatasetMiner {
        &self.miner
    }

    /// Rebuild `domain` from its seed snippets plus whatever the miner finds.
    ///
    /// Returns the number of indexed documents.
    pub fn initialize_domain(&self, domain: &str) -> usize {
        self.cache.clear_domain(domain);

        let seeds = seed_snippets(domain);
        self.cache
            .add_documents(domain, seeds, &source_metadata("seed"));

        let mined = self.miner.mine_knowledge_snippets();
        if !mined.is_empty() {
            self.cache
                .add_documents(domain, &mined, &source_metadata("mined"));
            info!("Augmented '{}' knowledge with {} mined snippets", domain, mined.len());
        }

        let size = self.cache.size(domain);
        info!("Initialized '{}' knowledge with {} snippets", domain, size);
        size
    }

    /// Search one domain.
    pub fn retrieve(&self, domain: &str, query: &str, top_k: usize) -> Vec<SearchHit> {
        self.cache.search(domain, query, top_k)
    }
}

fn source_metadata(source: &str) -> Metadata {
    let mut meta = Metadata::new();
    meta.insert("source".to_string(), json!(source));
    meta
}
