//! Domain-partitioned term-frequency index for generation-time retrieval.
//!
//! Documents are bag-of-words vectors compared with cosine similarity. Each
//! domain is an append-only partition behind its own lock, so indexing one
//! domain never blocks searches of another.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};
use unicode_normalization::UnicodeNormalization;

/// Tokens shorter than this (in characters) are not indexed.
const MIN_TOKEN_CHARS: usize = 2;

/// Free-form metadata attached to indexed documents.
pub type Metadata = Map<String, Value>;

/// An indexed text. Immutable once created.
#[derive(Debug, Clone)]
pub struct Document {
    text: String,
    term_frequency: HashMap<String, u32>,
    vector_norm: f64,
    norm_squared: u64,
    metadata: Metadata,
}

impl Document {
    /// Build a document, or `None` when the text is blank.
    fn from_text(text: &str, metadata: Metadata) -> Option<Self> {
        if text.trim().is_empty() {
            return None;
        }
        let text = normalize(text);
        let (term_frequency, norm_squared) = term_vector(&text);
        Some(Self {
            text,
            term_frequency,
            vector_norm: (norm_squared as f64).sqrt(),
            norm_squared,
            metadata,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn term_frequency(&self) -> &HashMap<String, u32> {
        &self.term_frequency
    }

    pub fn vector_norm(&self) -> f64 {
        self.vector_norm
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }
}

/// A scored search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub text: String,
    pub score: f64,
    pub metadata: Metadata,
}

type Partition = Arc<RwLock<Vec<Arc<Document>>>>;

/// In-memory retrieval cache keyed by domain.
#[derive(Default)]
pub struct RetrievalCache {
    domains: DashMap<String, Partition>,
}

impl RetrievalCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index `texts` under `domain`, cloning `base_metadata` into each document.
    ///
    /// Blank texts are skipped. Returns the number of documents added.
    pub fn add_documents<S: AsRef<str>>(
        &self,
        domain: &str,
        texts: &[S],
        base_metadata: &Metadata,
    ) -> usize {
        if texts.is_empty() {
            return 0;
        }

        let docs: Vec<Arc<Document>> = texts
            .iter()
            .filter_map(|t| Document::from_text(t.as_ref(), base_metadata.clone()))
            .map(Arc::new)
            .collect();
        if docs.is_empty() {
            debug!("Retrieval cache: nothing to index for domain '{}'", domain);
            return 0;
        }

        // Clone the partition handle so the map shard is released before locking.
        let partition = self
            .domains
            .entry(domain.to_string())
            .or_default()
            .clone();

        let added = docs.len();
        let mut guard = partition.write().unwrap_or_else(PoisonError::into_inner);
        guard.extend(docs);
        info!(
            "Retrieval cache: domain '{}' now has {} docs",
            domain,
            guard.len()
        );
        added
    }

    /// Cosine-similarity search within one domain.
    ///
    /// Only strictly positive scores are returned, best first. Ties keep
    /// insertion order.
    pub fn search(&self, domain: &str, query: &str, top_k: usize) -> Vec<SearchHit> {
        if top_k == 0 || query.trim().is_empty() {
            return Vec::new();
        }
        let Some(partition) = self.partition(domain) else {
            return Vec::new();
        };

        let normalized = normalize(query);
        let (query_tf, query_norm_sq) = term_vector(&normalized);
        if query_norm_sq == 0 {
            return Vec::new();
        }

        let docs = partition.read().unwrap_or_else(PoisonError::into_inner);
        let mut hits: Vec<SearchHit> = docs
            .iter()
            .filter_map(|doc| {
                let score = cosine(&query_tf, query_norm_sq, &doc.term_frequency, doc.norm_squared);
                (score > 0.0).then(|| SearchHit {
                    text: doc.text.clone(),
                    score,
                    metadata: doc.metadata.clone(),
                })
            })
            .collect();
        drop(docs);

        // sort_by is stable, so equal scores keep insertion order.
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(top_k);
        hits
    }

    /// Drop every document in `domain`.
    pub fn clear_domain(&self, domain: &str) {
        if self.domains.remove(domain).is_some() {
            info!("Retrieval cache: cleared domain '{}'", domain);
        }
    }

    /// Number of documents in `domain` (0 when absent).
    pub fn size(&self, domain: &str) -> usize {
        self.partition(domain)
            .map(|p| p.read().unwrap_or_else(PoisonError::into_inner).len())
            .unwrap_or(0)
    }

    /// Names of all non-cleared domains, sorted.
    pub fn domains(&self) -> Vec<String> {
        let mut names: Vec<String> = self.domains.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    fn partition(&self, domain: &str) -> Option<Partition> {
        self.domains.get(domain).map(|p| Arc::clone(p.value()))
    }
}

/// Compatibility-fold, lower-case and collapse whitespace.
pub fn normalize(text: &str) -> String {
    let folded: String = text.nfkc().collect::<String>().to_lowercase();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Alphanumeric tokens of at least two characters.
///
/// Boundaries use Unicode alphanumerics, not ASCII `[a-z0-9]`: accented and
/// non-Latin letters stay inside their token, so `café` is one token rather
/// than `caf`.
pub fn tokenize(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= MIN_TOKEN_CHARS)
}

/// Term frequencies and the squared Euclidean norm of that vector.
fn term_vector(text: &str) -> (HashMap<String, u32>, u64) {
    let mut tf: HashMap<String, u32> = HashMap::new();
    for token in tokenize(text) {
        *tf.entry(token.to_string()).or_insert(0) += 1;
    }
    let norm_squared = tf.values().map(|&c| u64::from(c) * u64::from(c)).sum();
    (tf, norm_squared)
}

/// Cosine similarity over sparse integer vectors, iterating the smaller map.
///
/// Uses the squared norms so identical vectors score exactly 1.0.
fn cosine(a: &HashMap<String, u32>, a_sq: u64, b: &HashMap<String, u32>, b_sq: u64) -> f64 {
    if a_sq == 0 || b_sq == 0 {
        return 0.0;
    }
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let dot: u64 = small
        .iter()
        .filter_map(|(term, &c)| large.get(term).map(|&d| u64::from(c) * u64::from(d)))
        .sum();
    if dot == 0 {
        return 0.0;
    }
    let denominator = (a_sq as f64 * b_sq as f64).sqrt();
    (dot as f64 / denominator).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta(source: &str) -> Metadata {
        let mut m = Metadata::new();
        m.insert("source".to_string(), json!(source));
        m
    }

    #[test]
    fn test_normalize_folds_and_collapses() {
        assert_eq!(normalize("  Ｆｕｌｌ\tWIDTH\n\ntext "), "full width text");
        assert_eq!(normalize("ﬁle"), "file");
    }

    #[test]
    fn test_short_tokens_dropped() {
        let (tf, norm_sq) = term_vector("a bb c dd dd");
        assert_eq!(tf.len(), 2);
        assert_eq!(tf["dd"], 2);
        assert_eq!(norm_sq, 1 + 4);
    }

    #[test]
    fn test_tokens_keep_non_ascii_letters() {
        let tokens: Vec<&str> = tokenize("café crème, straße_nr 12").collect();
        assert_eq!(tokens, vec!["café", "crème", "straße", "nr", "12"]);
    }

    #[test]
    fn test_blank_and_empty_input_is_noop() {
        let cache = RetrievalCache::new();
        let empty: [&str; 0] = [];
        assert_eq!(cache.add_documents("a", &empty, &Metadata::new()), 0);
        assert_eq!(cache.add_documents("a", &["", "   ", "\n"], &Metadata::new()), 0);
        assert_eq!(cache.size("a"), 0);
        assert!(cache.domains().is_empty());
    }

    #[test]
    fn test_self_similarity_is_exactly_one() {
        let cache = RetrievalCache::new();
        cache.add_documents(
            "banking",
            &[
                "CardType: finite list: VISA, MASTERCARD, AMEX, DISCOVER.",
                "AccountID: identifiers, headers: account_id, acct_id, account_number.",
            ],
            &meta("seed"),
        );
        let hits = cache.search(
            "banking",
            "AccountID: identifiers, headers: account_id, acct_id, account_number.",
            5,
        );
        assert!(!hits.is_empty());
        assert_eq!(hits[0].score, 1.0);
        assert!(hits[0].text.starts_with("accountid"));
        assert_eq!(hits[0].metadata["source"], "seed");
    }

    #[test]
    fn test_no_cross_domain_leakage() {
        let cache = RetrievalCache::new();
        cache.add_documents("A", &["employee identifier codes"], &Metadata::new());
        assert!(cache.search("B", "employee identifier codes", 5).is_empty());
        assert_eq!(cache.search("A", "employee identifier codes", 5).len(), 1);
    }

    #[test]
    fn test_zero_norm_query_returns_nothing() {
        let cache = RetrievalCache::new();
        cache.add_documents("A", &["employee identifier"], &Metadata::new());
        assert!(cache.search("A", "a b c ! ?", 5).is_empty());
        assert!(cache.search("A", "   ", 5).is_empty());
    }

    #[test]
    fn test_non_overlapping_docs_excluded() {
        let cache = RetrievalCache::new();
        cache.add_documents("A", &["loan status approved", "card type visa"], &Metadata::new());
        let hits = cache.search("A", "loan", 5);
        assert_eq!(hits.len(), 1);
        assert!(hits[0].text.contains("loan"));
    }

    #[test]
    fn test_ties_keep_insertion_order_and_truncate() {
        let cache = RetrievalCache::new();
        cache.add_documents(
            "A",
            &["rate first", "rate second", "rate third"],
            &Metadata::new(),
        );
        let hits = cache.search("A", "rate", 2);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].text, "rate first");
        assert_eq!(hits[1].text, "rate second");
    }

    #[test]
    fn test_clear_and_readd_reproduces_ranking() {
        let cache = RetrievalCache::new();
        let docs = [
            "interest rate apr percentage",
            "credit limit monetary",
            "interest on loan balance",
        ];
        cache.add_documents("A", &docs, &Metadata::new());
        let before = cache.search("A", "interest rate", 10);

        cache.clear_domain("A");
        assert_eq!(cache.size("A"), 0);
        cache.add_documents("A", &docs, &Metadata::new());
        let after = cache.search("A", "interest rate", 10);

        assert_eq!(before, after);
    }

    #[test]
    fn test_metadata_is_cloned_per_document() {
        let cache = RetrievalCache::new();
        cache.add_documents("A", &["alpha beta", "beta gamma"], &meta("mined"));
        let hits = cache.search("A", "beta", 5);
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| h.metadata["source"] == "mined"));
    }

    #[test]
    fn test_concurrent_writers_and_readers() {
        let cache = Arc::new(RetrievalCache::new());
        cache.add_documents("read", &["stable document text"], &Metadata::new());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    let domain = format!("write{}", i % 2);
                    for n in 0..50 {
                        cache.add_documents(&domain, &[format!("doc {} number {}", i, n)], &Metadata::new());
                        assert_eq!(cache.search("read", "stable document", 1).len(), 1);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(cache.size("write0") + cache.size("write1"), 400);
    }
}
