//! Duplicate detection between a candidate type and an existing catalog.
//!
//! The score is a weighted sum of symmetric per-aspect components. Weights are
//! integers out of 100 so that a pair agreeing on every aspect sums to exactly
//! 1.0. Near-misses on the name or content are capped below 1.0, so only a
//! pair with identical id, base type, plugin and content can reach 1.0.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ForgeError, Result};
use crate::knowledge::{normalize, tokenize};
use crate::types::{CustomSemanticType, Plugin};

const NAME_WEIGHT: f64 = 30.0;
const DESCRIPTION_WEIGHT: f64 = 25.0;
const BASE_TYPE_WEIGHT: f64 = 10.0;
const PLUGIN_WEIGHT: f64 = 10.0;
const CONTENT_WEIGHT: f64 = 15.0;
const LOCALE_WEIGHT: f64 = 5.0;
const HEADER_WEIGHT: f64 = 5.0;
const TOTAL_WEIGHT: f64 = 100.0;

/// Ceiling for partial name or content agreement.
const NEAR_MISS: f64 = 0.9;

/// Configuration for the comparator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparatorConfig {
    /// Best-match score above which the existing type is recommended.
    pub recommend_threshold: f64,
}

impl Default for ComparatorConfig {
    fn default() -> Self {
        Self {
            recommend_threshold: 0.75,
        }
    }
}

impl ComparatorConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.recommend_threshold) {
            return Err(ForgeError::Config(format!(
                "recommend_threshold must be in [0, 1), got {}",
                self.recommend_threshold
            )));
        }
        Ok(())
    }
}

/// One aspect in which two types differ.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Difference {
    pub aspect: String,
    pub description: String,
}

impl Difference {
    fn new(aspect: &str, description: impl Into<String>) -> Self {
        Self {
            aspect: aspect.to_string(),
            description: description.into(),
        }
    }
}

/// The best catalog match for a candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarityResult {
    pub existing_type: String,
    pub existing_description: String,
    pub score: f64,
    pub similarities: Vec<String>,
    pub differences: Vec<Difference>,
    pub recommend_use_existing: bool,
    pub reason: String,
}

/// Compares candidate definitions against a catalog.
#[derive(Debug, Clone, Default)]
pub struct SimilarityComparator {
    config: ComparatorConfig,
}

impl SimilarityComparator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ComparatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ComparatorConfig {
        &self.config
    }

    /// Find the closest catalog entry. `None` for an empty catalog.
    ///
    /// Ties go to the entry that appears first.
    pub fn compare(
        &self,
        candidate: &CustomSemanticType,
        catalog: &[CustomSemanticType],
    ) -> Option<SimilarityResult> {
        let mut best: Option<(&CustomSemanticType, f64)> = None;
        for existing in catalog {
            let score = similarity_score(candidate, existing);
            debug!("{} vs {}: {:.3}", candidate.semantic_type, existing.semantic_type, score);
            if best.is_none_or(|(_, top)| score > top) {
                best = Some((existing, score));
            }
        }

        let (existing, score) = best?;
        let recommend = score > self.config.recommend_threshold;
        let reason = if recommend {
            format!(
                "Existing type '{}' is {:.0}% similar and already covers this concept: {}",
                existing.semantic_type,
                score * 100.0,
                existing.description
            )
        } else {
            format!(
                "Closest existing type '{}' is only {:.0}% similar; a new type is warranted",
                existing.semantic_type,
                score * 100.0
            )
        };

        Some(SimilarityResult {
            existing_type: existing.semantic_type.clone(),
            existing_description: existing.description.clone(),
            score,
            similarities: similarities(candidate, existing),
            differences: differences(candidate, existing),
            recommend_use_existing: recommend,
            reason,
        })
    }
}

/// Symmetric similarity in [0, 1].
pub fn similarity_score(a: &CustomSemanticType, b: &CustomSemanticType) -> f64 {
    let name = if a.semantic_type == b.semantic_type {
        1.0
    } else {
        jaccard(&word_set(&a.semantic_type), &word_set(&b.semantic_type)) * NEAR_MISS
    };
    let description = jaccard(&word_set(&a.description), &word_set(&b.description));
    let base_type = indicator(a.base_type == b.base_type);
    let plugin = indicator(a.plugin_type() == b.plugin_type());
    let content = content_similarity(a, b);
    let locales = jaccard(&locale_tags(a), &locale_tags(b));
    let headers = jaccard(&header_set(a), &header_set(b));

    let total = NAME_WEIGHT * name
        + DESCRIPTION_WEIGHT * description
        + BASE_TYPE_WEIGHT * base_type
        + PLUGIN_WEIGHT * plugin
        + CONTENT_WEIGHT * content
        + LOCALE_WEIGHT * locales
        + HEADER_WEIGHT * headers;
    (total / TOTAL_WEIGHT).clamp(0.0, 1.0)
}

fn indicator(same: bool) -> f64 {
    if same { 1.0 } else { 0.0 }
}

fn content_similarity(a: &CustomSemanticType, b: &CustomSemanticType) -> f64 {
    match (&a.plugin, &b.plugin) {
        (Plugin::Regex, Plugin::Regex) => {
            let pa: Vec<&str> = a.value_patterns().collect();
            let pb: Vec<&str> = b.value_patterns().collect();
            if pa == pb {
                1.0
            } else {
                let sa = pa.iter().map(|p| p.to_string()).collect();
                let sb = pb.iter().map(|p| p.to_string()).collect();
                jaccard(&sa, &sb) * NEAR_MISS
            }
        }
        (Plugin::List { content: ca }, Plugin::List { content: cb }) => {
            if ca.values == cb.values {
                1.0
            } else {
                jaccard(&upper_set(&ca.values), &upper_set(&cb.values)) * NEAR_MISS
            }
        }
        (Plugin::CustomRule { clazz: ca, .. }, Plugin::CustomRule { clazz: cb, .. }) => {
            indicator(ca == cb)
        }
        _ => 0.0,
    }
}

/// |A ∩ B| / |A ∪ B|, with two empty sets counting as identical.
fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let shared = a.intersection(b).count();
    let union = a.len() + b.len() - shared;
    shared as f64 / union as f64
}

fn word_set(text: &str) -> BTreeSet<String> {
    tokenize(&normalize(text)).map(String::from).collect()
}

fn upper_set(values: &[String]) -> BTreeSet<String> {
    values.iter().map(|v| v.trim().to_uppercase()).collect()
}

fn locale_tags(t: &CustomSemanticType) -> BTreeSet<String> {
    t.valid_locales
        .iter()
        .map(|l| l.locale_tag.trim().to_lowercase())
        .collect()
}

fn header_set(t: &CustomSemanticType) -> BTreeSet<String> {
    t.header_patterns().map(|p| p.trim().to_lowercase()).collect()
}

fn similarities(a: &CustomSemanticType, b: &CustomSemanticType) -> Vec<String> {
    let mut out = Vec::new();
    if a.semantic_type == b.semantic_type {
        out.push(format!("Same name {}", a.semantic_type));
    } else {
        let shared: Vec<String> = word_set(&a.semantic_type)
            .intersection(&word_set(&b.semantic_type))
            .cloned()
            .collect();
        if !shared.is_empty() {
            out.push(format!("Names share: {}", shared.join(", ")));
        }
    }

    let shared_words = word_set(&a.description)
        .intersection(&word_set(&b.description))
        .count();
    if shared_words > 0 {
        out.push(format!("Descriptions share {} term(s)", shared_words));
    }
    if a.base_type == b.base_type {
        out.push(format!("Same base type {}", a.base_type));
    }
    if a.plugin_type() == b.plugin_type() {
        out.push(format!("Both use the {} plugin", a.plugin_type()));
    }
    if content_similarity(a, b) == 1.0 {
        out.push("Identical pattern or values".to_string());
    }
    let shared_headers = header_set(a).intersection(&header_set(b)).count();
    if shared_headers > 0 {
        out.push(format!("{} shared header pattern(s)", shared_headers));
    }
    out
}

fn differences(a: &CustomSemanticType, b: &CustomSemanticType) -> Vec<Difference> {
    let mut out = Vec::new();
    if a.semantic_type != b.semantic_type {
        out.push(Difference::new(
            "Name",
            format!("{} vs {}", a.semantic_type, b.semantic_type),
        ));
    }
    if word_set(&a.description) != word_set(&b.description) {
        out.push(Difference::new(
            "Description",
            "Descriptions use different terms",
        ));
    }
    if a.base_type != b.base_type {
        out.push(Difference::new(
            "Base type",
            format!("{} vs {}", a.base_type, b.base_type),
        ));
    }
    if a.plugin_type() != b.plugin_type() {
        out.push(Difference::new(
            "Plugin type",
            format!("{} vs {}", a.plugin_type(), b.plugin_type()),
        ));
    } else if content_similarity(a, b) < 1.0 {
        let entry = match (&a.plugin, &b.plugin) {
            (Plugin::List { content: ca }, Plugin::List { content: cb }) => {
                let only_a = upper_set(&ca.values).difference(&upper_set(&cb.values)).count();
                let only_b = upper_set(&cb.values).difference(&upper_set(&ca.values)).count();
                Difference::new(
                    "List values",
                    format!("{} value(s) only in candidate, {} only in existing", only_a, only_b),
                )
            }
            (Plugin::CustomRule { clazz: ca, .. }, Plugin::CustomRule { clazz: cb, .. }) => {
                Difference::new("Rule class", format!("{} vs {}", ca, cb))
            }
            _ => Difference::new(
                "Pattern",
                format!(
                    "{} vs {}",
                    a.primary_pattern().unwrap_or("-"),
                    b.primary_pattern().unwrap_or("-")
                ),
            ),
        };
        out.push(entry);
    }
    if locale_tags(a) != locale_tags(b) {
        out.push(Difference::new(
            "Locale coverage",
            "Types apply to different locales",
        ));
    }
    if header_set(a) != header_set(b) {
        out.push(Difference::new(
            "Header patterns",
            "Header patterns differ",
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_name() -> CustomSemanticType {
        CustomSemanticType::regex("NAME.FIRST", "Given name of a person", "^[A-Z][a-z]+$")
            .with_header_pattern("(?i)first.?name")
    }

    #[test]
    fn test_identity_scores_one() {
        let candidate = first_name();
        let result = SimilarityComparator::new()
            .compare(&candidate, &[first_name()])
            .unwrap();
        assert_eq!(result.score, 1.0);
        assert!(result.recommend_use_existing);
        assert!(result.differences.is_empty());
        assert!(result.reason.contains("NAME.FIRST"));
    }

    #[test]
    fn test_empty_catalog() {
        assert!(SimilarityComparator::new().compare(&first_name(), &[]).is_none());
    }

    #[test]
    fn test_near_copy_is_below_one() {
        let renamed = CustomSemanticType::regex("NAME.GIVEN", "Given name of a person", "^[A-Z][a-z]+$")
            .with_header_pattern("(?i)first.?name");
        let score = similarity_score(&first_name(), &renamed);
        assert!(score < 1.0);
        assert!(score > 0.75);

        let other_base = first_name().with_base_type("LONG");
        assert!(similarity_score(&first_name(), &other_base) < 1.0);
    }

    #[test]
    fn test_symmetric() {
        let a = first_name();
        let b = CustomSemanticType::list("NAME.TITLE", "Honorific", ["MR", "MRS", "DR"]);
        assert_eq!(similarity_score(&a, &b), similarity_score(&b, &a));
    }

    #[test]
    fn test_ties_go_to_first_entry() {
        let mut a = first_name();
        a.semantic_type = "NAME.ALPHA".to_string();
        let mut b = first_name();
        b.semantic_type = "NAME.BETA".to_string();
        let candidate = CustomSemanticType::list("COLOR", "Colours", ["RED"]);

        let result = SimilarityComparator::new()
            .compare(&candidate, &[a, b])
            .unwrap();
        assert_eq!(result.existing_type, "NAME.ALPHA");
    }

    #[test]
    fn test_threshold_is_strict() {
        let renamed = CustomSemanticType::regex("NAME.GIVEN", "Given name of a person", "^[A-Z][a-z]+$")
            .with_header_pattern("(?i)first.?name");
        let score = similarity_score(&first_name(), &renamed);
        let comparator = SimilarityComparator::with_config(ComparatorConfig {
            recommend_threshold: score,
        });
        let result = comparator.compare(&first_name(), &[renamed]).unwrap();
        assert!(!result.recommend_use_existing);
    }

    #[test]
    fn test_list_differences() {
        let a = CustomSemanticType::list("CARD.TYPE", "Card network", ["VISA", "AMEX"]);
        let b = CustomSemanticType::list("CARD.TYPE", "Card network", ["visa", "DISCOVER"]);
        let result = SimilarityComparator::new().compare(&a, &[b]).unwrap();
        assert!(result.score < 1.0);
        let aspects: Vec<&str> = result.differences.iter().map(|d| d.aspect.as_str()).collect();
        assert_eq!(aspects, vec!["List values"]);
        assert_eq!(
            result.differences[0].description,
            "1 value(s) only in candidate, 1 only in existing"
        );
    }

    #[test]
    fn test_config_bounds() {
        assert!(ComparatorConfig::default().validate().is_ok());
        let bad = ComparatorConfig {
            recommend_threshold: 1.0,
        };
        assert!(bad.validate().is_err());
    }
}
