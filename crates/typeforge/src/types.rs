//! Semantic type definitions and their structural invariants.
//!
//! A [`CustomSemanticType`] is always handled as a whole value: the pipeline
//! produces complete definitions and hands them to a catalog store, it never
//! patches individual fields of a stored one.

use std::fmt;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ForgeError, Result};
use crate::pattern::PatternMatcher;

/// Dot-delimited upper-case identifiers such as `IDENTIFIER.EMPLOYEE_ID`.
static SEMANTIC_TYPE_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Z0-9_]+(\.[A-Z0-9_]+)*$").expect("static regex")
});

/// Confidence threshold as an integer percentage, always within `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Threshold(u8);

impl Threshold {
    /// Create a threshold, rejecting values outside `[0, 100]`.
    pub fn new(value: i64) -> Result<Self> {
        if (0..=100).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(ForgeError::InvalidDefinition(format!(
                "threshold must be within [0, 100], got {}",
                value
            )))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Self(95)
    }
}

impl TryFrom<i64> for Threshold {
    type Error = ForgeError;

    fn try_from(value: i64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Threshold> for i64 {
    fn from(t: Threshold) -> Self {
        i64::from(t.0)
    }
}

/// The validation mechanism backing a semantic type, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PluginType {
    Regex,
    List,
    CustomRule,
}

impl fmt::Display for PluginType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginType::Regex => write!(f, "regex"),
            PluginType::List => write!(f, "list"),
            PluginType::CustomRule => write!(f, "custom-rule"),
        }
    }
}

/// Plugin-specific payload. The tag decides which fields are meaningful.
///
/// Regex types keep their value patterns in the locale match entries, so the
/// `Regex` variant carries no extra data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "pluginType")]
pub enum Plugin {
    #[serde(rename = "regex")]
    Regex,
    #[serde(rename = "list")]
    List { content: ContentConfig },
    #[serde(rename = "custom-rule", alias = "java")]
    CustomRule {
        clazz: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signature: Option<String>,
    },
}

impl Plugin {
    pub fn kind(&self) -> PluginType {
        match self {
            Plugin::Regex => PluginType::Regex,
            Plugin::List { .. } => PluginType::List,
            Plugin::CustomRule { .. } => PluginType::CustomRule,
        }
    }
}

/// Values backing a list-type semantic type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentConfig {
    /// Where the values live (`inline`, `resource`, ...).
    #[serde(default = "default_content_type", rename = "type")]
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default)]
    pub values: Vec<String>,
}

fn default_content_type() -> String {
    "inline".to_string()
}

impl ContentConfig {
    /// Inline list content.
    pub fn inline(values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            content_type: default_content_type(),
            reference: None,
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// Header-context rule: a regex matched against column headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderMatch {
    #[serde(alias = "regExp")]
    pub pattern: String,
    #[serde(default = "default_header_confidence")]
    pub confidence: i32,
    #[serde(default = "default_true")]
    pub mandatory: bool,
}

fn default_header_confidence() -> i32 {
    99
}

fn default_true() -> bool {
    true
}

impl HeaderMatch {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            confidence: default_header_confidence(),
            mandatory: true,
        }
    }
}

/// Value-pattern rule for one locale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchEntry {
    /// Patterns produced by the profiling engine that this entry applies to.
    #[serde(default, alias = "regExpsToMatch")]
    pub source_patterns: Vec<String>,
    /// The pattern the type reports once matched.
    #[serde(alias = "regExpReturned")]
    pub returned_pattern: String,
    #[serde(default = "default_true", alias = "isRegExpComplete")]
    pub is_complete: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl MatchEntry {
    pub fn new(returned_pattern: impl Into<String>) -> Self {
        let returned_pattern = returned_pattern.into();
        Self {
            source_patterns: vec![returned_pattern.clone()],
            returned_pattern,
            is_complete: true,
            description: None,
        }
    }
}

/// Per-locale header and value rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocaleConfig {
    #[serde(default = "default_locale_tag")]
    pub locale_tag: String,
    #[serde(default)]
    pub header_reg_exps: Vec<HeaderMatch>,
    #[serde(default)]
    pub match_entries: Vec<MatchEntry>,
}

fn default_locale_tag() -> String {
    "*".to_string()
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self {
            locale_tag: default_locale_tag(),
            header_reg_exps: Vec::new(),
            match_entries: Vec::new(),
        }
    }
}

/// A named, reusable column classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomSemanticType {
    pub semantic_type: String,
    pub description: String,
    #[serde(flatten)]
    pub plugin: Plugin,
    #[serde(default = "default_base_type")]
    pub base_type: String,
    #[serde(default)]
    pub threshold: Threshold,
    #[serde(default)]
    pub valid_locales: Vec<LocaleConfig>,
    #[serde(default)]
    pub is_built_in: bool,
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_base_type() -> String {
    "STRING".to_string()
}

impl CustomSemanticType {
    /// A regex type with a single wildcard locale.
    pub fn regex(
        semantic_type: impl Into<String>,
        description: impl Into<String>,
        pattern: impl Into<String>,
    ) -> Self {
        Self {
            semantic_type: semantic_type.into(),
            description: description.into(),
            plugin: Plugin::Regex,
            base_type: default_base_type(),
            threshold: Threshold::default(),
            valid_locales: vec![LocaleConfig {
                match_entries: vec![MatchEntry::new(pattern)],
                ..LocaleConfig::default()
            }],
            is_built_in: false,
            created_at: None,
        }
    }

    /// A list type with inline values.
    pub fn list(
        semantic_type: impl Into<String>,
        description: impl Into<String>,
        values: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            semantic_type: semantic_type.into(),
            description: description.into(),
            plugin: Plugin::List {
                content: ContentConfig::inline(values),
            },
            base_type: default_base_type(),
            threshold: Threshold::default(),
            valid_locales: vec![LocaleConfig::default()],
            is_built_in: false,
            created_at: None,
        }
    }

    /// Add a header pattern to the first locale, creating it if needed.
    pub fn with_header_pattern(mut self, pattern: impl Into<String>) -> Self {
        if self.valid_locales.is_empty() {
            self.valid_locales.push(LocaleConfig::default());
        }
        self.valid_locales[0]
            .header_reg_exps
            .push(HeaderMatch::new(pattern));
        self
    }

    pub fn with_base_type(mut self, base_type: impl Into<String>) -> Self {
        self.base_type = base_type.into();
        self
    }

    pub fn with_threshold(mut self, threshold: Threshold) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn plugin_type(&self) -> PluginType {
        self.plugin.kind()
    }

    /// The primary value pattern of a regex type (first locale, first entry).
    pub fn primary_pattern(&self) -> Option<&str> {
        if self.plugin_type() != PluginType::Regex {
            return None;
        }
        self.valid_locales
            .first()
            .and_then(|l| l.match_entries.first())
            .map(|m| m.returned_pattern.as_str())
    }

    /// Every value pattern across all locales, in declaration order.
    pub fn value_patterns(&self) -> impl Iterator<Item = &str> {
        self.valid_locales
            .iter()
            .flat_map(|l| l.match_entries.iter())
            .map(|m| m.returned_pattern.as_str())
    }

    /// Every header pattern across all locales, in declaration order.
    pub fn header_patterns(&self) -> impl Iterator<Item = &str> {
        self.valid_locales
            .iter()
            .flat_map(|l| l.header_reg_exps.iter())
            .map(|h| h.pattern.as_str())
    }

    /// List values for list types, empty otherwise.
    pub fn list_values(&self) -> &[String] {
        match &self.plugin {
            Plugin::List { content } => &content.values,
            _ => &[],
        }
    }

    /// Check the structural invariants of this definition.
    pub fn validate(&self) -> Result<()> {
        let id = self.semantic_type.trim();
        if id.is_empty() {
            return Err(ForgeError::InvalidDefinition(
                "semanticType must not be blank".to_string(),
            ));
        }
        if !SEMANTIC_TYPE_ID.is_match(id) {
            return Err(ForgeError::InvalidDefinition(format!(
                "semanticType '{}' must be dot-delimited upper-case segments",
                id
            )));
        }
        if self.description.trim().is_empty() {
            return Err(ForgeError::InvalidDefinition(format!(
                "{}: description must not be blank",
                id
            )));
        }
        if self.base_type.trim().is_empty() {
            return Err(ForgeError::InvalidDefinition(format!(
                "{}: baseType must not be blank",
                id
            )));
        }

        for locale in &self.valid_locales {
            for header in &locale.header_reg_exps {
                Regex::new(&header.pattern).map_err(|e| {
                    ForgeError::InvalidDefinition(format!(
                        "{}: header pattern '{}' does not compile: {}",
                        id, header.pattern, e
                    ))
                })?;
            }
        }

        match &self.plugin {
            Plugin::Regex => {
                let pattern = self.primary_pattern().ok_or_else(|| {
                    ForgeError::InvalidDefinition(format!(
                        "{}: regex types need at least one match entry",
                        id
                    ))
                })?;
                Regex::new(pattern).map_err(|e| {
                    ForgeError::InvalidDefinition(format!(
                        "{}: pattern '{}' does not compile: {}",
                        id, pattern, e
                    ))
                })?;
            }
            Plugin::List { content } => {
                if content.values.iter().all(|v| v.trim().is_empty()) {
                    return Err(ForgeError::InvalidDefinition(format!(
                        "{}: list types need at least one value",
                        id
                    )));
                }
            }
            Plugin::CustomRule { clazz, .. } => {
                if clazz.trim().is_empty() {
                    return Err(ForgeError::InvalidDefinition(format!(
                        "{}: custom-rule types need a rule class",
                        id
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Verdict for a single example checked against a definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExampleVerdict {
    pub example: String,
    pub matches: bool,
    /// Whether the example behaved as its direction requires.
    pub accepted: bool,
    pub reason: String,
}

/// Outcome of checking operator-supplied examples against a definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExampleReport {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub positive: Vec<ExampleVerdict>,
    pub negative: Vec<ExampleVerdict>,
}

impl ExampleReport {
    fn rejected(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// Check positive and negative examples against a definition.
///
/// Regex types go through the pattern engine, list types use case-insensitive
/// membership. Custom rules cannot be evaluated here and are reported as such.
pub fn validate_examples(
    definition: &CustomSemanticType,
    positives: &[String],
    negatives: &[String],
    matcher: &dyn PatternMatcher,
) -> ExampleReport {
    let check: Box<dyn Fn(&str) -> bool + '_> = match &definition.plugin {
        Plugin::Regex => {
            let Some(pattern) = definition.primary_pattern() else {
                return ExampleReport::rejected("No regex pattern found in semantic type");
            };
            if !matcher.is_valid(pattern) {
                return ExampleReport::rejected(format!("Invalid regex pattern: {}", pattern));
            }
            Box::new(move |text: &str| matcher.matches(pattern, text))
        }
        Plugin::List { content } => {
            let values: Vec<String> = content
                .values
                .iter()
                .map(|v| v.trim().to_uppercase())
                .collect();
            Box::new(move |text: &str| values.contains(&text.trim().to_uppercase()))
        }
        Plugin::CustomRule { clazz, .. } => {
            return ExampleReport::rejected(format!(
                "Custom rule '{}' cannot be evaluated outside the profiling engine",
                clazz
            ));
        }
    };

    let verdict = |example: &String, should_match: bool| {
        if example.trim().is_empty() {
            return ExampleVerdict {
                example: example.clone(),
                matches: false,
                accepted: false,
                reason: "Empty example".to_string(),
            };
        }
        let matches = check(example);
        let accepted = matches == should_match;
        let reason = match (should_match, matches) {
            (true, true) => "Correctly matched",
            (true, false) => "Expected a match but the type rejected it",
            (false, false) => "Correctly rejected",
            (false, true) => "Expected a rejection but the type matched it",
        };
        ExampleVerdict {
            example: example.clone(),
            matches,
            accepted,
            reason: reason.to_string(),
        }
    };

    let positive: Vec<ExampleVerdict> = positives.iter().map(|e| verdict(e, true)).collect();
    let negative: Vec<ExampleVerdict> = negatives.iter().map(|e| verdict(e, false)).collect();
    let valid = positive.iter().chain(negative.iter()).all(|v| v.accepted);

    ExampleReport {
        valid,
        error: None,
        positive,
        negative,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::RegexMatcher;

    #[test]
    fn test_threshold_bounds() {
        assert!(Threshold::new(0).is_ok());
        assert!(Threshold::new(100).is_ok());
        assert!(Threshold::new(101).is_err());
        assert!(Threshold::new(-1).is_err());
    }

    #[test]
    fn test_threshold_rejected_on_deserialize() {
        let json = r#"{"semanticType":"A.B","description":"d","pluginType":"regex","threshold":150}"#;
        assert!(serde_json::from_str::<CustomSemanticType>(json).is_err());
    }

    #[test]
    fn test_plugin_tag_roundtrip_shape() {
        let t = CustomSemanticType::list("COLOR.PRIMARY", "Primary colours", ["RED", "BLUE"]);
        let value = serde_json::to_value(&t).unwrap();
        assert_eq!(value["pluginType"], "list");
        assert_eq!(value["content"]["values"][1], "BLUE");
        assert_eq!(value["threshold"], 95);

        let back: CustomSemanticType = serde_json::from_value(value).unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn test_legacy_field_names_accepted() {
        let json = r#"{
            "semanticType": "IDENTIFIER.EMPLOYEE_ID",
            "description": "Employee ID",
            "pluginType": "regex",
            "validLocales": [{
                "localeTag": "*",
                "headerRegExps": [{"regExp": "(?i).*employee.*"}],
                "matchEntries": [{"regExpReturned": "E\\d{5}", "regExpsToMatch": ["E\\d{5}"]}]
            }]
        }"#;
        let t: CustomSemanticType = serde_json::from_str(json).unwrap();
        assert_eq!(t.primary_pattern(), Some(r"E\d{5}"));
        assert_eq!(t.header_patterns().count(), 1);
        assert!(t.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_definitions() {
        let bad_id = CustomSemanticType::regex("name first", "d", "^a$");
        assert!(bad_id.validate().is_err());

        let bad_pattern = CustomSemanticType::regex("NAME.FIRST", "d", "([a-z");
        assert!(bad_pattern.validate().is_err());

        let empty_list = CustomSemanticType::list("COLOR", "d", Vec::<String>::new());
        assert!(empty_list.validate().is_err());
    }

    #[test]
    fn test_validate_examples_regex() {
        let t = CustomSemanticType::regex("NAME.FIRST", "First names", "[A-Z][a-z]+");
        let report = validate_examples(
            &t,
            &["Maria".to_string(), "123".to_string()],
            &["bob".to_string()],
            &RegexMatcher::new(),
        );
        assert!(!report.valid);
        assert!(report.positive[0].accepted);
        assert!(!report.positive[1].accepted);
        assert!(report.negative[0].accepted);
    }

    #[test]
    fn test_validate_examples_list_is_case_insensitive() {
        let t = CustomSemanticType::list("CARD.TYPE", "Card networks", ["VISA", "AMEX"]);
        let report = validate_examples(&t, &["visa".to_string()], &[], &RegexMatcher::new());
        assert!(report.valid);
    }
}
