//! Mines finite-list and header-synonym hints from a sample dataset.
//!
//! The bundled evaluator datasets use a four-part layout:
//!
//! | row | content                         |
//! |-----|---------------------------------|
//! | 0   | expected type annotations       |
//! | 1   | column headers                  |
//! | 2   | copy of the headers             |
//! | 3.. | data                            |

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ForgeError, Result};

/// Index of the header row.
const HEADER_ROW: usize = 1;

/// Index of the first data row.
const DATA_START: usize = 3;

/// How a raw line is split into cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnSplit {
    /// Plain comma split, no quote or escape handling.
    #[default]
    Naive,
    /// RFC 4180 quoting via the csv crate.
    Quoted,
}

/// Miner configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MinerConfig {
    /// Dataset read first.
    pub dataset_path: PathBuf,
    /// Used when `dataset_path` does not exist.
    pub fallback_path: PathBuf,
    /// Maximum data rows scanned.
    pub max_rows: usize,
    /// Columns with more distinct values than this get no finite-list hint.
    pub max_distinct_values: usize,
    pub split: ColumnSplit,
}

impl Default for MinerConfig {
    fn default() -> Self {
        let dir = Path::new("evaluator")
            .join("datasets")
            .join("data")
            .join("transactions");
        Self {
            dataset_path: dir.join("transactions.csv"),
            fallback_path: dir.join("transactions_data.csv"),
            max_rows: 5000,
            max_distinct_values: 40,
            split: ColumnSplit::Naive,
        }
    }
}

impl MinerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_rows == 0 {
            return Err(ForgeError::Config("miner max_rows must be at least 1".to_string()));
        }
        if self.max_distinct_values < 2 {
            return Err(ForgeError::Config(
                "miner max_distinct_values must be at least 2".to_string(),
            ));
        }
        Ok(())
    }
}

/// Raw row access for the miner.
pub trait TabularSource: Send + Sync {
    /// Up to `limit` raw rows, or `None` when the dataset does not exist.
    fn read_rows(&self, limit: usize) -> Result<Option<Vec<Vec<String>>>>;

    /// Human-readable location, for logs.
    fn describe(&self) -> String;
}

/// Delimited file on disk with one fallback location.
#[derive(Debug, Clone)]
pub struct CsvFileSource {
    primary: PathBuf,
    fallback: PathBuf,
    split: ColumnSplit,
}

impl CsvFileSource {
    pub fn new(primary: impl Into<PathBuf>, fallback: impl Into<PathBuf>, split: ColumnSplit) -> Self {
        Self {
            primary: primary.into(),
            fallback: fallback.into(),
            split,
        }
    }

    fn resolve(&self) -> Option<&Path> {
        [self.primary.as_path(), self.fallback.as_path()]
            .into_iter()
            .find(|p| p.is_file())
    }

    fn read_naive(path: &Path, limit: usize) -> Result<Vec<Vec<String>>> {
        let io_err = |source| ForgeError::Io {
            path: path.to_path_buf(),
            source,
        };
        let reader = BufReader::new(File::open(path).map_err(io_err)?);
        let mut rows = Vec::new();
        for line in reader.lines().take(limit) {
            let line = line.map_err(io_err)?;
            rows.push(split_naive(&line));
        }
        Ok(rows)
    }

    fn read_quoted(path: &Path, limit: usize) -> Result<Vec<Vec<String>>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)?;
        let mut rows = Vec::new();
        for record in reader.records().take(limit) {
            rows.push(record?.iter().map(str::to_string).collect());
        }
        Ok(rows)
    }
}

impl TabularSource for CsvFileSource {
    fn read_rows(&self, limit: usize) -> Result<Option<Vec<Vec<String>>>> {
        let Some(path) = self.resolve() else {
            return Ok(None);
        };
        debug!("Reading up to {} rows from {}", limit, path.display());
        let rows = match self.split {
            ColumnSplit::Naive => Self::read_naive(path, limit)?,
            ColumnSplit::Quoted => Self::read_quoted(path, limit)?,
        };
        Ok(Some(rows))
    }

    fn describe(&self) -> String {
        format!("{} (fallback {})", self.primary.display(), self.fallback.display())
    }
}

/// Split on every comma, keeping empty trailing cells.
pub fn split_naive(line: &str) -> Vec<String> {
    line.split(',').map(str::to_string).collect()
}

/// Extracts knowledge snippets from a [`TabularSource`].
pub struct DatasetMiner {
    config: MinerConfig,
    source: Box<dyn TabularSource>,
}

impl DatasetMiner {
    /// Miner over the configured dataset files.
    pub fn new(config: MinerConfig) -> Self {
        let source = CsvFileSource::new(
            config.dataset_path.clone(),
            config.fallback_path.clone(),
            config.split,
        );
        Self::with_source(config, source)
    }

    /// Miner over an arbitrary source.
    pub fn with_source(config: MinerConfig, source: impl TabularSource + 'static) -> Self {
        Self {
            config,
            source: Box::new(source),
        }
    }

    pub fn config(&self) -> &MinerConfig {
        &self.config
    }

    /// Mine hints from the dataset. Never fails: problems yield an empty list.
    pub fn mine_knowledge_snippets(&self) -> Vec<String> {
        match self.source.read_rows(DATA_START.saturating_add(self.config.max_rows)) {
            Ok(Some(rows)) => {
                let snippets = mine_rows(&rows, &self.config);
                info!(
                    "Dataset miner: mined {} snippets from {}",
                    snippets.len(),
                    self.source.describe()
                );
                snippets
            }
            Ok(None) => {
                debug!("Dataset miner: no dataset at {}", self.source.describe());
                Vec::new()
            }
            Err(e) => {
                warn!("Dataset miner: failed to mine knowledge: {}", e);
                Vec::new()
            }
        }
    }
}

/// Mine snippets from already-split rows laid out as described in the module docs.
pub fn mine_rows(rows: &[Vec<String>], config: &MinerConfig) -> Vec<String> {
    if rows.len() < DATA_START {
        return Vec::new();
    }
    let headers = &rows[HEADER_ROW];

    let mut frequencies: Vec<IndexMap<String, usize>> = vec![IndexMap::new(); headers.len()];
    for row in rows.iter().skip(DATA_START).take(config.max_rows) {
        for (freq, cell) in frequencies.iter_mut().zip(row.iter()) {
            let value = normalize_value(cell);
            if !value.is_empty() {
                *freq.entry(value.to_string()).or_insert(0) += 1;
            }
        }
    }

    let mut snippets = Vec::new();
    for (col, (header, freq)) in headers.iter().zip(frequencies.iter()).enumerate() {
        let header = match header.trim() {
            "" => format!("col_{}", col),
            h => h.to_string(),
        };

        let distinct = freq.len();
        if distinct > 1 && distinct <= config.max_distinct_values {
            let mut ranked: Vec<(&String, &usize)> = freq.iter().collect();
            // Stable sort keeps first-seen order among equal counts.
            ranked.sort_by(|a, b| b.1.cmp(a.1));
            let values: Vec<&str> = ranked
                .iter()
                .take(config.max_distinct_values)
                .map(|(v, _)| v.as_str())
                .collect();
            snippets.push(format!(
                "{}: finite list candidate from data [{}]",
                header,
                values.join(", ")
            ));
        }

        let tokens = header_tokens(&header);
        if !tokens.is_empty() {
            snippets.push(format!(
                "{}: header synonyms tokens ({})",
                header,
                tokens.join("|")
            ));
        }
    }
    snippets
}

/// Trimmed cell value; the literal `null` counts as empty.
fn normalize_value(cell: &str) -> &str {
    let trimmed = cell.trim();
    if trimmed.eq_ignore_ascii_case("null") {
        ""
    } else {
        trimmed
    }
}

/// Lower-cased alphanumeric runs of a header.
///
/// Runs are Unicode alphanumeric, matching [`tokenize`](super::tokenize), so
/// `Café_Name` yields `café` and `name`.
pub fn header_tokens(header: &str) -> Vec<String> {
    header
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(lines: &[&str]) -> Vec<Vec<String>> {
        lines.iter().map(|l| split_naive(l)).collect()
    }

    #[test]
    fn test_header_tokens() {
        assert_eq!(header_tokens("Txn_Amount (USD)"), vec!["txn", "amount", "usd"]);
        assert!(header_tokens("--").is_empty());
        assert_eq!(header_tokens("Café_Name"), vec!["café", "name"]);
    }

    #[test]
    fn test_too_few_rows() {
        let r = rows(&["STRING,STRING", "a,b"]);
        assert!(mine_rows(&r, &MinerConfig::default()).is_empty());
    }

    #[test]
    fn test_finite_list_ordering() {
        let r = rows(&[
            "STRING",
            "channel",
            "channel",
            "web",
            "branch",
            "atm",
            "branch",
            "NULL",
            "",
            "atm",
        ]);
        let snippets = mine_rows(&r, &MinerConfig::default());
        assert_eq!(
            snippets[0],
            "channel: finite list candidate from data [branch, atm, web]"
        );
        assert_eq!(snippets[1], "channel: header synonyms tokens (channel)");
    }

    #[test]
    fn test_single_value_column_has_no_list() {
        let r = rows(&["T,T", "status,id", "status,id", "ok,1", "ok,2"]);
        let snippets = mine_rows(&r, &MinerConfig::default());
        assert_eq!(
            snippets,
            vec![
                "status: header synonyms tokens (status)".to_string(),
                "id: finite list candidate from data [1, 2]".to_string(),
                "id: header synonyms tokens (id)".to_string(),
            ]
        );
    }

    #[test]
    fn test_blank_header_gets_placeholder() {
        let r = rows(&["T", " ", " ", "x", "y"]);
        let snippets = mine_rows(&r, &MinerConfig::default());
        assert_eq!(snippets[0], "col_0: finite list candidate from data [x, y]");
        assert_eq!(snippets[1], "col_0: header synonyms tokens (col|0)");
    }

    #[test]
    fn test_row_cap() {
        let mut lines = vec!["T", "kind", "kind"];
        lines.extend(["a", "b", "c"]);
        let config = MinerConfig {
            max_rows: 1,
            ..MinerConfig::default()
        };
        let snippets = mine_rows(&rows(&lines), &config);
        // Only "a" is scanned, so there is no finite list.
        assert_eq!(snippets, vec!["kind: header synonyms tokens (kind)".to_string()]);
    }

    #[test]
    fn test_missing_dataset_is_empty() {
        let config = MinerConfig {
            dataset_path: PathBuf::from("/nonexistent/a.csv"),
            fallback_path: PathBuf::from("/nonexistent/b.csv"),
            ..MinerConfig::default()
        };
        assert!(DatasetMiner::new(config).mine_knowledge_snippets().is_empty());
    }

    #[test]
    fn test_unbounded_row_cap() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(&path, "T\nkind\nkind\na\nb\n").unwrap();

        let config = MinerConfig {
            dataset_path: path.clone(),
            fallback_path: path,
            max_rows: usize::MAX,
            ..MinerConfig::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(
            DatasetMiner::new(config).mine_knowledge_snippets()[0],
            "kind: finite list candidate from data [a, b]"
        );
    }

    struct FailingSource;

    impl TabularSource for FailingSource {
        fn read_rows(&self, _limit: usize) -> Result<Option<Vec<Vec<String>>>> {
            Err(ForgeError::Config("disk on fire".to_string()))
        }

        fn describe(&self) -> String {
            "failing".to_string()
        }
    }

    #[test]
    fn test_source_failure_degrades_to_empty() {
        let miner = DatasetMiner::with_source(MinerConfig::default(), FailingSource);
        assert!(miner.mine_knowledge_snippets().is_empty());
    }
}
