//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// TypeForge: LLM-assisted semantic type generation
#[derive(Parser)]
#[command(name = "typeforge")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output (debug logging unless RUST_LOG is set)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// JSON configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Mine finite-list and header hints from a sample dataset
    Mine {
        /// Dataset to mine (default: the configured evaluator dataset)
        #[arg(value_name = "FILE")]
        dataset: Option<PathBuf>,

        /// Honour CSV quoting when splitting rows
        #[arg(long)]
        quoted: bool,

        /// Print snippets as JSON
        #[arg(long)]
        json: bool,
    },

    /// Search domain knowledge
    Search {
        /// Free-text query
        query: String,

        /// Knowledge domain
        #[arg(short, long, default_value = "banking")]
        domain: String,

        /// Number of hits (default: from config)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Dataset mined into the domain (default: the configured evaluator dataset)
        #[arg(long, value_name = "FILE")]
        dataset: Option<PathBuf>,

        /// Print hits as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate validated examples for a semantic type
    Generate(GenerateArgs),

    /// Find the closest existing type in a catalog
    Compare {
        /// Candidate type definition (JSON)
        #[arg(value_name = "CANDIDATE")]
        candidate: PathBuf,

        /// Catalog file (JSON array of definitions)
        #[arg(long, value_name = "FILE")]
        catalog: PathBuf,

        /// Recommendation threshold in [0, 1) (default: from config)
        #[arg(long)]
        threshold: Option<f64>,

        /// Add the candidate to the catalog unless reuse is recommended
        #[arg(long)]
        save: bool,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check a definition and example values against it
    Validate {
        /// Type definition (JSON)
        #[arg(value_name = "DEFINITION")]
        definition: PathBuf,

        /// Value that should match (repeatable)
        #[arg(long = "positive")]
        positives: Vec<String>,

        /// Value that should not match (repeatable)
        #[arg(long = "negative")]
        negatives: Vec<String>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Arguments for `generate`.
#[derive(Args)]
pub struct GenerateArgs {
    /// Semantic type id, e.g. NAME.FIRST
    #[arg(value_name = "SEMANTIC_TYPE")]
    pub name: Option<String>,

    /// Value pattern (or comma-separated header patterns with --improve-headers)
    #[arg(short, long)]
    pub pattern: Option<String>,

    /// Read the whole request from a JSON file instead
    #[arg(long, value_name = "FILE", conflicts_with_all = ["name", "pattern"])]
    pub request: Option<PathBuf>,

    /// What the type represents
    #[arg(short, long)]
    pub description: Option<String>,

    /// Steering text for the model
    #[arg(short, long)]
    pub guidance: Option<String>,

    /// Existing positive example (repeatable)
    #[arg(long = "positive")]
    pub positives: Vec<String>,

    /// Existing negative example (repeatable)
    #[arg(long = "negative")]
    pub negatives: Vec<String>,

    /// Only generate positive examples
    #[arg(long, conflicts_with = "negative_only")]
    pub positive_only: bool,

    /// Only generate negative examples
    #[arg(long)]
    pub negative_only: bool,

    /// Let the model revise the value pattern
    #[arg(long, conflicts_with = "improve_headers")]
    pub improve_pattern: bool,

    /// Generate header examples and let the model revise header patterns
    #[arg(long)]
    pub improve_headers: bool,

    /// Attempt bound (default: from config)
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Knowledge domain used for context
    #[arg(long)]
    pub domain: Option<String>,

    /// LLM provider to use
    #[arg(long, default_value = "anthropic")]
    pub llm: LlmProviderChoice,

    /// Model to use (provider-specific, e.g., "llama3.2")
    #[arg(long)]
    pub model: Option<String>,

    /// Stop starting new attempts after this many seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Print the response as JSON
    #[arg(long)]
    pub json: bool,
}

/// LLM provider choices.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LlmProviderChoice {
    /// Anthropic Claude API (requires ANTHROPIC_API_KEY)
    #[default]
    Anthropic,
    /// Ollama local models (requires Ollama running)
    Ollama,
    /// Mock provider that replays existing examples
    Mock,
}

impl std::str::FromStr for LlmProviderChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "anthropic" | "claude" => Ok(LlmProviderChoice::Anthropic),
            "ollama" | "local" => Ok(LlmProviderChoice::Ollama),
            "mock" | "test" => Ok(LlmProviderChoice::Mock),
            _ => Err(format!(
                "Unknown LLM provider: {}. Valid options: anthropic, ollama, mock",
                s
            )),
        }
    }
}

impl std::fmt::Display for LlmProviderChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmProviderChoice::Anthropic => write!(f, "anthropic"),
            LlmProviderChoice::Ollama => write!(f, "ollama"),
            LlmProviderChoice::Mock => write!(f, "mock"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_provider_aliases() {
        assert_eq!("Claude".parse::<LlmProviderChoice>(), Ok(LlmProviderChoice::Anthropic));
        assert_eq!("local".parse::<LlmProviderChoice>(), Ok(LlmProviderChoice::Ollama));
        assert!("openai".parse::<LlmProviderChoice>().is_err());
    }

    #[test]
    fn test_generate_flags() {
        let cli = Cli::parse_from([
            "typeforge",
            "generate",
            "NAME.FIRST",
            "--pattern",
            "^[A-Z][a-z]+$",
            "--positive",
            "Maria",
            "--positive",
            "Ana",
            "--llm",
            "mock",
        ]);
        match cli.command {
            Commands::Generate(args) => {
                assert_eq!(args.name.as_deref(), Some("NAME.FIRST"));
                assert_eq!(args.positives, vec!["Maria", "Ana"]);
                assert_eq!(args.llm, LlmProviderChoice::Mock);
            }
            _ => panic!("expected generate"),
        }
    }
}
