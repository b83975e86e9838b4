//! CLI command implementations.

pub mod compare;
pub mod generate;
pub mod mine;
pub mod search;
pub mod validate;

use std::error::Error;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use typeforge::ForgeConfig;

pub type CommandResult = Result<(), Box<dyn Error>>;

/// Load the configuration file, or defaults when none is given.
pub fn load_config(path: Option<&Path>) -> Result<ForgeConfig, Box<dyn Error>> {
    match path {
        Some(path) => Ok(ForgeConfig::from_json_file(path)?),
        None => Ok(ForgeConfig::default()),
    }
}

/// Point the miner at a single dataset file.
pub fn use_dataset(config: &mut ForgeConfig, dataset: Option<PathBuf>) -> CommandResult {
    if let Some(dataset) = dataset {
        if !dataset.exists() {
            return Err(format!("File not found: {}", dataset.display()).into());
        }
        config.miner.fallback_path = dataset.clone();
        config.miner.dataset_path = dataset;
    }
    Ok(())
}

/// Read a JSON document from `path`.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, Box<dyn Error>> {
    if !path.exists() {
        return Err(format!("File not found: {}", path.display()).into());
    }
    let file = File::open(path)?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| format!("Failed to parse '{}': {}", path.display(), e).into())
}

pub fn print_json<T: serde::Serialize>(value: &T) -> CommandResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
