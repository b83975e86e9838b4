//! Mine command - extract knowledge snippets from a sample dataset.

use std::path::PathBuf;

use colored::Colorize;
use typeforge::knowledge::ColumnSplit;
use typeforge::{DatasetMiner, ForgeConfig};

use super::{print_json, use_dataset, CommandResult};

pub fn run(
    mut config: ForgeConfig,
    dataset: Option<PathBuf>,
    quoted: bool,
    json: bool,
) -> CommandResult {
    use_dataset(&mut config, dataset)?;
    if quoted {
        config.miner.split = ColumnSplit::Quoted;
    }

    let miner = DatasetMiner::new(config.miner.clone());
    let snippets = miner.mine_knowledge_snippets();

    if json {
        return print_json(&snippets);
    }

    println!(
        "{} {}",
        "Mining".cyan().bold(),
        config.miner.dataset_path.display().to_string().white()
    );
    if snippets.is_empty() {
        println!("{}", "No snippets mined (dataset missing or empty)".yellow());
        return Ok(());
    }
    for snippet in &snippets {
        println!("  {}", snippet);
    }
    println!();
    println!("Mined {} snippets", snippets.len().to_string().white().bold());
    Ok(())
}
