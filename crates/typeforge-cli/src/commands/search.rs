//! Search command - query a knowledge domain.

use std::path::PathBuf;

use colored::Colorize;
use typeforge::{ForgeConfig, TypeForge};

use super::{print_json, use_dataset, CommandResult};

pub fn run(
    mut config: ForgeConfig,
    query: &str,
    domain: &str,
    top_k: Option<usize>,
    dataset: Option<PathBuf>,
    json: bool,
) -> CommandResult {
    use_dataset(&mut config, dataset)?;
    let top_k = top_k.unwrap_or(config.cache.default_top_k);

    let forge = TypeForge::with_config(config);
    let indexed = forge.initialize_domain(domain);
    let hits = forge.knowledge().retrieve(domain, query, top_k);

    if json {
        return print_json(&hits);
    }

    println!(
        "{} '{}' in {} ({} documents)",
        "Searching".cyan().bold(),
        query,
        domain.white().bold(),
        indexed
    );
    if hits.is_empty() {
        println!("{}", "No matches".yellow());
        return Ok(());
    }
    for (rank, hit) in hits.iter().enumerate() {
        let source = hit
            .metadata
            .get("source")
            .and_then(|v| v.as_str())
            .unwrap_or("-");
        println!(
            "{:>3}. {:.3} [{}] {}",
            rank + 1,
            hit.score,
            source.dimmed(),
            hit.text
        );
    }
    Ok(())
}
