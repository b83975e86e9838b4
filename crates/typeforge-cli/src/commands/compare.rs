//! Compare command - check a candidate type against an existing catalog.

use std::path::PathBuf;

use colored::Colorize;
use typeforge::{CatalogStore, CustomSemanticType, ForgeConfig, InMemoryCatalog, TypeForge};

use super::{print_json, read_json, CommandResult};

pub fn run(
    mut config: ForgeConfig,
    candidate: PathBuf,
    catalog_path: PathBuf,
    threshold: Option<f64>,
    save: bool,
    json: bool,
) -> CommandResult {
    if let Some(t) = threshold {
        config.comparator.recommend_threshold = t;
        config.comparator.validate()?;
    }

    let candidate: CustomSemanticType = read_json(&candidate)?;
    candidate.validate()?;

    let catalog = if catalog_path.exists() {
        InMemoryCatalog::from_json_file(&catalog_path)?
    } else if save {
        InMemoryCatalog::new()
    } else {
        return Err(format!("File not found: {}", catalog_path.display()).into());
    };

    let forge = TypeForge::with_config(config);
    let result = forge.compare(&candidate, &catalog);
    let reuse = result.as_ref().is_some_and(|r| r.recommend_use_existing);

    if json {
        print_json(&result)?;
    } else {
        match &result {
            None => println!("{}", "Catalog is empty; nothing to compare against".yellow()),
            Some(r) => {
                let verdict = if r.recommend_use_existing {
                    "reuse existing".yellow().bold()
                } else {
                    "create new".green().bold()
                };
                println!(
                    "Closest: {} ({:.1}%) -> {}",
                    r.existing_type.white().bold(),
                    r.score * 100.0,
                    verdict
                );
                println!("{}", r.reason);
                for s in &r.similarities {
                    println!("  {} {}", "=".green(), s);
                }
                for d in &r.differences {
                    println!("  {} {}: {}", "≠".red(), d.aspect, d.description);
                }
            }
        }
    }

    if save && !reuse {
        let id = candidate.semantic_type.clone();
        catalog.put(candidate)?;
        catalog.save_json_file(&catalog_path)?;
        if !json {
            println!("Saved {} to {}", id, catalog_path.display());
        }
    }
    Ok(())
}
