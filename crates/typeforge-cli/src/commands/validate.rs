//! Validate command - check a definition and examples against it.

use std::path::PathBuf;

use colored::Colorize;
use typeforge::types::ExampleVerdict;
use typeforge::{CustomSemanticType, ForgeConfig, TypeForge};

use super::{print_json, read_json, CommandResult};

pub fn run(
    config: ForgeConfig,
    definition: PathBuf,
    positives: Vec<String>,
    negatives: Vec<String>,
    json: bool,
) -> CommandResult {
    let definition: CustomSemanticType = read_json(&definition)?;
    definition.validate()?;

    let forge = TypeForge::with_config(config);
    let report = forge.validate_examples(&definition, &positives, &negatives);

    if json {
        print_json(&report)?;
    } else {
        println!(
            "{} {} ({})",
            "Definition".cyan().bold(),
            definition.semantic_type.white().bold(),
            definition.plugin_type()
        );
        if let Some(error) = &report.error {
            println!("  {}", error.yellow());
        }
        print_verdicts("Positive", &report.positive);
        print_verdicts("Negative", &report.negative);
    }

    if report.valid {
        Ok(())
    } else {
        let failed = report
            .positive
            .iter()
            .chain(&report.negative)
            .filter(|v| !v.accepted)
            .count();
        Err(match report.error {
            Some(error) => error.into(),
            None => format!("{} example(s) failed validation", failed).into(),
        })
    }
}

fn print_verdicts(label: &str, verdicts: &[ExampleVerdict]) {
    if verdicts.is_empty() {
        return;
    }
    println!("{}:", label);
    for v in verdicts {
        let mark = if v.accepted { "ok".green() } else { "FAIL".red() };
        println!("  [{}] {:20} {}", mark, v.example, v.reason);
    }
}
