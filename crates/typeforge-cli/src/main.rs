//! TypeForge CLI - LLM-assisted semantic type generation.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = commands::load_config(cli.config.as_deref()).and_then(|config| {
        match cli.command {
            Commands::Mine {
                dataset,
                quoted,
                json,
            } => commands::mine::run(config, dataset, quoted, json),

            Commands::Search {
                query,
                domain,
                top_k,
                dataset,
                json,
            } => commands::search::run(config, &query, &domain, top_k, dataset, json),

            Commands::Generate(args) => commands::generate::run(config, args),

            Commands::Compare {
                candidate,
                catalog,
                threshold,
                save,
                json,
            } => commands::compare::run(config, candidate, catalog, threshold, save, json),

            Commands::Validate {
                definition,
                positives,
                negatives,
                json,
            } => commands::validate::run(config, definition, positives, negatives, json),
        }
    });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
