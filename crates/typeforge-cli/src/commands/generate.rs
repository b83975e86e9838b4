//! Generate command - run the validated example loop against a model.

use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use tracing::{debug, warn};
use typeforge::llm::LlmConfig;
use typeforge::{
    AnthropicProvider, CancelToken, ExampleModel, ForgeConfig, GenerationRequest,
    GenerationResponse, MockProvider, OllamaProvider, Outcome, TypeForge,
};

use super::{print_json, read_json, CommandResult};
use crate::cli::{GenerateArgs, LlmProviderChoice};

pub fn run(config: ForgeConfig, args: GenerateArgs) -> CommandResult {
    let request = build_request(&args)?;
    let model = build_model(args.llm, args.model.clone())?;
    let domain = request
        .domain
        .clone()
        .unwrap_or_else(|| config.generator.default_domain.clone());

    let forge = TypeForge::with_config(config).with_shared_model(model);
    let indexed = forge.initialize_domain(&domain);
    debug!("Indexed {} knowledge snippets for '{}'", indexed, domain);

    let mut cancel = CancelToken::new();
    if let Some(secs) = args.timeout_secs {
        cancel = cancel.with_timeout(Duration::from_secs(secs));
    }
    let handle = cancel.clone();
    ctrlc::set_handler(move || {
        warn!("Interrupt received, cancelling after the current attempt");
        handle.cancel();
    })?;

    if !args.json {
        println!(
            "{} {} with {}",
            "Generating".cyan().bold(),
            request.semantic_type_name.white().bold(),
            args.llm
        );
    }

    let response = forge.generate_with_cancel(&request, &cancel)?;

    if args.json {
        return print_json(&response);
    }
    print_response(&response);
    Ok(())
}

fn build_request(args: &GenerateArgs) -> Result<GenerationRequest, Box<dyn std::error::Error>> {
    let mut request = match &args.request {
        Some(path) => read_json::<GenerationRequest>(path)?,
        None => {
            let name = args
                .name
                .clone()
                .ok_or("a semantic type name is required (or use --request)")?;
            let pattern = args
                .pattern
                .clone()
                .ok_or("--pattern is required (or use --request)")?;
            GenerationRequest::new(name, pattern)
        }
    };

    if args.description.is_some() {
        request.description = args.description.clone();
    }
    if args.guidance.is_some() {
        request.user_description = args.guidance.clone();
    }
    if !args.positives.is_empty() {
        request.existing_positive_examples = args.positives.clone();
    }
    if !args.negatives.is_empty() {
        request.existing_negative_examples = args.negatives.clone();
    }
    request.generate_positive_only |= args.positive_only;
    request.generate_negative_only |= args.negative_only;
    request.pattern_improvement |= args.improve_pattern;
    request.header_pattern_improvement |= args.improve_headers;
    if args.max_retries.is_some() {
        request.max_retries = args.max_retries;
    }
    if args.domain.is_some() {
        request.domain = args.domain.clone();
    }
    Ok(request)
}

fn build_model(
    choice: LlmProviderChoice,
    model: Option<String>,
) -> Result<Arc<dyn ExampleModel>, Box<dyn std::error::Error>> {
    let mut config = LlmConfig::default();
    let provider: Arc<dyn ExampleModel> = match choice {
        LlmProviderChoice::Anthropic => {
            let key = std::env::var("ANTHROPIC_API_KEY")
                .map_err(|_| "ANTHROPIC_API_KEY environment variable not set")?;
            if let Some(m) = model {
                config.model = m;
            }
            Arc::new(AnthropicProvider::with_config(key, config)?)
        }
        LlmProviderChoice::Ollama => match model {
            Some(m) => Arc::new(OllamaProvider::with_model(m)?),
            None => Arc::new(OllamaProvider::new()?),
        },
        LlmProviderChoice::Mock => Arc::new(MockProvider::new()),
    };
    Ok(provider)
}

fn print_response(response: &GenerationResponse) {
    let status = match response.outcome {
        Outcome::Validated => "validated".green().bold(),
        Outcome::Exhausted => "incomplete".yellow().bold(),
        Outcome::Cancelled => "cancelled".red().bold(),
    };
    println!(
        "Result: {} after {} attempt(s)",
        status, response.attempts_used
    );
    println!("Pattern: {}", response.final_pattern);
    if let Some(pattern) = &response.updated_regex_pattern {
        println!("{} {}", "Revised pattern:".cyan(), pattern);
    }
    if !response.updated_header_patterns.is_empty() {
        println!(
            "{} {}",
            "Revised header patterns:".cyan(),
            response.updated_header_patterns.join(", ")
        );
    }

    println!();
    println!("{}", "Positive examples:".green().bold());
    for example in &response.positive_examples {
        println!("  + {}", example);
    }
    println!("{}", "Negative examples:".red().bold());
    for example in &response.negative_examples {
        println!("  - {}", example);
    }

    let s = &response.validation_summary;
    println!();
    println!(
        "Positive: {} generated, {} validated, {} failed",
        s.total_positive_generated, s.positive_examples_validated, s.positive_examples_failed
    );
    println!(
        "Negative: {} generated, {} validated, {} failed",
        s.total_negative_generated, s.negative_examples_validated, s.negative_examples_failed
    );
    if let Some(rationale) = &response.rationale {
        println!("{} {}", "Rationale:".dimmed(), rationale);
    }
    if let Some(error) = &response.error {
        println!("{} {}", "Note:".yellow(), error);
    }
}
