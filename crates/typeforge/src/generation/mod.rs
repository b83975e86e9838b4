//! Validated example generation.
//!
//! Each attempt retrieves context, asks the model for a batch, and validates
//! every candidate against the current pattern. Validated examples accumulate
//! across attempts until the requested targets are met or the attempt bound
//! runs out. Exhaustion and cancellation after the first attempt are reported
//! in the response, not as errors.

mod cancel;
mod generator;
mod request;

pub use cancel::CancelToken;
pub use generator::{ExampleGenerator, GenerationState, GeneratorConfig};
pub use request::{
    split_header_patterns, DiscardedExample, GenerationMode, GenerationRequest,
    GenerationResponse, Outcome, ValidationSummary,
};
