//! Legal text to SHACL through a completion service.
//!
//! - [`CompletionService`]: the single `complete(system, user, temperature)`
//!   boundary. HTTP backends live in [`backends`] (OpenAI Responses API,
//!   Anthropic Messages API, Ollama chat), selected by [`LlmConfig`].
//!   [`ScriptedCompletion`] replays canned responses for tests and dry runs.
//! - [`prompt`]: system prompts and request composition.
//! - [`turtle`]: candidate extraction from free text and minimal syntax
//!   normalization.
//! - [`harvest`]: new field definitions implied by a generated shape.
//! - [`ShapeGenerator`]: the orchestrator (generate, improve, repair, rules).

pub mod backends;
pub mod completion;
pub mod generator;
pub mod harvest;
pub mod prompt;
pub mod turtle;

pub use backends::{connect, LlmBackend, LlmConfig};
pub use completion::{CompletionService, RecordedPrompt, ScriptedCompletion};
pub use generator::{GeneratedShape, GeneratorOptions, ShapeGenerator};
pub use harvest::harvest_fields;
pub use prompt::{truncate_legal_text, DEFAULT_MAX_LEGAL_TEXT_CHARS};
pub use turtle::{extract_turtle_block, normalize_turtle};

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("completion backend misconfigured: {0}")]
    Config(String),
    #[error("failed to reach {backend} at {url}: {message}")]
    Network {
        backend: &'static str,
        url: String,
        message: String,
    },
    #[error("{backend} http error {status}: {body}")]
    Api {
        backend: &'static str,
        status: u16,
        body: String,
    },
    #[error("{backend} returned an unusable response: {message}")]
    InvalidResponse {
        backend: &'static str,
        message: String,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error(transparent)]
    Completion(#[from] LlmError),
    /// The candidate still failed to parse after every repair round.
    #[error("generated Turtle is invalid after {attempts} repair attempt(s): {message}")]
    InvalidTurtle {
        text: String,
        message: String,
        attempts: usize,
    },
    #[error("failed to register generated fields: {0}")]
    Registry(#[from] lexshape_fields::FieldError),
}
