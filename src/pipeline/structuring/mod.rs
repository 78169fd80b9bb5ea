pub mod types;
pub mod prompt;
pub mod parser;
pub mod gemini;
pub mod orchestrator;

pub use types::*;
pub use prompt::*;
pub use parser::*;
pub use gemini::*;
pub use orchestrator::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StructuringError {
    #[error("Generative model endpoint unreachable at {0}")]
    ModelConnection(String),

    #[error("Generative model returned error (status {status}): {body}")]
    ModelError { status: u16, body: String },

    #[error("GEMINI_API_KEY is not configured")]
    MissingApiKey,

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("Malformed report response: {0}")]
    MalformedResponse(String),

    #[error("JSON parsing error: {0}")]
    JsonParsing(String),
}
