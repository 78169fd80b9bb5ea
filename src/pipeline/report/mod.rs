pub mod renderer;
pub mod store;

pub use renderer::*;
pub use store::*;

use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("PDF rendering failed: {0}")]
    Render(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No report has been generated for bill {0}")]
    NotGenerated(Uuid),
}
