pub mod staging;

pub use staging::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No file was provided")]
    MissingFile,

    #[error("Uploaded file is empty")]
    EmptyFile,

    #[error("File too large: {size} bytes exceeds {max} byte limit")]
    FileTooLarge { size: usize, max: usize },
}
