pub mod redaction;
pub mod import;
pub mod extraction;
pub mod structuring;
pub mod report;
pub mod processor;
