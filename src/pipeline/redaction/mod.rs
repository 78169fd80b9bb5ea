//! Personal-data detection and redaction for bill text.
//!
//! Exactly three pattern classes are recognized: email addresses, phone
//! numbers and long account numbers.

pub mod scanner;

pub use scanner::*;
