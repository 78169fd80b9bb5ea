//! API endpoint handlers.

pub mod bills;
pub mod health;
