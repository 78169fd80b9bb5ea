//! Repository layer: entity-scoped database operations.

mod bill;

pub use bill::*;
