pub mod bill;
pub mod enums;
pub mod report;

pub use bill::*;
pub use report::*;
