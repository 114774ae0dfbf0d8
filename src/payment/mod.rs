//! Payment allocation and receivables aging

pub mod aging;
pub mod allocation;

pub use aging::*;
pub use allocation::*;
