//! Invoice line computation and invoice totals

pub mod aggregate;
pub mod line;

pub use aggregate::*;
pub use line::*;
