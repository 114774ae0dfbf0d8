//! Inventory batch selection

pub mod batch;

pub use batch::*;
