//! # Pharma Billing Core
//!
//! The computation core behind sales entry, returns, payment entry and the
//! party ledger of a pharmaceutical distribution business.
//!
//! ## Features
//!
//! - **Batch allocation**: first-to-expire batch selection with shortfall reporting
//! - **Line items**: amount, discount, taxable value, GST and net per line
//! - **Invoice totals**: CGST/SGST/IGST breakup per rate, transport charges and round-off
//! - **Payment allocation**: oldest-due-first or validated manual allocation
//! - **Aging**: fixed day-range buckets of pending dues
//!
//! Everything here is a pure function of its inputs. Nothing is fetched or
//! persisted; allocations are proposals the caller commits atomically.
//!
//! ## Quick Start
//!
//! ```rust
//! use pharma_billing_core::{InvoiceAggregator, LineItemCalculator, LineItemInput};
//! use bigdecimal::BigDecimal;
//!
//! let line = LineItemCalculator::new()
//!     .compute_line(&LineItemInput::new(
//!         "paracetamol-500".to_string(),
//!         10,
//!         BigDecimal::from(25),
//!         BigDecimal::from(12),
//!     ))
//!     .unwrap();
//!
//! let totals = InvoiceAggregator::default()
//!     .aggregate(&[line], &BigDecimal::from(0), true)
//!     .unwrap();
//! assert_eq!(totals.final_amount, BigDecimal::from(280));
//! ```

pub mod config;
pub mod inventory;
pub mod invoice;
pub mod payment;
pub mod tax;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use config::*;
pub use inventory::*;
pub use invoice::*;
pub use payment::*;
pub use tax::gst::*;
pub use traits::*;
pub use types::*;
