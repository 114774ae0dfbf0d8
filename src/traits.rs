//! Traits for pluggable validation rules

use crate::types::*;
use crate::utils::validation::{validate_non_negative_amount, validate_percentage, validate_quantity};

/// Trait for implementing custom line item validation rules
///
/// The line calculator runs the validator before computing any figure, so a
/// rejected line never produces partial results.
pub trait LineItemValidator: Send + Sync {
    /// Validate a line before computing it
    fn validate_line(&self, input: &LineItemInput) -> BillingResult<()>;
}

/// Default line validator: non-negative quantities and rate, percentages within 0-100
pub struct DefaultLineItemValidator;

impl LineItemValidator for DefaultLineItemValidator {
    fn validate_line(&self, input: &LineItemInput) -> BillingResult<()> {
        validate_quantity("Quantity", input.quantity)?;
        validate_quantity("Free quantity", input.free_quantity)?;
        validate_non_negative_amount("Rate", &input.rate)?;
        validate_percentage("Discount percent", &input.discount_percent)?;
        validate_percentage("Tax rate", &input.tax_rate)?;

        Ok(())
    }
}
