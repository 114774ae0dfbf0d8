//! Validation utilities

use bigdecimal::BigDecimal;
use std::collections::HashSet;

use crate::tax::gst::GstCategory;
use crate::traits::*;
use crate::types::*;

/// Validate that a percentage lies within `0..=100`
pub fn validate_percentage(field: &str, value: &BigDecimal) -> BillingResult<()> {
    if *value < BigDecimal::from(0) || *value > BigDecimal::from(100) {
        Err(BillingError::Validation(format!(
            "{} must be between 0 and 100, got {}",
            field, value
        )))
    } else {
        Ok(())
    }
}

/// Validate that an amount is not negative
pub fn validate_non_negative_amount(field: &str, amount: &BigDecimal) -> BillingResult<()> {
    if *amount < BigDecimal::from(0) {
        Err(BillingError::Validation(format!(
            "{} cannot be negative, got {}",
            field, amount
        )))
    } else {
        Ok(())
    }
}

/// Validate that a quantity is not negative
pub fn validate_quantity(field: &str, quantity: i64) -> BillingResult<()> {
    if quantity < 0 {
        Err(BillingError::Validation(format!(
            "{} cannot be negative, got {}",
            field, quantity
        )))
    } else {
        Ok(())
    }
}

/// Validate that a record identifier is usable
pub fn validate_identifier(kind: &str, id: &str) -> BillingResult<()> {
    if id.trim().is_empty() {
        return Err(BillingError::Validation(format!("{} cannot be empty", kind)));
    }

    if id.len() > 50 {
        return Err(BillingError::Validation(format!(
            "{} cannot exceed 50 characters",
            kind
        )));
    }

    Ok(())
}

/// Validate that no identifier appears twice in a list of records
pub fn validate_unique_ids<'a>(
    kind: &str,
    ids: impl IntoIterator<Item = &'a str>,
) -> BillingResult<()> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(BillingError::Validation(format!(
                "{} {} appears more than once",
                kind, id
            )));
        }
    }

    Ok(())
}

/// Validate a GSTIN against the registering state.
///
/// Only the shape is checked (length, state prefix, alphanumeric), not the checksum.
pub fn validate_gstin(gstin: &str, state_code: &str) -> BillingResult<()> {
    if gstin.len() != 15 {
        return Err(BillingError::Validation(format!(
            "GSTIN must be 15 characters, got {}",
            gstin.len()
        )));
    }

    if !gstin.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(BillingError::Validation(
            "GSTIN can only contain letters and digits".to_string(),
        ));
    }

    if &gstin[..2] != state_code.trim() {
        return Err(BillingError::Validation(format!(
            "GSTIN {} does not belong to state code {}",
            gstin, state_code
        )));
    }

    Ok(())
}

/// Line validator that also requires a product, a billed quantity and a standard GST slab
pub struct StrictLineItemValidator;

impl LineItemValidator for StrictLineItemValidator {
    fn validate_line(&self, input: &LineItemInput) -> BillingResult<()> {
        // Basic validation
        DefaultLineItemValidator.validate_line(input)?;

        validate_identifier("Product ID", &input.product_id)?;

        if input.quantity == 0 {
            return Err(BillingError::Validation(
                "Billed quantity must be at least 1".to_string(),
            ));
        }

        if GstCategory::from_rate(&input.tax_rate).is_none() {
            return Err(BillingError::Validation(format!(
                "Tax rate {}% is not a standard GST slab",
                input.tax_rate
            )));
        }

        Ok(())
    }
}
