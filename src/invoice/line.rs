//! Per-line figures: amount, discount, taxable value, tax and net

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::inventory::{BatchAllocation, BatchAllocator};
use crate::traits::*;
use crate::types::*;
use crate::utils::validation::validate_unique_ids;

/// Computes invoice lines. Pure: the same input always yields the same line.
pub struct LineItemCalculator {
    validator: Box<dyn LineItemValidator>,
}

impl Default for LineItemCalculator {
    fn default() -> Self {
        Self::new()
    }
}

impl LineItemCalculator {
    /// Create a calculator with the default validation rules
    pub fn new() -> Self {
        Self {
            validator: Box::new(DefaultLineItemValidator),
        }
    }

    /// Create a calculator with custom validation rules
    pub fn with_validator(validator: Box<dyn LineItemValidator>) -> Self {
        Self { validator }
    }

    /// Compute the money figures of one line.
    ///
    /// Free quantity is not billed, only `quantity` is multiplied by the rate.
    pub fn compute_line(&self, input: &LineItemInput) -> BillingResult<ComputedLine> {
        self.validator.validate_line(input)?;

        let amount = BigDecimal::from(input.quantity) * &input.rate;
        let discount_amount = (&amount * &input.discount_percent) / BigDecimal::from(100);
        let taxable_amount = &amount - &discount_amount;
        let tax_amount = (&taxable_amount * &input.tax_rate) / BigDecimal::from(100);
        let net_amount = &taxable_amount + &tax_amount;

        Ok(ComputedLine {
            input: input.clone(),
            amount,
            discount_amount,
            taxable_amount,
            tax_amount,
            net_amount,
            batches: Vec::new(),
            shortfall: 0,
        })
    }

    /// Compute every line independently; an invalid line is reported in its
    /// own slot and does not stop the others
    pub fn compute_lines(&self, inputs: &[LineItemInput]) -> Vec<BillingResult<ComputedLine>> {
        inputs
            .iter()
            .enumerate()
            .map(|(index, input)| {
                self.compute_line(input).inspect_err(|e| {
                    warn!(line = index, product_id = %input.product_id, error = %e, "line rejected");
                })
            })
            .collect()
    }

    /// Compute a line and propose the batches it is drawn from.
    ///
    /// A pinned `batch_id` is checked on its own; otherwise the product's
    /// batches are consumed earliest expiry first. Batches of other products
    /// in `batches` are ignored. When `today` is given the allocator's expiry
    /// policy is applied.
    pub fn compute_line_with_batches(
        &self,
        input: &LineItemInput,
        batches: &[Batch],
        allocator: &BatchAllocator,
        today: Option<NaiveDate>,
    ) -> BillingResult<ComputedLine> {
        let mut line = self.compute_line(input)?;
        let requested = input.batch_quantity()?;

        let product_batches: Vec<Batch> = batches
            .iter()
            .filter(|batch| batch.product_id == input.product_id)
            .cloned()
            .collect();
        validate_unique_ids("Batch", product_batches.iter().map(|batch| batch.id.as_str()))?;

        let allocation: BatchAllocation = match &input.batch_id {
            Some(batch_id) => {
                let pinned = product_batches
                    .iter()
                    .find(|batch| &batch.id == batch_id)
                    .ok_or_else(|| BillingError::UnknownBatch(batch_id.clone()))?;
                allocator.allocate_pinned(requested, pinned)?
            }
            None => match today {
                Some(today) => allocator.allocate_as_of(requested, &product_batches, today)?,
                None => allocator.allocate(requested, &product_batches)?,
            },
        };

        debug!(
            product_id = %input.product_id,
            drawn = allocation.total_drawn(),
            shortfall = allocation.shortfall,
            "line batches resolved"
        );

        line.batches = allocation.allocations;
        line.shortfall = allocation.shortfall;
        Ok(line)
    }
}
