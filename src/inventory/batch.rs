//! First-to-expire batch selection for invoice lines
//!
//! The allocator is advisory: it proposes how many units to draw from which
//! batch but never touches the batch records. Committing the draw against
//! real stock is the caller's job and must happen atomically there.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::{debug, instrument, warn};

use crate::config::BillingConfig;
use crate::types::*;
use crate::utils::validation::{validate_quantity, validate_unique_ids};

/// Proposed draw-down for one requested quantity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchAllocation {
    /// Units asked for
    pub requested: i64,
    /// Draws in the order they were taken
    pub allocations: Vec<BatchDraw>,
    /// Units no batch could cover; zero when fully satisfied
    pub shortfall: i64,
}

impl BatchAllocation {
    fn empty(requested: i64) -> Self {
        Self {
            requested,
            allocations: Vec::new(),
            shortfall: requested,
        }
    }

    /// Units covered by batches
    pub fn total_drawn(&self) -> i64 {
        self.allocations.iter().map(|draw| draw.quantity).sum()
    }

    pub fn is_satisfied(&self) -> bool {
        self.shortfall == 0
    }

    /// Stock was asked for but nothing could be drawn; the line is sold
    /// without a batch
    pub fn no_batch_selected(&self) -> bool {
        self.requested > 0 && self.allocations.is_empty()
    }
}

/// Selects batches for a line, earliest expiry first
#[derive(Debug, Clone, Default)]
pub struct BatchAllocator {
    skip_expired: bool,
}

impl BatchAllocator {
    /// Create an allocator that considers every batch with stock
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an allocator following the expiry policy in `config`
    pub fn from_config(config: &BillingConfig) -> Self {
        Self {
            skip_expired: config.skip_expired_batches,
        }
    }

    /// Allocate `requested` units across `batches`, earliest expiry first.
    ///
    /// Batches without an expiry date go last. Batches with no stock are
    /// skipped. Any uncovered remainder is reported as shortfall. Two batches
    /// sharing an id are rejected as invalid input.
    #[instrument(skip(self, batches), fields(batch_count = batches.len()))]
    pub fn allocate(&self, requested: i64, batches: &[Batch]) -> BillingResult<BatchAllocation> {
        self.allocate_from(requested, batches.iter().collect())
    }

    /// Like [`allocate`](Self::allocate), but leaves out batches expired on
    /// `today` when the allocator was configured to skip them
    #[instrument(skip(self, batches), fields(batch_count = batches.len()))]
    pub fn allocate_as_of(
        &self,
        requested: i64,
        batches: &[Batch],
        today: NaiveDate,
    ) -> BillingResult<BatchAllocation> {
        let candidates: Vec<&Batch> = batches
            .iter()
            .filter(|batch| !(self.skip_expired && batch.is_expired_on(today)))
            .collect();

        if candidates.len() < batches.len() {
            debug!(
                skipped = batches.len() - candidates.len(),
                "expired batches left out of allocation"
            );
        }

        self.allocate_from(requested, candidates)
    }

    /// Check a user-pinned batch instead of running expiry order.
    ///
    /// Draws what the batch can cover and reports the rest as shortfall.
    #[instrument(skip(self, batch), fields(batch_id = %batch.id))]
    pub fn allocate_pinned(&self, requested: i64, batch: &Batch) -> BillingResult<BatchAllocation> {
        validate_quantity("Requested quantity", requested)?;

        let available = batch.quantity_available.max(0);
        let drawn = requested.min(available);

        let mut allocation = BatchAllocation::empty(requested);
        if drawn > 0 {
            allocation
                .allocations
                .push(BatchDraw::new(batch.id.clone(), drawn));
        }
        allocation.shortfall = requested - drawn;

        self.check_invariants(&allocation, &[batch])?;

        if allocation.shortfall > 0 {
            warn!(
                requested,
                available,
                shortfall = allocation.shortfall,
                "pinned batch cannot cover requested quantity"
            );
        }

        Ok(allocation)
    }

    fn allocate_from(
        &self,
        requested: i64,
        mut candidates: Vec<&Batch>,
    ) -> BillingResult<BatchAllocation> {
        validate_quantity("Requested quantity", requested)?;
        validate_unique_ids(
            "Batch",
            candidates.iter().copied().map(|batch| batch.id.as_str()),
        )?;

        let mut allocation = BatchAllocation::empty(requested);
        if requested == 0 {
            return Ok(allocation);
        }

        // Stable, so batches with equal expiry keep their input order
        candidates.sort_by(|a, b| expiry_order(a.expiry_date, b.expiry_date));

        let mut remaining = requested;
        for batch in &candidates {
            if remaining == 0 {
                break;
            }
            if !batch.has_stock() {
                continue;
            }

            let take = remaining.min(batch.quantity_available);
            allocation
                .allocations
                .push(BatchDraw::new(batch.id.clone(), take));
            remaining -= take;
        }
        allocation.shortfall = remaining;

        self.check_invariants(&allocation, &candidates)?;

        if allocation.no_batch_selected() {
            warn!(requested, "no batch available, line proceeds without batch");
        } else if allocation.shortfall > 0 {
            warn!(
                requested,
                shortfall = allocation.shortfall,
                "batches cannot cover requested quantity"
            );
        } else {
            debug!(
                requested,
                batches_used = allocation.allocations.len(),
                "batch allocation complete"
            );
        }

        Ok(allocation)
    }

    fn check_invariants(
        &self,
        allocation: &BatchAllocation,
        batches: &[&Batch],
    ) -> BillingResult<()> {
        for draw in &allocation.allocations {
            let available = batches
                .iter()
                .find(|batch| batch.id == draw.batch_id)
                .map(|batch| batch.quantity_available)
                .unwrap_or(0);
            if draw.quantity <= 0 || draw.quantity > available {
                return Err(invariant_violation(format!(
                    "Draw of {} from batch {} exceeds available {}",
                    draw.quantity, draw.batch_id, available
                )));
            }
        }

        if allocation.total_drawn() + allocation.shortfall != allocation.requested {
            return Err(invariant_violation(format!(
                "Drawn {} plus shortfall {} does not equal requested {}",
                allocation.total_drawn(),
                allocation.shortfall,
                allocation.requested
            )));
        }

        Ok(())
    }
}

/// Dated batches ascending, undated batches after all of them
fn expiry_order(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn batch(id: &str, expiry: Option<NaiveDate>, qty: i64) -> Batch {
        Batch::new(
            id.to_string(),
            "p1".to_string(),
            format!("LOT-{}", id),
            expiry,
            qty,
            BigDecimal::from(10),
        )
    }

    #[test]
    fn test_earliest_expiry_drawn_first() {
        let batches = vec![
            batch("late", Some(date(2025, 1, 1)), 5),
            batch("early", Some(date(2024, 6, 1)), 3),
        ];

        let allocation = BatchAllocator::new().allocate(4, &batches).unwrap();

        assert_eq!(
            allocation.allocations,
            vec![
                BatchDraw::new("early".to_string(), 3),
                BatchDraw::new("late".to_string(), 1),
            ]
        );
        assert_eq!(allocation.shortfall, 0);
        assert!(allocation.is_satisfied());
    }

    #[test]
    fn test_undated_batches_go_last() {
        let batches = vec![
            batch("undated", None, 10),
            batch("dated", Some(date(2030, 1, 1)), 2),
        ];

        let allocation = BatchAllocator::new().allocate(5, &batches).unwrap();

        assert_eq!(allocation.allocations[0].batch_id, "dated");
        assert_eq!(allocation.allocations[1], BatchDraw::new("undated".to_string(), 3));
    }

    #[test]
    fn test_shortfall_reported() {
        let batches = vec![
            batch("a", Some(date(2025, 1, 1)), 5),
            batch("b", Some(date(2025, 2, 1)), 3),
        ];

        let allocation = BatchAllocator::new().allocate(10, &batches).unwrap();

        assert_eq!(allocation.total_drawn(), 8);
        assert_eq!(allocation.shortfall, 2);
        assert!(!allocation.no_batch_selected());
    }

    #[test]
    fn test_empty_stock_batches_skipped() {
        let batches = vec![
            batch("empty", Some(date(2024, 1, 1)), 0),
            batch("negative", Some(date(2024, 2, 1)), -4),
            batch("stocked", Some(date(2024, 3, 1)), 6),
        ];

        let allocation = BatchAllocator::new().allocate(2, &batches).unwrap();

        assert_eq!(
            allocation.allocations,
            vec![BatchDraw::new("stocked".to_string(), 2)]
        );
    }

    #[test]
    fn test_zero_request_and_no_batches() {
        let allocator = BatchAllocator::new();

        let zero = allocator.allocate(0, &[batch("a", None, 5)]).unwrap();
        assert!(zero.allocations.is_empty());
        assert_eq!(zero.shortfall, 0);
        assert!(!zero.no_batch_selected());

        let none = allocator.allocate(7, &[]).unwrap();
        assert_eq!(none.shortfall, 7);
        assert!(none.no_batch_selected());
    }

    #[test]
    fn test_negative_request_rejected() {
        let result = BatchAllocator::new().allocate(-1, &[]);
        assert!(matches!(result, Err(BillingError::Validation(_))));
    }

    #[test]
    fn test_duplicate_batch_ids_rejected() {
        let batches = vec![
            batch("x", Some(date(2025, 1, 1)), 1),
            batch("x", Some(date(2026, 1, 1)), 5),
        ];

        let result = BatchAllocator::new().allocate(4, &batches);
        assert!(matches!(result, Err(BillingError::Validation(_))));

        let as_of = BatchAllocator::new().allocate_as_of(4, &batches, date(2024, 1, 1));
        assert!(matches!(as_of, Err(BillingError::Validation(_))));
    }

    #[test]
    fn test_pinned_batch() {
        let allocator = BatchAllocator::new();
        let pinned = batch("pinned", Some(date(2026, 1, 1)), 4);

        let within = allocator.allocate_pinned(3, &pinned).unwrap();
        assert_eq!(within.allocations, vec![BatchDraw::new("pinned".to_string(), 3)]);
        assert_eq!(within.shortfall, 0);

        let over = allocator.allocate_pinned(6, &pinned).unwrap();
        assert_eq!(over.total_drawn(), 4);
        assert_eq!(over.shortfall, 2);

        let empty = allocator
            .allocate_pinned(2, &batch("dry", None, 0))
            .unwrap();
        assert!(empty.allocations.is_empty());
        assert_eq!(empty.shortfall, 2);
    }

    #[test]
    fn test_skip_expired_only_when_configured() {
        let batches = vec![
            batch("expired", Some(date(2024, 1, 1)), 5),
            batch("fresh", Some(date(2026, 1, 1)), 5),
        ];
        let today = date(2025, 1, 1);

        let permissive = BatchAllocator::new()
            .allocate_as_of(3, &batches, today)
            .unwrap();
        assert_eq!(permissive.allocations[0].batch_id, "expired");

        let config = BillingConfig {
            skip_expired_batches: true,
            ..BillingConfig::default()
        };
        let strict = BatchAllocator::from_config(&config)
            .allocate_as_of(3, &batches, today)
            .unwrap();
        assert_eq!(strict.allocations, vec![BatchDraw::new("fresh".to_string(), 3)]);
    }
}
