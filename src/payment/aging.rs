//! Receivables aging for the party ledger

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::types::*;

/// Fixed overdue day ranges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AgingBand {
    /// Not yet overdue
    Current,
    Days1To30,
    Days31To60,
    Days61To90,
    Over90,
}

impl AgingBand {
    /// Every band in reporting order
    pub const ALL: [AgingBand; 5] = [
        AgingBand::Current,
        AgingBand::Days1To30,
        AgingBand::Days31To60,
        AgingBand::Days61To90,
        AgingBand::Over90,
    ];

    /// Band for a number of days past due
    pub fn for_days(days_overdue: i64) -> Self {
        match days_overdue {
            i64::MIN..=0 => AgingBand::Current,
            1..=30 => AgingBand::Days1To30,
            31..=60 => AgingBand::Days31To60,
            61..=90 => AgingBand::Days61To90,
            _ => AgingBand::Over90,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AgingBand::Current => "current",
            AgingBand::Days1To30 => "1-30",
            AgingBand::Days31To60 => "31-60",
            AgingBand::Days61To90 => "61-90",
            AgingBand::Over90 => "over90",
        }
    }
}

/// Pending dues falling into one band
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgingBucket {
    pub band: AgingBand,
    pub label: String,
    pub amount: BigDecimal,
    pub count: usize,
}

impl AgingBucket {
    fn empty(band: AgingBand) -> Self {
        Self {
            band,
            label: band.label().to_string(),
            amount: BigDecimal::from(0),
            count: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AgingAnalyzer;

impl AgingAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Bucket pending amounts by days overdue as of `reference`.
    ///
    /// Always returns the five bands in order, zero-filled when empty.
    /// Invoices whose pending amount is negative or above their total are
    /// left out and logged.
    #[instrument(skip(self, invoices), fields(invoice_count = invoices.len()))]
    pub fn bucketize(
        &self,
        invoices: &[OutstandingInvoice],
        reference: NaiveDate,
    ) -> Vec<AgingBucket> {
        let mut buckets: Vec<AgingBucket> =
            AgingBand::ALL.iter().map(|band| AgingBucket::empty(*band)).collect();

        for invoice in invoices {
            if let Err(e) = invoice.validate() {
                warn!(invoice_id = %invoice.id, error = %e, "invoice left out of aging");
                continue;
            }
            let band = AgingBand::for_days(invoice.days_overdue(reference));
            // ALL is in declaration order, so the discriminant is the index
            let bucket = &mut buckets[band as usize];
            bucket.amount += &invoice.pending_amount;
            bucket.count += 1;
        }

        debug!(
            overdue = buckets[1..].iter().map(|bucket| bucket.count).sum::<usize>(),
            "aging buckets computed"
        );

        buckets
    }

    /// Sum of pending amounts across `invoices`, skipping the same malformed
    /// invoices as [`bucketize`](Self::bucketize)
    pub fn total_outstanding(&self, invoices: &[OutstandingInvoice]) -> BigDecimal {
        invoices
            .iter()
            .filter(|invoice| invoice.validate().is_ok())
            .map(|invoice| &invoice.pending_amount)
            .sum()
    }
}
