//! GST (Goods and Services Tax) breakup for Indian invoices

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::*;
use crate::utils::validation::validate_percentage;

/// Tax computed on one taxable amount
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxBreakup {
    /// Amount the tax was computed on
    pub taxable_amount: BigDecimal,
    /// GST rate in percent
    pub rate: BigDecimal,
    /// Central GST (intra-state only)
    pub cgst: BigDecimal,
    /// State GST (intra-state only)
    pub sgst: BigDecimal,
    /// Integrated GST (inter-state only)
    pub igst: BigDecimal,
    /// cgst + sgst + igst
    pub total: BigDecimal,
}

impl TaxBreakup {
    fn zero(taxable_amount: BigDecimal, rate: BigDecimal) -> Self {
        Self {
            taxable_amount,
            rate,
            cgst: BigDecimal::from(0),
            sgst: BigDecimal::from(0),
            igst: BigDecimal::from(0),
            total: BigDecimal::from(0),
        }
    }

    /// Taxable amount plus tax
    pub fn gross_amount(&self) -> BigDecimal {
        &self.taxable_amount + &self.total
    }
}

/// Summed tax for all lines sharing one GST rate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateBucket {
    pub rate: BigDecimal,
    pub taxable_amount: BigDecimal,
    pub cgst: BigDecimal,
    pub sgst: BigDecimal,
    pub igst: BigDecimal,
    pub total: BigDecimal,
    pub line_count: usize,
}

impl RateBucket {
    fn empty(rate: BigDecimal) -> Self {
        Self {
            rate,
            taxable_amount: BigDecimal::from(0),
            cgst: BigDecimal::from(0),
            sgst: BigDecimal::from(0),
            igst: BigDecimal::from(0),
            total: BigDecimal::from(0),
            line_count: 0,
        }
    }
}

/// Standard GST slabs applied to goods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GstCategory {
    /// Exempt items - 0%
    Exempt,
    /// Essential medicines and reduced rate items - 5%
    Reduced,
    /// Most formulations - 12%
    Standard,
    /// Cosmetics, devices and general goods - 18%
    Higher,
    /// Luxury/Sin goods - 28%
    Luxury,
}

impl GstCategory {
    pub const ALL: [GstCategory; 5] = [
        GstCategory::Exempt,
        GstCategory::Reduced,
        GstCategory::Standard,
        GstCategory::Higher,
        GstCategory::Luxury,
    ];

    /// Get the GST rate for this category
    pub fn rate(&self) -> BigDecimal {
        match self {
            GstCategory::Exempt => BigDecimal::from(0),
            GstCategory::Reduced => BigDecimal::from(5),
            GstCategory::Standard => BigDecimal::from(12),
            GstCategory::Higher => BigDecimal::from(18),
            GstCategory::Luxury => BigDecimal::from(28),
        }
    }

    /// Find the slab for a rate, if it is a standard one
    pub fn from_rate(rate: &BigDecimal) -> Option<Self> {
        Self::ALL.into_iter().find(|category| category.rate() == *rate)
    }
}

/// GST calculation engine
#[derive(Debug, Clone, Copy, Default)]
pub struct TaxCalculator;

impl TaxCalculator {
    pub fn new() -> Self {
        Self
    }

    /// Compute the tax on `taxable_amount` at `rate_percent`.
    ///
    /// Intra-state supplies split the tax evenly into CGST and SGST, inter-state
    /// supplies carry it all as IGST. A zero rate or a negative taxable amount
    /// yields an all-zero breakup.
    pub fn compute_tax(
        &self,
        taxable_amount: &BigDecimal,
        rate_percent: &BigDecimal,
        is_intra_state: bool,
    ) -> BillingResult<TaxBreakup> {
        validate_percentage("Tax rate", rate_percent)?;

        if *taxable_amount < BigDecimal::from(0) {
            return Ok(TaxBreakup::zero(taxable_amount.clone(), rate_percent.clone()));
        }

        let total = (taxable_amount * rate_percent) / BigDecimal::from(100);
        Ok(Self::split(taxable_amount.clone(), rate_percent.clone(), total, is_intra_state))
    }

    /// Derive the taxable amount from a tax-inclusive amount (e.g. an MRP)
    pub fn reverse_compute(
        &self,
        inclusive_amount: &BigDecimal,
        rate_percent: &BigDecimal,
        is_intra_state: bool,
    ) -> BillingResult<TaxBreakup> {
        validate_percentage("Tax rate", rate_percent)?;

        if *inclusive_amount < BigDecimal::from(0) {
            return Ok(TaxBreakup::zero(inclusive_amount.clone(), rate_percent.clone()));
        }

        let divisor = BigDecimal::from(100) + rate_percent;
        let taxable_amount = (inclusive_amount * BigDecimal::from(100)) / divisor;
        // Taken as the difference so taxable + tax gives back the inclusive amount exactly
        let total = inclusive_amount - &taxable_amount;

        Ok(Self::split(taxable_amount, rate_percent.clone(), total, is_intra_state))
    }

    /// Group computed lines by tax rate and sum each group.
    ///
    /// The map iterates in ascending rate order. Each bucket's tax is the sum
    /// of its lines' tax amounts, so bucket totals add up to the invoice tax.
    pub fn aggregate_by_rate(
        &self,
        lines: &[ComputedLine],
        is_intra_state: bool,
    ) -> BTreeMap<BigDecimal, RateBucket> {
        let mut buckets: BTreeMap<BigDecimal, RateBucket> = BTreeMap::new();

        for line in lines {
            let rate = line.input.tax_rate.normalized();
            let bucket = buckets
                .entry(rate.clone())
                .or_insert_with(|| RateBucket::empty(rate));
            bucket.taxable_amount += &line.taxable_amount;
            bucket.total += &line.tax_amount;
            bucket.line_count += 1;
        }

        for bucket in buckets.values_mut() {
            let split = Self::split(
                bucket.taxable_amount.clone(),
                bucket.rate.clone(),
                bucket.total.clone(),
                is_intra_state,
            );
            bucket.cgst = split.cgst;
            bucket.sgst = split.sgst;
            bucket.igst = split.igst;
        }

        buckets
    }

    fn split(
        taxable_amount: BigDecimal,
        rate: BigDecimal,
        total: BigDecimal,
        is_intra_state: bool,
    ) -> TaxBreakup {
        if is_intra_state {
            let half = &total / BigDecimal::from(2);
            TaxBreakup {
                taxable_amount,
                rate,
                cgst: half.clone(),
                sgst: half,
                igst: BigDecimal::from(0),
                total,
            }
        } else {
            TaxBreakup {
                taxable_amount,
                rate,
                cgst: BigDecimal::from(0),
                sgst: BigDecimal::from(0),
                igst: total.clone(),
                total,
            }
        }
    }
}
