//! Invoice level totals, GST breakup and round-off

use bigdecimal::{BigDecimal, RoundingMode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

use crate::config::BillingConfig;
use crate::tax::gst::{RateBucket, TaxCalculator};
use crate::types::*;
use crate::utils::validation::validate_non_negative_amount;

/// Totals of a complete invoice (sale or credit note)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceTotals {
    /// Sum of line amounts before discount
    pub gross_amount: BigDecimal,
    pub discount_total: BigDecimal,
    pub taxable_amount: BigDecimal,
    pub tax_total: BigDecimal,
    pub cgst_amount: BigDecimal,
    pub sgst_amount: BigDecimal,
    pub igst_amount: BigDecimal,
    pub transport_charges: BigDecimal,
    /// taxable + tax + transport, before round-off
    pub net_amount: BigDecimal,
    /// final_amount - net_amount
    pub round_off: BigDecimal,
    pub final_amount: BigDecimal,
    /// Tax per GST rate, ascending by rate
    pub tax_breakup: BTreeMap<BigDecimal, RateBucket>,
    pub is_intra_state: bool,
    pub line_count: usize,
}

/// Sums computed lines into invoice totals
#[derive(Debug, Clone, Default)]
pub struct InvoiceAggregator {
    config: BillingConfig,
    tax_calculator: TaxCalculator,
}

impl InvoiceAggregator {
    /// Create an aggregator for the given seller and settings
    pub fn new(config: BillingConfig) -> Self {
        Self {
            config,
            tax_calculator: TaxCalculator::new(),
        }
    }

    pub fn config(&self) -> &BillingConfig {
        &self.config
    }

    /// Aggregate `lines` into invoice totals.
    ///
    /// An empty line set gives all-zero totals (plus any transport charges).
    #[instrument(skip(self, lines), fields(line_count = lines.len()))]
    pub fn aggregate(
        &self,
        lines: &[ComputedLine],
        transport_charges: &BigDecimal,
        is_intra_state: bool,
    ) -> BillingResult<InvoiceTotals> {
        validate_non_negative_amount("Transport charges", transport_charges)?;

        let gross_amount: BigDecimal = lines.iter().map(|line| &line.amount).sum();
        let discount_total: BigDecimal = lines.iter().map(|line| &line.discount_amount).sum();
        let taxable_amount: BigDecimal = lines.iter().map(|line| &line.taxable_amount).sum();
        let tax_total: BigDecimal = lines.iter().map(|line| &line.tax_amount).sum();

        let tax_breakup = self.tax_calculator.aggregate_by_rate(lines, is_intra_state);
        let cgst_amount: BigDecimal = tax_breakup.values().map(|bucket| &bucket.cgst).sum();
        let sgst_amount: BigDecimal = tax_breakup.values().map(|bucket| &bucket.sgst).sum();
        let igst_amount: BigDecimal = tax_breakup.values().map(|bucket| &bucket.igst).sum();

        let net_amount = &taxable_amount + &tax_total + transport_charges;
        let round_off = if self.config.round_off {
            round_to_rupee(&net_amount) - &net_amount
        } else {
            BigDecimal::from(0)
        };
        let final_amount = &net_amount + &round_off;

        let totals = InvoiceTotals {
            gross_amount,
            discount_total,
            taxable_amount,
            tax_total,
            cgst_amount,
            sgst_amount,
            igst_amount,
            transport_charges: transport_charges.clone(),
            net_amount,
            round_off,
            final_amount,
            tax_breakup,
            is_intra_state,
            line_count: lines.len(),
        };
        self.check_invariants(&totals)?;

        debug!(
            net_amount = %totals.net_amount,
            round_off = %totals.round_off,
            final_amount = %totals.final_amount,
            "invoice aggregated"
        );

        Ok(totals)
    }

    /// Aggregate, deciding intra/inter-state from the customer's state and
    /// the configured seller state
    pub fn aggregate_for_customer(
        &self,
        lines: &[ComputedLine],
        transport_charges: &BigDecimal,
        customer_state: &str,
    ) -> BillingResult<InvoiceTotals> {
        let is_intra_state = self.config.seller.is_intra_state(customer_state);
        self.aggregate(lines, transport_charges, is_intra_state)
    }

    fn check_invariants(&self, totals: &InvoiceTotals) -> BillingResult<()> {
        let split_total = &totals.cgst_amount + &totals.sgst_amount + &totals.igst_amount;
        if split_total != totals.tax_total {
            return Err(invariant_violation(format!(
                "CGST + SGST + IGST = {} but tax total is {}",
                split_total, totals.tax_total
            )));
        }

        if totals.is_intra_state && totals.cgst_amount != totals.sgst_amount {
            return Err(invariant_violation(format!(
                "Intra-state CGST {} differs from SGST {}",
                totals.cgst_amount, totals.sgst_amount
            )));
        }

        if self.config.round_off && totals.final_amount != round_to_rupee(&totals.final_amount) {
            return Err(invariant_violation(format!(
                "Final amount {} is not a whole rupee value",
                totals.final_amount
            )));
        }

        Ok(())
    }
}

/// Round to whole rupees, halves away from zero
pub fn round_to_rupee(amount: &BigDecimal) -> BigDecimal {
    amount.with_scale_round(0, RoundingMode::HalfUp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SellerProfile;
    use crate::invoice::line::LineItemCalculator;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn computed(qty: i64, rate: &str, discount: &str, tax: &str) -> ComputedLine {
        let input = LineItemInput::new("p".to_string(), qty, dec(rate), dec(tax))
            .with_discount(dec(discount));
        LineItemCalculator::new().compute_line(&input).unwrap()
    }

    #[test]
    fn test_round_to_rupee() {
        assert_eq!(round_to_rupee(&dec("1234.37")), BigDecimal::from(1234));
        assert_eq!(round_to_rupee(&dec("1234.50")), BigDecimal::from(1235));
        assert_eq!(round_to_rupee(&dec("1234.49")), BigDecimal::from(1234));
        assert_eq!(round_to_rupee(&dec("-2.5")), BigDecimal::from(-3));
    }

    #[test]
    fn test_round_off_on_net_amount() {
        // 1000 @ 0% tax + 234.37 transport
        let lines = vec![computed(1, "1000", "0", "0")];
        let totals = InvoiceAggregator::default()
            .aggregate(&lines, &dec("234.37"), true)
            .unwrap();

        assert_eq!(totals.net_amount, dec("1234.37"));
        assert_eq!(totals.round_off, dec("-0.37"));
        assert_eq!(totals.final_amount, BigDecimal::from(1234));
    }

    #[test]
    fn test_empty_invoice_is_all_zero() {
        let totals = InvoiceAggregator::default()
            .aggregate(&[], &BigDecimal::from(0), true)
            .unwrap();

        assert_eq!(totals.gross_amount, BigDecimal::from(0));
        assert_eq!(totals.tax_total, BigDecimal::from(0));
        assert_eq!(totals.round_off, BigDecimal::from(0));
        assert_eq!(totals.final_amount, BigDecimal::from(0));
        assert!(totals.tax_breakup.is_empty());
        assert_eq!(totals.line_count, 0);
    }

    #[test]
    fn test_multi_rate_intra_state_totals() {
        let lines = vec![
            computed(10, "45.50", "10", "12"),
            computed(2, "120", "0", "18"),
            computed(5, "20", "5", "5"),
        ];
        let totals = InvoiceAggregator::default()
            .aggregate(&lines, &BigDecimal::from(0), true)
            .unwrap();

        // 455 + 240 + 100
        assert_eq!(totals.gross_amount, dec("795"));
        // 45.5 + 0 + 5
        assert_eq!(totals.discount_total, dec("50.5"));
        assert_eq!(totals.taxable_amount, dec("744.5"));
        // 49.14 + 43.2 + 4.75
        assert_eq!(totals.tax_total, dec("97.09"));
        assert_eq!(totals.cgst_amount, dec("48.545"));
        assert_eq!(totals.sgst_amount, dec("48.545"));
        assert_eq!(totals.igst_amount, BigDecimal::from(0));
        assert_eq!(totals.net_amount, dec("841.59"));
        assert_eq!(totals.round_off, dec("0.41"));
        assert_eq!(totals.final_amount, BigDecimal::from(842));
        assert_eq!(totals.tax_breakup.len(), 3);
    }

    #[test]
    fn test_inter_state_from_customer_state() {
        let config = BillingConfig::new(SellerProfile::new(
            "Malabar Pharma".to_string(),
            None,
            "32".to_string(),
            "Kerala".to_string(),
        ));
        let aggregator = InvoiceAggregator::new(config);
        let lines = vec![computed(1, "1000", "0", "18")];

        let inter = aggregator
            .aggregate_for_customer(&lines, &BigDecimal::from(0), "Karnataka")
            .unwrap();
        assert!(!inter.is_intra_state);
        assert_eq!(inter.igst_amount, BigDecimal::from(180));
        assert_eq!(inter.cgst_amount, BigDecimal::from(0));

        let intra = aggregator
            .aggregate_for_customer(&lines, &BigDecimal::from(0), "Kerala")
            .unwrap();
        assert_eq!(intra.cgst_amount, BigDecimal::from(90));
        assert_eq!(intra.sgst_amount, BigDecimal::from(90));
    }

    #[test]
    fn test_round_off_disabled() {
        let config = BillingConfig {
            round_off: false,
            ..BillingConfig::default()
        };
        let lines = vec![computed(1, "10.25", "0", "0")];
        let totals = InvoiceAggregator::new(config)
            .aggregate(&lines, &BigDecimal::from(0), true)
            .unwrap();

        assert_eq!(totals.round_off, BigDecimal::from(0));
        assert_eq!(totals.final_amount, dec("10.25"));
    }

    #[test]
    fn test_negative_transport_rejected() {
        let result = InvoiceAggregator::default().aggregate(&[], &BigDecimal::from(-5), true);
        assert!(matches!(result, Err(BillingError::Validation(_))));
    }
}
