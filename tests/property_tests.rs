//! Property-based tests for the billing computations

use bigdecimal::BigDecimal;
use chrono::{Duration, NaiveDate};
use pharma_billing_core::{
    AgingAnalyzer, Batch, BatchAllocator, InvoiceAggregator, LineItemCalculator, LineItemInput,
    OutstandingInvoice, PaymentAllocator, TaxCalculator,
};
use proptest::prelude::*;

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
}

/// Money with two decimals (0.00 to 99999.99)
fn arb_money() -> impl Strategy<Value = BigDecimal> {
    (0i64..10_000_000i64).prop_map(|paise| BigDecimal::new(paise.into(), 2))
}

/// Percentage with two decimals (0.00 to 100.00)
fn arb_percent() -> impl Strategy<Value = BigDecimal> {
    (0i64..=10_000i64).prop_map(|hundredths| BigDecimal::new(hundredths.into(), 2))
}

fn arb_line_input() -> impl Strategy<Value = LineItemInput> {
    (0i64..500, arb_money(), arb_percent(), prop_oneof![Just(0), Just(5), Just(12), Just(18), Just(28)])
        .prop_map(|(quantity, rate, discount, tax)| {
            LineItemInput::new("p".to_string(), quantity, rate, BigDecimal::from(tax))
                .with_discount(discount)
        })
}

fn arb_batches() -> impl Strategy<Value = Vec<Batch>> {
    prop::collection::vec((prop::option::of(0i64..1000), -5i64..50), 0..8).prop_map(|specs| {
        specs
            .into_iter()
            .enumerate()
            .map(|(i, (expiry_offset, qty))| {
                Batch::new(
                    format!("b{}", i),
                    "p".to_string(),
                    format!("LOT-{}", i),
                    expiry_offset.map(|days| base_date() + Duration::days(days)),
                    qty,
                    BigDecimal::from(1),
                )
            })
            .collect()
    })
}

fn arb_invoices() -> impl Strategy<Value = Vec<OutstandingInvoice>> {
    prop::collection::vec((0i64..365, arb_money()), 0..10).prop_map(|specs| {
        specs
            .into_iter()
            .enumerate()
            .map(|(i, (due_offset, pending))| {
                OutstandingInvoice::new(
                    format!("INV-{}", i),
                    format!("INV-{}", i),
                    base_date(),
                    base_date() + Duration::days(due_offset),
                    pending.clone(),
                    pending,
                )
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn compute_line_is_idempotent(input in arb_line_input()) {
        let calculator = LineItemCalculator::new();
        prop_assert_eq!(
            calculator.compute_line(&input).unwrap(),
            calculator.compute_line(&input).unwrap()
        );
    }

    #[test]
    fn aggregate_conserves_taxable_amount(inputs in prop::collection::vec(arb_line_input(), 0..12)) {
        let calculator = LineItemCalculator::new();
        let lines: Vec<_> = inputs
            .iter()
            .map(|input| calculator.compute_line(input).unwrap())
            .collect();

        let totals = InvoiceAggregator::default()
            .aggregate(&lines, &BigDecimal::from(0), true)
            .unwrap();

        let taxable: BigDecimal = lines.iter().map(|line| &line.taxable_amount).sum();
        let tax: BigDecimal = lines.iter().map(|line| &line.tax_amount).sum();
        prop_assert_eq!(&totals.taxable_amount, &taxable);
        prop_assert_eq!(&totals.tax_total, &tax);
        prop_assert_eq!(&totals.cgst_amount + &totals.sgst_amount, tax);
        prop_assert_eq!(&totals.net_amount + &totals.round_off, totals.final_amount.clone());
        prop_assert_eq!(totals.final_amount.with_scale(0), totals.final_amount);
    }

    #[test]
    fn intra_state_split_is_even(taxable in arb_money(), rate in arb_percent()) {
        let breakup = TaxCalculator::new().compute_tax(&taxable, &rate, true).unwrap();
        prop_assert_eq!(&breakup.cgst, &breakup.sgst);
        prop_assert_eq!(&breakup.cgst + &breakup.sgst, breakup.total);
        prop_assert_eq!(breakup.igst, BigDecimal::from(0));
    }

    #[test]
    fn batch_allocation_respects_stock(requested in 0i64..200, batches in arb_batches()) {
        let allocation = BatchAllocator::new().allocate(requested, &batches).unwrap();

        let available: i64 = batches.iter().map(|b| b.quantity_available.max(0)).sum();
        prop_assert_eq!(allocation.total_drawn() + allocation.shortfall, requested);
        prop_assert_eq!(allocation.shortfall, (requested - available).max(0));

        for draw in &allocation.allocations {
            let batch = batches.iter().find(|b| b.id == draw.batch_id).unwrap();
            prop_assert!(draw.quantity > 0);
            prop_assert!(draw.quantity <= batch.quantity_available);
        }
    }

    #[test]
    fn fifo_payment_stays_within_bounds(total in arb_money(), invoices in arb_invoices()) {
        let allocation = PaymentAllocator::new().allocate_fifo(&total, &invoices).unwrap();

        prop_assert!(allocation.allocated_amount <= total);
        prop_assert_eq!(&allocation.allocated_amount + &allocation.unallocated_amount, total);
        for entry in &allocation.allocations {
            let invoice = invoices.iter().find(|i| i.id == entry.invoice_id).unwrap();
            prop_assert!(entry.amount <= invoice.pending_amount);
        }
    }

    #[test]
    fn aging_always_has_five_buckets(invoices in arb_invoices(), offset in 0i64..500) {
        let analyzer = AgingAnalyzer::new();
        let buckets = analyzer.bucketize(&invoices, base_date() + Duration::days(offset));

        prop_assert_eq!(buckets.len(), 5);
        let counted: usize = buckets.iter().map(|b| b.count).sum();
        prop_assert_eq!(counted, invoices.len());
        let summed: BigDecimal = buckets.iter().map(|b| &b.amount).sum();
        prop_assert_eq!(summed, analyzer.total_outstanding(&invoices));
    }
}
