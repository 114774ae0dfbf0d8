//! Sales invoice walkthrough: batch selection, line figures and GST totals
//!
//! Run with `RUST_LOG=debug cargo run --example sales_invoice` to see the
//! computation events.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use pharma_billing_core::{
    Batch, BatchAllocator, BillingConfig, InvoiceAggregator, LineItemCalculator, LineItemInput,
    Product, SellerProfile,
};
use std::str::FromStr;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = BillingConfig::new(SellerProfile::new(
        "Malabar Pharma Distributors".to_string(),
        Some("32ABCDE1234F1Z5".to_string()),
        "32".to_string(),
        "Kerala".to_string(),
    ));
    config.validate()?;

    let amoxicillin = Product::new(
        "amox-250".to_string(),
        "Amoxicillin 250mg".to_string(),
        BigDecimal::from(12),
        BigDecimal::from_str("10.00")?,
        BigDecimal::from_str("8.50")?,
    );
    let cough_syrup = Product::new(
        "syrup-100".to_string(),
        "Cough Syrup 100ml".to_string(),
        BigDecimal::from(18),
        BigDecimal::from(95),
        BigDecimal::from(78),
    );

    let batches = vec![
        Batch::new(
            "amx-a".to_string(),
            amoxicillin.id.clone(),
            "AMX2503".to_string(),
            NaiveDate::from_ymd_opt(2025, 3, 1),
            10,
            BigDecimal::from_str("8.50")?,
        ),
        Batch::new(
            "amx-b".to_string(),
            amoxicillin.id.clone(),
            "AMX2509".to_string(),
            NaiveDate::from_ymd_opt(2025, 9, 1),
            5,
            BigDecimal::from_str("8.50")?,
        ),
        Batch::new(
            "syr-a".to_string(),
            cough_syrup.id.clone(),
            "SYR2612".to_string(),
            None,
            3,
            BigDecimal::from(78),
        ),
    ];

    let inputs = vec![
        LineItemInput::for_product(&amoxicillin, 12),
        LineItemInput::for_product(&cough_syrup, 4)
            .with_discount(BigDecimal::from(5))
            .with_free_quantity(1),
    ];

    let calculator = LineItemCalculator::new();
    let allocator = BatchAllocator::from_config(&config);
    let aggregator = InvoiceAggregator::new(config);

    println!("Sales invoice lines:");
    let mut lines = Vec::new();
    for input in &inputs {
        let line = calculator.compute_line_with_batches(input, &batches, &allocator, None)?;
        println!(
            "  {} x{} @ {}: taxable {} + tax {} = {}",
            line.input.product_id,
            line.input.quantity,
            line.input.rate,
            line.taxable_amount,
            line.tax_amount,
            line.net_amount
        );
        for draw in &line.batches {
            println!("    batch {}: {}", draw.batch_id, draw.quantity);
        }
        if line.shortfall > 0 {
            println!("    short by {} units", line.shortfall);
        }
        lines.push(line);
    }
    println!();

    let totals = aggregator.aggregate_for_customer(&lines, &BigDecimal::from(40), "Kerala")?;

    println!("GST breakup:");
    for bucket in totals.tax_breakup.values() {
        println!(
            "  {}%: taxable {} CGST {} SGST {} IGST {}",
            bucket.rate, bucket.taxable_amount, bucket.cgst, bucket.sgst, bucket.igst
        );
    }
    println!();
    println!("Gross:     {}", totals.gross_amount);
    println!("Discount:  {}", totals.discount_total);
    println!("Taxable:   {}", totals.taxable_amount);
    println!("Tax:       {}", totals.tax_total);
    println!("Transport: {}", totals.transport_charges);
    println!("Round off: {}", totals.round_off);
    println!("Total:     {}", totals.final_amount);

    Ok(())
}
