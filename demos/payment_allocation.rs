//! Payment entry walkthrough: FIFO and manual allocation, then aging

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use pharma_billing_core::{
    AgingAnalyzer, OutstandingInvoice, PaymentAllocationInput, PaymentAllocator,
};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid calendar date")
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let invoices = vec![
        OutstandingInvoice::new(
            "1".to_string(),
            "INV-1".to_string(),
            date(2024, 12, 2),
            date(2025, 1, 1),
            BigDecimal::from(2000),
            BigDecimal::from(2000),
        ),
        OutstandingInvoice::new(
            "2".to_string(),
            "INV-2".to_string(),
            date(2025, 1, 2),
            date(2025, 2, 1),
            BigDecimal::from(4000),
            BigDecimal::from(4000),
        ),
    ];
    let allocator = PaymentAllocator::new();

    println!("FIFO allocation of 5000:");
    let fifo = allocator.allocate_fifo(&BigDecimal::from(5000), &invoices)?;
    for entry in &fifo.allocations {
        println!("  invoice {}: {}", entry.invoice_id, entry.amount);
    }
    println!("  unallocated (advance): {}", fifo.unallocated_amount);
    println!();

    println!("Manual allocation of 5000:");
    let manual = allocator.allocate_manual(
        &BigDecimal::from(5000),
        &invoices,
        &[
            PaymentAllocationInput::new("1".to_string(), BigDecimal::from(2500)),
            PaymentAllocationInput::new("2".to_string(), BigDecimal::from(1000)),
        ],
    );
    match manual.into_allocation() {
        Ok(allocation) => println!("  accepted, {} allocated", allocation.allocated_amount),
        Err(violations) => {
            for violation in violations {
                println!("  rejected: {}", violation);
            }
        }
    }
    println!();

    println!("Aging as of 2025-03-15:");
    for bucket in AgingAnalyzer::new().bucketize(&invoices, date(2025, 3, 15)) {
        println!("  {:>7}: {} ({} invoices)", bucket.label, bucket.amount, bucket.count);
    }

    Ok(())
}
