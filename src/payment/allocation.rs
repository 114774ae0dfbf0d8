//! Distribution of one received payment across outstanding invoices
//!
//! Two modes: automatic oldest-due-first (FIFO) and a manual selection that
//! is validated as a whole. Both only propose the allocation; writing it to
//! the books happens outside this crate in a single atomic step.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, instrument, warn};

use crate::types::*;
use crate::utils::validation::validate_unique_ids;

/// Lifecycle of a payment: computed here up to `Allocated`, committed by the
/// persistence layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// Amount entered, nothing allocated yet
    Draft,
    /// Allocation computed and validated
    Allocated,
    /// Allocation written to the backing store
    Committed,
}

impl PaymentStatus {
    /// Only forward moves are allowed: Draft -> Allocated -> Committed
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        matches!(
            (self, next),
            (PaymentStatus::Draft, PaymentStatus::Allocated)
                | (PaymentStatus::Allocated, PaymentStatus::Committed)
        )
    }
}

/// Amount of a payment applied to one invoice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceAllocation {
    pub invoice_id: String,
    pub amount: BigDecimal,
}

/// A payment and how it is spread over invoices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentAllocation {
    pub status: PaymentStatus,
    /// Amount received
    pub total_amount: BigDecimal,
    pub allocations: Vec<InvoiceAllocation>,
    /// Sum of `allocations`
    pub allocated_amount: BigDecimal,
    /// Left over after all invoices; recorded by the caller as an advance
    pub unallocated_amount: BigDecimal,
}

impl PaymentAllocation {
    /// A payment with nothing allocated yet
    pub fn draft(total_amount: BigDecimal) -> Self {
        Self {
            status: PaymentStatus::Draft,
            unallocated_amount: total_amount.clone(),
            total_amount,
            allocations: Vec::new(),
            allocated_amount: BigDecimal::from(0),
        }
    }

    fn allocated(total_amount: BigDecimal, allocations: Vec<InvoiceAllocation>) -> Self {
        let allocated_amount: BigDecimal = allocations.iter().map(|a| &a.amount).sum();
        let unallocated_amount = &total_amount - &allocated_amount;
        Self {
            status: PaymentStatus::Allocated,
            total_amount,
            allocations,
            allocated_amount,
            unallocated_amount,
        }
    }

    /// Whether part of the payment remains as customer credit
    pub fn has_advance(&self) -> bool {
        self.unallocated_amount > BigDecimal::from(0)
    }

    /// Amount allocated to one invoice, zero when it got nothing
    pub fn amount_for(&self, invoice_id: &str) -> BigDecimal {
        self.allocations
            .iter()
            .filter(|a| a.invoice_id == invoice_id)
            .map(|a| &a.amount)
            .sum()
    }

    /// Mark the allocation as committed once the persistence layer has
    /// written it atomically
    pub fn commit(&mut self) -> BillingResult<()> {
        self.transition(PaymentStatus::Committed)
    }

    fn transition(&mut self, next: PaymentStatus) -> BillingResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(BillingError::Validation(format!(
                "Payment cannot move from {:?} to {:?}",
                self.status, next
            )));
        }
        self.status = next;
        Ok(())
    }
}

/// A broken rule in a manual allocation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AllocationViolation {
    #[error("Payment amount {total} must not be negative")]
    InvalidTotal { total: BigDecimal },
    #[error("Allocation of {amount} to invoice {invoice_id} must be positive")]
    NonPositiveAmount {
        invoice_id: String,
        amount: BigDecimal,
    },
    #[error("Allocation of {amount} to invoice {invoice_id} exceeds pending {pending}")]
    ExceedsPending {
        invoice_id: String,
        amount: BigDecimal,
        pending: BigDecimal,
    },
    #[error("Allocations total {allocated} exceeds payment amount {total}")]
    ExceedsTotal {
        allocated: BigDecimal,
        total: BigDecimal,
    },
    #[error("Invoice {0} is selected more than once")]
    DuplicateInvoice(String),
    #[error("Invoice {0} is not outstanding")]
    UnknownInvoice(String),
    #[error("Outstanding invoice {invoice_id} is malformed: {reason}")]
    InvalidInvoice { invoice_id: String, reason: String },
}

/// Outcome of validating a manual allocation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub total_amount: BigDecimal,
    pub selections: Vec<PaymentAllocationInput>,
    /// Every rule the selection breaks; empty when valid
    pub violations: Vec<AllocationViolation>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// Turn a valid selection into an `Allocated` payment, or hand back the violations
    pub fn into_allocation(self) -> Result<PaymentAllocation, Vec<AllocationViolation>> {
        if !self.is_valid() {
            return Err(self.violations);
        }

        let allocations = self
            .selections
            .into_iter()
            .map(|selection| InvoiceAllocation {
                invoice_id: selection.invoice_id,
                amount: selection.amount,
            })
            .collect();
        Ok(PaymentAllocation::allocated(self.total_amount, allocations))
    }
}

/// Allocates payments to outstanding invoices
#[derive(Debug, Clone, Copy, Default)]
pub struct PaymentAllocator;

impl PaymentAllocator {
    pub fn new() -> Self {
        Self
    }

    /// Spread `total_amount` over invoices, earliest due date first.
    ///
    /// Ties on due date are broken by invoice id. Each invoice receives at
    /// most its pending amount; invoices with nothing pending are passed over.
    /// What is left after the last invoice is reported as unallocated.
    /// Malformed invoices (pending outside `0..=total`, repeated ids) fail
    /// the whole call.
    #[instrument(skip(self, invoices), fields(invoice_count = invoices.len()))]
    pub fn allocate_fifo(
        &self,
        total_amount: &BigDecimal,
        invoices: &[OutstandingInvoice],
    ) -> BillingResult<PaymentAllocation> {
        if *total_amount < BigDecimal::from(0) {
            return Err(BillingError::Validation(format!(
                "Payment amount cannot be negative, got {}",
                total_amount
            )));
        }
        for invoice in invoices {
            invoice.validate()?;
        }
        validate_unique_ids("Invoice", invoices.iter().map(|invoice| invoice.id.as_str()))?;

        let mut ordered: Vec<&OutstandingInvoice> = invoices.iter().collect();
        ordered.sort_by(|a, b| a.due_date.cmp(&b.due_date).then_with(|| a.id.cmp(&b.id)));

        let zero = BigDecimal::from(0);
        let mut remaining = total_amount.clone();
        let mut allocations = Vec::new();

        for invoice in ordered {
            if remaining <= zero {
                break;
            }

            let amount = if invoice.pending_amount < remaining {
                invoice.pending_amount.clone()
            } else {
                remaining.clone()
            };
            if amount > zero {
                remaining -= &amount;
                allocations.push(InvoiceAllocation {
                    invoice_id: invoice.id.clone(),
                    amount,
                });
            }
        }

        let allocation = PaymentAllocation::allocated(total_amount.clone(), allocations);
        self.check_invariants(&allocation, invoices)?;

        if allocation.has_advance() {
            warn!(
                unallocated = %allocation.unallocated_amount,
                "payment exceeds outstanding dues, remainder left unallocated"
            );
        }
        debug!(
            allocated = %allocation.allocated_amount,
            invoices_paid = allocation.allocations.len(),
            "fifo payment allocation complete"
        );

        Ok(allocation)
    }

    /// Validate a user-chosen allocation.
    ///
    /// Every violation is collected; nothing is clamped or dropped.
    #[instrument(skip(self, invoices, selections), fields(selection_count = selections.len()))]
    pub fn allocate_manual(
        &self,
        total_amount: &BigDecimal,
        invoices: &[OutstandingInvoice],
        selections: &[PaymentAllocationInput],
    ) -> ValidationResult {
        let zero = BigDecimal::from(0);
        let mut violations = Vec::new();

        if *total_amount < zero {
            violations.push(AllocationViolation::InvalidTotal {
                total: total_amount.clone(),
            });
        }

        let mut pending_by_id: HashMap<&str, &BigDecimal> = HashMap::new();
        for invoice in invoices {
            if let Err(e) = invoice.validate() {
                violations.push(AllocationViolation::InvalidInvoice {
                    invoice_id: invoice.id.clone(),
                    reason: e.to_string(),
                });
            }
            if pending_by_id
                .insert(invoice.id.as_str(), &invoice.pending_amount)
                .is_some()
            {
                violations.push(AllocationViolation::InvalidInvoice {
                    invoice_id: invoice.id.clone(),
                    reason: "listed more than once".to_string(),
                });
            }
        }
        let mut seen = HashSet::new();

        for selection in selections {
            if !seen.insert(selection.invoice_id.as_str()) {
                violations.push(AllocationViolation::DuplicateInvoice(
                    selection.invoice_id.clone(),
                ));
            }

            if selection.amount <= zero {
                violations.push(AllocationViolation::NonPositiveAmount {
                    invoice_id: selection.invoice_id.clone(),
                    amount: selection.amount.clone(),
                });
            }

            match pending_by_id.get(selection.invoice_id.as_str()) {
                Some(pending) if selection.amount > **pending => {
                    violations.push(AllocationViolation::ExceedsPending {
                        invoice_id: selection.invoice_id.clone(),
                        amount: selection.amount.clone(),
                        pending: (*pending).clone(),
                    });
                }
                Some(_) => {}
                None => {
                    violations.push(AllocationViolation::UnknownInvoice(
                        selection.invoice_id.clone(),
                    ));
                }
            }
        }

        let allocated: BigDecimal = selections.iter().map(|s| &s.amount).sum();
        if allocated > *total_amount {
            violations.push(AllocationViolation::ExceedsTotal {
                allocated,
                total: total_amount.clone(),
            });
        }

        if !violations.is_empty() {
            warn!(violations = violations.len(), "manual payment allocation rejected");
        }

        ValidationResult {
            total_amount: total_amount.clone(),
            selections: selections.to_vec(),
            violations,
        }
    }

    fn check_invariants(
        &self,
        allocation: &PaymentAllocation,
        invoices: &[OutstandingInvoice],
    ) -> BillingResult<()> {
        if allocation.allocated_amount > allocation.total_amount {
            return Err(invariant_violation(format!(
                "Allocated {} exceeds payment {}",
                allocation.allocated_amount, allocation.total_amount
            )));
        }

        for entry in &allocation.allocations {
            let pending = invoices
                .iter()
                .find(|invoice| invoice.id == entry.invoice_id)
                .map(|invoice| invoice.pending_amount.clone())
                .unwrap_or_else(|| BigDecimal::from(0));
            if entry.amount > pending {
                return Err(invariant_violation(format!(
                    "Allocated {} to invoice {} with only {} pending",
                    entry.amount, entry.invoice_id, pending
                )));
            }
        }

        Ok(())
    }
}
