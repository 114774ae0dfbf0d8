//! Core types and data structures shared by the billing computations

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Product reference data, immutable for the duration of a computation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Unique identifier for the product
    pub id: String,
    /// Display name
    pub name: String,
    /// Default GST rate in percent (e.g. 12 for 12%)
    pub tax_rate: BigDecimal,
    /// Maximum retail price printed on the pack
    pub mrp: BigDecimal,
    /// Default selling price per unit (before discount and tax)
    pub sale_price: BigDecimal,
}

impl Product {
    /// Create a new product
    pub fn new(
        id: String,
        name: String,
        tax_rate: BigDecimal,
        mrp: BigDecimal,
        sale_price: BigDecimal,
    ) -> Self {
        Self {
            id,
            name,
            tax_rate,
            mrp,
            sale_price,
        }
    }
}

/// A dated lot of a product with its own expiry and available stock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    /// Unique identifier for the batch record
    pub id: String,
    /// Product this batch belongs to
    pub product_id: String,
    /// Manufacturer batch number printed on the pack
    pub batch_number: String,
    /// Expiry date; `None` means the batch never expires
    pub expiry_date: Option<NaiveDate>,
    /// Units currently available in stock
    pub quantity_available: i64,
    /// Selling price of this batch
    pub selling_price: BigDecimal,
}

impl Batch {
    /// Create a new batch
    pub fn new(
        id: String,
        product_id: String,
        batch_number: String,
        expiry_date: Option<NaiveDate>,
        quantity_available: i64,
        selling_price: BigDecimal,
    ) -> Self {
        Self {
            id,
            product_id,
            batch_number,
            expiry_date,
            quantity_available,
            selling_price,
        }
    }

    /// Whether the batch has any stock that can be drawn
    pub fn has_stock(&self) -> bool {
        self.quantity_available > 0
    }

    /// Whether the batch is past its expiry on the given date.
    /// A batch expiring on `date` is still sellable that day.
    pub fn is_expired_on(&self, date: NaiveDate) -> bool {
        self.expiry_date.is_some_and(|expiry| expiry < date)
    }
}

/// Input for a single invoice line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItemInput {
    /// Product being billed
    pub product_id: String,
    /// Billed quantity
    pub quantity: i64,
    /// Scheme quantity handed out free of charge; drawn from stock but not billed
    #[serde(default)]
    pub free_quantity: i64,
    /// Unit rate before discount and tax
    pub rate: BigDecimal,
    /// Line discount in percent (0-100)
    #[serde(default)]
    pub discount_percent: BigDecimal,
    /// GST rate in percent (0-100), may override the product default
    pub tax_rate: BigDecimal,
    /// Batch pinned by the user; `None` lets the allocator choose
    #[serde(default)]
    pub batch_id: Option<String>,
}

impl LineItemInput {
    /// Create a new line input without discount or pinned batch
    pub fn new(product_id: String, quantity: i64, rate: BigDecimal, tax_rate: BigDecimal) -> Self {
        Self {
            product_id,
            quantity,
            free_quantity: 0,
            rate,
            discount_percent: BigDecimal::from(0),
            tax_rate,
            batch_id: None,
        }
    }

    /// Create a line for a product using its default sale price and tax rate
    pub fn for_product(product: &Product, quantity: i64) -> Self {
        Self::new(
            product.id.clone(),
            quantity,
            product.sale_price.clone(),
            product.tax_rate.clone(),
        )
    }

    pub fn with_discount(mut self, discount_percent: BigDecimal) -> Self {
        self.discount_percent = discount_percent;
        self
    }

    pub fn with_free_quantity(mut self, free_quantity: i64) -> Self {
        self.free_quantity = free_quantity;
        self
    }

    pub fn with_batch(mut self, batch_id: String) -> Self {
        self.batch_id = Some(batch_id);
        self
    }

    /// Units that leave the shelf for this line (billed plus free)
    pub fn batch_quantity(&self) -> BillingResult<i64> {
        self.quantity.checked_add(self.free_quantity).ok_or_else(|| {
            BillingError::Validation(format!(
                "Quantity {} plus free quantity {} is too large",
                self.quantity, self.free_quantity
            ))
        })
    }
}

/// Quantity proposed to be drawn from one batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchDraw {
    pub batch_id: String,
    pub quantity: i64,
}

impl BatchDraw {
    pub fn new(batch_id: String, quantity: i64) -> Self {
        Self { batch_id, quantity }
    }
}

/// A fully computed invoice line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputedLine {
    /// The input the figures were derived from
    #[serde(flatten)]
    pub input: LineItemInput,
    /// quantity x rate
    pub amount: BigDecimal,
    pub discount_amount: BigDecimal,
    /// amount - discount_amount
    pub taxable_amount: BigDecimal,
    pub tax_amount: BigDecimal,
    /// taxable_amount + tax_amount
    pub net_amount: BigDecimal,
    /// Proposed batch draws, empty when no batch resolution was requested
    #[serde(default)]
    pub batches: Vec<BatchDraw>,
    /// Units that could not be backed by any batch
    #[serde(default)]
    pub shortfall: i64,
}

impl ComputedLine {
    /// True when the line has no inventory backing at all
    pub fn has_no_batch(&self) -> bool {
        self.batches.is_empty()
    }
}

/// An invoice with an unpaid balance, as fetched for payment entry or the party ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutstandingInvoice {
    pub id: String,
    pub invoice_number: String,
    pub invoice_date: NaiveDate,
    pub due_date: NaiveDate,
    pub total_amount: BigDecimal,
    /// Unpaid part of `total_amount`
    pub pending_amount: BigDecimal,
}

impl OutstandingInvoice {
    /// Create a new outstanding invoice
    pub fn new(
        id: String,
        invoice_number: String,
        invoice_date: NaiveDate,
        due_date: NaiveDate,
        total_amount: BigDecimal,
        pending_amount: BigDecimal,
    ) -> Self {
        Self {
            id,
            invoice_number,
            invoice_date,
            due_date,
            total_amount,
            pending_amount,
        }
    }

    /// Whole days past the due date as of `reference`, never negative
    pub fn days_overdue(&self, reference: NaiveDate) -> i64 {
        (reference - self.due_date).num_days().max(0)
    }

    /// Check that the pending balance is within `0..=total_amount`
    pub fn validate(&self) -> BillingResult<()> {
        if self.pending_amount < BigDecimal::from(0) {
            return Err(BillingError::Validation(format!(
                "Invoice {} has a negative pending amount: {}",
                self.invoice_number, self.pending_amount
            )));
        }

        if self.pending_amount > self.total_amount {
            return Err(BillingError::Validation(format!(
                "Invoice {} pending amount {} exceeds total {}",
                self.invoice_number, self.pending_amount, self.total_amount
            )));
        }

        Ok(())
    }
}

/// One manually chosen (invoice, amount) pair of a payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentAllocationInput {
    pub invoice_id: String,
    pub amount: BigDecimal,
}

impl PaymentAllocationInput {
    pub fn new(invoice_id: String, amount: BigDecimal) -> Self {
        Self { invoice_id, amount }
    }
}

/// Errors that can occur while computing billing figures
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BillingError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
    #[error("Batch not found: {0}")]
    UnknownBatch(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for billing computations
pub type BillingResult<T> = Result<T, BillingError>;

/// Report a broken internal invariant.
///
/// Panics in debug builds; release builds get an error instead of a clamped value.
pub(crate) fn invariant_violation(message: String) -> BillingError {
    tracing::error!(%message, "billing invariant violated");
    if cfg!(debug_assertions) {
        panic!("billing invariant violated: {message}");
    }
    BillingError::InvariantViolation(message)
}
