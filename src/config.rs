//! Seller profile and computation settings passed explicitly into the aggregator

use serde::{Deserialize, Serialize};

use crate::types::*;
use crate::utils::validation::validate_gstin;

/// Company details of the selling party
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SellerProfile {
    pub company_name: String,
    /// 15 character GST identification number, if registered
    #[serde(default)]
    pub gstin: Option<String>,
    /// Two digit GST state code (e.g. "32" for Kerala)
    pub state_code: String,
    pub state_name: String,
}

impl SellerProfile {
    /// Create a new seller profile
    pub fn new(
        company_name: String,
        gstin: Option<String>,
        state_code: String,
        state_name: String,
    ) -> Self {
        Self {
            company_name,
            gstin,
            state_code,
            state_name,
        }
    }

    /// Whether a sale to a customer in `customer_state` is an intra-state supply.
    ///
    /// `customer_state` may be a state code or a state name. A blank state
    /// (walk-in customer) is billed as intra-state.
    pub fn is_intra_state(&self, customer_state: &str) -> bool {
        let customer_state = customer_state.trim();
        if customer_state.is_empty() {
            return true;
        }

        customer_state.eq_ignore_ascii_case(self.state_code.trim())
            || customer_state.eq_ignore_ascii_case(self.state_name.trim())
    }
}

/// Settings for invoice computation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingConfig {
    pub seller: SellerProfile,
    /// Round the invoice total to whole rupees
    #[serde(default = "default_round_off")]
    pub round_off: bool,
    /// Leave batches that are already past expiry out of automatic allocation
    #[serde(default)]
    pub skip_expired_batches: bool,
}

fn default_round_off() -> bool {
    true
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            seller: SellerProfile::default(),
            round_off: default_round_off(),
            skip_expired_batches: false,
        }
    }
}

impl BillingConfig {
    /// Create a config for a seller with default settings
    pub fn new(seller: SellerProfile) -> Self {
        Self {
            seller,
            ..Self::default()
        }
    }

    /// Parse and validate a config from JSON
    pub fn from_json(json: &str) -> BillingResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| BillingError::Config(format!("Invalid billing config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the seller details
    pub fn validate(&self) -> BillingResult<()> {
        if let Some(gstin) = &self.seller.gstin {
            validate_gstin(gstin, &self.seller.state_code)
                .map_err(|e| BillingError::Config(e.to_string()))?;
        }

        Ok(())
    }
}
