pub mod pricing;
pub mod shells;
pub mod totals;

pub use pricing::{price_shells, PricingOutcome};
pub use shells::generate_shells;
pub use totals::{aggregate, classify_margin};

use crate::config::PricingConfig;
use crate::domain::quote::DraftQuote;
use crate::domain::scoping::ScopingRecord;
use crate::errors::PricingError;

/// One pricing pass over a scoping record: generate shells, price them,
/// aggregate and classify. Pure and synchronous; persisting the result is
/// the caller's concern (see `store::QuoteRevisionStore`).
#[derive(Clone, Debug)]
pub struct QuoteEngine {
    config: PricingConfig,
}

impl QuoteEngine {
    pub fn new(config: PricingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    pub fn build_quote(&self, record: &ScopingRecord) -> Result<DraftQuote, PricingError> {
        let shells = generate_shells(record);
        let outcome = price_shells(shells, &self.config.cost_basis, &self.config.rules)?;
        let totals = aggregate(&outcome.shells, &self.config.rules.margin, outcome.flags)?;
        Ok(DraftQuote { line_items: outcome.shells, totals })
    }
}

impl Default for QuoteEngine {
    fn default() -> Self {
        Self::new(PricingConfig::default())
    }
}
