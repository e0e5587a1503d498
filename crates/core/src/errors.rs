use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::shell::ShellId;

/// Fatal failures of a single pricing attempt. No partial quote is ever
/// saved when one of these is raised; the offending shell is always named.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PricingError {
    #[error("no cost basis covers shell {shell_id:?} ({description})")]
    MissingCostBasis { shell_id: ShellId, description: String },
    #[error("computed vendor cost {amount} for shell {shell_id:?} is negative")]
    InvalidCost { shell_id: ShellId, amount: Decimal },
    #[error("shell {shell_id:?} reached aggregation without a price")]
    UnpricedShell { shell_id: ShellId },
}
