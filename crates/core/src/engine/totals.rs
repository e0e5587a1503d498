use rust_decimal::Decimal;

use crate::config::MarginRules;
use crate::domain::quote::{IntegrityStatus, QuoteTotals};
use crate::domain::shell::{LineItemShell, ShellCategory};
use crate::errors::PricingError;

pub const FLAG_NON_POSITIVE_TOTAL: &str = "non_positive_total";
pub const FLAG_NEGATIVE_MARGIN_SHELL: &str = "negative_margin_shell";
pub const FLAG_PRIMARY_INVARIANT: &str = "primary_shell_invariant_violated";

/// Sums priced shells into quote totals and classifies profitability.
///
/// Aggregation is a hard precondition on pricing: a single unpriced shell
/// fails the whole attempt rather than producing a partial total. Flags
/// raised earlier in the pipeline (e.g. the minimum-value floor) are carried
/// through ahead of the aggregator's own findings.
pub fn aggregate(
    shells: &[LineItemShell],
    rules: &MarginRules,
    carried_flags: Vec<String>,
) -> Result<QuoteTotals, PricingError> {
    let mut total_client_price = Decimal::ZERO;
    let mut total_vendor_cost = Decimal::ZERO;
    let mut flags = carried_flags;

    for shell in shells {
        let (Some(vendor_cost), Some(client_price)) = (shell.vendor_cost, shell.client_price)
        else {
            return Err(PricingError::UnpricedShell { shell_id: shell.id.clone() });
        };
        total_client_price += client_price;
        total_vendor_cost += vendor_cost;

        if shell.category != ShellCategory::Discount && client_price < vendor_cost {
            flags.push(format!("{FLAG_NEGATIVE_MARGIN_SHELL}: {}", shell.description));
        }
    }

    let primary_count = shells.iter().filter(|shell| shell.is_primary).count();
    if !shells.is_empty() && primary_count != 1 {
        flags.push(format!("{FLAG_PRIMARY_INVARIANT}: found {primary_count} primary shells"));
    }

    let gross_margin = total_client_price - total_vendor_cost;
    let (gross_margin_percent, integrity_status) = if total_client_price <= Decimal::ZERO {
        flags.push(FLAG_NON_POSITIVE_TOTAL.to_string());
        (Decimal::ZERO, IntegrityStatus::Blocked)
    } else {
        let percent =
            (gross_margin / total_client_price * Decimal::ONE_HUNDRED).round_dp(2);
        (percent, classify_margin(percent, rules))
    };

    Ok(QuoteTotals {
        total_client_price,
        total_vendor_cost,
        gross_margin,
        gross_margin_percent,
        integrity_status,
        integrity_flags: flags,
    })
}

/// Pure, monotone step function of margin percent against the configured
/// thresholds. Boundaries are inclusive-upper: a margin exactly at a
/// threshold classifies into the higher-margin bucket.
pub fn classify_margin(margin_percent: Decimal, rules: &MarginRules) -> IntegrityStatus {
    if margin_percent < rules.blocked_below {
        IntegrityStatus::Blocked
    } else if margin_percent < rules.warn_below {
        IntegrityStatus::Warning
    } else {
        IntegrityStatus::Passed
    }
}
