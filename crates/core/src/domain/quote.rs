use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::scoping::ScopingRecordId;
use crate::domain::shell::LineItemShell;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuoteId(pub String);

impl QuoteId {
    pub fn generate() -> Self {
        Self(format!("quote-{}", uuid::Uuid::new_v4()))
    }
}

/// A named situational pricing factor ("Rush", "High-Risk Access"). Applied
/// once to the quote's client total, never to vendor cost.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Multiplier {
    pub name: String,
    pub factor: Decimal,
}

/// Three-state profitability classification gating proposal creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrityStatus {
    Passed,
    Warning,
    Blocked,
}

impl IntegrityStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Warning => "warning",
            Self::Blocked => "blocked",
        }
    }
}

/// Derived totals for a priced quote. Never hand-edited; always recomputed
/// from the line items by the totals aggregator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteTotals {
    pub total_client_price: Decimal,
    pub total_vendor_cost: Decimal,
    pub gross_margin: Decimal,
    /// Rounded to two decimal places; zero when the client total is zero.
    pub gross_margin_percent: Decimal,
    pub integrity_status: IntegrityStatus,
    pub integrity_flags: Vec<String>,
}

/// A priced quote that has not yet been assigned a version by the revision
/// store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftQuote {
    pub line_items: Vec<LineItemShell>,
    pub totals: QuoteTotals,
}

/// A versioned quote snapshot. Versions are append-only: regeneration after
/// a scope edit produces a new version, never a mutation of a prior one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub id: QuoteId,
    pub scoping_record_id: ScopingRecordId,
    pub line_items: Vec<LineItemShell>,
    pub totals: QuoteTotals,
    pub version: u32,
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
}
