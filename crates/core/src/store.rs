use async_trait::async_trait;
use thiserror::Error;

use crate::domain::quote::{DraftQuote, Quote, QuoteTotals};
use crate::domain::scoping::ScopingRecordId;
use crate::domain::shell::LineItemShell;

#[derive(Debug, Error)]
pub enum RevisionStoreError {
    /// The store's latest version advanced while this quote was being
    /// computed. Recoverable: refetch the scope, recompute, retry.
    #[error("quote for {scoping_record_id:?} was computed against version {expected} but the store is at version {actual}")]
    StaleVersion { scoping_record_id: ScopingRecordId, expected: u32, actual: u32 },
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("stored quote payload could not be decoded: {0}")]
    Decode(String),
}

/// Append-only sequence of quote versions per scoping record.
///
/// `save` carries the version the quote was computed against (`0` when the
/// caller saw no prior quote) and appends version `based_on_version + 1`.
/// Saves against anything other than the current latest version fail with
/// `StaleVersion`; nothing is ever overwritten or destroyed.
#[async_trait]
pub trait QuoteRevisionStore: Send + Sync {
    async fn save(
        &self,
        scoping_record_id: &ScopingRecordId,
        draft: DraftQuote,
        based_on_version: u32,
    ) -> Result<Quote, RevisionStoreError>;

    async fn latest(
        &self,
        scoping_record_id: &ScopingRecordId,
    ) -> Result<Option<Quote>, RevisionStoreError>;

    /// All saved versions, oldest first.
    async fn history(
        &self,
        scoping_record_id: &ScopingRecordId,
    ) -> Result<Vec<Quote>, RevisionStoreError>;
}

/// Stamps a draft into a concrete revision: allocates the quote id, assigns
/// the version, fingerprints the content, and timestamps it. Store
/// implementations call this after their concurrency check passes.
pub fn seal_revision(
    scoping_record_id: &ScopingRecordId,
    draft: DraftQuote,
    version: u32,
) -> Quote {
    let content_hash = content_fingerprint(&draft.line_items, &draft.totals);
    Quote {
        id: crate::domain::quote::QuoteId::generate(),
        scoping_record_id: scoping_record_id.clone(),
        line_items: draft.line_items,
        totals: draft.totals,
        version,
        content_hash,
        created_at: chrono::Utc::now(),
    }
}

/// Stable fingerprint of a revision's content, so auditors can tell whether
/// two versions actually differ. Hashes the canonical JSON of line items and
/// totals; ids and timestamps are excluded.
pub fn content_fingerprint(line_items: &[LineItemShell], totals: &QuoteTotals) -> String {
    #[derive(serde::Serialize)]
    struct FingerprintedShell<'a> {
        area_id: Option<&'a str>,
        category: crate::domain::shell::ShellCategory,
        discipline: Option<crate::domain::shell::Discipline>,
        description: &'a str,
        square_feet: Option<u32>,
        lod: Option<u16>,
        one_way_miles: Option<u32>,
        add_on_kind: Option<crate::domain::shell::AddOnKind>,
        is_primary: bool,
        vendor_cost: Option<String>,
        client_price: Option<String>,
    }

    #[derive(serde::Serialize)]
    struct Fingerprinted<'a> {
        line_items: Vec<FingerprintedShell<'a>>,
        totals: &'a QuoteTotals,
    }

    let reduced = line_items
        .iter()
        .map(|shell| FingerprintedShell {
            area_id: shell.area_id.as_ref().map(|id| id.0.as_str()),
            category: shell.category,
            discipline: shell.discipline,
            description: &shell.description,
            square_feet: shell.square_feet,
            lod: shell.lod.map(|lod| lod.0),
            one_way_miles: shell.one_way_miles,
            add_on_kind: shell.add_on_kind,
            is_primary: shell.is_primary,
            vendor_cost: shell.vendor_cost.map(|cost| cost.to_string()),
            client_price: shell.client_price.map(|price| price.to_string()),
        })
        .collect();

    let canonical =
        serde_json::to_vec(&Fingerprinted { line_items: reduced, totals }).unwrap_or_default();
    blake3::hash(&canonical).to_hex().to_string()
}
