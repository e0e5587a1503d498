use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use scanquote_core::domain::quote::{DraftQuote, Quote};
use scanquote_core::domain::scoping::ScopingRecordId;
use scanquote_core::store::{seal_revision, QuoteRevisionStore, RevisionStoreError};

/// In-memory revision store for tests and conversational sessions that do
/// not need durability. Same append-only and stale-version semantics as the
/// SQL store.
#[derive(Default)]
pub struct InMemoryQuoteRevisionStore {
    revisions: RwLock<HashMap<String, Vec<Quote>>>,
}

#[async_trait]
impl QuoteRevisionStore for InMemoryQuoteRevisionStore {
    async fn save(
        &self,
        scoping_record_id: &ScopingRecordId,
        draft: DraftQuote,
        based_on_version: u32,
    ) -> Result<Quote, RevisionStoreError> {
        let mut revisions = self.revisions.write().await;
        let entry = revisions.entry(scoping_record_id.0.clone()).or_default();

        let actual = entry.last().map(|quote| quote.version).unwrap_or(0);
        if actual != based_on_version {
            return Err(RevisionStoreError::StaleVersion {
                scoping_record_id: scoping_record_id.clone(),
                expected: based_on_version,
                actual,
            });
        }

        let quote = seal_revision(scoping_record_id, draft, based_on_version + 1);
        entry.push(quote.clone());
        Ok(quote)
    }

    async fn latest(
        &self,
        scoping_record_id: &ScopingRecordId,
    ) -> Result<Option<Quote>, RevisionStoreError> {
        let revisions = self.revisions.read().await;
        Ok(revisions.get(&scoping_record_id.0).and_then(|entry| entry.last().cloned()))
    }

    async fn history(
        &self,
        scoping_record_id: &ScopingRecordId,
    ) -> Result<Vec<Quote>, RevisionStoreError> {
        let revisions = self.revisions.read().await;
        Ok(revisions.get(&scoping_record_id.0).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use scanquote_core::domain::quote::{DraftQuote, IntegrityStatus, QuoteTotals};
    use scanquote_core::domain::scoping::ScopingRecordId;
    use scanquote_core::domain::shell::{LineItemShell, ShellCategory};
    use scanquote_core::store::{QuoteRevisionStore, RevisionStoreError};

    use super::InMemoryQuoteRevisionStore;

    fn draft() -> DraftQuote {
        let mut shell =
            LineItemShell::unpriced(None, ShellCategory::Modeling, None, "Architecture model");
        shell.is_primary = true;
        shell.vendor_cost = Some(Decimal::new(8_000, 0));
        shell.client_price = Some(Decimal::new(16_000, 0));

        DraftQuote {
            line_items: vec![shell],
            totals: QuoteTotals {
                total_client_price: Decimal::new(16_000, 0),
                total_vendor_cost: Decimal::new(8_000, 0),
                gross_margin: Decimal::new(8_000, 0),
                gross_margin_percent: Decimal::new(50, 0),
                integrity_status: IntegrityStatus::Passed,
                integrity_flags: Vec::new(),
            },
        }
    }

    #[tokio::test]
    async fn versions_grow_monotonically() {
        let store = InMemoryQuoteRevisionStore::default();
        let record_id = ScopingRecordId("rec-mem-1".to_string());

        let first = store.save(&record_id, draft(), 0).await.expect("save v1");
        let second = store.save(&record_id, draft(), first.version).await.expect("save v2");
        assert_eq!((first.version, second.version), (1, 2));

        let history = store.history(&record_id).await.expect("history");
        assert_eq!(history.iter().map(|quote| quote.version).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[tokio::test]
    async fn stale_version_is_rejected() {
        let store = InMemoryQuoteRevisionStore::default();
        let record_id = ScopingRecordId("rec-mem-2".to_string());

        store.save(&record_id, draft(), 0).await.expect("save v1");
        let error = store.save(&record_id, draft(), 0).await.expect_err("stale save");
        assert!(matches!(
            error,
            RevisionStoreError::StaleVersion { expected: 0, actual: 1, .. }
        ));
    }

    #[tokio::test]
    async fn latest_is_none_before_first_save() {
        let store = InMemoryQuoteRevisionStore::default();
        let record_id = ScopingRecordId("rec-mem-3".to_string());
        assert!(store.latest(&record_id).await.expect("latest").is_none());
    }
}
