use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use scanquote_core::domain::quote::{DraftQuote, Quote, QuoteId, QuoteTotals};
use scanquote_core::domain::scoping::ScopingRecordId;
use scanquote_core::domain::shell::LineItemShell;
use scanquote_core::store::{seal_revision, QuoteRevisionStore, RevisionStoreError};

use crate::DbPool;

/// SQLite-backed revision store. Revisions are immutable rows; line items
/// and totals are stored as JSON documents because a revision is read back
/// whole or not at all.
pub struct SqlQuoteRevisionStore {
    pool: DbPool,
}

impl SqlQuoteRevisionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn latest_version(
        &self,
        scoping_record_id: &ScopingRecordId,
    ) -> Result<u32, RevisionStoreError> {
        let latest: Option<i64> = sqlx::query_scalar(
            "SELECT MAX(version) FROM quote_revision WHERE scoping_record_id = ?",
        )
        .bind(&scoping_record_id.0)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(latest.and_then(|value| u32::try_from(value).ok()).unwrap_or(0))
    }

    fn quote_from_row(row: &SqliteRow) -> Result<Quote, RevisionStoreError> {
        let id: String = row.try_get("id").map_err(db_error)?;
        let scoping_record_id: String =
            row.try_get("scoping_record_id").map_err(db_error)?;
        let version_raw: i64 = row.try_get("version").map_err(db_error)?;
        let version = u32::try_from(version_raw).map_err(|_| {
            RevisionStoreError::Decode(format!("version `{version_raw}` does not fit in u32"))
        })?;
        let line_items_json: String = row.try_get("line_items_json").map_err(db_error)?;
        let totals_json: String = row.try_get("totals_json").map_err(db_error)?;
        let content_hash: String = row.try_get("content_hash").map_err(db_error)?;
        let created_at_raw: String = row.try_get("created_at").map_err(db_error)?;

        let line_items: Vec<LineItemShell> =
            serde_json::from_str(&line_items_json).map_err(|error| {
                RevisionStoreError::Decode(format!("invalid line_items_json: {error}"))
            })?;
        let totals: QuoteTotals = serde_json::from_str(&totals_json).map_err(|error| {
            RevisionStoreError::Decode(format!("invalid totals_json: {error}"))
        })?;
        let created_at = DateTime::parse_from_rfc3339(&created_at_raw)
            .map_err(|error| {
                RevisionStoreError::Decode(format!("invalid created_at timestamp: {error}"))
            })?
            .with_timezone(&Utc);

        Ok(Quote {
            id: QuoteId(id),
            scoping_record_id: ScopingRecordId(scoping_record_id),
            line_items,
            totals,
            version,
            content_hash,
            created_at,
        })
    }
}

#[async_trait]
impl QuoteRevisionStore for SqlQuoteRevisionStore {
    async fn save(
        &self,
        scoping_record_id: &ScopingRecordId,
        draft: DraftQuote,
        based_on_version: u32,
    ) -> Result<Quote, RevisionStoreError> {
        let actual = self.latest_version(scoping_record_id).await?;
        if actual != based_on_version {
            return Err(RevisionStoreError::StaleVersion {
                scoping_record_id: scoping_record_id.clone(),
                expected: based_on_version,
                actual,
            });
        }

        let quote = seal_revision(scoping_record_id, draft, based_on_version + 1);
        let line_items_json = serde_json::to_string(&quote.line_items)
            .map_err(|error| RevisionStoreError::Persistence(error.to_string()))?;
        let totals_json = serde_json::to_string(&quote.totals)
            .map_err(|error| RevisionStoreError::Persistence(error.to_string()))?;

        let insert = sqlx::query(
            r#"
            INSERT INTO quote_revision (
                id, scoping_record_id, version, line_items_json, totals_json, content_hash, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&quote.id.0)
        .bind(&scoping_record_id.0)
        .bind(i64::from(quote.version))
        .bind(line_items_json)
        .bind(totals_json)
        .bind(&quote.content_hash)
        .bind(quote.created_at.to_rfc3339())
        .execute(&self.pool)
        .await;

        match insert {
            Ok(_) => Ok(quote),
            // A concurrent writer appended the same version first.
            Err(sqlx::Error::Database(error)) if error.is_unique_violation() => {
                let actual = self.latest_version(scoping_record_id).await?;
                Err(RevisionStoreError::StaleVersion {
                    scoping_record_id: scoping_record_id.clone(),
                    expected: based_on_version,
                    actual,
                })
            }
            Err(error) => Err(db_error(error)),
        }
    }

    async fn latest(
        &self,
        scoping_record_id: &ScopingRecordId,
    ) -> Result<Option<Quote>, RevisionStoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, scoping_record_id, version, line_items_json, totals_json, content_hash, created_at
            FROM quote_revision
            WHERE scoping_record_id = ?
            ORDER BY version DESC
            LIMIT 1
            "#,
        )
        .bind(&scoping_record_id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.as_ref().map(Self::quote_from_row).transpose()
    }

    async fn history(
        &self,
        scoping_record_id: &ScopingRecordId,
    ) -> Result<Vec<Quote>, RevisionStoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, scoping_record_id, version, line_items_json, totals_json, content_hash, created_at
            FROM quote_revision
            WHERE scoping_record_id = ?
            ORDER BY version ASC
            "#,
        )
        .bind(&scoping_record_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.iter().map(Self::quote_from_row).collect()
    }
}

fn db_error(error: sqlx::Error) -> RevisionStoreError {
    RevisionStoreError::Persistence(format!("database error: {error}"))
}
