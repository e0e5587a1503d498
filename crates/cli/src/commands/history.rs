use std::path::Path;

use scanquote_core::domain::scoping::ScopingRecordId;
use scanquote_core::store::QuoteRevisionStore;
use scanquote_db::{connect_with_settings, migrations, SqlQuoteRevisionStore};

use super::{load_config, CommandResult};

pub async fn run(record_id: &str, config_path: Option<&Path>) -> CommandResult {
    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(error) => return CommandResult::failure("config", error.to_string()),
    };

    let pool = match connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    {
        Ok(pool) => pool,
        Err(error) => return CommandResult::failure("database", error.to_string()),
    };
    if let Err(error) = migrations::run_pending(&pool).await {
        return CommandResult::failure("migration", error.to_string());
    }

    let store = SqlQuoteRevisionStore::new(pool.clone());
    let history = match store.history(&ScopingRecordId(record_id.to_string())).await {
        Ok(history) => history,
        Err(error) => return CommandResult::failure("store", error.to_string()),
    };
    pool.close().await;

    if history.is_empty() {
        return CommandResult::success(format!("no quote revisions for {record_id}"));
    }

    let mut lines = vec![format!("{} revision(s) for {record_id}:", history.len())];
    for quote in &history {
        lines.push(format!(
            "v{} @ {} | client {} | vendor {} | margin {}% | {} | {}",
            quote.version,
            quote.created_at.to_rfc3339(),
            quote.totals.total_client_price,
            quote.totals.total_vendor_cost,
            quote.totals.gross_margin_percent,
            quote.totals.integrity_status.label(),
            &quote.content_hash[..12.min(quote.content_hash.len())],
        ));
    }

    CommandResult::success(lines.join("\n"))
}
