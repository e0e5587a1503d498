use std::path::Path;

use scanquote_core::domain::quote::Quote;
use scanquote_core::domain::scoping::ScopingRecord;
use scanquote_core::engine::QuoteEngine;
use scanquote_core::proposal::{ProposalDecision, ProposalGate};
use scanquote_core::store::QuoteRevisionStore;
use scanquote_db::{connect_with_settings, migrations, SqlQuoteRevisionStore};

use super::{load_config, CommandResult};

pub async fn run(record_path: &Path, config_path: Option<&Path>) -> CommandResult {
    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(error) => return CommandResult::failure("config", error.to_string()),
    };

    let record = match read_record(record_path) {
        Ok(record) => record,
        Err(message) => return CommandResult::failure("record", message),
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

    let engine = QuoteEngine::new(config.pricing.clone());
    let draft = match engine.build_quote(&record) {
        Ok(draft) => draft,
        Err(error) => return CommandResult::failure("pricing", error.to_string()),
    };

    let store = SqlQuoteRevisionStore::new(pool.clone());
    let based_on = match store.latest(&record.id).await {
        Ok(latest) => latest.map(|quote| quote.version).unwrap_or(0),
        Err(error) => return CommandResult::failure("store", error.to_string()),
    };
    let saved = match store.save(&record.id, draft, based_on).await {
        Ok(saved) => saved,
        Err(error) => return CommandResult::failure("store", error.to_string()),
    };

    tracing::info!(
        record_id = %record.id.0,
        version = saved.version,
        status = saved.totals.integrity_status.label(),
        "quote revision saved"
    );

    pool.close().await;
    CommandResult::success(render_quote(&record, &saved))
}

fn read_record(path: &Path) -> Result<ScopingRecord, String> {
    let raw = std::fs::read_to_string(path)
        .map_err(|error| format!("could not read `{}`: {error}", path.display()))?;
    toml::from_str(&raw)
        .map_err(|error| format!("could not parse `{}`: {error}", path.display()))
}

fn render_quote(record: &ScopingRecord, quote: &Quote) -> String {
    let mut lines = vec![format!(
        "quote v{} for {} ({})",
        quote.version, record.project_name, record.id.0
    )];

    for shell in &quote.line_items {
        let marker = if shell.is_primary { "*" } else { " " };
        lines.push(format!(
            "{marker} {:<60} vendor {:>12}  client {:>12}",
            shell.description,
            shell.vendor_cost.map(|cost| cost.to_string()).unwrap_or_else(|| "-".to_string()),
            shell.client_price.map(|price| price.to_string()).unwrap_or_else(|| "-".to_string()),
        ));
    }

    let totals = &quote.totals;
    lines.push(format!(
        "totals: client {} | vendor {} | margin {} ({}%)",
        totals.total_client_price,
        totals.total_vendor_cost,
        totals.gross_margin,
        totals.gross_margin_percent
    ));
    let total_sqft = record.total_square_feet();
    if total_sqft > 0 {
        // Presentation derivative, not a cost driver.
        let rate = (totals.total_client_price
            / rust_decimal::Decimal::from(total_sqft))
        .round_dp(2);
        lines.push(format!("effective client rate: {rate}/sqft over {total_sqft} sqft"));
    }
    lines.push(format!("integrity: {}", totals.integrity_status.label()));
    for flag in &totals.integrity_flags {
        lines.push(format!("  flag: {flag}"));
    }

    match ProposalGate::evaluate(totals) {
        ProposalDecision::Proceed => lines.push("proposal: clear to generate".to_string()),
        ProposalDecision::ProceedWithWarning { .. } => {
            lines.push("proposal: allowed with warnings".to_string());
        }
        ProposalDecision::Refuse { .. } => {
            lines.push("proposal: BLOCKED until margin is repaired".to_string());
        }
    }

    lines.join("\n")
}
