use std::path::Path;

use super::{load_config, CommandResult};

/// Prints the effective pricing configuration after validation. Secrets
/// never print; there is nothing secret in the rate card itself, but the
/// LLM key is redacted to its presence.
pub fn run(config_path: Option<&Path>) -> CommandResult {
    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(error) => return CommandResult::failure("config", error.to_string()),
    };

    let cost_basis = &config.pricing.cost_basis;
    let rules = &config.pricing.rules;

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    lines.push(format!("database.url = {}", config.database.url));
    lines.push(format!("logging.level = {}", config.logging.level));
    lines.push(format!("llm.enabled = {}", config.llm.enabled));
    lines.push(format!(
        "llm.api_key = {}",
        if config.llm.api_key.is_some() { "(set)" } else { "(unset)" }
    ));

    lines.push(format!(
        "cost_basis: throughput {} sqft/scan-day, scan day {}, processing {}/day, travel {}/mile",
        cost_basis.scan_day_throughput_sqft,
        cost_basis.scan_day_rate,
        cost_basis.processing_per_scan_day,
        cost_basis.travel_per_mile
    ));
    lines.push(format!(
        "cost_basis.modeling_per_sqft: architecture {}, structure {}, mepf {}",
        cost_basis.modeling_per_sqft.architecture,
        cost_basis.modeling_per_sqft.structure,
        cost_basis.modeling_per_sqft.mepf
    ));
    lines.push(format!(
        "cost_basis.flat: georeferencing {}, expedite {}, cad {}/sqft",
        cost_basis.georeferencing_flat, cost_basis.expedite_fee, cost_basis.cad_export_per_sqft
    ));

    lines.push(format!("rules.cogs_multiplier = {}", rules.cogs_multiplier));
    lines.push(format!(
        "rules.addon_markup: architecture {}, structure {}, mepf {}, add_on {}, travel {}",
        rules.addon_markup.architecture_modeling,
        rules.addon_markup.structure_modeling,
        rules.addon_markup.mepf_modeling,
        rules.addon_markup.add_on,
        rules.addon_markup.travel
    ));
    lines.push(format!("rules.minimum_project_value = {}", rules.minimum_project_value));
    lines.push(format!(
        "rules.margin: blocked below {}%, warn below {}%",
        rules.margin.blocked_below, rules.margin.warn_below
    ));

    if rules.multipliers.is_empty() {
        lines.push("rules.multipliers: (none)".to_string());
    } else {
        for multiplier in &rules.multipliers {
            lines.push(format!("rules.multipliers: {} x{}", multiplier.name, multiplier.factor));
        }
    }

    CommandResult::success(lines.join("\n"))
}
