use std::collections::BTreeSet;

use rust_decimal::Decimal;

use scanquote_core::config::PricingConfig;
use scanquote_core::domain::quote::QuoteTotals;
use scanquote_core::domain::shell::LineItemShell;

/// Every figure that must never appear in conversational text: per-shell and
/// total vendor cost, gross margin (absolute and percent), the COGS
/// multiplier and lean markups, and the per-discipline unit costs they are
/// derived from. Client prices are deliberately absent; the client side of
/// the quote is what the conversation is for.
#[derive(Clone, Debug, Default)]
pub struct SensitiveFigures {
    figures: BTreeSet<String>,
}

impl SensitiveFigures {
    pub fn from_quote(
        line_items: &[LineItemShell],
        totals: &QuoteTotals,
        config: &PricingConfig,
    ) -> Self {
        let mut figures = BTreeSet::new();

        for shell in line_items {
            if let Some(vendor_cost) = shell.vendor_cost {
                insert_figure(&mut figures, vendor_cost);
            }
        }

        insert_figure(&mut figures, totals.total_vendor_cost);
        insert_figure(&mut figures, totals.gross_margin);
        insert_figure(&mut figures, totals.gross_margin_percent);

        insert_figure(&mut figures, config.rules.cogs_multiplier);
        insert_figure(&mut figures, config.rules.addon_markup.architecture_modeling);
        insert_figure(&mut figures, config.rules.addon_markup.structure_modeling);
        insert_figure(&mut figures, config.rules.addon_markup.mepf_modeling);
        insert_figure(&mut figures, config.rules.addon_markup.add_on);
        insert_figure(&mut figures, config.rules.addon_markup.travel);

        insert_figure(&mut figures, config.cost_basis.scan_day_rate);
        insert_figure(&mut figures, config.cost_basis.processing_per_scan_day);
        insert_figure(&mut figures, config.cost_basis.modeling_per_sqft.architecture);
        insert_figure(&mut figures, config.cost_basis.modeling_per_sqft.structure);
        insert_figure(&mut figures, config.cost_basis.modeling_per_sqft.mepf);
        insert_figure(&mut figures, config.cost_basis.cad_export_per_sqft);
        insert_figure(&mut figures, config.cost_basis.georeferencing_flat);
        insert_figure(&mut figures, config.cost_basis.expedite_fee);
        insert_figure(&mut figures, config.cost_basis.travel_per_mile);

        // Zero is never a meaningful leak and shows up in ordinary prose.
        figures.remove("0");

        Self { figures }
    }

    fn contains(&self, value: &Decimal) -> bool {
        self.figures.contains(&normalize(*value))
    }
}

fn insert_figure(figures: &mut BTreeSet<String>, value: Decimal) {
    figures.insert(normalize(value));
}

fn normalize(value: Decimal) -> String {
    value.normalize().to_string()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisclosureViolation {
    pub leaked_numerals: Vec<String>,
}

/// Verifies the information-hiding invariant on an outgoing reply. This is
/// an information-flow contract, not a formatting preference: a reply that
/// contains any numeral equal to a sensitive figure is rejected even if the
/// number happens to be accurate.
#[derive(Clone, Copy, Debug, Default)]
pub struct DisclosureGuard;

impl DisclosureGuard {
    pub fn verify(text: &str, figures: &SensitiveFigures) -> Result<(), DisclosureViolation> {
        let mut leaked = Vec::new();

        for numeral in extract_numerals(text) {
            if let Ok(value) = numeral.parse::<Decimal>() {
                if figures.contains(&value) && !leaked.contains(&numeral) {
                    leaked.push(numeral);
                }
            }
        }

        if leaked.is_empty() {
            Ok(())
        } else {
            Err(DisclosureViolation { leaked_numerals: leaked })
        }
    }
}

/// Pulls candidate numerals out of free text: digit runs with optional
/// thousands separators, decimal points, currency and percent dressing.
fn extract_numerals(text: &str) -> Vec<String> {
    let mut numerals = Vec::new();
    let mut current = String::new();

    for character in text.chars() {
        if character.is_ascii_digit() || matches!(character, ',' | '.') {
            current.push(character);
        } else if !current.is_empty() {
            push_numeral(&mut numerals, &current);
            current.clear();
        }
    }
    if !current.is_empty() {
        push_numeral(&mut numerals, &current);
    }

    numerals
}

fn push_numeral(numerals: &mut Vec<String>, raw: &str) {
    let cleaned: String = raw.replace(',', "");
    let cleaned = cleaned.trim_matches('.');
    if cleaned.chars().any(|c| c.is_ascii_digit()) {
        numerals.push(cleaned.to_string());
    }
}
