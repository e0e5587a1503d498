use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::{CostBasis, PricingRules};
use crate::domain::shell::{AddOnKind, Discipline, LineItemShell, ShellCategory};
use crate::errors::PricingError;

pub const FLAG_MINIMUM_VALUE_FLOOR: &str = "minimum_value_floor_applied";

/// Priced shells plus the flags the calculator raised along the way. Flags
/// are carried into the quote's integrity flags by the totals aggregator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingOutcome {
    pub shells: Vec<LineItemShell>,
    pub flags: Vec<String>,
}

/// Assigns vendor cost and client price to every shell.
///
/// Two-tier policy: the primary shell carries the full COGS multiplier;
/// every other shell is an add-on priced with a lean markup for its
/// category. Situational multipliers then scale the client side only, and a
/// minimum project value floor tops up the primary shell when the adjusted
/// total comes in under it.
pub fn price_shells(
    shells: Vec<LineItemShell>,
    cost_basis: &CostBasis,
    rules: &PricingRules,
) -> Result<PricingOutcome, PricingError> {
    let scan_days = scan_day_count(&shells, cost_basis);
    let mut priced = Vec::with_capacity(shells.len());

    for shell in shells {
        priced.push(price_shell(shell, cost_basis, rules, scan_days)?);
    }

    apply_multipliers(&mut priced, rules);

    let mut flags = Vec::new();
    apply_minimum_value_floor(&mut priced, rules, &mut flags);

    Ok(PricingOutcome { shells: priced, flags })
}

/// Scan days for the whole project: the crew captures every area's base
/// footage once, regardless of how many disciplines are modeled from the
/// point cloud. Always at least one day when anything is scanned.
pub fn scan_day_count(shells: &[LineItemShell], cost_basis: &CostBasis) -> u32 {
    let scanned_sqft: u64 = shells
        .iter()
        .filter(|shell| {
            shell.category == ShellCategory::Modeling
                && shell.discipline == Some(Discipline::Architecture)
        })
        .filter_map(|shell| shell.square_feet.map(u64::from))
        .sum();

    if scanned_sqft == 0 {
        return 0;
    }

    let throughput = u64::from(cost_basis.scan_day_throughput_sqft);
    u32::try_from(scanned_sqft.div_ceil(throughput)).unwrap_or(u32::MAX)
}

fn price_shell(
    mut shell: LineItemShell,
    cost_basis: &CostBasis,
    rules: &PricingRules,
    scan_days: u32,
) -> Result<LineItemShell, PricingError> {
    // Fixed amounts (custom line items, discounts) are never re-derived.
    if shell.client_price.is_some() {
        if shell.vendor_cost.is_none() {
            shell.vendor_cost = Some(Decimal::ZERO);
        }
        return Ok(shell);
    }

    if shell.category == ShellCategory::Discount {
        // A discount without a pre-set amount has nothing to derive from.
        return Err(PricingError::MissingCostBasis {
            shell_id: shell.id.clone(),
            description: shell.description.clone(),
        });
    }

    let vendor_cost = vendor_cost_for(&shell, cost_basis, scan_days)?;
    if vendor_cost < Decimal::ZERO {
        return Err(PricingError::InvalidCost { shell_id: shell.id.clone(), amount: vendor_cost });
    }

    let factor = if shell.is_primary { rules.cogs_multiplier } else { lean_markup(&shell, rules) };
    shell.vendor_cost = Some(vendor_cost);
    shell.client_price = Some((vendor_cost * factor).round_dp(2));
    Ok(shell)
}

fn vendor_cost_for(
    shell: &LineItemShell,
    cost_basis: &CostBasis,
    scan_days: u32,
) -> Result<Decimal, PricingError> {
    match shell.category {
        ShellCategory::Modeling => {
            let discipline = shell.discipline.ok_or_else(|| missing_cost_basis(shell))?;
            let sqft = shell.square_feet.ok_or_else(|| missing_cost_basis(shell))?;
            let modeling = cost_basis.modeling_rate(discipline) * Decimal::from(sqft);

            if shell.is_primary {
                // Field capture and point-cloud processing ride on the
                // flagship deliverable; add-on disciplines reuse the capture.
                let days = Decimal::from(scan_days);
                let labor = cost_basis.scan_day_rate * days;
                let processing = cost_basis.processing_per_scan_day * days;
                Ok(labor + modeling + processing)
            } else {
                Ok(modeling)
            }
        }
        ShellCategory::Travel => {
            let miles = shell.one_way_miles.ok_or_else(|| missing_cost_basis(shell))?;
            // Round trip per scan day; a single mobilization when pricing a
            // record that books no scan days.
            let trips = Decimal::from(scan_days.max(1)) * Decimal::from(2u32);
            Ok(cost_basis.travel_per_mile * Decimal::from(miles) * trips)
        }
        ShellCategory::AddOn => match shell.add_on_kind {
            Some(AddOnKind::Georeferencing) => Ok(cost_basis.georeferencing_flat),
            Some(AddOnKind::Expedite) => Ok(cost_basis.expedite_fee),
            Some(AddOnKind::CadExport) => {
                let sqft = shell.square_feet.ok_or_else(|| missing_cost_basis(shell))?;
                Ok(cost_basis.cad_export_per_sqft * Decimal::from(sqft))
            }
            // Custom add-ons arrive pre-priced and never reach this point.
            Some(AddOnKind::Custom) | None => Err(missing_cost_basis(shell)),
        },
        // Presentation rows carry no money of their own.
        ShellCategory::Summary => Ok(Decimal::ZERO),
        ShellCategory::Discount => Ok(Decimal::ZERO),
    }
}

fn lean_markup(shell: &LineItemShell, rules: &PricingRules) -> Decimal {
    match (shell.category, shell.discipline) {
        (ShellCategory::Modeling, Some(Discipline::Architecture)) => {
            rules.addon_markup.architecture_modeling
        }
        (ShellCategory::Modeling, Some(Discipline::Structure)) => {
            rules.addon_markup.structure_modeling
        }
        (ShellCategory::Modeling, Some(Discipline::Mepf)) => rules.addon_markup.mepf_modeling,
        (ShellCategory::Travel, _) => rules.addon_markup.travel,
        _ => rules.addon_markup.add_on,
    }
}

fn missing_cost_basis(shell: &LineItemShell) -> PricingError {
    PricingError::MissingCostBasis {
        shell_id: shell.id.clone(),
        description: shell.description.clone(),
    }
}

/// Each configured multiplier applies once, multiplicatively, to the client
/// side of the quote. Scaling every non-discount shell by the product is
/// arithmetically the same as scaling the client total, and keeps the line
/// items summing to the total they claim. Vendor cost is never touched:
/// multipliers represent pricing power, not cost changes.
fn apply_multipliers(shells: &mut [LineItemShell], rules: &PricingRules) {
    let product: Decimal =
        rules.multipliers.iter().map(|multiplier| multiplier.factor).product();
    if product == Decimal::ONE || rules.multipliers.is_empty() {
        return;
    }

    for shell in shells.iter_mut() {
        if shell.category == ShellCategory::Discount {
            continue;
        }
        if let Some(price) = shell.client_price {
            shell.client_price = Some((price * product).round_dp(2));
        }
    }
}

fn apply_minimum_value_floor(
    shells: &mut [LineItemShell],
    rules: &PricingRules,
    flags: &mut Vec<String>,
) {
    let adjusted_total: Decimal = shells.iter().filter_map(|shell| shell.client_price).sum();
    if adjusted_total >= rules.minimum_project_value || shells.is_empty() {
        return;
    }

    let Some(primary) = shells.iter_mut().find(|shell| shell.is_primary) else {
        return;
    };
    let Some(primary_price) = primary.client_price else {
        return;
    };

    let shortfall = rules.minimum_project_value - adjusted_total;
    primary.client_price = Some(primary_price + shortfall);
    flags.push(format!(
        "{FLAG_MINIMUM_VALUE_FLOOR}: raised client total from {adjusted_total} to {}",
        rules.minimum_project_value
    ));
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{price_shells, FLAG_MINIMUM_VALUE_FLOOR};
    use crate::config::{CostBasis, PricingRules};
    use crate::domain::quote::Multiplier;
    use crate::domain::scoping::{
        DisciplineScope, Lod, ScopeArea, ScopeAreaId, ScopeMode, ScopingRecord, ScopingRecordId,
        TravelMode,
    };
    use crate::domain::shell::{Discipline, LineItemShell, ShellCategory};
    use crate::engine::shells::generate_shells;
    use crate::errors::PricingError;

    fn fixture_record() -> ScopingRecord {
        ScopingRecord {
            id: ScopingRecordId("rec-accept-1".to_string()),
            company_name: "Meridian Builders".to_string(),
            project_name: "Harborview Tower".to_string(),
            floor_count: Some(3),
            one_way_miles: 12,
            travel_mode: Some(TravelMode::Local),
            risk_factors: Vec::new(),
            expedited: false,
            georeferencing: true,
            areas: vec![ScopeArea {
                id: ScopeAreaId("area-1".to_string()),
                name: "Floors 1-3 Office Space".to_string(),
                building_type: "office".to_string(),
                square_feet: 45_000,
                scope_mode: ScopeMode::Full,
                lod: Lod(300),
                structural: DisciplineScope { enabled: true, square_feet: None },
                mepf: DisciplineScope { enabled: true, square_feet: None },
                cad_deliverable: false,
                custom_line_items: Vec::new(),
            }],
        }
    }

    #[test]
    fn prices_acceptance_fixture_to_known_totals() {
        let shells = generate_shells(&fixture_record());
        let outcome = price_shells(shells, &CostBasis::default(), &PricingRules::default())
            .expect("fixture prices cleanly");

        let vendor: Decimal = outcome.shells.iter().filter_map(|s| s.vendor_cost).sum();
        let client: Decimal = outcome.shells.iter().filter_map(|s| s.client_price).sum();
        assert_eq!(vendor, Decimal::new(14_730, 0));
        assert_eq!(client, Decimal::new(29_800, 0));
        assert!(outcome.flags.is_empty());
    }

    #[test]
    fn primary_shell_carries_capture_and_processing_cost() {
        let shells = generate_shells(&fixture_record());
        let outcome = price_shells(shells, &CostBasis::default(), &PricingRules::default())
            .expect("fixture prices cleanly");

        // 5 scan days at 10k sqft/day: 5*800 labor + 45000*0.12 modeling + 5*150 processing.
        let primary = outcome.shells.iter().find(|s| s.is_primary).expect("primary present");
        assert_eq!(primary.vendor_cost, Some(Decimal::new(10_150, 0)));
        assert_eq!(primary.client_price, Some(Decimal::new(20_300, 0)));

        let structure = outcome
            .shells
            .iter()
            .find(|s| s.discipline == Some(Discipline::Structure))
            .expect("structure present");
        assert_eq!(structure.vendor_cost, Some(Decimal::new(2_700, 0)));
        assert_eq!(structure.client_price, Some(Decimal::new(5_400, 0)));
    }

    #[test]
    fn multipliers_scale_client_prices_but_not_vendor_cost() {
        let shells = generate_shells(&fixture_record());
        let baseline = price_shells(shells.clone(), &CostBasis::default(), &PricingRules::default())
            .expect("baseline");

        let mut rules = PricingRules::default();
        rules.multipliers = vec![
            Multiplier { name: "Rush".to_string(), factor: Decimal::new(125, 2) },
            Multiplier { name: "High-Risk Access".to_string(), factor: Decimal::new(110, 2) },
        ];
        let adjusted = price_shells(shells, &CostBasis::default(), &rules).expect("adjusted");

        let baseline_vendor: Decimal = baseline.shells.iter().filter_map(|s| s.vendor_cost).sum();
        let adjusted_vendor: Decimal = adjusted.shells.iter().filter_map(|s| s.vendor_cost).sum();
        assert_eq!(baseline_vendor, adjusted_vendor);

        let baseline_client: Decimal = baseline.shells.iter().filter_map(|s| s.client_price).sum();
        let adjusted_client: Decimal = adjusted.shells.iter().filter_map(|s| s.client_price).sum();
        assert_eq!(adjusted_client, (baseline_client * Decimal::new(1375, 3)).round_dp(2));
    }

    #[test]
    fn minimum_value_floor_inflates_only_the_primary_shell() {
        let mut record = fixture_record();
        record.areas[0].square_feet = 1_000;
        record.areas[0].structural.enabled = false;
        record.areas[0].mepf.enabled = false;
        record.georeferencing = false;
        record.one_way_miles = 0;

        let mut rules = PricingRules::default();
        rules.minimum_project_value = Decimal::new(3_500, 0);

        let shells = generate_shells(&record);
        let outcome =
            price_shells(shells, &CostBasis::default(), &rules).expect("floor prices cleanly");

        // 1 scan day: 800 + 120 + 150 = 1070 vendor, 2140 client before the floor.
        let primary = outcome.shells.iter().find(|s| s.is_primary).expect("primary");
        assert_eq!(primary.vendor_cost, Some(Decimal::new(1_070, 0)));
        assert_eq!(primary.client_price, Some(Decimal::new(3_500, 0)));

        let client: Decimal = outcome.shells.iter().filter_map(|s| s.client_price).sum();
        assert_eq!(client, Decimal::new(3_500, 0));
        assert!(outcome.flags.iter().any(|flag| flag.starts_with(FLAG_MINIMUM_VALUE_FLOOR)));
    }

    #[test]
    fn discount_shells_are_exempt_from_multipliers() {
        let mut discount =
            LineItemShell::unpriced(None, ShellCategory::Discount, None, "Repeat-client discount");
        discount.vendor_cost = Some(Decimal::ZERO);
        discount.client_price = Some(Decimal::new(-500, 0));
        let mut geo = LineItemShell::unpriced(None, ShellCategory::AddOn, None, "Georeferencing");
        geo.add_on_kind = Some(crate::domain::shell::AddOnKind::Georeferencing);
        geo.is_primary = true;

        let mut rules = PricingRules::default();
        rules.minimum_project_value = Decimal::ZERO;
        rules.multipliers =
            vec![Multiplier { name: "Rush".to_string(), factor: Decimal::new(2, 0) }];

        let outcome = price_shells(vec![geo, discount], &CostBasis::default(), &rules)
            .expect("prices cleanly");
        let discount_shell = outcome
            .shells
            .iter()
            .find(|s| s.category == ShellCategory::Discount)
            .expect("discount kept");
        assert_eq!(discount_shell.client_price, Some(Decimal::new(-500, 0)));
    }

    #[test]
    fn unpriceable_add_on_names_the_shell() {
        let orphan = LineItemShell::unpriced(None, ShellCategory::AddOn, None, "Mystery add-on");
        let orphan_id = orphan.id.clone();

        let error =
            price_shells(vec![orphan], &CostBasis::default(), &PricingRules::default())
                .expect_err("no cost basis for an unkinded add-on");
        assert_eq!(
            error,
            PricingError::MissingCostBasis {
                shell_id: orphan_id,
                description: "Mystery add-on".to_string()
            }
        );
    }
}
