use rust_decimal::Decimal;

use crate::domain::scoping::{ScopeArea, ScopingRecord};
use crate::domain::shell::{AddOnKind, Discipline, LineItemShell, ShellCategory};

/// Decomposes a scoping record into an ordered list of unpriced line-item
/// shells. Pure: the (area, discipline, category) sequence is a function of
/// record content alone, so re-scoping and re-pricing stay reproducible and
/// diffable. Ids are freshly allocated on every run.
///
/// A record with zero areas and no project-level add-ons yields an empty
/// list; that is a valid state, not an error.
pub fn generate_shells(record: &ScopingRecord) -> Vec<LineItemShell> {
    let mut shells = Vec::new();

    for area in &record.areas {
        push_area_shells(&mut shells, area);
    }

    if record.georeferencing {
        let mut shell = LineItemShell::unpriced(
            None,
            ShellCategory::AddOn,
            None,
            "Georeferencing to survey control points",
        );
        shell.add_on_kind = Some(AddOnKind::Georeferencing);
        shells.push(shell);
    }

    if record.one_way_miles > 0 {
        let mode = record
            .travel_mode
            .map(|mode| mode.label())
            .unwrap_or("local drive");
        let mut shell = LineItemShell::unpriced(
            None,
            ShellCategory::Travel,
            None,
            format!("Travel - {mode}, {} miles one way", record.one_way_miles),
        );
        shell.one_way_miles = Some(record.one_way_miles);
        shells.push(shell);
    }

    if record.expedited {
        let mut shell =
            LineItemShell::unpriced(None, ShellCategory::AddOn, None, "Expedited delivery");
        shell.add_on_kind = Some(AddOnKind::Expedite);
        shells.push(shell);
    }

    designate_primary(&mut shells);
    shells
}

fn push_area_shells(shells: &mut Vec<LineItemShell>, area: &ScopeArea) {
    let mut architecture = LineItemShell::unpriced(
        Some(area.id.clone()),
        ShellCategory::Modeling,
        Some(Discipline::Architecture),
        format!(
            "Scan-to-BIM architecture model - {}, {} sqft, {}, {}",
            area.name,
            area.square_feet,
            area.lod,
            area.scope_mode.label()
        ),
    );
    architecture.square_feet = Some(area.square_feet);
    architecture.lod = Some(area.lod);
    shells.push(architecture);

    if area.structural.enabled {
        let sqft = area.structural_square_feet();
        let mut structure = LineItemShell::unpriced(
            Some(area.id.clone()),
            ShellCategory::Modeling,
            Some(Discipline::Structure),
            format!("Structural model - {}, {} sqft, {}", area.name, sqft, area.lod),
        );
        structure.square_feet = Some(sqft);
        structure.lod = Some(area.lod);
        shells.push(structure);
    }

    if area.mepf.enabled {
        let sqft = area.mepf_square_feet();
        let mut mepf = LineItemShell::unpriced(
            Some(area.id.clone()),
            ShellCategory::Modeling,
            Some(Discipline::Mepf),
            format!("MEPF model - {}, {} sqft, {}", area.name, sqft, area.lod),
        );
        mepf.square_feet = Some(sqft);
        mepf.lod = Some(area.lod);
        shells.push(mepf);
    }

    if area.cad_deliverable {
        let mut cad = LineItemShell::unpriced(
            Some(area.id.clone()),
            ShellCategory::AddOn,
            None,
            format!("2D CAD deliverable - {}", area.name),
        );
        cad.square_feet = Some(area.square_feet);
        cad.add_on_kind = Some(AddOnKind::CadExport);
        shells.push(cad);
    }

    for item in &area.custom_line_items {
        // Fixed amounts pass through as-is; the calculator never re-derives
        // them. Negative amounts are price reductions.
        let category = if item.amount < Decimal::ZERO {
            ShellCategory::Discount
        } else {
            ShellCategory::AddOn
        };
        let mut custom = LineItemShell::unpriced(
            Some(area.id.clone()),
            category,
            None,
            item.description.clone(),
        );
        custom.add_on_kind = Some(AddOnKind::Custom);
        custom.vendor_cost = Some(Decimal::ZERO);
        custom.client_price = Some(item.amount);
        shells.push(custom);
    }
}

/// The first architecture modeling shell carries the flagship Scan-to-Plan
/// deliverable. Projects without one (structure/MEP-only work) fall back to
/// the first emitted shell so every non-empty quote has exactly one primary.
fn designate_primary(shells: &mut [LineItemShell]) {
    let primary_index = shells
        .iter()
        .position(|shell| {
            shell.category == ShellCategory::Modeling
                && shell.discipline == Some(Discipline::Architecture)
        })
        .or(if shells.is_empty() { None } else { Some(0) });

    if let Some(index) = primary_index {
        shells[index].is_primary = true;
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::generate_shells;
    use crate::domain::scoping::{
        CustomLineItem, DisciplineScope, Lod, ScopeArea, ScopeAreaId, ScopeMode, ScopingRecord,
        ScopingRecordId, TravelMode,
    };
    use crate::domain::shell::{Discipline, ShellCategory};

    fn record() -> ScopingRecord {
        ScopingRecord {
            id: ScopingRecordId("rec-1".to_string()),
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
    fn full_record_emits_expected_sequence() {
        let shells = generate_shells(&record());

        let sequence: Vec<_> =
            shells.iter().map(|shell| (shell.category, shell.discipline)).collect();
        assert_eq!(
            sequence,
            vec![
                (ShellCategory::Modeling, Some(Discipline::Architecture)),
                (ShellCategory::Modeling, Some(Discipline::Structure)),
                (ShellCategory::Modeling, Some(Discipline::Mepf)),
                (ShellCategory::AddOn, None),
                (ShellCategory::Travel, None),
            ]
        );
        assert_eq!(shells[4].one_way_miles, Some(12));
        assert!(shells.iter().all(|shell| shell.vendor_cost.is_none() && shell.client_price.is_none()));
    }

    #[test]
    fn exactly_one_primary_shell() {
        let shells = generate_shells(&record());
        assert_eq!(shells.iter().filter(|shell| shell.is_primary).count(), 1);
        assert_eq!(shells[0].discipline, Some(Discipline::Architecture));
        assert!(shells[0].is_primary);
    }

    #[test]
    fn discipline_shells_fall_back_to_area_footage() {
        let mut record = record();
        record.areas[0].structural.square_feet = Some(20_000);
        let shells = generate_shells(&record);

        assert_eq!(shells[1].square_feet, Some(20_000));
        assert_eq!(shells[2].square_feet, Some(45_000));
    }

    #[test]
    fn custom_line_items_pass_through_priced() {
        let mut record = record();
        record.areas[0].custom_line_items.push(CustomLineItem {
            description: "Drone roof capture".to_string(),
            amount: Decimal::new(1_200, 0),
        });

        let shells = generate_shells(&record);
        let custom = shells
            .iter()
            .find(|shell| shell.description == "Drone roof capture")
            .expect("custom shell present");
        assert_eq!(custom.client_price, Some(Decimal::new(1_200, 0)));
        assert_eq!(custom.vendor_cost, Some(Decimal::ZERO));
        assert_eq!(custom.category, ShellCategory::AddOn);
    }

    #[test]
    fn empty_record_yields_empty_list() {
        let record = ScopingRecord {
            areas: Vec::new(),
            georeferencing: false,
            one_way_miles: 0,
            expedited: false,
            ..record()
        };
        assert!(generate_shells(&record).is_empty());
    }

    #[test]
    fn project_without_architecture_promotes_first_shell() {
        let mut record = record();
        record.areas.clear();
        record.one_way_miles = 0;
        // Only georeferencing remains.
        let shells = generate_shells(&record);
        assert_eq!(shells.len(), 1);
        assert!(shells[0].is_primary);
        assert_eq!(shells[0].category, ShellCategory::AddOn);
    }

    #[test]
    fn generation_is_deterministic_modulo_ids() {
        let record = record();
        let first: Vec<_> =
            generate_shells(&record).iter().map(|shell| shell.structural_key().1).collect();
        let second: Vec<_> =
            generate_shells(&record).iter().map(|shell| shell.structural_key().1).collect();
        assert_eq!(first, second);

        let full_first: Vec<_> = generate_shells(&record)
            .iter()
            .map(|shell| {
                (
                    shell.area_id.clone(),
                    shell.category,
                    shell.discipline,
                    shell.square_feet,
                    shell.lod,
                    shell.description.clone(),
                )
            })
            .collect();
        let full_second: Vec<_> = generate_shells(&record)
            .iter()
            .map(|shell| {
                (
                    shell.area_id.clone(),
                    shell.category,
                    shell.discipline,
                    shell.square_feet,
                    shell.lod,
                    shell.description.clone(),
                )
            })
            .collect();
        assert_eq!(full_first, full_second);
    }
}
