use rust_decimal::Decimal;

use scanquote_core::domain::scoping::{
    DisciplineScope, Lod, ScopeArea, ScopeAreaId, ScopeMode, ScopingRecord, ScopingRecordId,
    TravelMode,
};
use scanquote_core::domain::shell::{Discipline, ShellCategory};
use scanquote_core::{IntegrityStatus, PricingConfig, QuoteEngine};

fn acceptance_record() -> ScopingRecord {
    ScopingRecord {
        id: ScopingRecordId("rec-harborview".to_string()),
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
fn acceptance_scenario_prices_and_classifies() {
    let engine = QuoteEngine::new(PricingConfig::default());
    let draft = engine.build_quote(&acceptance_record()).expect("acceptance record prices");

    let sequence: Vec<_> = draft
        .line_items
        .iter()
        .map(|shell| (shell.category, shell.discipline, shell.is_primary))
        .collect();
    assert_eq!(
        sequence,
        vec![
            (ShellCategory::Modeling, Some(Discipline::Architecture), true),
            (ShellCategory::Modeling, Some(Discipline::Structure), false),
            (ShellCategory::Modeling, Some(Discipline::Mepf), false),
            (ShellCategory::AddOn, None, false),
            (ShellCategory::Travel, None, false),
        ]
    );

    assert_eq!(draft.totals.total_client_price, Decimal::new(29_800, 0));
    assert_eq!(draft.totals.total_vendor_cost, Decimal::new(14_730, 0));
    assert_eq!(draft.totals.gross_margin_percent, Decimal::new(5_057, 2));
    assert_eq!(draft.totals.integrity_status, IntegrityStatus::Passed);
    assert!(draft.totals.integrity_flags.is_empty());
}

#[test]
fn margin_identity_holds_for_the_priced_quote() {
    let engine = QuoteEngine::new(PricingConfig::default());
    let draft = engine.build_quote(&acceptance_record()).expect("acceptance record prices");
    let totals = &draft.totals;

    let recomputed = ((totals.total_client_price - totals.total_vendor_cost)
        / totals.total_client_price
        * Decimal::ONE_HUNDRED)
        .round_dp(2);
    assert_eq!(totals.gross_margin_percent, recomputed);
}

#[test]
fn repeated_builds_are_structurally_identical() {
    let engine = QuoteEngine::new(PricingConfig::default());
    let record = acceptance_record();

    let first = engine.build_quote(&record).expect("first build");
    let second = engine.build_quote(&record).expect("second build");

    let strip_ids = |draft: &scanquote_core::DraftQuote| {
        draft
            .line_items
            .iter()
            .map(|shell| {
                (
                    shell.area_id.clone(),
                    shell.category,
                    shell.discipline,
                    shell.square_feet,
                    shell.lod,
                    shell.vendor_cost,
                    shell.client_price,
                )
            })
            .collect::<Vec<_>>()
    };

    assert_eq!(strip_ids(&first), strip_ids(&second));
    assert_eq!(first.totals, second.totals);
}
