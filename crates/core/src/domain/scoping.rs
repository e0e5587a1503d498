use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopingRecordId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeAreaId(pub String);

/// BIM level-of-detail tier (200, 300, 350, ...).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Lod(pub u16);

impl std::fmt::Display for Lod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LOD {}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeMode {
    Full,
    InteriorOnly,
    ExteriorOnly,
    Mixed,
}

impl ScopeMode {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Full => "full interior + exterior",
            Self::InteriorOnly => "interior only",
            Self::ExteriorOnly => "exterior only",
            Self::Mixed => "mixed scope",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TravelMode {
    Local,
    Overnight,
    Flight,
}

impl TravelMode {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Local => "local drive",
            Self::Overnight => "overnight stay",
            Self::Flight => "flight",
        }
    }
}

/// Per-discipline opt-in on a scope area. When `square_feet` is unset the
/// area's own footage is used.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DisciplineScope {
    pub enabled: bool,
    pub square_feet: Option<u32>,
}

/// Free-text line item carried through to the quote with its amount fixed by
/// the scoper, never re-derived by the pricing calculator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomLineItem {
    pub description: String,
    pub amount: Decimal,
}

/// A physical subdivision of the project ("Floors 1-3 Office Space").
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeArea {
    pub id: ScopeAreaId,
    pub name: String,
    pub building_type: String,
    pub square_feet: u32,
    pub scope_mode: ScopeMode,
    pub lod: Lod,
    #[serde(default)]
    pub structural: DisciplineScope,
    #[serde(default)]
    pub mepf: DisciplineScope,
    #[serde(default)]
    pub cad_deliverable: bool,
    #[serde(default)]
    pub custom_line_items: Vec<CustomLineItem>,
}

impl ScopeArea {
    pub fn structural_square_feet(&self) -> u32 {
        self.structural.square_feet.unwrap_or(self.square_feet)
    }

    pub fn mepf_square_feet(&self) -> u32 {
        self.mepf.square_feet.unwrap_or(self.square_feet)
    }
}

/// One customer project under consideration. Owned by the intake service;
/// the engine treats it as read-only input per call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopingRecord {
    pub id: ScopingRecordId,
    pub company_name: String,
    pub project_name: String,
    #[serde(default)]
    pub floor_count: Option<u32>,
    #[serde(default)]
    pub one_way_miles: u32,
    #[serde(default)]
    pub travel_mode: Option<TravelMode>,
    #[serde(default)]
    pub risk_factors: Vec<String>,
    #[serde(default)]
    pub expedited: bool,
    #[serde(default)]
    pub georeferencing: bool,
    pub areas: Vec<ScopeArea>,
}

impl ScopingRecord {
    /// Total base square footage across all areas. Drives the scan-day
    /// estimate: the crew scans the building once regardless of how many
    /// modeling disciplines are derived from the capture.
    pub fn total_square_feet(&self) -> u64 {
        self.areas.iter().map(|area| u64::from(area.square_feet)).sum()
    }
}
