use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::scoping::{Lod, ScopeAreaId};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShellId(pub String);

impl ShellId {
    pub fn generate() -> Self {
        Self(format!("shell-{}", uuid::Uuid::new_v4()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShellCategory {
    Modeling,
    AddOn,
    Travel,
    Discount,
    Summary,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Discipline {
    Architecture,
    Structure,
    Mepf,
}

impl Discipline {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Architecture => "architecture",
            Self::Structure => "structure",
            Self::Mepf => "MEPF",
        }
    }
}

/// Closed set of add-on pricing keys. The calculator resolves vendor cost
/// from the cost basis by kind rather than by matching description strings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddOnKind {
    Georeferencing,
    Expedite,
    CadExport,
    Custom,
}

/// One billable unit. Cost and price stay `None` until the pricing
/// calculator has run; aggregation refuses shells left unpriced.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemShell {
    pub id: ShellId,
    /// `None` marks a project-level item (travel, georeferencing, expedite).
    pub area_id: Option<ScopeAreaId>,
    pub category: ShellCategory,
    pub discipline: Option<Discipline>,
    pub description: String,
    pub square_feet: Option<u32>,
    pub lod: Option<Lod>,
    /// Travel shells only.
    pub one_way_miles: Option<u32>,
    /// Add-on shells only.
    pub add_on_kind: Option<AddOnKind>,
    pub is_primary: bool,
    pub vendor_cost: Option<Decimal>,
    pub client_price: Option<Decimal>,
}

impl LineItemShell {
    pub fn unpriced(
        area_id: Option<ScopeAreaId>,
        category: ShellCategory,
        discipline: Option<Discipline>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: ShellId::generate(),
            area_id,
            category,
            discipline,
            description: description.into(),
            square_feet: None,
            lod: None,
            one_way_miles: None,
            add_on_kind: None,
            is_primary: false,
            vendor_cost: None,
            client_price: None,
        }
    }

    pub fn is_priced(&self) -> bool {
        self.vendor_cost.is_some() && self.client_price.is_some()
    }

    /// Structural key used by determinism checks: everything that identifies
    /// the shell except its freshly allocated id and pricing fields.
    pub fn structural_key(&self) -> (Option<&str>, ShellCategory, Option<Discipline>, Option<u32>, Option<Lod>) {
        (
            self.area_id.as_ref().map(|id| id.0.as_str()),
            self.category,
            self.discipline,
            self.square_feet,
            self.lod,
        )
    }
}
