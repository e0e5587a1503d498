use scanquote_core::domain::scoping::{
    DisciplineScope, Lod, ScopeArea, ScopeAreaId, ScopeMode, ScopingRecord, ScopingRecordId,
    TravelMode,
};

/// Scope fields accumulated across conversation turns. A draft becomes
/// priceable once the minimum set (square footage, building type,
/// deliverable LOD, timeline) is known; everything else defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScopeDraft {
    pub square_feet: Option<u32>,
    pub building_type: Option<String>,
    pub lod: Option<Lod>,
    pub scope_mode: Option<ScopeMode>,
    pub timeline: Option<String>,
    pub structural: bool,
    pub mepf: bool,
    pub georeferencing: bool,
    pub expedited: bool,
    pub one_way_miles: Option<u32>,
    pub travel_mode: Option<TravelMode>,
}

impl ScopeDraft {
    /// Folds a newer extraction into this draft. Later mentions win for
    /// scalar fields; boolean opt-ins are sticky. Returns whether anything
    /// changed, which is what re-opens a presented session.
    pub fn merge(&mut self, newer: &ScopeDraft) -> bool {
        let before = self.clone();

        if newer.square_feet.is_some() {
            self.square_feet = newer.square_feet;
        }
        if newer.building_type.is_some() {
            self.building_type = newer.building_type.clone();
        }
        if newer.lod.is_some() {
            self.lod = newer.lod;
        }
        if newer.scope_mode.is_some() {
            self.scope_mode = newer.scope_mode;
        }
        if newer.timeline.is_some() {
            self.timeline = newer.timeline.clone();
        }
        if newer.one_way_miles.is_some() {
            self.one_way_miles = newer.one_way_miles;
        }
        if newer.travel_mode.is_some() {
            self.travel_mode = newer.travel_mode;
        }
        self.structural |= newer.structural;
        self.mepf |= newer.mepf;
        self.georeferencing |= newer.georeferencing;
        self.expedited |= newer.expedited;

        *self != before
    }

    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.square_feet.is_none() {
            missing.push("square footage");
        }
        if self.building_type.is_none() {
            missing.push("building type");
        }
        if self.lod.is_none() {
            missing.push("deliverable level of detail");
        }
        if self.timeline.is_none() {
            missing.push("timeline");
        }
        missing
    }

    pub fn is_ready(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// Materializes the draft as a single-area scoping record, the same
    /// shape the intake service produces for form-driven quotes.
    pub fn to_scoping_record(&self, record_id: &ScopingRecordId) -> ScopingRecord {
        let building_type =
            self.building_type.clone().unwrap_or_else(|| "unspecified".to_string());

        ScopingRecord {
            id: record_id.clone(),
            company_name: String::new(),
            project_name: format!("Conversational quote ({building_type})"),
            floor_count: None,
            one_way_miles: self.one_way_miles.unwrap_or(0),
            travel_mode: self.travel_mode,
            risk_factors: Vec::new(),
            expedited: self.expedited,
            georeferencing: self.georeferencing,
            areas: vec![ScopeArea {
                id: ScopeAreaId(format!("{}-area-1", record_id.0)),
                name: "Primary scope area".to_string(),
                building_type,
                square_feet: self.square_feet.unwrap_or(0),
                scope_mode: self.scope_mode.unwrap_or(ScopeMode::Full),
                lod: self.lod.unwrap_or(Lod(300)),
                structural: DisciplineScope { enabled: self.structural, square_feet: None },
                mepf: DisciplineScope { enabled: self.mepf, square_feet: None },
                cad_deliverable: false,
                custom_line_items: Vec::new(),
            }],
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ScopeExtractor;

impl ScopeExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, text: &str) -> ScopeDraft {
        let normalized_text = normalize_text(text);
        let tokens = tokenize(&normalized_text);

        ScopeDraft {
            square_feet: extract_square_feet(&tokens),
            building_type: extract_building_type(&normalized_text),
            lod: extract_lod(&tokens),
            scope_mode: extract_scope_mode(&normalized_text),
            timeline: extract_timeline(&normalized_text),
            structural: normalized_text.contains("structur"),
            mepf: normalized_text.contains("mepf")
                || normalized_text.contains("mep ")
                || normalized_text.ends_with("mep")
                || normalized_text.contains("mechanical"),
            georeferencing: normalized_text.contains("georeferenc")
                || normalized_text.contains("survey control"),
            expedited: normalized_text.contains("rush")
                || normalized_text.contains("expedite")
                || normalized_text.contains("asap"),
            one_way_miles: extract_miles(&tokens),
            travel_mode: extract_travel_mode(&normalized_text),
        }
    }
}

fn normalize_text(text: &str) -> String {
    text.to_ascii_lowercase()
}

fn tokenize(text: &str) -> Vec<String> {
    let mut sanitized = String::with_capacity(text.len());
    for character in text.chars() {
        // Commas stay so "45,000" survives as one token.
        if character.is_ascii_alphanumeric() || matches!(character, '.' | ',' | 'k' | 'm') {
            sanitized.push(character);
        } else {
            sanitized.push(' ');
        }
    }
    sanitized
        .split_whitespace()
        .map(|token| token.trim_matches(|c| c == ',' || c == '.').to_string())
        .filter(|token| !token.is_empty())
        .collect()
}

fn parse_count_token(token: &str) -> Option<u32> {
    let trimmed = token.replace(',', "");
    let trimmed = trimmed.as_str();
    let (number_part, multiplier) = if let Some(prefix) = trimmed.strip_suffix('k') {
        (prefix, 1_000.0)
    } else if let Some(prefix) = trimmed.strip_suffix('m') {
        (prefix, 1_000_000.0)
    } else {
        (trimmed, 1.0)
    };

    let amount = number_part.parse::<f64>().ok()?;
    if amount <= 0.0 {
        return None;
    }
    Some((amount * multiplier).round() as u32)
}

fn is_sqft_unit(token: &str) -> bool {
    matches!(token, "sqft" | "sf" | "sq" | "square" | "sqft.")
}

fn extract_square_feet(tokens: &[String]) -> Option<u32> {
    for window in tokens.windows(2) {
        if let [value, unit] = window {
            if is_sqft_unit(unit) {
                if let Some(sqft) = parse_count_token(value) {
                    return Some(sqft);
                }
            }
        }
    }
    None
}

fn extract_building_type(normalized_text: &str) -> Option<String> {
    let known_types = [
        "office",
        "warehouse",
        "hospital",
        "school",
        "retail",
        "residential",
        "industrial",
        "hotel",
        "church",
        "parking",
        "mixed-use",
        "mixed use",
    ];

    known_types
        .iter()
        .find(|building_type| normalized_text.contains(**building_type))
        .map(|building_type| building_type.replace(' ', "-"))
}

fn extract_lod(tokens: &[String]) -> Option<Lod> {
    for (index, token) in tokens.iter().enumerate() {
        if let Some(raw) = token.strip_prefix("lod") {
            if let Ok(level) = raw.parse::<u16>() {
                return Some(Lod(level));
            }
            if raw.is_empty() {
                if let Some(next) = tokens.get(index + 1) {
                    if let Ok(level) = next.parse::<u16>() {
                        return Some(Lod(level));
                    }
                }
            }
        }
    }
    None
}

fn extract_scope_mode(normalized_text: &str) -> Option<ScopeMode> {
    if normalized_text.contains("interior only") || normalized_text.contains("inside only") {
        Some(ScopeMode::InteriorOnly)
    } else if normalized_text.contains("exterior only")
        || normalized_text.contains("outside only")
        || normalized_text.contains("facade only")
    {
        Some(ScopeMode::ExteriorOnly)
    } else if normalized_text.contains("inside and out")
        || normalized_text.contains("full scope")
        || normalized_text.contains("interior and exterior")
    {
        Some(ScopeMode::Full)
    } else {
        None
    }
}

fn extract_timeline(normalized_text: &str) -> Option<String> {
    let timeline_patterns = [
        "this week",
        "next week",
        "this month",
        "next month",
        "this quarter",
        "next quarter",
        "q1",
        "q2",
        "q3",
        "q4",
        "asap",
        "end of month",
        "end of year",
        "by friday",
        "by monday",
        "weeks out",
    ];

    timeline_patterns
        .iter()
        .find(|pattern| normalized_text.contains(**pattern))
        .map(|pattern| (*pattern).to_string())
}

fn extract_miles(tokens: &[String]) -> Option<u32> {
    for window in tokens.windows(2) {
        if let [value, unit] = window {
            if matches!(unit.as_str(), "miles" | "mile" | "mi") {
                if let Some(miles) = parse_count_token(value) {
                    return Some(miles);
                }
            }
        }
    }
    None
}

fn extract_travel_mode(normalized_text: &str) -> Option<TravelMode> {
    if normalized_text.contains("flight") || normalized_text.contains("fly ") {
        Some(TravelMode::Flight)
    } else if normalized_text.contains("overnight") {
        Some(TravelMode::Overnight)
    } else if normalized_text.contains("drive") || normalized_text.contains("local") {
        Some(TravelMode::Local)
    } else {
        None
    }
}
