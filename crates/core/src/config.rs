use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::quote::Multiplier;
use crate::domain::shell::Discipline;

/// Effective application configuration. The pricing section is the
/// versionable rate card supplied by the pricing-configuration store; the
/// engine receives it as immutable input on every call.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub llm: LlmConfig,
    pub pricing: PricingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub enabled: bool,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

/// Cost basis + pricing rules, loaded together because quoting is only
/// meaningful with both halves present and mutually validated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PricingConfig {
    pub cost_basis: CostBasis,
    pub rules: PricingRules,
}

/// Vendor-side unit costs. All figures are configuration, not algorithmic
/// truths; the defaults carry the conservative end of the observed ranges.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CostBasis {
    /// Square feet one crew captures per scan day under standard conditions.
    pub scan_day_throughput_sqft: u32,
    pub scan_day_rate: Decimal,
    pub processing_per_scan_day: Decimal,
    pub modeling_per_sqft: ModelingRates,
    pub cad_export_per_sqft: Decimal,
    pub georeferencing_flat: Decimal,
    pub expedite_fee: Decimal,
    pub travel_per_mile: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelingRates {
    pub architecture: Decimal,
    pub structure: Decimal,
    pub mepf: Decimal,
}

impl CostBasis {
    pub fn modeling_rate(&self, discipline: Discipline) -> Decimal {
        match discipline {
            Discipline::Architecture => self.modeling_per_sqft.architecture,
            Discipline::Structure => self.modeling_per_sqft.structure,
            Discipline::Mepf => self.modeling_per_sqft.mepf,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PricingRules {
    /// Full multiplier applied to the primary shell's vendor cost.
    pub cogs_multiplier: Decimal,
    pub addon_markup: AddonMarkups,
    pub minimum_project_value: Decimal,
    pub multipliers: Vec<Multiplier>,
    pub margin: MarginRules,
}

/// Lean markups for everything that is not the primary shell, keyed by the
/// pricing category the calculator resolves for the shell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddonMarkups {
    /// Non-primary architecture shells (second and later scope areas).
    pub architecture_modeling: Decimal,
    pub structure_modeling: Decimal,
    pub mepf_modeling: Decimal,
    pub add_on: Decimal,
    pub travel: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarginRules {
    /// Margin percent strictly below this classifies as blocked.
    pub blocked_below: Decimal,
    /// Margin percent strictly below this (and at/above blocked_below)
    /// classifies as warning. Boundaries are inclusive-upper: a margin equal
    /// to a threshold lands in the better bucket.
    pub warn_below: Decimal,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://scanquote.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
            llm: LlmConfig {
                enabled: false,
                api_key: None,
                base_url: None,
                model: "llama3.1".to_string(),
                timeout_secs: 30,
            },
            pricing: PricingConfig::default(),
        }
    }
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self { cost_basis: CostBasis::default(), rules: PricingRules::default() }
    }
}

impl Default for CostBasis {
    fn default() -> Self {
        Self {
            scan_day_throughput_sqft: 10_000,
            scan_day_rate: Decimal::new(800, 0),
            processing_per_scan_day: Decimal::new(150, 0),
            modeling_per_sqft: ModelingRates {
                architecture: Decimal::new(12, 2),
                structure: Decimal::new(6, 2),
                mepf: Decimal::new(3, 2),
            },
            cad_export_per_sqft: Decimal::new(2, 2),
            georeferencing_flat: Decimal::new(350, 0),
            expedite_fee: Decimal::new(500, 0),
            travel_per_mile: Decimal::new(150, 2),
        }
    }
}

impl Default for PricingRules {
    fn default() -> Self {
        Self {
            cogs_multiplier: Decimal::new(20, 1),
            addon_markup: AddonMarkups {
                architecture_modeling: Decimal::new(20, 1),
                structure_modeling: Decimal::new(20, 1),
                mepf_modeling: Decimal::new(22, 1),
                add_on: Decimal::new(22, 1),
                travel: Decimal::new(20, 1),
            },
            minimum_project_value: Decimal::new(3_500, 0),
            multipliers: Vec::new(),
            margin: MarginRules {
                blocked_below: Decimal::new(35, 0),
                warn_below: Decimal::new(45, 0),
            },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("scanquote.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(enabled) = llm.enabled {
                self.llm.enabled = enabled;
            }
            if let Some(api_key) = llm.api_key {
                self.llm.api_key = Some(api_key.into());
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
        }

        if let Some(pricing) = patch.pricing {
            self.pricing.apply_patch(pricing);
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("SCANQUOTE_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("SCANQUOTE_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("SCANQUOTE_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("SCANQUOTE_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("SCANQUOTE_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("SCANQUOTE_LOGGING_LEVEL") {
            self.logging.level = value;
        }
        if let Some(value) = read_env("SCANQUOTE_LOGGING_FORMAT") {
            self.logging.format = value.parse()?;
        }

        if let Some(value) = read_env("SCANQUOTE_LLM_API_KEY") {
            self.llm.api_key = Some(value.into());
        }
        if let Some(value) = read_env("SCANQUOTE_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("SCANQUOTE_LLM_MODEL") {
            self.llm.model = value;
        }

        if let Some(value) = read_env("SCANQUOTE_PRICING_COGS_MULTIPLIER") {
            self.pricing.rules.cogs_multiplier =
                parse_decimal("SCANQUOTE_PRICING_COGS_MULTIPLIER", &value)?;
        }
        if let Some(value) = read_env("SCANQUOTE_PRICING_MINIMUM_PROJECT_VALUE") {
            self.pricing.rules.minimum_project_value =
                parse_decimal("SCANQUOTE_PRICING_MINIMUM_PROJECT_VALUE", &value)?;
        }
        if let Some(value) = read_env("SCANQUOTE_PRICING_BLOCKED_BELOW") {
            self.pricing.rules.margin.blocked_below =
                parse_decimal("SCANQUOTE_PRICING_BLOCKED_BELOW", &value)?;
        }
        if let Some(value) = read_env("SCANQUOTE_PRICING_WARN_BELOW") {
            self.pricing.rules.margin.warn_below =
                parse_decimal("SCANQUOTE_PRICING_WARN_BELOW", &value)?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_llm(&self.llm)?;
        self.pricing.validate()?;
        Ok(())
    }
}

impl PricingConfig {
    fn apply_patch(&mut self, patch: PricingPatch) {
        if let Some(cost_basis) = patch.cost_basis {
            let target = &mut self.cost_basis;
            if let Some(value) = cost_basis.scan_day_throughput_sqft {
                target.scan_day_throughput_sqft = value;
            }
            if let Some(value) = cost_basis.scan_day_rate {
                target.scan_day_rate = value;
            }
            if let Some(value) = cost_basis.processing_per_scan_day {
                target.processing_per_scan_day = value;
            }
            if let Some(rates) = cost_basis.modeling_per_sqft {
                if let Some(value) = rates.architecture {
                    target.modeling_per_sqft.architecture = value;
                }
                if let Some(value) = rates.structure {
                    target.modeling_per_sqft.structure = value;
                }
                if let Some(value) = rates.mepf {
                    target.modeling_per_sqft.mepf = value;
                }
            }
            if let Some(value) = cost_basis.cad_export_per_sqft {
                target.cad_export_per_sqft = value;
            }
            if let Some(value) = cost_basis.georeferencing_flat {
                target.georeferencing_flat = value;
            }
            if let Some(value) = cost_basis.expedite_fee {
                target.expedite_fee = value;
            }
            if let Some(value) = cost_basis.travel_per_mile {
                target.travel_per_mile = value;
            }
        }

        if let Some(rules) = patch.rules {
            let target = &mut self.rules;
            if let Some(value) = rules.cogs_multiplier {
                target.cogs_multiplier = value;
            }
            if let Some(markup) = rules.addon_markup {
                if let Some(value) = markup.architecture_modeling {
                    target.addon_markup.architecture_modeling = value;
                }
                if let Some(value) = markup.structure_modeling {
                    target.addon_markup.structure_modeling = value;
                }
                if let Some(value) = markup.mepf_modeling {
                    target.addon_markup.mepf_modeling = value;
                }
                if let Some(value) = markup.add_on {
                    target.addon_markup.add_on = value;
                }
                if let Some(value) = markup.travel {
                    target.addon_markup.travel = value;
                }
            }
            if let Some(value) = rules.minimum_project_value {
                target.minimum_project_value = value;
            }
            if let Some(multipliers) = rules.multipliers {
                target.multipliers = multipliers
                    .into_iter()
                    .map(|entry| Multiplier { name: entry.name, factor: entry.factor })
                    .collect();
            }
            if let Some(margin) = rules.margin {
                if let Some(value) = margin.blocked_below {
                    target.margin.blocked_below = value;
                }
                if let Some(value) = margin.warn_below {
                    target.margin.warn_below = value;
                }
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_cost_basis(&self.cost_basis)?;
        validate_rules(&self.rules)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("scanquote.toml"), PathBuf::from("config/scanquote.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    toml::from_str::<ConfigPatch>(&raw)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() })
}

fn parse_decimal(key: &str, value: &str) -> Result<Decimal, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() })
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if !llm.enabled {
        return Ok(());
    }

    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if llm.base_url.as_deref().map(str::trim).filter(|url| !url.is_empty()).is_none() {
        return Err(ConfigError::Validation(
            "llm.base_url is required when llm.enabled is true".to_string(),
        ));
    }

    Ok(())
}

fn validate_cost_basis(cost_basis: &CostBasis) -> Result<(), ConfigError> {
    if cost_basis.scan_day_throughput_sqft == 0 {
        return Err(ConfigError::Validation(
            "cost_basis.scan_day_throughput_sqft must be greater than zero".to_string(),
        ));
    }

    let positive_entries = [
        ("scan_day_rate", cost_basis.scan_day_rate),
        ("processing_per_scan_day", cost_basis.processing_per_scan_day),
        ("modeling_per_sqft.architecture", cost_basis.modeling_per_sqft.architecture),
        ("modeling_per_sqft.structure", cost_basis.modeling_per_sqft.structure),
        ("modeling_per_sqft.mepf", cost_basis.modeling_per_sqft.mepf),
        ("cad_export_per_sqft", cost_basis.cad_export_per_sqft),
        ("georeferencing_flat", cost_basis.georeferencing_flat),
        ("expedite_fee", cost_basis.expedite_fee),
        ("travel_per_mile", cost_basis.travel_per_mile),
    ];

    for (name, value) in positive_entries {
        if value <= Decimal::ZERO {
            return Err(ConfigError::Validation(format!(
                "cost_basis.{name} must be greater than zero"
            )));
        }
    }

    Ok(())
}

fn validate_rules(rules: &PricingRules) -> Result<(), ConfigError> {
    if rules.cogs_multiplier <= Decimal::ONE {
        return Err(ConfigError::Validation(
            "rules.cogs_multiplier must be greater than 1".to_string(),
        ));
    }

    let markups = [
        ("architecture_modeling", rules.addon_markup.architecture_modeling),
        ("structure_modeling", rules.addon_markup.structure_modeling),
        ("mepf_modeling", rules.addon_markup.mepf_modeling),
        ("add_on", rules.addon_markup.add_on),
        ("travel", rules.addon_markup.travel),
    ];
    for (name, factor) in markups {
        if factor < Decimal::ONE {
            return Err(ConfigError::Validation(format!(
                "rules.addon_markup.{name} must be at least 1 (add-ons are never sold below vendor cost)"
            )));
        }
    }

    if rules.minimum_project_value < Decimal::ZERO {
        return Err(ConfigError::Validation(
            "rules.minimum_project_value must not be negative".to_string(),
        ));
    }

    let mut seen_names = BTreeSet::new();
    for multiplier in &rules.multipliers {
        if multiplier.factor <= Decimal::ZERO {
            return Err(ConfigError::Validation(format!(
                "multiplier `{}` must have a positive factor",
                multiplier.name
            )));
        }
        if !seen_names.insert(multiplier.name.trim().to_ascii_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate multiplier name `{}`",
                multiplier.name
            )));
        }
    }

    if rules.margin.blocked_below >= rules.margin.warn_below {
        return Err(ConfigError::Validation(
            "rules.margin.blocked_below must be strictly below warn_below".to_string(),
        ));
    }

    Ok(())
}

#[derive(Debug, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    logging: Option<LoggingPatch>,
    llm: Option<LlmPatch>,
    pricing: Option<PricingPatch>,
}

#[derive(Debug, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[derive(Debug, Deserialize)]
struct LlmPatch {
    enabled: Option<bool>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct PricingPatch {
    cost_basis: Option<CostBasisPatch>,
    rules: Option<RulesPatch>,
}

#[derive(Debug, Deserialize)]
struct CostBasisPatch {
    scan_day_throughput_sqft: Option<u32>,
    scan_day_rate: Option<Decimal>,
    processing_per_scan_day: Option<Decimal>,
    modeling_per_sqft: Option<ModelingRatesPatch>,
    cad_export_per_sqft: Option<Decimal>,
    georeferencing_flat: Option<Decimal>,
    expedite_fee: Option<Decimal>,
    travel_per_mile: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
struct ModelingRatesPatch {
    architecture: Option<Decimal>,
    structure: Option<Decimal>,
    mepf: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
struct RulesPatch {
    cogs_multiplier: Option<Decimal>,
    addon_markup: Option<AddonMarkupPatch>,
    minimum_project_value: Option<Decimal>,
    multipliers: Option<Vec<MultiplierPatch>>,
    margin: Option<MarginPatch>,
}

#[derive(Debug, Deserialize)]
struct AddonMarkupPatch {
    architecture_modeling: Option<Decimal>,
    structure_modeling: Option<Decimal>,
    mepf_modeling: Option<Decimal>,
    add_on: Option<Decimal>,
    travel: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
struct MultiplierPatch {
    name: String,
    factor: Decimal,
}

#[derive(Debug, Deserialize)]
struct MarginPatch {
    blocked_below: Option<Decimal>,
    warn_below: Option<Decimal>,
}
