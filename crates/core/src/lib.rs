pub mod config;
pub mod domain;
pub mod engine;
pub mod errors;
pub mod proposal;
pub mod store;

pub use config::{
    AppConfig, ConfigError, CostBasis, LoadOptions, MarginRules, PricingConfig, PricingRules,
};
pub use domain::quote::{DraftQuote, IntegrityStatus, Multiplier, Quote, QuoteId, QuoteTotals};
pub use domain::scoping::{
    CustomLineItem, DisciplineScope, Lod, ScopeArea, ScopeAreaId, ScopeMode, ScopingRecord,
    ScopingRecordId, TravelMode,
};
pub use domain::shell::{AddOnKind, Discipline, LineItemShell, ShellCategory, ShellId};
pub use engine::{generate_shells, price_shells, QuoteEngine};
pub use errors::PricingError;
pub use proposal::{ProposalDecision, ProposalGate};
pub use store::{content_fingerprint, seal_revision, QuoteRevisionStore, RevisionStoreError};
