//! Conversational quoting protocol.
//!
//! This crate is the dialogue-driven entry point into the pricing engine:
//! - **Scope extraction** (`conversation`) - parse free text into a
//!   structured `ScopeDraft`
//! - **Session protocol** (`protocol`) - the Clarifying -> Ready ->
//!   Presented state machine, driving the core engine and revision store
//! - **Disclosure guardrails** (`guardrails`) - the information-hiding
//!   invariant, enforced on every outgoing reply
//! - **Model integration** (`llm`) - pluggable hosted-model client with
//!   deterministic fallback
//!
//! # Safety principle
//!
//! The model is strictly a translator of scope language. It never decides a
//! price, a multiplier, or an integrity status; those are deterministic
//! outputs of the core engine. Vendor cost, the COGS multiplier, margin
//! figures, and per-discipline cost breakdowns exist only inside the
//! structured quote payload consumed by the quote UI. They are never
//! rendered into conversational text, and `guardrails` treats any numeral
//! collision with those figures as a protocol bug regardless of accuracy.

pub mod conversation;
pub mod guardrails;
pub mod llm;
pub mod protocol;
pub mod runtime;
