use serde::{Deserialize, Serialize};
use thiserror::Error;

use scanquote_core::domain::quote::{Multiplier, Quote};
use scanquote_core::domain::scoping::ScopingRecordId;
use scanquote_core::engine::QuoteEngine;
use scanquote_core::errors::PricingError;
use scanquote_core::store::{QuoteRevisionStore, RevisionStoreError};

use crate::conversation::{ScopeDraft, ScopeExtractor};
use crate::guardrails::{DisclosureGuard, SensitiveFigures};

/// Dialogue states. There is no terminal state; the loop runs until the
/// session ends externally.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Not enough scope information to price.
    Clarifying,
    /// Minimum scope fields are known; the next turn can price.
    Ready,
    /// A quote has been generated and summarized. Any scope change re-opens
    /// the session.
    Presented,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptTurn {
    pub role: Role,
    pub text: String,
}

/// The typed data channel of the two-channel output. Everything internal
/// (vendor cost, margin, multipliers) travels here, consumed by the quote
/// UI; the accompanying text channel never carries those figures.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotePayload {
    pub quote: Quote,
    pub applied_multipliers: Vec<Multiplier>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionReply {
    Clarify { question: String },
    Quoted { summary: String, payload: QuotePayload },
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error(transparent)]
    Pricing(#[from] PricingError),
    #[error(transparent)]
    Store(#[from] RevisionStoreError),
}

/// One conversational quoting session for one scoping record.
///
/// Each priced turn appends a new quote version; a stale-version conflict
/// from a concurrent writer is recovered once by refetching the latest
/// version and recomputing against it.
#[derive(Clone, Debug)]
pub struct QuoteSession {
    record_id: ScopingRecordId,
    state: SessionState,
    draft: ScopeDraft,
    based_on_version: u32,
    extractor: ScopeExtractor,
}

impl QuoteSession {
    pub fn new(record_id: ScopingRecordId) -> Self {
        Self {
            record_id,
            state: SessionState::Clarifying,
            draft: ScopeDraft::default(),
            based_on_version: 0,
            extractor: ScopeExtractor::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn draft(&self) -> &ScopeDraft {
        &self.draft
    }

    pub fn record_id(&self) -> &ScopingRecordId {
        &self.record_id
    }

    /// Folds a turn into the draft without pricing. Used to rebuild session
    /// state from a transcript.
    pub fn absorb(&mut self, text: &str) -> bool {
        let extracted = self.extractor.extract(text);
        let changed = self.draft.merge(&extracted);
        if changed && self.state == SessionState::Presented {
            self.state =
                if self.draft.is_ready() { SessionState::Ready } else { SessionState::Clarifying };
        }
        changed
    }

    /// Merge a pre-extracted draft (e.g. from the hosted model) instead of
    /// running the deterministic extractor.
    pub fn absorb_draft(&mut self, extracted: &ScopeDraft) -> bool {
        let changed = self.draft.merge(extracted);
        if changed && self.state == SessionState::Presented {
            self.state =
                if self.draft.is_ready() { SessionState::Ready } else { SessionState::Clarifying };
        }
        changed
    }

    /// Restores store alignment when a session is rebuilt from a
    /// transcript: the next save must be computed against the store's
    /// current latest version.
    pub fn resume_from(&mut self, latest_version: u32) {
        self.based_on_version = latest_version;
        if latest_version > 0 && self.draft.is_ready() {
            self.state = SessionState::Presented;
        }
    }

    /// Drives one user turn: either asks a clarifying question or invokes
    /// the pricing pipeline and presents a new quote version.
    pub async fn handle_message(
        &mut self,
        text: &str,
        engine: &QuoteEngine,
        store: &dyn QuoteRevisionStore,
    ) -> Result<SessionReply, ProtocolError> {
        let changed = self.absorb(text);
        self.respond(changed, engine, store).await
    }

    /// Same turn logic, but with the scope fields already extracted.
    pub async fn handle_extracted(
        &mut self,
        extracted: &ScopeDraft,
        engine: &QuoteEngine,
        store: &dyn QuoteRevisionStore,
    ) -> Result<SessionReply, ProtocolError> {
        let changed = self.absorb_draft(extracted);
        self.respond(changed, engine, store).await
    }

    async fn respond(
        &mut self,
        changed: bool,
        engine: &QuoteEngine,
        store: &dyn QuoteRevisionStore,
    ) -> Result<SessionReply, ProtocolError> {
        if !self.draft.is_ready() {
            self.state = SessionState::Clarifying;
            return Ok(SessionReply::Clarify { question: clarifying_question(&self.draft) });
        }

        // A turn that changes nothing re-presents the standing quote
        // instead of minting a spurious version.
        if self.state == SessionState::Presented && !changed {
            if let Some(latest) = store.latest(&self.record_id).await? {
                let figures = SensitiveFigures::from_quote(
                    &latest.line_items,
                    &latest.totals,
                    engine.config(),
                );
                let summary = guarded_summary(&latest, &self.draft, &figures);
                return Ok(SessionReply::Quoted {
                    summary,
                    payload: QuotePayload {
                        quote: latest,
                        applied_multipliers: engine.config().rules.multipliers.clone(),
                    },
                });
            }
        }
        self.state = SessionState::Ready;

        let record = self.draft.to_scoping_record(&self.record_id);
        let draft_quote = engine.build_quote(&record)?;

        let saved = match store
            .save(&self.record_id, draft_quote.clone(), self.based_on_version)
            .await
        {
            Ok(saved) => saved,
            Err(RevisionStoreError::StaleVersion { actual, .. }) => {
                // A colleague quoted this record mid-conversation; recompute
                // against their version rather than overwrite it.
                self.based_on_version = actual;
                let fresh = engine.build_quote(&record)?;
                store.save(&self.record_id, fresh, self.based_on_version).await?
            }
            Err(error) => return Err(error.into()),
        };

        self.based_on_version = saved.version;
        self.state = SessionState::Presented;

        let figures =
            SensitiveFigures::from_quote(&saved.line_items, &saved.totals, engine.config());
        let summary = guarded_summary(&saved, &self.draft, &figures);

        Ok(SessionReply::Quoted {
            summary,
            payload: QuotePayload {
                quote: saved,
                applied_multipliers: engine.config().rules.multipliers.clone(),
            },
        })
    }
}

fn clarifying_question(draft: &ScopeDraft) -> String {
    let missing = draft.missing_fields();
    format!(
        "To put a number on this I still need: {}. What can you tell me about {}?",
        missing.join(", "),
        missing.first().copied().unwrap_or("the scope")
    )
}

/// Client-safe one-paragraph summary. If the rendered text trips the
/// disclosure guard (a client figure colliding with an internal one), fall
/// back to a summary with no numerals at all; a blander reply beats a leak.
fn guarded_summary(quote: &Quote, draft: &ScopeDraft, figures: &SensitiveFigures) -> String {
    let summary = render_summary(quote, draft);
    match DisclosureGuard::verify(&summary, figures) {
        Ok(()) => summary,
        Err(_) =>
            "Your estimate is ready - the full line-item breakdown is in the quote view. \
             Reply with any scope change and I will re-quote."
                .to_string(),
    }
}

fn render_summary(quote: &Quote, draft: &ScopeDraft) -> String {
    let mut parts = Vec::new();

    if let (Some(square_feet), Some(building_type)) = (&draft.square_feet, &draft.building_type) {
        parts.push(format!("the {square_feet} sqft {building_type} scan"));
    } else {
        parts.push("your project".to_string());
    }

    let mut summary = format!(
        "Here is the estimate for {}: ${} total across {} line item{}.",
        parts.join(" "),
        quote.totals.total_client_price.round_dp(2),
        quote.line_items.len(),
        if quote.line_items.len() == 1 { "" } else { "s" },
    );

    if let Some(timeline) = &draft.timeline {
        summary.push_str(&format!(" Target timeline: {timeline}."));
    }
    summary.push_str(" Reply with any scope change and I will re-quote.");
    summary
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use scanquote_core::config::PricingConfig;
    use scanquote_core::domain::quote::IntegrityStatus;
    use scanquote_core::domain::scoping::ScopingRecordId;
    use scanquote_core::engine::QuoteEngine;
    use scanquote_core::store::QuoteRevisionStore;
    use scanquote_db::InMemoryQuoteRevisionStore;

    use super::{QuoteSession, SessionReply, SessionState};

    fn engine() -> QuoteEngine {
        QuoteEngine::new(PricingConfig::default())
    }

    #[tokio::test]
    async fn session_clarifies_until_scope_is_complete() {
        let store = InMemoryQuoteRevisionStore::default();
        let engine = engine();
        let mut session = QuoteSession::new(ScopingRecordId("rec-sess-1".to_string()));
        assert_eq!(session.state(), SessionState::Clarifying);

        let reply = session
            .handle_message("we have an office building to scan", &engine, &store)
            .await
            .expect("turn succeeds");
        match reply {
            SessionReply::Clarify { question } => {
                assert!(question.contains("square footage"));
                assert!(!question.contains("building type"));
            }
            other => panic!("expected clarification, got {other:?}"),
        }
        assert_eq!(session.state(), SessionState::Clarifying);
    }

    #[tokio::test]
    async fn complete_scope_produces_a_presented_quote() {
        let store = InMemoryQuoteRevisionStore::default();
        let engine = engine();
        let mut session = QuoteSession::new(ScopingRecordId("rec-sess-2".to_string()));

        let reply = session
            .handle_message(
                "45,000 sqft office, lod 300, structural and mepf, georeferenced, \
                 12 miles drive, next month",
                &engine,
                &store,
            )
            .await
            .expect("turn succeeds");

        let SessionReply::Quoted { summary, payload } = reply else {
            panic!("expected a quote");
        };
        assert_eq!(session.state(), SessionState::Presented);
        assert_eq!(payload.quote.version, 1);
        assert_eq!(payload.quote.totals.total_client_price, Decimal::new(29_800, 0));
        assert_eq!(payload.quote.totals.integrity_status, IntegrityStatus::Passed);
        assert!(summary.contains("29800"));
        assert!(!summary.contains("14730"));
    }

    #[tokio::test]
    async fn scope_change_after_presentation_produces_a_new_version() {
        let store = InMemoryQuoteRevisionStore::default();
        let engine = engine();
        let record_id = ScopingRecordId("rec-sess-3".to_string());
        let mut session = QuoteSession::new(record_id.clone());

        session
            .handle_message(
                "45,000 sqft office, lod 300, next month",
                &engine,
                &store,
            )
            .await
            .expect("first quote");
        assert_eq!(session.state(), SessionState::Presented);

        let reply = session
            .handle_message("make it 60,000 sqft", &engine, &store)
            .await
            .expect("re-quote");
        let SessionReply::Quoted { payload, .. } = reply else {
            panic!("expected a re-quote");
        };
        assert_eq!(payload.quote.version, 2);

        let history = store.history(&record_id).await.expect("history");
        assert_eq!(history.len(), 2);
        assert!(
            history[1].totals.total_client_price > history[0].totals.total_client_price,
            "larger scope must price higher"
        );
    }

    #[tokio::test]
    async fn concurrent_writer_conflict_is_recovered_once() {
        let store = InMemoryQuoteRevisionStore::default();
        let engine = engine();
        let record_id = ScopingRecordId("rec-sess-4".to_string());

        // A colleague saves version 1 outside the conversation.
        let mut other = QuoteSession::new(record_id.clone());
        other
            .handle_message("10,000 sqft warehouse, lod 200, this month", &engine, &store)
            .await
            .expect("colleague quote");

        // This session still believes it is first; the save conflict is
        // absorbed by refetch-and-retry.
        let mut session = QuoteSession::new(record_id.clone());
        let reply = session
            .handle_message("45,000 sqft office, lod 300, next month", &engine, &store)
            .await
            .expect("conflict recovered");
        let SessionReply::Quoted { payload, .. } = reply else {
            panic!("expected a quote");
        };
        assert_eq!(payload.quote.version, 2);
    }
}
