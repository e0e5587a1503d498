use scanquote_core::domain::scoping::ScopingRecordId;
use scanquote_core::engine::QuoteEngine;
use scanquote_core::store::QuoteRevisionStore;

use crate::llm::{parse_scope_payload, scope_extraction_prompt, LlmClient};
use crate::protocol::{
    ProtocolError, QuotePayload, QuoteSession, Role, SessionReply, TranscriptTurn,
};

/// Strict two-channel response: the text channel is client-safe prose, the
/// data channel (when present) is the structured quote payload.
#[derive(Clone, Debug)]
pub struct AgentResponse {
    pub reply: String,
    pub payload: Option<QuotePayload>,
}

/// Stateless conversational entry point. Each call rebuilds the session
/// from the transcript, folds in the new message (via the hosted model when
/// one is configured, deterministically otherwise), and runs the protocol.
pub struct AgentRuntime {
    engine: QuoteEngine,
    llm: Option<Box<dyn LlmClient>>,
}

impl AgentRuntime {
    pub fn new(engine: QuoteEngine) -> Self {
        Self { engine, llm: None }
    }

    pub fn with_llm(engine: QuoteEngine, llm: Box<dyn LlmClient>) -> Self {
        Self { engine, llm: Some(llm) }
    }

    pub async fn handle_turn(
        &self,
        record_id: &ScopingRecordId,
        transcript: &[TranscriptTurn],
        message: &str,
        store: &dyn QuoteRevisionStore,
    ) -> Result<AgentResponse, ProtocolError> {
        let mut session = QuoteSession::new(record_id.clone());
        for turn in transcript {
            if turn.role == Role::User {
                session.absorb(&turn.text);
            }
        }
        if let Some(latest) = store.latest(record_id).await? {
            session.resume_from(latest.version);
        }

        let reply = match self.extract_with_model(message).await {
            Some(extracted) => {
                session.handle_extracted(&extracted, &self.engine, store).await?
            }
            None => session.handle_message(message, &self.engine, store).await?,
        };

        Ok(match reply {
            SessionReply::Clarify { question } => {
                AgentResponse { reply: question, payload: None }
            }
            SessionReply::Quoted { summary, payload } => {
                AgentResponse { reply: summary, payload: Some(payload) }
            }
        })
    }

    /// Asks the hosted model to translate the message into scope fields.
    /// Malformed output is recovered locally by falling back to the
    /// deterministic extractor; the user never sees a model error.
    async fn extract_with_model(&self, message: &str) -> Option<crate::conversation::ScopeDraft> {
        let llm = self.llm.as_ref()?;
        let raw = llm.complete(&scope_extraction_prompt(message)).await.ok()?;
        parse_scope_payload(&raw)
    }
}
