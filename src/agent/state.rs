//! Per-turn dialogue state.
//!
//! One [`AgentState`] value is created per incoming question and flows
//! through the orchestrator's stages. Each stage consumes the state and
//! returns a new one with its own field filled in; nothing mutates state
//! in place and nothing outlives the turn.

use crate::agent::intent::Intent;
use crate::retrieval::Passage;
use crate::stores::Exchange;

/// Everything the state machine knows about the turn in flight.
#[derive(Clone, Debug)]
pub struct AgentState {
    pub conversation_id: String,
    pub question: String,
    pub history: Vec<Exchange>,
    pub intent: Option<Intent>,
    pub passages: Vec<Passage>,
    pub draft: Option<String>,
}

impl AgentState {
    pub fn new(
        conversation_id: impl Into<String>,
        question: impl Into<String>,
        history: Vec<Exchange>,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            question: question.into(),
            history,
            intent: None,
            passages: Vec::new(),
            draft: None,
        }
    }

    #[must_use]
    pub fn with_intent(self, intent: Intent) -> Self {
        Self {
            intent: Some(intent),
            ..self
        }
    }

    #[must_use]
    pub fn with_passages(self, passages: Vec<Passage>) -> Self {
        Self { passages, ..self }
    }

    #[must_use]
    pub fn with_draft(self, draft: impl Into<String>) -> Self {
        Self {
            draft: Some(draft.into()),
            ..self
        }
    }
}
