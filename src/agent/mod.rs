//! The dialogue state machine.
//!
//! One call to [`DocumentationAgent::answer`] runs the full turn: gate on
//! job status, load history, classify intent, retrieve, generate, format,
//! persist. Stages hand an [`AgentState`] value forward; no stage retries,
//! and any unhandled failure surfaces as a fixed apology rather than an
//! error to the caller.

pub mod format;
pub mod intent;
pub mod state;

use std::sync::Arc;
use std::time::Duration;

use crate::llm::LanguageModel;
use crate::retrieval::Retriever;
use crate::stores::{Exchange, JobStatus, JobStore, TurnStore};
use crate::types::{DocError, Result};

pub use format::ensure_code_fences;
pub use intent::{Intent, IntentClassifier};
pub use state::AgentState;

/// Gate reply when no job exists for the conversation.
pub const NO_DOCUMENTATION_MESSAGE: &str =
    "No documentation has been processed for this conversation yet. Submit a URL first.";

/// Gate reply while the job is pending or in progress.
pub const STILL_PROCESSING_MESSAGE: &str =
    "The documentation is still being processed. Please try again in a moment.";

/// Gate reply after a failed job.
pub const PROCESSING_FAILED_MESSAGE: &str =
    "Processing the documentation failed. Please submit the URL again.";

/// Reply on the clarification branch.
pub const CLARIFICATION_MESSAGE: &str =
    "I'm not sure I understand the question. Could you rephrase it in terms of the documentation?";

/// Reply when the turn fails outright.
pub const APOLOGY_MESSAGE: &str =
    "Sorry, something went wrong while answering your question. Please try again.";

/// Context marker used when retrieval returns nothing.
const NO_CONTEXT_MARKER: &str = "No relevant information was found in the documentation.";

/// How many recent exchanges the generation prompt includes.
const HISTORY_WINDOW: usize = 3;

/// Answers questions about a conversation's ingested documentation.
#[derive(Clone)]
pub struct DocumentationAgent {
    jobs: JobStore,
    turns: TurnStore,
    retriever: Retriever,
    classifier: IntentClassifier,
    model: Arc<dyn LanguageModel>,
    generation_timeout: Duration,
}

impl DocumentationAgent {
    pub fn new(
        jobs: JobStore,
        turns: TurnStore,
        retriever: Retriever,
        model: Arc<dyn LanguageModel>,
        generation_timeout: Duration,
    ) -> Self {
        Self {
            jobs,
            turns,
            retriever,
            classifier: IntentClassifier::new(model.clone()),
            model,
            generation_timeout,
        }
    }

    /// Runs one full turn. Never returns an error to the caller: failures
    /// are logged and replaced with [`APOLOGY_MESSAGE`].
    pub async fn answer(&self, conversation_id: &str, question: &str) -> String {
        match self.try_answer(conversation_id, question).await {
            Ok(response) => response,
            Err(err) => {
                tracing::error!(conversation_id, error = %err, "turn failed");
                APOLOGY_MESSAGE.to_string()
            }
        }
    }

    async fn try_answer(&self, conversation_id: &str, question: &str) -> Result<String> {
        // Gate: an unanswerable conversation replies with a status message
        // and leaves no trace in the turn log.
        match self.jobs.get(conversation_id).await? {
            None => return Ok(NO_DOCUMENTATION_MESSAGE.to_string()),
            Some(job) => match job.status {
                JobStatus::Pending | JobStatus::InProgress => {
                    return Ok(STILL_PROCESSING_MESSAGE.to_string());
                }
                JobStatus::Failed => return Ok(PROCESSING_FAILED_MESSAGE.to_string()),
                JobStatus::Completed => {}
            },
        }

        let history = self.turns.history(conversation_id).await?;
        let state = AgentState::new(conversation_id, question, history);

        let intent = self
            .classifier
            .classify(&state.question, &state.history)
            .await;
        tracing::debug!(conversation_id, intent = intent.as_str(), "classified question");
        let state = state.with_intent(intent);

        let state = match intent {
            Intent::Unknown => state.with_draft(CLARIFICATION_MESSAGE),
            Intent::CodeQuery => {
                let passages = self
                    .retriever
                    .retrieve_code(conversation_id, &state.question)
                    .await?;
                let state = state.with_passages(passages);
                self.generate(state).await?
            }
            Intent::GeneralQuery | Intent::FollowUpQuestion => {
                let passages = self
                    .retriever
                    .retrieve(conversation_id, &state.question)
                    .await?;
                let state = state.with_passages(passages);
                self.generate(state).await?
            }
        };

        let draft = state
            .draft
            .as_deref()
            .ok_or_else(|| DocError::Generation("no draft produced".to_string()))?;
        let response = ensure_code_fences(draft);

        self.turns
            .append_exchange(conversation_id, question, &response)
            .await?;
        Ok(response)
    }

    async fn generate(&self, state: AgentState) -> Result<AgentState> {
        let prompt = generation_prompt(&state);
        let reply = tokio::time::timeout(self.generation_timeout, self.model.generate(&prompt))
            .await
            .map_err(|_| DocError::Deadline(self.generation_timeout))??;
        Ok(state.with_draft(reply))
    }
}

/// Flattens passages, recent history, and the question into one prompt.
fn generation_prompt(state: &AgentState) -> String {
    let mut prompt = String::from(
        "You are a documentation assistant. Answer the question using only \
         the documentation excerpts below.\n\n",
    );

    if state.passages.is_empty() {
        prompt.push_str(NO_CONTEXT_MARKER);
        prompt.push('\n');
    } else {
        for (i, passage) in state.passages.iter().enumerate() {
            prompt.push_str(&format!(
                "Document {} (Source: {}):\n{}\n\n",
                i + 1,
                passage.source_url,
                passage.content
            ));
        }
    }

    let recent: Vec<&Exchange> = state
        .history
        .iter()
        .rev()
        .take(HISTORY_WINDOW)
        .rev()
        .collect();
    if !recent.is_empty() {
        prompt.push_str("\nRecent conversation:\n");
        for exchange in recent {
            prompt.push_str(&format!(
                "User: {}\nAssistant: {}\n",
                exchange.question, exchange.answer
            ));
        }
    }

    prompt.push_str(&format!("\nQuestion: {}\nAnswer:", state.question));
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::{EmbeddingProvider, MockEmbeddingProvider};
    use crate::llm::ScriptedModel;
    use crate::stores::{Database, EmbeddedChunk};

    async fn seeded_db() -> Database {
        let db = Database::open_in_memory().await.unwrap();
        let embedder = MockEmbeddingProvider::new();
        let texts = [
            "Install the library with the package manager.",
            "Authentication uses bearer tokens in the request header.",
        ];
        let embeddings = embedder
            .embed_batch(&texts.iter().map(|t| t.to_string()).collect::<Vec<_>>())
            .await
            .unwrap();
        let chunks = texts
            .iter()
            .zip(embeddings)
            .map(|(content, embedding)| EmbeddedChunk {
                content: content.to_string(),
                embedding,
            })
            .collect();
        db.chunks()
            .replace_collection("conv1", "https://docs.example/guide", chunks)
            .await
            .unwrap();
        db
    }

    fn agent_with(db: &Database, replies: &[&str]) -> DocumentationAgent {
        let model = Arc::new(ScriptedModel::new(replies.iter().copied()));
        let retriever = Retriever::new(db.chunks(), Arc::new(MockEmbeddingProvider::new()), 2);
        DocumentationAgent::new(
            db.jobs(),
            db.turns(),
            retriever,
            model,
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn pending_job_gates_without_persisting() {
        let db = seeded_db().await;
        db.jobs().submit("conv1", "https://docs.example/guide").await.unwrap();

        let agent = agent_with(&db, &[]);
        let reply = agent.answer("conv1", "how do I install?").await;
        assert_eq!(reply, STILL_PROCESSING_MESSAGE);
        assert!(db.turns().turns("conv1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_job_gates_with_retry_message() {
        let db = seeded_db().await;
        db.jobs().submit("conv1", "https://docs.example/guide").await.unwrap();
        db.jobs().set_status("conv1", JobStatus::Failed).await.unwrap();

        let agent = agent_with(&db, &[]);
        let reply = agent.answer("conv1", "how do I install?").await;
        assert_eq!(reply, PROCESSING_FAILED_MESSAGE);
    }

    #[tokio::test]
    async fn absent_job_gates_with_no_documentation_message() {
        let db = seeded_db().await;
        let agent = agent_with(&db, &[]);
        let reply = agent.answer("conv1", "anything?").await;
        assert_eq!(reply, NO_DOCUMENTATION_MESSAGE);
    }

    #[tokio::test]
    async fn completed_job_answers_and_persists_the_exchange() {
        let db = seeded_db().await;
        db.jobs().submit("conv1", "https://docs.example/guide").await.unwrap();
        db.jobs().set_status("conv1", JobStatus::Completed).await.unwrap();

        let agent = agent_with(
            &db,
            &["general_query", "Install it with the package manager."],
        );
        let reply = agent.answer("conv1", "how do I install the library?").await;
        assert_eq!(reply, "Install it with the package manager.");

        let history = db.turns().history("conv1").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].question, "how do I install the library?");
        assert_eq!(history[0].answer, "Install it with the package manager.");
    }

    #[tokio::test]
    async fn unknown_intent_clarifies_and_still_persists() {
        let db = seeded_db().await;
        db.jobs().submit("conv1", "https://docs.example/guide").await.unwrap();
        db.jobs().set_status("conv1", JobStatus::Completed).await.unwrap();

        let agent = agent_with(&db, &["unknown"]);
        let reply = agent.answer("conv1", "purple monkey dishwasher").await;
        assert_eq!(reply, CLARIFICATION_MESSAGE);

        let history = db.turns().history("conv1").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].answer, CLARIFICATION_MESSAGE);
    }

    #[tokio::test]
    async fn generation_failure_returns_apology_without_persisting() {
        let db = seeded_db().await;
        db.jobs().submit("conv1", "https://docs.example/guide").await.unwrap();
        db.jobs().set_status("conv1", JobStatus::Completed).await.unwrap();

        // One reply feeds classification; generation then finds the script
        // exhausted and errors.
        let agent = agent_with(&db, &["general_query"]);
        let reply = agent.answer("conv1", "how do I install?").await;
        assert_eq!(reply, APOLOGY_MESSAGE);
        assert!(db.turns().turns("conv1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn code_answer_gets_fenced() {
        let db = seeded_db().await;
        db.jobs().submit("conv1", "https://docs.example/guide").await.unwrap();
        db.jobs().set_status("conv1", JobStatus::Completed).await.unwrap();

        let agent = agent_with(&db, &["code_query", "def install():\n    run_setup()"]);
        let reply = agent.answer("conv1", "show me install code").await;
        assert!(reply.starts_with("```"));
        assert!(reply.ends_with("```"));
    }

    #[test]
    fn generation_prompt_labels_sources_and_limits_history() {
        let history: Vec<Exchange> = (0..5)
            .map(|i| Exchange {
                question: format!("q{i}"),
                answer: format!("a{i}"),
            })
            .collect();
        let state = AgentState::new("conv1", "latest question", history).with_passages(vec![
            crate::retrieval::Passage {
                content: "chunk text".to_string(),
                source_url: "https://docs.example/guide".to_string(),
                ordinal: 0,
                score: 0.9,
            },
        ]);

        let prompt = generation_prompt(&state);
        assert!(prompt.contains("Document 1 (Source: https://docs.example/guide)"));
        assert!(prompt.contains("q4"));
        assert!(!prompt.contains("q0"));
        assert!(prompt.contains("latest question"));
    }

    #[test]
    fn generation_prompt_marks_empty_context() {
        let state = AgentState::new("conv1", "anything", Vec::new());
        let prompt = generation_prompt(&state);
        assert!(prompt.contains(NO_CONTEXT_MARKER));
    }
}
