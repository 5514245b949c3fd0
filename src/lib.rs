//! ```text
//! submit(url, conversation) ──► stores::jobs (PENDING)
//!                                     │
//!                                     ▼
//! ingestion::scrape ──► ingestion::sanitize ──► ingestion::chunk
//!                                     │
//!                                     ▼
//! embeddings::EmbeddingProvider ──► stores::sqlite (per-conversation collection)
//!
//! answer(question, conversation):
//!   job gate ──► stores::turns history ──► agent::intent ──► retrieval
//!            ──► llm::LanguageModel ──► agent::format ──► stores::turns
//! ```
//!
//! docloom turns a remote documentation page into an embedded, searchable
//! chunk collection and answers questions about it through a staged dialogue
//! state machine. The [`service::DocAssistant`] facade exposes the three
//! external operations: `submit`, `status`, and `answer`.

pub mod agent;
pub mod config;
pub mod embeddings;
pub mod ingestion;
pub mod llm;
pub mod retrieval;
pub mod service;
pub mod stores;
pub mod types;

pub use agent::DocumentationAgent;
pub use config::Settings;
pub use embeddings::{EmbeddingProvider, MockEmbeddingProvider};
pub use llm::LanguageModel;
pub use retrieval::{Passage, Retriever};
pub use service::DocAssistant;
pub use stores::JobStatus;
pub use types::{DocError, Result};
