//! Process-level facade wiring every component together.
//!
//! [`DocAssistant`] owns the long-lived singletons (database handle, HTTP
//! client, embedding provider, language model) and exposes the three
//! external operations: [`submit`](DocAssistant::submit),
//! [`status`](DocAssistant::status), and [`answer`](DocAssistant::answer).
//!
//! Ingestion runs as a spawned background task. The service does not
//! serialize submissions per conversation: callers must not submit a new
//! URL for a conversation while an earlier job for it is still running,
//! or the two jobs race on the collection write.

use std::sync::Arc;

use reqwest::Client;
use url::Url;

use crate::agent::DocumentationAgent;
use crate::config::Settings;
use crate::embeddings::{EmbeddingProvider, HttpEmbeddingProvider};
use crate::ingestion::{IngestionPipeline, Scraper};
use crate::llm::{LanguageModel, OllamaModel};
use crate::retrieval::Retriever;
use crate::stores::{Database, ProcessingJob};
use crate::types::Result;

#[derive(Clone)]
pub struct DocAssistant {
    db: Database,
    pipeline: IngestionPipeline,
    agent: DocumentationAgent,
}

impl DocAssistant {
    /// Opens the database at the configured path and wires the components
    /// around the given providers.
    pub async fn new(
        settings: &Settings,
        embedder: Arc<dyn EmbeddingProvider>,
        model: Arc<dyn LanguageModel>,
    ) -> Result<Self> {
        let db = Database::open(&settings.database_path).await?;
        Ok(Self::assemble(db, settings, embedder, model))
    }

    /// Builds the HTTP providers from `settings` and wires everything up.
    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        let client = Client::new();
        let embedder = Arc::new(HttpEmbeddingProvider::new(
            client.clone(),
            settings.embedding_endpoint.clone(),
            settings.embedding_model.clone(),
        ));
        let model = Arc::new(OllamaModel::new(
            client,
            settings.llm_endpoint.clone(),
            settings.llm_model.clone(),
        ));
        Self::new(settings, embedder, model).await
    }

    /// Wires components around an already-open database. Intended for
    /// tests running against an in-memory database.
    pub fn with_database(
        db: Database,
        settings: &Settings,
        embedder: Arc<dyn EmbeddingProvider>,
        model: Arc<dyn LanguageModel>,
    ) -> Self {
        Self::assemble(db, settings, embedder, model)
    }

    fn assemble(
        db: Database,
        settings: &Settings,
        embedder: Arc<dyn EmbeddingProvider>,
        model: Arc<dyn LanguageModel>,
    ) -> Self {
        let client = Client::new();
        let scraper = Scraper::new(
            client,
            settings.browser_endpoint.clone(),
            settings.fetch_timeout,
        );
        let pipeline = IngestionPipeline::new(
            scraper,
            embedder.clone(),
            db.chunks(),
            db.jobs(),
            settings.max_chunk_size,
            settings.chunk_overlap,
        );
        let retriever = Retriever::new(db.chunks(), embedder, settings.top_k);
        let agent = DocumentationAgent::new(
            db.jobs(),
            db.turns(),
            retriever,
            model,
            settings.generation_timeout,
        );
        Self {
            db,
            pipeline,
            agent,
        }
    }

    /// Records a pending job for the conversation and starts ingesting
    /// `source_url` in the background. Returns once the job is enqueued.
    pub async fn submit(&self, conversation_id: &str, source_url: &str) -> Result<()> {
        let url = Url::parse(source_url)?;
        self.db.jobs().submit(conversation_id, url.as_str()).await?;
        tracing::info!(conversation_id, url = %url, "ingestion job submitted");

        let pipeline = self.pipeline.clone();
        let conversation_id = conversation_id.to_string();
        tokio::spawn(async move {
            // run() records the outcome on the job row and logs failures.
            let _ = pipeline.run(&conversation_id, &url).await;
        });
        Ok(())
    }

    /// The conversation's ingestion job, if one was ever submitted.
    pub async fn status(&self, conversation_id: &str) -> Result<Option<ProcessingJob>> {
        self.db.jobs().get(conversation_id).await
    }

    /// Answers a question about the conversation's documentation.
    pub async fn answer(&self, conversation_id: &str, question: &str) -> String {
        self.agent.answer(conversation_id, question).await
    }
}
