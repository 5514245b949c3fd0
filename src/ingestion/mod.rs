//! The ingestion pipeline: scrape, sanitize, chunk, embed, index.
//!
//! Stages run strictly in sequence for one submission; any stage error
//! fails the whole job. The index write is a transactional replace of the
//! conversation's collection, so a re-submission either fully supersedes
//! the old index or leaves it untouched.

pub mod chunk;
pub mod sanitize;
pub mod scrape;

use std::sync::Arc;

use url::Url;

use crate::embeddings::EmbeddingProvider;
use crate::stores::{ChunkStore, EmbeddedChunk, JobStatus, JobStore};
use crate::types::{DocError, Result};

pub use chunk::chunk_text;
pub use sanitize::clean_html;
pub use scrape::Scraper;

/// Drives one submission end to end and records the outcome on the job row.
#[derive(Clone)]
pub struct IngestionPipeline {
    scraper: Scraper,
    embedder: Arc<dyn EmbeddingProvider>,
    chunks: ChunkStore,
    jobs: JobStore,
    max_chunk_size: usize,
    chunk_overlap: usize,
}

impl IngestionPipeline {
    pub fn new(
        scraper: Scraper,
        embedder: Arc<dyn EmbeddingProvider>,
        chunks: ChunkStore,
        jobs: JobStore,
        max_chunk_size: usize,
        chunk_overlap: usize,
    ) -> Self {
        Self {
            scraper,
            embedder,
            chunks,
            jobs,
            max_chunk_size,
            chunk_overlap,
        }
    }

    /// Processes `url` for `conversation_id`, then moves the job to
    /// `completed` or `failed`. Returns the number of chunks indexed.
    pub async fn run(&self, conversation_id: &str, url: &Url) -> Result<usize> {
        self.jobs
            .set_status(conversation_id, JobStatus::InProgress)
            .await?;
        match self.ingest(conversation_id, url).await {
            Ok(written) => {
                self.jobs
                    .set_status(conversation_id, JobStatus::Completed)
                    .await?;
                tracing::info!(
                    conversation_id,
                    url = %url,
                    chunks = written,
                    "ingestion completed"
                );
                Ok(written)
            }
            Err(err) => {
                tracing::error!(
                    conversation_id,
                    url = %url,
                    error = %err,
                    "ingestion failed"
                );
                self.jobs
                    .set_status(conversation_id, JobStatus::Failed)
                    .await?;
                Err(err)
            }
        }
    }

    async fn ingest(&self, conversation_id: &str, url: &Url) -> Result<usize> {
        let raw = self.scraper.fetch(url).await?;
        let text = clean_html(&raw);
        if text.is_empty() {
            return Err(DocError::EmptyDocument {
                url: url.to_string(),
            });
        }

        let pieces = chunk_text(&text, self.max_chunk_size, self.chunk_overlap);
        tracing::debug!(
            conversation_id,
            text_len = text.len(),
            chunks = pieces.len(),
            "sanitized and chunked page"
        );

        let embeddings = self.embedder.embed_batch(&pieces).await?;
        let embedded = pieces
            .into_iter()
            .zip(embeddings)
            .map(|(content, embedding)| EmbeddedChunk { content, embedding })
            .collect();

        self.chunks
            .replace_collection(conversation_id, url.as_str(), embedded)
            .await
    }
}
