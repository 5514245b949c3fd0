//! Similarity retrieval over a conversation's chunk collection.
//!
//! The retriever embeds the question with the same provider that embedded
//! the index and asks the store for the nearest chunks. Code questions pull
//! a wider net: code answers tend to need the surrounding prose as well as
//! the snippet itself.

use std::sync::Arc;

use crate::embeddings::EmbeddingProvider;
use crate::stores::ChunkStore;
use crate::types::Result;

/// A retrieved chunk with its provenance and similarity score.
#[derive(Clone, Debug, PartialEq)]
pub struct Passage {
    pub content: String,
    pub source_url: String,
    pub ordinal: usize,
    pub score: f32,
}

#[derive(Clone)]
pub struct Retriever {
    store: ChunkStore,
    embedder: Arc<dyn EmbeddingProvider>,
    top_k: usize,
}

impl Retriever {
    pub fn new(store: ChunkStore, embedder: Arc<dyn EmbeddingProvider>, top_k: usize) -> Self {
        Self {
            store,
            embedder,
            top_k,
        }
    }

    /// Top passages for a general or follow-up question.
    pub async fn retrieve(&self, conversation_id: &str, question: &str) -> Result<Vec<Passage>> {
        self.search(conversation_id, question, self.top_k).await
    }

    /// Top passages for a code question; double the usual depth.
    pub async fn retrieve_code(
        &self,
        conversation_id: &str,
        question: &str,
    ) -> Result<Vec<Passage>> {
        self.search(conversation_id, question, self.top_k * 2).await
    }

    async fn search(
        &self,
        conversation_id: &str,
        question: &str,
        limit: usize,
    ) -> Result<Vec<Passage>> {
        if question.trim().is_empty() {
            return Ok(Vec::new());
        }

        let query = self.embedder.embed(question).await?;
        let hits = self.store.search(conversation_id, &query, limit).await?;
        tracing::debug!(
            conversation_id,
            requested = limit,
            returned = hits.len(),
            "retrieved passages"
        );

        Ok(hits
            .into_iter()
            .map(|(chunk, score)| Passage {
                content: chunk.content,
                source_url: chunk.url,
                ordinal: chunk.ordinal,
                score,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::MockEmbeddingProvider;
    use crate::stores::{Database, EmbeddedChunk};

    async fn seeded_retriever(top_k: usize) -> (Database, Retriever) {
        let db = Database::open_in_memory().await.unwrap();
        let embedder = Arc::new(MockEmbeddingProvider::new());

        let texts = [
            "Install the tool by running the setup script.",
            "Authentication uses bearer tokens in the request header.",
            "The configuration file lives in the project root.",
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

        let retriever = Retriever::new(db.chunks(), embedder, top_k);
        (db, retriever)
    }

    #[tokio::test]
    async fn retrieve_favors_lexically_similar_chunks() {
        let (_db, retriever) = seeded_retriever(1).await;
        let passages = retriever
            .retrieve("conv1", "how do bearer tokens work for authentication?")
            .await
            .unwrap();
        assert_eq!(passages.len(), 1);
        assert!(passages[0].content.contains("bearer tokens"));
        assert_eq!(passages[0].source_url, "https://docs.example/guide");
    }

    #[tokio::test]
    async fn code_retrieval_doubles_depth() {
        let (_db, retriever) = seeded_retriever(1).await;
        let passages = retriever
            .retrieve_code("conv1", "setup script configuration")
            .await
            .unwrap();
        assert_eq!(passages.len(), 2);
    }

    #[tokio::test]
    async fn blank_question_short_circuits() {
        let (_db, retriever) = seeded_retriever(3).await;
        assert!(retriever.retrieve("conv1", "   ").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_conversation_returns_nothing() {
        let (_db, retriever) = seeded_retriever(3).await;
        assert!(
            retriever
                .retrieve("other", "anything at all")
                .await
                .unwrap()
                .is_empty()
        );
    }
}
