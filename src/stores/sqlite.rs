//! Chunk vector store.
//!
//! Each conversation owns one collection, named `chat_{conversation_id}`.
//! Re-ingesting a URL replaces the whole collection in a single
//! transaction, so a conversation never serves results from a half-written
//! index. Embeddings live in a side table as `sqlite-vec` blobs and are
//! queried with `vec_distance_cosine`.

use tokio_rusqlite::Connection;

use crate::types::{DocError, Result};

/// A chunk as persisted, minus its embedding.
#[derive(Clone, Debug, PartialEq)]
pub struct StoredChunk {
    pub id: String,
    pub url: String,
    pub ordinal: usize,
    pub length: usize,
    pub content: String,
}

/// A chunk of text paired with its embedding, ready to index.
#[derive(Clone, Debug)]
pub struct EmbeddedChunk {
    pub content: String,
    pub embedding: Vec<f32>,
}

#[derive(Clone)]
pub struct ChunkStore {
    conn: Connection,
}

/// Collection name for a conversation's chunks.
pub fn collection_name(conversation_id: &str) -> String {
    format!("chat_{conversation_id}")
}

fn chunk_id(conversation_id: &str, ordinal: usize) -> String {
    format!("{conversation_id}:{ordinal}")
}

impl ChunkStore {
    pub(crate) fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Atomically replaces a conversation's collection with `chunks`.
    ///
    /// Ordinals are assigned densely from zero in input order. Returns the
    /// number of chunks written.
    pub async fn replace_collection(
        &self,
        conversation_id: &str,
        source_url: &str,
        chunks: Vec<EmbeddedChunk>,
    ) -> Result<usize> {
        let conversation_id = conversation_id.to_string();
        let source_url = source_url.to_string();

        // Serialized outside the connection closure so the closure only
        // deals in sqlite errors.
        let mut rows = Vec::with_capacity(chunks.len());
        for (ordinal, chunk) in chunks.into_iter().enumerate() {
            let vector = serde_json::to_string(&chunk.embedding)
                .map_err(|err| DocError::Storage(err.to_string()))?;
            rows.push((chunk_id(&conversation_id, ordinal), ordinal, chunk.content, vector));
        }

        let written = self
            .conn
            .call(move |conn| {
                let collection = collection_name(&conversation_id);
                let tx = conn.transaction()?;

                tx.execute(
                    "DELETE FROM chunk_embeddings WHERE id IN
                         (SELECT id FROM chunks WHERE collection = ?1)",
                    (&collection,),
                )?;
                tx.execute("DELETE FROM chunks WHERE collection = ?1", (&collection,))?;

                for (id, ordinal, content, vector) in &rows {
                    tx.execute(
                        "INSERT INTO chunks (id, collection, url, ordinal, length, content)
                             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                        (
                            id,
                            &collection,
                            &source_url,
                            *ordinal as i64,
                            content.len() as i64,
                            content,
                        ),
                    )?;
                    tx.execute(
                        "INSERT INTO chunk_embeddings (id, embedding)
                             VALUES (?1, vec_f32(?2))",
                        (id, vector),
                    )?;
                }

                tx.commit()?;
                Ok(rows.len())
            })
            .await?;
        Ok(written)
    }

    /// Nearest chunks to `query` within a conversation's collection,
    /// ordered by descending cosine similarity (`1 - distance`).
    pub async fn search(
        &self,
        conversation_id: &str,
        query: &[f32],
        limit: usize,
    ) -> Result<Vec<(StoredChunk, f32)>> {
        let collection = collection_name(conversation_id);
        let vector = serde_json::to_string(query)
            .map_err(|err| DocError::Storage(err.to_string()))?;
        let rows = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT c.id, c.url, c.ordinal, c.length, c.content,
                            vec_distance_cosine(e.embedding, vec_f32(?1)) AS distance
                     FROM chunks c
                     JOIN chunk_embeddings e ON e.id = c.id
                     WHERE c.collection = ?2
                     ORDER BY distance ASC
                     LIMIT ?3",
                )?;

                let rows = stmt
                    .query_map((&vector, &collection, limit as i64), |row| {
                        let distance: f64 = row.get(5)?;
                        Ok((
                            StoredChunk {
                                id: row.get(0)?,
                                url: row.get(1)?,
                                ordinal: row.get::<_, i64>(2)? as usize,
                                length: row.get::<_, i64>(3)? as usize,
                                content: row.get(4)?,
                            },
                            1.0 - distance as f32,
                        ))
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;
        Ok(rows)
    }

    /// Number of chunks indexed for a conversation.
    pub async fn count(&self, conversation_id: &str) -> Result<usize> {
        let collection = collection_name(conversation_id);
        let count = self
            .conn
            .call(move |conn| {
                let count = conn.query_row(
                    "SELECT COUNT(*) FROM chunks WHERE collection = ?1",
                    (&collection,),
                    |row| row.get::<_, i64>(0),
                )?;
                Ok(count)
            })
            .await?;
        Ok(count as usize)
    }
}
