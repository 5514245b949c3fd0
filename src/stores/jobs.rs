//! Ingestion job tracking.
//!
//! One row per conversation: submitting a URL upserts the row back to
//! `pending`, and the pipeline moves it through `in_progress` to
//! `completed` or `failed`. The answering path reads this row to gate
//! questions until the index is ready.

use chrono::Utc;
use tokio_rusqlite::Connection;

use crate::types::{DocError, Result};

/// Lifecycle state of a conversation's ingestion job.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::InProgress => "in_progress",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    fn parse(value: &str) -> Result<Self> {
        match value {
            "pending" => Ok(JobStatus::Pending),
            "in_progress" => Ok(JobStatus::InProgress),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(DocError::Storage(format!("unknown job status {other:?}"))),
        }
    }
}

/// A conversation's ingestion job as persisted.
#[derive(Clone, Debug, PartialEq)]
pub struct ProcessingJob {
    pub conversation_id: String,
    pub source_url: String,
    pub status: JobStatus,
}

#[derive(Clone)]
pub struct JobStore {
    conn: Connection,
}

impl JobStore {
    pub(crate) fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Records a new submission, resetting any previous job for the
    /// conversation back to pending.
    pub async fn submit(&self, conversation_id: &str, source_url: &str) -> Result<()> {
        let conversation_id = conversation_id.to_string();
        let source_url = source_url.to_string();
        self.conn
            .call(move |conn| {
                let now = Utc::now().to_rfc3339();
                conn.execute(
                    "INSERT INTO processing_jobs
                         (conversation_id, source_url, status, created_at, updated_at)
                         VALUES (?1, ?2, ?3, ?4, ?4)
                     ON CONFLICT(conversation_id) DO UPDATE SET
                         source_url = excluded.source_url,
                         status = excluded.status,
                         updated_at = excluded.updated_at",
                    (
                        &conversation_id,
                        &source_url,
                        JobStatus::Pending.as_str(),
                        &now,
                    ),
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Moves an existing job to a new status.
    pub async fn set_status(&self, conversation_id: &str, status: JobStatus) -> Result<()> {
        let conversation_id = conversation_id.to_string();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE processing_jobs
                         SET status = ?2, updated_at = ?3
                         WHERE conversation_id = ?1",
                    (
                        &conversation_id,
                        status.as_str(),
                        Utc::now().to_rfc3339(),
                    ),
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// The conversation's job, if one was ever submitted.
    pub async fn get(&self, conversation_id: &str) -> Result<Option<ProcessingJob>> {
        let conversation_id = conversation_id.to_string();
        let row = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT conversation_id, source_url, status
                     FROM processing_jobs WHERE conversation_id = ?1",
                )?;
                let mut rows = stmt
                    .query_map((&conversation_id,), |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                        ))
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows.pop())
            })
            .await?;

        match row {
            Some((conversation_id, source_url, status)) => Ok(Some(ProcessingJob {
                conversation_id,
                source_url,
                status: JobStatus::parse(&status)?,
            })),
            None => Ok(None),
        }
    }
}
