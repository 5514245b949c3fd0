//! Conversation turn persistence and history reconstruction.
//!
//! Turns are an append-only log per conversation. History is rebuilt by
//! greedy positional pairing: turn 0 with turn 1, turn 2 with turn 3, and
//! so on, dropping an odd trailing turn. That only holds if user and agent
//! turns strictly alternate, which is why a question and its answer are
//! always written together in one transaction.

use chrono::Utc;
use tokio_rusqlite::Connection;

use crate::types::Result;

/// Who produced a turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sender {
    User,
    Agent,
}

impl Sender {
    pub fn as_str(self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Agent => "agent",
        }
    }

    fn parse(value: &str) -> Self {
        match value {
            "agent" => Sender::Agent,
            _ => Sender::User,
        }
    }
}

/// A single persisted message.
#[derive(Clone, Debug, PartialEq)]
pub struct Turn {
    pub sender: Sender,
    pub text: String,
}

/// A paired question and answer from the history.
#[derive(Clone, Debug, PartialEq)]
pub struct Exchange {
    pub question: String,
    pub answer: String,
}

#[derive(Clone)]
pub struct TurnStore {
    conn: Connection,
}

impl TurnStore {
    pub(crate) fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Appends a single turn.
    pub async fn append(&self, conversation_id: &str, sender: Sender, text: &str) -> Result<()> {
        let conversation_id = conversation_id.to_string();
        let text = text.to_string();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO turns (conversation_id, sender, text, created_at)
                         VALUES (?1, ?2, ?3, ?4)",
                    (
                        &conversation_id,
                        sender.as_str(),
                        &text,
                        Utc::now().to_rfc3339(),
                    ),
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Appends a question and its answer in one transaction, preserving the
    /// alternation that positional pairing depends on.
    pub async fn append_exchange(
        &self,
        conversation_id: &str,
        question: &str,
        answer: &str,
    ) -> Result<()> {
        let conversation_id = conversation_id.to_string();
        let question = question.to_string();
        let answer = answer.to_string();
        self.conn
            .call(move |conn| {
                let now = Utc::now().to_rfc3339();
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT INTO turns (conversation_id, sender, text, created_at)
                         VALUES (?1, ?2, ?3, ?4)",
                    (&conversation_id, Sender::User.as_str(), &question, &now),
                )?;
                tx.execute(
                    "INSERT INTO turns (conversation_id, sender, text, created_at)
                         VALUES (?1, ?2, ?3, ?4)",
                    (&conversation_id, Sender::Agent.as_str(), &answer, &now),
                )?;
                tx.commit()?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// All turns for a conversation in insertion order.
    pub async fn turns(&self, conversation_id: &str) -> Result<Vec<Turn>> {
        let conversation_id = conversation_id.to_string();
        let turns = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT sender, text FROM turns
                     WHERE conversation_id = ?1
                     ORDER BY id ASC",
                )?;
                let turns = stmt
                    .query_map((&conversation_id,), |row| {
                        Ok(Turn {
                            sender: Sender::parse(&row.get::<_, String>(0)?),
                            text: row.get(1)?,
                        })
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(turns)
            })
            .await?;
        Ok(turns)
    }

    /// History as question/answer pairs, via greedy positional pairing.
    pub async fn history(&self, conversation_id: &str) -> Result<Vec<Exchange>> {
        let turns = self.turns(conversation_id).await?;
        Ok(pair_turns(&turns))
    }
}

/// Pairs turn 0 with 1, 2 with 3, and so on. An odd trailing turn is
/// dropped rather than paired with nothing.
fn pair_turns(turns: &[Turn]) -> Vec<Exchange> {
    turns
        .chunks_exact(2)
        .map(|pair| Exchange {
            question: pair[0].text.clone(),
            answer: pair[1].text.clone(),
        })
        .collect()
}
