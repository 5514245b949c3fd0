//! SQLite-backed persistence: chunk vectors, conversation turns, and
//! processing jobs.
//!
//! ```text
//!                  ┌──────────────┐
//!                  │   Database   │  one file, one connection pool entry
//!                  └──────┬───────┘
//!          ┌──────────────┼──────────────┐
//!          ▼              ▼              ▼
//!   ┌────────────┐ ┌────────────┐ ┌────────────┐
//!   │ ChunkStore │ │ TurnStore  │ │  JobStore  │
//!   │ sqlite-vec │ │ pairing    │ │ status     │
//!   └────────────┘ └────────────┘ └────────────┘
//! ```
//!
//! Vector search runs through the `sqlite-vec` extension
//! (`vec_distance_cosine` over stored embedding blobs); it is registered
//! process-wide once, before the first connection opens.

pub mod jobs;
pub mod sqlite;
pub mod turns;

use std::mem::transmute;
use std::os::raw::c_char;
use std::path::Path;
use std::sync::Once;

use tokio_rusqlite::{Connection, ffi};

use crate::types::{DocError, Result};

pub use jobs::{JobStatus, JobStore, ProcessingJob};
pub use sqlite::{ChunkStore, EmbeddedChunk, StoredChunk};
pub use turns::{Exchange, Sender, Turn, TurnStore};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS chunks (
    id          TEXT PRIMARY KEY,
    collection  TEXT NOT NULL,
    url         TEXT NOT NULL,
    ordinal     INTEGER NOT NULL,
    length      INTEGER NOT NULL,
    content     TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_chunks_collection ON chunks(collection);

CREATE TABLE IF NOT EXISTS chunk_embeddings (
    id        TEXT PRIMARY KEY,
    embedding BLOB NOT NULL
);

CREATE TABLE IF NOT EXISTS turns (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    conversation_id TEXT NOT NULL,
    sender          TEXT NOT NULL,
    text            TEXT NOT NULL,
    created_at      TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_turns_conversation ON turns(conversation_id);

CREATE TABLE IF NOT EXISTS processing_jobs (
    conversation_id TEXT PRIMARY KEY,
    source_url      TEXT NOT NULL,
    status          TEXT NOT NULL,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);
";

/// Handle to the docloom SQLite database.
///
/// Opening registers the `sqlite-vec` extension, verifies it loaded, and
/// applies the schema. The individual stores are cheap views over a cloned
/// connection handle.
#[derive(Clone)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens (and migrates) the database at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        register_sqlite_vec()?;
        let conn = Connection::open(path).await?;
        Self::init(conn).await
    }

    /// Opens an in-memory database. Intended for tests.
    pub async fn open_in_memory() -> Result<Self> {
        register_sqlite_vec()?;
        let conn = Connection::open_in_memory().await?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self> {
        conn.call(|conn| {
            // Fails loudly if the vec extension did not register.
            conn.query_row("SELECT vec_version()", [], |row| row.get::<_, String>(0))?;
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;
        Ok(Self { conn })
    }

    pub fn chunks(&self) -> ChunkStore {
        ChunkStore::new(self.conn.clone())
    }

    pub fn turns(&self) -> TurnStore {
        TurnStore::new(self.conn.clone())
    }

    pub fn jobs(&self) -> JobStore {
        JobStore::new(self.conn.clone())
    }
}

/// Registers `sqlite-vec` as an auto-loaded extension for every connection
/// opened by this process. Safe to call repeatedly.
fn register_sqlite_vec() -> Result<()> {
    use std::sync::Mutex;

    static INIT: Once = Once::new();
    static INIT_RESULT: Mutex<Option<std::result::Result<(), String>>> = Mutex::new(None);

    INIT.call_once(|| {
        let result = unsafe {
            type SqliteExtensionInit = unsafe extern "C" fn(
                *mut ffi::sqlite3,
                *mut *mut c_char,
                *const ffi::sqlite3_api_routines,
            ) -> i32;

            let init: unsafe extern "C" fn() = sqlite_vec::sqlite3_vec_init;
            let init_fn: SqliteExtensionInit =
                transmute::<unsafe extern "C" fn(), SqliteExtensionInit>(init);
            let rc = ffi::sqlite3_auto_extension(Some(init_fn));
            if rc != 0 {
                Err(format!(
                    "failed to register sqlite-vec extension (code {rc})"
                ))
            } else {
                Ok(())
            }
        };
        *INIT_RESULT.lock().expect("init result mutex poisoned") = Some(result);
    });

    INIT_RESULT
        .lock()
        .expect("init result mutex poisoned")
        .clone()
        .expect("init was called but result not set")
        .map_err(DocError::Storage)
}
