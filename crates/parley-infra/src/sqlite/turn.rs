//! SQLite message store implementation.
//!
//! Implements `MessageStore` from `parley-core` using sqlx with split
//! read/write pools, raw queries and a private Row struct. Every query is
//! scoped by `(agent_key, session_id)` and ordered by `(created_at, id)`.

use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use sqlx::Row;

use parley_core::retrieval::levenshtein_within;
use parley_core::store::MessageStore;
use parley_types::error::StorageError;
use parley_types::turn::{ConversationTurn, SessionActivity, TurnRole, format_timestamp};

use super::pool::DatabasePool;

const TURN_COLUMNS: &str = "id, session_id, agent_key, role, content, created_at, quality";

/// SQLite-backed implementation of `MessageStore`.
pub struct SqliteMessageStore {
    pool: DatabasePool,
}

impl SqliteMessageStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }

    /// Store-wide counts, across every agent.
    pub async fn totals(&self) -> Result<StoreTotals, StorageError> {
        let row = sqlx::query(
            r#"SELECT COUNT(*) AS turns,
                      COUNT(DISTINCT agent_key) AS agents,
                      COUNT(DISTINCT agent_key || char(31) || session_id) AS sessions
               FROM conversation_turns"#,
        )
        .fetch_one(&self.pool.reader)
        .await
        .map_err(query_err)?;

        let turns: i64 = row.try_get("turns").map_err(query_err)?;
        let agents: i64 = row.try_get("agents").map_err(query_err)?;
        let sessions: i64 = row.try_get("sessions").map_err(query_err)?;
        Ok(StoreTotals {
            turns: turns as u64,
            agents: agents as u64,
            sessions: sessions as u64,
        })
    }
}

/// Store-wide counts shown by status displays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreTotals {
    pub turns: u64,
    pub agents: u64,
    /// Distinct `(agent_key, session_id)` threads.
    pub sessions: u64,
}

/// Internal row type for mapping SQLite rows to domain ConversationTurn.
struct TurnRow {
    id: i64,
    session_id: String,
    agent_key: String,
    role: String,
    content: String,
    created_at: String,
    quality: Option<i64>,
}

impl TurnRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            session_id: row.try_get("session_id")?,
            agent_key: row.try_get("agent_key")?,
            role: row.try_get("role")?,
            content: row.try_get("content")?,
            created_at: row.try_get("created_at")?,
            quality: row.try_get("quality")?,
        })
    }

    fn into_turn(self) -> Result<ConversationTurn, StorageError> {
        let role: TurnRole = self
            .role
            .parse()
            .map_err(|e: String| StorageError::Query(e))?;

        Ok(ConversationTurn {
            id: self.id,
            session_id: self.session_id,
            agent_key: self.agent_key,
            role,
            content: self.content,
            created_at: parse_datetime(&self.created_at)?,
            quality: self.quality,
        })
    }
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::Query(format!("invalid datetime: {e}")))
}

fn query_err(e: sqlx::Error) -> StorageError {
    match e {
        sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut => StorageError::Connection,
        other => StorageError::Query(other.to_string()),
    }
}

fn sql_limit(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn into_turns(rows: &[sqlx::sqlite::SqliteRow]) -> Result<Vec<ConversationTurn>, StorageError> {
    let mut turns = Vec::with_capacity(rows.len());
    for row in rows {
        turns.push(TurnRow::from_row(row).map_err(query_err)?.into_turn()?);
    }
    Ok(turns)
}

impl MessageStore for SqliteMessageStore {
    async fn append(
        &self,
        session_id: &str,
        agent_key: &str,
        role: TurnRole,
        content: &str,
    ) -> Result<i64, StorageError> {
        let result = sqlx::query(
            r#"INSERT INTO conversation_turns (session_id, agent_key, role, content, created_at)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(session_id)
        .bind(agent_key)
        .bind(role.to_string())
        .bind(content)
        .bind(format_timestamp(&Utc::now()))
        .execute(&self.pool.writer)
        .await
        .map_err(query_err)?;

        Ok(result.last_insert_rowid())
    }

    async fn get_turn(&self, turn_id: i64) -> Result<Option<ConversationTurn>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {TURN_COLUMNS} FROM conversation_turns WHERE id = ?"
        ))
        .bind(turn_id)
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(query_err)?;

        match row {
            Some(row) => Ok(Some(TurnRow::from_row(&row).map_err(query_err)?.into_turn()?)),
            None => Ok(None),
        }
    }

    async fn read_all(
        &self,
        session_id: &str,
        agent_key: &str,
    ) -> Result<Vec<ConversationTurn>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {TURN_COLUMNS} FROM conversation_turns
             WHERE agent_key = ? AND session_id = ?
             ORDER BY created_at ASC, id ASC"
        ))
        .bind(agent_key)
        .bind(session_id)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_err)?;

        into_turns(&rows)
    }

    async fn read_recent(
        &self,
        session_id: &str,
        agent_key: &str,
        n: usize,
    ) -> Result<Vec<ConversationTurn>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {TURN_COLUMNS} FROM conversation_turns
             WHERE agent_key = ? AND session_id = ?
             ORDER BY created_at ASC, id ASC
             LIMIT ?"
        ))
        .bind(agent_key)
        .bind(session_id)
        .bind(sql_limit(n))
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_err)?;

        into_turns(&rows)
    }

    async fn read_latest(
        &self,
        session_id: &str,
        agent_key: &str,
        n: usize,
    ) -> Result<Vec<ConversationTurn>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {TURN_COLUMNS} FROM (
                 SELECT {TURN_COLUMNS} FROM conversation_turns
                 WHERE agent_key = ? AND session_id = ?
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?
             )
             ORDER BY created_at ASC, id ASC"
        ))
        .bind(agent_key)
        .bind(session_id)
        .bind(sql_limit(n))
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_err)?;

        into_turns(&rows)
    }

    /// Streams the thread in store order and stops at the `limit`-th match,
    /// so only the qualifying prefix of the thread is ever decoded.
    #[tracing::instrument(name = "sqlite_fuzzy_search", skip(self, query))]
    async fn fuzzy_search(
        &self,
        session_id: &str,
        agent_key: &str,
        query: &str,
        max_distance: usize,
        limit: usize,
    ) -> Result<Vec<ConversationTurn>, StorageError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT {TURN_COLUMNS} FROM conversation_turns
             WHERE agent_key = ? AND session_id = ?
             ORDER BY created_at ASC, id ASC"
        );
        let mut rows = sqlx::query(&sql)
            .bind(agent_key)
            .bind(session_id)
            .fetch(&self.pool.reader);

        let mut hits = Vec::new();
        let mut scanned = 0usize;
        while let Some(row) = rows.try_next().await.map_err(query_err)? {
            scanned += 1;
            let content: &str = row.try_get("content").map_err(query_err)?;
            if levenshtein_within(query, content, max_distance).is_none() {
                continue;
            }
            hits.push(TurnRow::from_row(&row).map_err(query_err)?.into_turn()?);
            if hits.len() >= limit {
                break;
            }
        }

        tracing::debug!(scanned, hits = hits.len(), "fuzzy scan finished");
        Ok(hits)
    }

    async fn set_quality(&self, turn_id: i64, quality: Option<i64>) -> Result<(), StorageError> {
        let result = sqlx::query("UPDATE conversation_turns SET quality = ? WHERE id = ?")
            .bind(quality)
            .bind(turn_id)
            .execute(&self.pool.writer)
            .await
            .map_err(query_err)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        Ok(())
    }

    async fn delete_session(&self, session_id: &str, agent_key: &str) -> Result<u64, StorageError> {
        let result =
            sqlx::query("DELETE FROM conversation_turns WHERE agent_key = ? AND session_id = ?")
                .bind(agent_key)
                .bind(session_id)
                .execute(&self.pool.writer)
                .await
                .map_err(query_err)?;

        let removed = result.rows_affected();
        tracing::info!(agent_key, session_id, removed, "session deleted");
        Ok(removed)
    }

    async fn list_sessions(&self, agent_key: &str) -> Result<Vec<SessionActivity>, StorageError> {
        let rows = sqlx::query(
            r#"SELECT session_id, MAX(created_at) AS last_active_at, COUNT(*) AS turn_count
               FROM conversation_turns
               WHERE agent_key = ?
               GROUP BY session_id
               ORDER BY last_active_at DESC, session_id ASC"#,
        )
        .bind(agent_key)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_err)?;

        let mut sessions = Vec::with_capacity(rows.len());
        for row in &rows {
            let session_id: String = row.try_get("session_id").map_err(query_err)?;
            let last_active_at: String = row.try_get("last_active_at").map_err(query_err)?;
            let turn_count: i64 = row.try_get("turn_count").map_err(query_err)?;
            sessions.push(SessionActivity {
                session_id,
                last_active_at: parse_datetime(&last_active_at)?,
                turn_count: turn_count as u64,
            });
        }

        Ok(sessions)
    }
}
