//! MessageStore trait definition.
//!
//! Every query is scoped by `(agent_key, session_id)`; implementations must
//! never leak turns across agents or sessions.

use parley_types::error::StorageError;
use parley_types::turn::{ConversationTurn, SessionActivity, TurnRole};

/// Repository trait for conversation turn persistence.
///
/// Implementations live in parley-infra (e.g., `SqliteMessageStore`).
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
///
/// Sequences are always returned in store order: `(created_at, id)` ascending.
pub trait MessageStore: Send + Sync {
    /// Insert one immutable turn. Returns the store-assigned id.
    fn append(
        &self,
        session_id: &str,
        agent_key: &str,
        role: TurnRole,
        content: &str,
    ) -> impl std::future::Future<Output = Result<i64, StorageError>> + Send;

    /// Get a single turn by id.
    fn get_turn(
        &self,
        turn_id: i64,
    ) -> impl std::future::Future<Output = Result<Option<ConversationTurn>, StorageError>> + Send;

    /// Full history of a thread. Empty when the thread does not exist.
    fn read_all(
        &self,
        session_id: &str,
        agent_key: &str,
    ) -> impl std::future::Future<Output = Result<Vec<ConversationTurn>, StorageError>> + Send;

    /// The first `n` turns of a thread in store order.
    ///
    /// This is the earliest-inserted window, not the most recent one.
    /// Callers wanting the latest turns use [`MessageStore::read_latest`].
    fn read_recent(
        &self,
        session_id: &str,
        agent_key: &str,
        n: usize,
    ) -> impl std::future::Future<Output = Result<Vec<ConversationTurn>, StorageError>> + Send;

    /// The last `n` turns of a thread, returned oldest first.
    fn read_latest(
        &self,
        session_id: &str,
        agent_key: &str,
        n: usize,
    ) -> impl std::future::Future<Output = Result<Vec<ConversationTurn>, StorageError>> + Send;

    /// Turns whose content is within `max_distance` Levenshtein edits of
    /// `query`, oldest first, at most `limit` of them.
    ///
    /// Distance is a filter, never a ranking key.
    fn fuzzy_search(
        &self,
        session_id: &str,
        agent_key: &str,
        query: &str,
        max_distance: usize,
        limit: usize,
    ) -> impl std::future::Future<Output = Result<Vec<ConversationTurn>, StorageError>> + Send;

    /// Set or clear the quality annotation, the only mutable field of a turn.
    fn set_quality(
        &self,
        turn_id: i64,
        quality: Option<i64>,
    ) -> impl std::future::Future<Output = Result<(), StorageError>> + Send;

    /// Remove every turn of a thread. Returns the number removed (0 if none).
    fn delete_session(
        &self,
        session_id: &str,
        agent_key: &str,
    ) -> impl std::future::Future<Output = Result<u64, StorageError>> + Send;

    /// Threads of an agent, most recently active first.
    fn list_sessions(
        &self,
        agent_key: &str,
    ) -> impl std::future::Future<Output = Result<Vec<SessionActivity>, StorageError>> + Send;
}
