//! Fuzzy search engine over a single conversation thread.
//!
//! A cheap local substitute for semantic search: turns whose content lies
//! within a bounded edit distance of the query are returned oldest first and
//! rendered as prompt-ready lines. Cost is O(turns x query_len x content_len),
//! which is only acceptable because the scope is always one thread.

use std::sync::Arc;

use parley_types::error::StorageError;
use parley_types::turn::ConversationTurn;

use crate::store::MessageStore;

use super::levenshtein::levenshtein_within;

/// Fuzzy search facade over a [`MessageStore`].
pub struct RetrievalEngine<S: MessageStore> {
    store: Arc<S>,
}

impl<S: MessageStore> RetrievalEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Turns within `max_distance` of `query`, rendered as snippets.
    ///
    /// Empty history, no match and `limit = 0` all yield an empty sequence.
    #[tracing::instrument(
        name = "fuzzy_search",
        skip(self, query),
        fields(query_len = query.chars().count())
    )]
    pub async fn fuzzy_search(
        &self,
        session_id: &str,
        agent_key: &str,
        query: &str,
        max_distance: usize,
        limit: usize,
    ) -> Result<Vec<String>, StorageError> {
        let turns = self
            .search_turns(session_id, agent_key, query, max_distance, limit)
            .await?;
        Ok(turns.iter().map(ConversationTurn::snippet).collect())
    }

    /// Same selection as [`RetrievalEngine::fuzzy_search`], unrendered.
    pub async fn search_turns(
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

        let turns = self
            .store
            .fuzzy_search(session_id, agent_key, query, max_distance, limit)
            .await?;

        tracing::debug!(hits = turns.len(), max_distance, limit, "fuzzy search complete");
        Ok(turns)
    }
}

/// Select qualifying turns from an already scoped, store-ordered sequence.
///
/// Keeps turns with distance in `[0, max_distance]`, preserves input order
/// and stops after `limit` matches. Backends that cannot push the distance
/// function into their query engine use this directly.
pub fn filter_within_distance<I>(
    turns: I,
    query: &str,
    max_distance: usize,
    limit: usize,
) -> Vec<ConversationTurn>
where
    I: IntoIterator<Item = ConversationTurn>,
{
    turns
        .into_iter()
        .filter(|turn| levenshtein_within(query, &turn.content, max_distance).is_some())
        .take(limit)
        .collect()
}

/// Keep only alphanumeric characters and spaces.
pub fn sanitize_query(query: &str) -> String {
    query
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ')
        .collect()
}
