//! In-crate fakes for the store and the external collaborators.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;

use parley_types::error::{CompletionError, MemoryError, StorageError};
use parley_types::llm::CompletionRequest;
use parley_types::turn::{ConversationTurn, SessionActivity, TurnRole};

use crate::llm::{BoxCompletionProvider, CompletionProvider};
use crate::memory::{LongTermMemory, MemoryResponse};
use crate::retrieval::filter_within_distance;
use crate::store::MessageStore;

pub(crate) fn turn(id: i64, role: TurnRole, content: &str) -> ConversationTurn {
    ConversationTurn {
        id,
        session_id: "s1".to_string(),
        agent_key: "agentA".to_string(),
        role,
        content: content.to_string(),
        created_at: Utc::now(),
        quality: None,
    }
}

/// Vec-backed store with the same ordering and scoping rules as SQLite.
#[derive(Default)]
pub(crate) struct InMemoryMessageStore {
    turns: Mutex<Vec<ConversationTurn>>,
    last_id: AtomicI64,
}

impl InMemoryMessageStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn scoped(&self, session_id: &str, agent_key: &str) -> Vec<ConversationTurn> {
        let turns = self.turns.lock().unwrap();
        let mut scoped: Vec<ConversationTurn> = turns
            .iter()
            .filter(|t| t.session_id == session_id && t.agent_key == agent_key)
            .cloned()
            .collect();
        scoped.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        scoped
    }
}

impl MessageStore for InMemoryMessageStore {
    async fn append(
        &self,
        session_id: &str,
        agent_key: &str,
        role: TurnRole,
        content: &str,
    ) -> Result<i64, StorageError> {
        let mut turns = self.turns.lock().unwrap();
        let id = self.last_id.fetch_add(1, Ordering::SeqCst) + 1;
        turns.push(ConversationTurn {
            id,
            session_id: session_id.to_string(),
            agent_key: agent_key.to_string(),
            role,
            content: content.to_string(),
            created_at: Utc::now(),
            quality: None,
        });
        Ok(id)
    }

    async fn get_turn(&self, turn_id: i64) -> Result<Option<ConversationTurn>, StorageError> {
        let turns = self.turns.lock().unwrap();
        Ok(turns.iter().find(|t| t.id == turn_id).cloned())
    }

    async fn read_all(
        &self,
        session_id: &str,
        agent_key: &str,
    ) -> Result<Vec<ConversationTurn>, StorageError> {
        Ok(self.scoped(session_id, agent_key))
    }

    async fn read_recent(
        &self,
        session_id: &str,
        agent_key: &str,
        n: usize,
    ) -> Result<Vec<ConversationTurn>, StorageError> {
        let mut turns = self.scoped(session_id, agent_key);
        turns.truncate(n);
        Ok(turns)
    }

    async fn read_latest(
        &self,
        session_id: &str,
        agent_key: &str,
        n: usize,
    ) -> Result<Vec<ConversationTurn>, StorageError> {
        let turns = self.scoped(session_id, agent_key);
        let skip = turns.len().saturating_sub(n);
        Ok(turns.into_iter().skip(skip).collect())
    }

    async fn fuzzy_search(
        &self,
        session_id: &str,
        agent_key: &str,
        query: &str,
        max_distance: usize,
        limit: usize,
    ) -> Result<Vec<ConversationTurn>, StorageError> {
        Ok(filter_within_distance(
            self.scoped(session_id, agent_key),
            query,
            max_distance,
            limit,
        ))
    }

    async fn set_quality(&self, turn_id: i64, quality: Option<i64>) -> Result<(), StorageError> {
        let mut turns = self.turns.lock().unwrap();
        let turn = turns
            .iter_mut()
            .find(|t| t.id == turn_id)
            .ok_or(StorageError::NotFound)?;
        turn.quality = quality;
        Ok(())
    }

    async fn delete_session(&self, session_id: &str, agent_key: &str) -> Result<u64, StorageError> {
        let mut turns = self.turns.lock().unwrap();
        let before = turns.len();
        turns.retain(|t| !(t.session_id == session_id && t.agent_key == agent_key));
        Ok((before - turns.len()) as u64)
    }

    async fn list_sessions(&self, agent_key: &str) -> Result<Vec<SessionActivity>, StorageError> {
        let turns = self.turns.lock().unwrap();
        let mut sessions: Vec<SessionActivity> = Vec::new();
        for t in turns.iter().filter(|t| t.agent_key == agent_key) {
            match sessions.iter_mut().find(|s| s.session_id == t.session_id) {
                Some(s) => {
                    s.last_active_at = s.last_active_at.max(t.created_at);
                    s.turn_count += 1;
                }
                None => sessions.push(SessionActivity {
                    session_id: t.session_id.clone(),
                    last_active_at: t.created_at,
                    turn_count: 1,
                }),
            }
        }
        sessions.sort_by(|a, b| {
            b.last_active_at
                .cmp(&a.last_active_at)
                .then_with(|| a.session_id.cmp(&b.session_id))
        });
        Ok(sessions)
    }
}

#[derive(Default)]
struct Script {
    responses: VecDeque<String>,
    requests: Vec<CompletionRequest>,
}

/// Completion provider that replays canned responses in order and records
/// every request. Fails once the script runs out.
#[derive(Clone, Default)]
pub(crate) struct ScriptedProvider {
    script: Arc<Mutex<Script>>,
}

impl ScriptedProvider {
    pub(crate) fn new<I>(responses: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let script = Script {
            responses: responses.into_iter().map(Into::into).collect(),
            requests: Vec::new(),
        };
        Self {
            script: Arc::new(Mutex::new(script)),
        }
    }

    /// A boxed handle sharing this provider's script.
    pub(crate) fn boxed(&self) -> BoxCompletionProvider {
        BoxCompletionProvider::new(self.clone())
    }

    pub(crate) fn requests(&self) -> Vec<CompletionRequest> {
        self.script.lock().unwrap().requests.clone()
    }
}

impl CompletionProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        let mut script = self.script.lock().unwrap();
        script.requests.push(request.clone());
        script
            .responses
            .pop_front()
            .ok_or_else(|| CompletionError::Provider {
                message: "script exhausted".to_string(),
            })
    }
}

/// Long-term memory that always returns the same outcome.
pub(crate) enum StaticMemory {
    Found(String),
    Failing(String),
}

impl StaticMemory {
    pub(crate) fn found(response: &str) -> Self {
        StaticMemory::Found(response.to_string())
    }

    pub(crate) fn failing(reason: &str) -> Self {
        StaticMemory::Failing(reason.to_string())
    }
}

impl LongTermMemory for StaticMemory {
    async fn search(&self, _query: &str) -> Result<MemoryResponse, MemoryError> {
        match self {
            StaticMemory::Found(response) => Ok(MemoryResponse::new(response.clone())),
            StaticMemory::Failing(reason) => Err(MemoryError::Unavailable(reason.clone())),
        }
    }
}
