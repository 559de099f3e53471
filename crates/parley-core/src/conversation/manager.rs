//! Conversation manager: the per-thread `ask` pipeline.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use parley_types::config::ManagerConfig;
use parley_types::error::{ConversationError, StorageError};
use parley_types::turn::{ConversationTurn, TurnRole};

use crate::context::{CompletionSummarizer, ContextAssembler, Summarizer};
use crate::llm::BoxCompletionProvider;
use crate::memory::BoxLongTermMemory;
use crate::store::MessageStore;

/// In-process running totals for one manager.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ManagerStats {
    /// Questions persisted.
    pub asked: u64,
    /// Answers received and persisted.
    pub answered: u64,
}

/// Owns one `(agent_key, session_id)` thread.
///
/// Obtain instances through a [`ManagerRegistry`](super::ManagerRegistry) so
/// every caller of a thread shares the same summary buffer and counters.
pub struct ConversationManager<S: MessageStore, Z: Summarizer = CompletionSummarizer> {
    assembler: ContextAssembler<S, Z>,
    store: Arc<S>,
    completion: Arc<BoxCompletionProvider>,
    asked: AtomicU64,
    answered: AtomicU64,
}

impl<S: MessageStore> ConversationManager<S, CompletionSummarizer> {
    pub fn new(
        agent_key: impl Into<String>,
        session_id: impl Into<String>,
        config: ManagerConfig,
        store: Arc<S>,
        completion: Arc<BoxCompletionProvider>,
        memory: Option<Arc<BoxLongTermMemory>>,
    ) -> Self {
        let assembler = ContextAssembler::new(
            agent_key,
            session_id,
            config,
            Arc::clone(&store),
            Arc::clone(&completion),
            memory,
        );
        Self::from_parts(assembler, store, completion)
    }
}

impl<S: MessageStore, Z: Summarizer> ConversationManager<S, Z> {
    /// Manager with a custom summarizer for the summary tier.
    pub fn with_summarizer(
        agent_key: impl Into<String>,
        session_id: impl Into<String>,
        config: ManagerConfig,
        store: Arc<S>,
        completion: Arc<BoxCompletionProvider>,
        memory: Option<Arc<BoxLongTermMemory>>,
        summarizer: Z,
    ) -> Self {
        let assembler = ContextAssembler::with_summarizer(
            agent_key,
            session_id,
            config,
            Arc::clone(&store),
            Arc::clone(&completion),
            memory,
            summarizer,
        );
        Self::from_parts(assembler, store, completion)
    }

    fn from_parts(
        assembler: ContextAssembler<S, Z>,
        store: Arc<S>,
        completion: Arc<BoxCompletionProvider>,
    ) -> Self {
        Self {
            assembler,
            store,
            completion,
            asked: AtomicU64::new(0),
            answered: AtomicU64::new(0),
        }
    }

    pub fn agent_key(&self) -> &str {
        self.assembler.agent_key()
    }

    pub fn session_id(&self) -> &str {
        self.assembler.session_id()
    }

    pub fn config(&self) -> &ManagerConfig {
        self.assembler.config()
    }

    /// Answer `question` in the context of this thread.
    ///
    /// Steps: assemble context (rewrite, history, memory), persist the
    /// question, call the completion interface, persist the answer. The
    /// question stays persisted if the completion fails; the error is
    /// returned unchanged.
    #[tracing::instrument(
        name = "ask",
        skip(self, question),
        fields(agent_key = %self.agent_key(), session_id = %self.session_id())
    )]
    pub async fn ask(&self, question: &str) -> Result<String, ConversationError> {
        let context = self.assembler.assemble(question).await?;

        self.store
            .append(self.session_id(), self.agent_key(), TurnRole::User, question)
            .await?;
        self.asked.fetch_add(1, Ordering::Relaxed);

        let request = self.assembler.completion_request(question, context);
        let answer = self.completion.complete(&request).await?;

        self.store
            .append(self.session_id(), self.agent_key(), TurnRole::Assistant, &answer)
            .await?;
        self.answered.fetch_add(1, Ordering::Relaxed);

        tracing::info!(
            provider = self.completion.name(),
            answer_len = answer.len(),
            "question answered"
        );
        Ok(answer)
    }

    /// Full stored history of this thread.
    pub async fn history(&self) -> Result<Vec<ConversationTurn>, StorageError> {
        self.store.read_all(self.session_id(), self.agent_key()).await
    }

    /// Delete every turn of this thread and forget the running summary.
    pub async fn clear(&self) -> Result<u64, StorageError> {
        let removed = self
            .store
            .delete_session(self.session_id(), self.agent_key())
            .await?;
        self.assembler.reset_summary().await;
        tracing::info!(removed, "conversation cleared");
        Ok(removed)
    }

    pub fn stats(&self) -> ManagerStats {
        ManagerStats {
            asked: self.asked.load(Ordering::Relaxed),
            answered: self.answered.load(Ordering::Relaxed),
        }
    }
}
