//! Per-question context assembly.
//!
//! For each question the assembler decides what prior context accompanies it
//! to the completion call: an optional standalone rewrite of the question, one
//! history tier chosen at construction time, and an optional long-term memory
//! block kept apart from conversational history.

use std::sync::Arc;

use tokio::sync::Mutex;

use parley_types::config::{HistoryTier, ManagerConfig, WindowAnchor};
use parley_types::error::ConversationError;
use parley_types::llm::{CompletionRequest, HistoryContext, Prompt};
use parley_types::turn::{ConversationTurn, TurnRole};

use crate::llm::BoxCompletionProvider;
use crate::memory::BoxLongTermMemory;
use crate::retrieval::{RetrievalEngine, sanitize_query};
use crate::store::MessageStore;

use super::prompt::{STANDALONE_SYSTEM_PROMPT, memory_echo};
use super::summarizer::{CompletionSummarizer, Summarizer};

/// Everything assembled for one question, short of the question itself.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledContext {
    /// The rewritten standalone query, or the raw question.
    pub search_query: String,
    pub history: HistoryContext,
    /// Long-term memory result, if one was found.
    pub memory: Option<String>,
}

/// Running summary state for the summary tier.
#[derive(Debug, Default)]
struct SummaryBuffer {
    text: Option<String>,
    /// Id of the newest turn folded into `text` (0 = nothing folded yet).
    through_id: i64,
}

/// Builds the context for each question of one conversation thread.
pub struct ContextAssembler<S: MessageStore, Z: Summarizer = CompletionSummarizer> {
    agent_key: String,
    session_id: String,
    config: ManagerConfig,
    store: Arc<S>,
    retrieval: RetrievalEngine<S>,
    completion: Arc<BoxCompletionProvider>,
    memory: Option<Arc<BoxLongTermMemory>>,
    summarizer: Z,
    summary: Mutex<SummaryBuffer>,
}

impl<S: MessageStore> ContextAssembler<S, CompletionSummarizer> {
    /// Assembler whose summary tier folds through the completion provider.
    pub fn new(
        agent_key: impl Into<String>,
        session_id: impl Into<String>,
        config: ManagerConfig,
        store: Arc<S>,
        completion: Arc<BoxCompletionProvider>,
        memory: Option<Arc<BoxLongTermMemory>>,
    ) -> Self {
        let summarizer = CompletionSummarizer::new(Arc::clone(&completion), config.model.clone());
        Self::with_summarizer(agent_key, session_id, config, store, completion, memory, summarizer)
    }
}

impl<S: MessageStore, Z: Summarizer> ContextAssembler<S, Z> {
    pub fn with_summarizer(
        agent_key: impl Into<String>,
        session_id: impl Into<String>,
        config: ManagerConfig,
        store: Arc<S>,
        completion: Arc<BoxCompletionProvider>,
        memory: Option<Arc<BoxLongTermMemory>>,
        summarizer: Z,
    ) -> Self {
        Self {
            agent_key: agent_key.into(),
            session_id: session_id.into(),
            config,
            retrieval: RetrievalEngine::new(Arc::clone(&store)),
            store,
            completion,
            memory,
            summarizer,
            summary: Mutex::new(SummaryBuffer::default()),
        }
    }

    pub fn agent_key(&self) -> &str {
        &self.agent_key
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Assemble the context for `question`.
    ///
    /// Order: standalone rewrite, history tier, long-term memory. The rewrite
    /// costs one completion call and is skipped while the rewrite window is
    /// empty, so the first question of a thread is used as-is. A memory
    /// hit is echoed into the thread as an assistant turn after history has
    /// been read. Store and completion failures propagate; a memory failure
    /// only drops the memory block.
    pub async fn assemble(&self, question: &str) -> Result<AssembledContext, ConversationError> {
        let search_query = self.search_query(question).await?;
        let history = self.history(&search_query).await?;
        let memory = self.recall(&search_query).await?;

        Ok(AssembledContext {
            search_query,
            history,
            memory,
        })
    }

    /// Merge an assembled context and the original question into a request.
    pub fn completion_request(&self, question: &str, context: AssembledContext) -> CompletionRequest {
        CompletionRequest {
            model: self.config.model.clone(),
            prompt: Prompt {
                system: self.config.system_prompt.clone(),
                question: question.to_string(),
                search_query: context.search_query,
                history: context.history,
                memory: context.memory,
            },
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        }
    }

    /// Forget the running summary. The next summary-tier assembly refolds
    /// whatever the thread still holds.
    pub async fn reset_summary(&self) {
        *self.summary.lock().await = SummaryBuffer::default();
    }

    /// Current running summary text, if any has been folded.
    pub async fn summary_text(&self) -> Option<String> {
        self.summary.lock().await.text.clone()
    }

    async fn search_query(&self, question: &str) -> Result<String, ConversationError> {
        if !self.config.standalone_question {
            return Ok(question.to_string());
        }

        let window = self
            .store
            .read_recent(&self.session_id, &self.agent_key, self.config.rewrite_window)
            .await?;
        if window.is_empty() {
            // Nothing to resolve references against.
            return Ok(question.to_string());
        }

        let request = CompletionRequest {
            model: self.config.model.clone(),
            prompt: Prompt {
                system: Some(STANDALONE_SYSTEM_PROMPT.to_string()),
                question: question.to_string(),
                search_query: question.to_string(),
                history: snippets(&window),
                memory: None,
            },
            temperature: Some(0.0),
            max_tokens: self.config.max_tokens,
        };

        let rewritten = self.completion.complete(&request).await?;
        let rewritten = rewritten.trim();
        if rewritten.is_empty() {
            return Ok(question.to_string());
        }

        tracing::debug!(rewritten, "standalone question");
        Ok(rewritten.to_string())
    }

    async fn history(&self, search_query: &str) -> Result<HistoryContext, ConversationError> {
        match &self.config.history {
            HistoryTier::FuzzySearch { distance, limit } => {
                let query = if self.config.sanitize_search_query {
                    sanitize_query(search_query)
                } else {
                    search_query.to_string()
                };
                let lines = self
                    .retrieval
                    .fuzzy_search(&self.session_id, &self.agent_key, &query, *distance, *limit)
                    .await?;
                Ok(if lines.is_empty() {
                    HistoryContext::Empty
                } else {
                    HistoryContext::Snippets(lines)
                })
            }
            HistoryTier::Recency { window, anchor } => {
                let turns = match anchor {
                    WindowAnchor::First => {
                        self.store
                            .read_recent(&self.session_id, &self.agent_key, *window)
                            .await?
                    }
                    WindowAnchor::Last => {
                        self.store
                            .read_latest(&self.session_id, &self.agent_key, *window)
                            .await?
                    }
                };
                Ok(snippets(&turns))
            }
            HistoryTier::Summary => self.summary_context().await,
        }
    }

    async fn summary_context(&self) -> Result<HistoryContext, ConversationError> {
        let mut buffer = self.summary.lock().await;

        let turns = self
            .store
            .read_all(&self.session_id, &self.agent_key)
            .await?;

        // The thread was deleted underneath us: drop what was folded from it.
        if buffer.through_id > 0 && !turns.iter().any(|turn| turn.id == buffer.through_id) {
            tracing::debug!(through_id = buffer.through_id, "summarized turns gone, resetting summary");
            *buffer = SummaryBuffer::default();
        }

        let fresh: Vec<ConversationTurn> = turns
            .into_iter()
            .filter(|turn| turn.id > buffer.through_id)
            .collect();

        if let Some(newest) = fresh.iter().map(|turn| turn.id).max() {
            let text = self.summarizer.fold(buffer.text.as_deref(), &fresh).await?;
            buffer.text = Some(text);
            buffer.through_id = newest;
        }

        Ok(match buffer.text.as_deref() {
            Some(text) if !text.trim().is_empty() => HistoryContext::Summary(text.to_string()),
            _ => HistoryContext::Empty,
        })
    }

    async fn recall(&self, search_query: &str) -> Result<Option<String>, ConversationError> {
        if !self.config.query_memory_before_ask {
            return Ok(None);
        }
        let Some(memory) = &self.memory else {
            return Ok(None);
        };

        let response = match memory.search(search_query).await {
            Ok(found) => found.response,
            Err(e) => {
                tracing::warn!(
                    agent_key = %self.agent_key,
                    session_id = %self.session_id,
                    error = %e,
                    "long-term memory lookup failed, continuing without it"
                );
                return Ok(None);
            }
        };
        if response.trim().is_empty() {
            return Ok(None);
        }

        self.store
            .append(
                &self.session_id,
                &self.agent_key,
                TurnRole::Assistant,
                &memory_echo(&response),
            )
            .await?;

        Ok(Some(response))
    }
}

fn snippets(turns: &[ConversationTurn]) -> HistoryContext {
    if turns.is_empty() {
        HistoryContext::Empty
    } else {
        HistoryContext::Snippets(turns.iter().map(ConversationTurn::snippet).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{InMemoryMessageStore, ScriptedProvider, StaticMemory};

    fn config(history: HistoryTier) -> ManagerConfig {
        ManagerConfig {
            standalone_question: false,
            history,
            ..ManagerConfig::default()
        }
    }

    async fn seed(store: &InMemoryMessageStore, contents: &[(TurnRole, &str)]) {
        for (role, content) in contents {
            store.append("s1", "agentA", *role, content).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_rewrite_skipped_on_empty_thread() {
        let store = Arc::new(InMemoryMessageStore::new());
        let scripted = ScriptedProvider::new(Vec::<&str>::new());
        let assembler = ContextAssembler::new(
            "agentA",
            "s1",
            ManagerConfig::default(),
            store,
            Arc::new(scripted.boxed()),
            None,
        );

        let ctx = assembler.assemble("What is EEG?").await.unwrap();
        assert_eq!(ctx.search_query, "What is EEG?");
        assert!(scripted.requests().is_empty());
    }

    #[tokio::test]
    async fn test_rewrite_feeds_fuzzy_search() {
        let store = Arc::new(InMemoryMessageStore::new());
        seed(
            &store,
            &[
                (TurnRole::User, "What is encephalography?"),
                (TurnRole::Assistant, "It's brain activity recording."),
            ],
        )
        .await;
        let scripted = ScriptedProvider::new(["What is encephalography"]);
        let cfg = ManagerConfig {
            history: HistoryTier::FuzzySearch { distance: 3, limit: 5 },
            ..ManagerConfig::default()
        };
        let assembler =
            ContextAssembler::new("agentA", "s1", cfg, store, Arc::new(scripted.boxed()), None);

        let ctx = assembler.assemble("And what does it measure?").await.unwrap();
        assert_eq!(ctx.search_query, "What is encephalography");
        match ctx.history {
            HistoryContext::Snippets(lines) => {
                assert_eq!(lines.len(), 1);
                assert!(lines[0].ends_with("by user: What is encephalography?"));
            }
            other => panic!("expected snippets, got {other:?}"),
        }

        let requests = scripted.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].prompt.system.as_deref(), Some(STANDALONE_SYSTEM_PROMPT));
        assert_eq!(requests[0].prompt.question, "And what does it measure?");
    }

    #[tokio::test]
    async fn test_blank_rewrite_falls_back_to_question() {
        let store = Arc::new(InMemoryMessageStore::new());
        seed(&store, &[(TurnRole::User, "hello")]).await;
        let scripted = ScriptedProvider::new(["   "]);
        let assembler = ContextAssembler::new(
            "agentA",
            "s1",
            ManagerConfig::default(),
            store,
            Arc::new(scripted.boxed()),
            None,
        );

        let ctx = assembler.assemble("hello").await.unwrap();
        assert_eq!(ctx.search_query, "hello");
    }

    #[tokio::test]
    async fn test_recency_tier_first_and_last() {
        let store = Arc::new(InMemoryMessageStore::new());
        seed(
            &store,
            &[
                (TurnRole::User, "one"),
                (TurnRole::Assistant, "two"),
                (TurnRole::User, "three"),
            ],
        )
        .await;
        let provider = Arc::new(ScriptedProvider::new(Vec::<&str>::new()).boxed());

        let first = ContextAssembler::new(
            "agentA",
            "s1",
            config(HistoryTier::Recency { window: 2, anchor: WindowAnchor::First }),
            Arc::clone(&store),
            Arc::clone(&provider),
            None,
        );
        let last = ContextAssembler::new(
            "agentA",
            "s1",
            config(HistoryTier::Recency { window: 2, anchor: WindowAnchor::Last }),
            Arc::clone(&store),
            provider,
            None,
        );

        let HistoryContext::Snippets(lines) = first.assemble("q").await.unwrap().history else {
            panic!("expected snippets");
        };
        assert!(lines[0].ends_with(": one"));
        assert!(lines[1].ends_with(": two"));

        let HistoryContext::Snippets(lines) = last.assemble("q").await.unwrap().history else {
            panic!("expected snippets");
        };
        assert!(lines[0].ends_with(": two"));
        assert!(lines[1].ends_with(": three"));
    }

    #[tokio::test]
    async fn test_sanitized_query_only_affects_search() {
        let store = Arc::new(InMemoryMessageStore::new());
        seed(&store, &[(TurnRole::User, "Whats EEG")]).await;
        let cfg = ManagerConfig {
            sanitize_search_query: true,
            ..config(HistoryTier::FuzzySearch { distance: 0, limit: 5 })
        };
        let assembler = ContextAssembler::new(
            "agentA",
            "s1",
            cfg,
            store,
            Arc::new(ScriptedProvider::new(Vec::<&str>::new()).boxed()),
            None,
        );

        let ctx = assembler.assemble("What's EEG?").await.unwrap();
        assert_eq!(ctx.search_query, "What's EEG?");
        assert!(matches!(ctx.history, HistoryContext::Snippets(ref l) if l.len() == 1));
    }

    #[tokio::test]
    async fn test_memory_echo_persisted_after_history_read() {
        let store = Arc::new(InMemoryMessageStore::new());
        let memory = Arc::new(BoxLongTermMemory::new(StaticMemory::found("EEG measures voltage.")));
        let assembler = ContextAssembler::new(
            "agentA",
            "s1",
            config(HistoryTier::Recency { window: 5, anchor: WindowAnchor::First }),
            Arc::clone(&store),
            Arc::new(ScriptedProvider::new(Vec::<&str>::new()).boxed()),
            Some(memory),
        );

        let ctx = assembler.assemble("What is EEG?").await.unwrap();
        assert_eq!(ctx.memory.as_deref(), Some("EEG measures voltage."));
        assert_eq!(ctx.history, HistoryContext::Empty);

        let turns = store.read_all("s1", "agentA").await.unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].role, TurnRole::Assistant);
        assert_eq!(turns[0].content, "Memory: EEG measures voltage.");
    }

    #[tokio::test]
    async fn test_memory_failure_is_not_fatal() {
        let store = Arc::new(InMemoryMessageStore::new());
        let memory = Arc::new(BoxLongTermMemory::new(StaticMemory::failing("index offline")));
        let assembler = ContextAssembler::new(
            "agentA",
            "s1",
            config(HistoryTier::default()),
            Arc::clone(&store),
            Arc::new(ScriptedProvider::new(Vec::<&str>::new()).boxed()),
            Some(memory),
        );

        let ctx = assembler.assemble("What is EEG?").await.unwrap();
        assert!(ctx.memory.is_none());
        assert!(store.read_all("s1", "agentA").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_memory_disabled_by_config() {
        let store = Arc::new(InMemoryMessageStore::new());
        let memory = Arc::new(BoxLongTermMemory::new(StaticMemory::found("unused")));
        let cfg = ManagerConfig {
            query_memory_before_ask: false,
            ..config(HistoryTier::default())
        };
        let assembler = ContextAssembler::new(
            "agentA",
            "s1",
            cfg,
            Arc::clone(&store),
            Arc::new(ScriptedProvider::new(Vec::<&str>::new()).boxed()),
            Some(memory),
        );

        assert!(assembler.assemble("q").await.unwrap().memory.is_none());
    }

    #[tokio::test]
    async fn test_summary_buffer_folds_only_new_turns() {
        let store = Arc::new(InMemoryMessageStore::new());
        seed(&store, &[(TurnRole::User, "What is EEG?")]).await;
        let scripted = ScriptedProvider::new(["Summary v1", "Summary v2"]);
        let assembler = ContextAssembler::new(
            "agentA",
            "s1",
            config(HistoryTier::Summary),
            Arc::clone(&store),
            Arc::new(scripted.boxed()),
            None,
        );

        let ctx = assembler.assemble("q1").await.unwrap();
        assert_eq!(ctx.history, HistoryContext::Summary("Summary v1".to_string()));

        // Nothing new since the last fold: the buffer is reused without a call.
        let ctx = assembler.assemble("q2").await.unwrap();
        assert_eq!(ctx.history, HistoryContext::Summary("Summary v1".to_string()));
        assert_eq!(scripted.requests().len(), 1);

        store.append("s1", "agentA", TurnRole::Assistant, "A recording of brain activity.").await.unwrap();
        let ctx = assembler.assemble("q3").await.unwrap();
        assert_eq!(ctx.history, HistoryContext::Summary("Summary v2".to_string()));

        let requests = scripted.requests();
        assert_eq!(requests.len(), 2);
        let body = requests[1].prompt.render_user_message();
        assert!(body.contains("Current summary:\nSummary v1"));
        assert!(body.contains("A recording of brain activity."));
        assert!(!body.contains("What is EEG?"));
    }

    #[tokio::test]
    async fn test_summary_failure_propagates() {
        let store = Arc::new(InMemoryMessageStore::new());
        seed(&store, &[(TurnRole::User, "hello")]).await;
        let assembler = ContextAssembler::new(
            "agentA",
            "s1",
            config(HistoryTier::Summary),
            store,
            Arc::new(ScriptedProvider::new(Vec::<&str>::new()).boxed()),
            None,
        );

        let err = assembler.assemble("q").await.unwrap_err();
        assert!(matches!(err, ConversationError::Completion(_)));
        assert!(assembler.summary_text().await.is_none());
    }

    #[tokio::test]
    async fn test_completion_request_carries_config() {
        let store = Arc::new(InMemoryMessageStore::new());
        let cfg = ManagerConfig {
            model: "gpt-4".to_string(),
            system_prompt: Some("You are a neurologist.".to_string()),
            temperature: Some(0.2),
            ..config(HistoryTier::default())
        };
        let assembler = ContextAssembler::new(
            "agentA",
            "s1",
            cfg,
            store,
            Arc::new(ScriptedProvider::new(Vec::<&str>::new()).boxed()),
            None,
        );

        let ctx = assembler.assemble("What is EEG?").await.unwrap();
        let request = assembler.completion_request("What is EEG?", ctx);
        assert_eq!(request.model, "gpt-4");
        assert_eq!(request.temperature, Some(0.2));
        assert_eq!(request.prompt.system.as_deref(), Some("You are a neurologist."));
        assert_eq!(request.prompt.question, "What is EEG?");
    }
}
