//! Running summary maintenance for the summary context tier.
//!
//! A `Summarizer` folds newly stored turns into the previous summary text.
//! The manager owns the buffer; summarizers are stateless.

use std::future::Future;
use std::sync::Arc;

use parley_types::error::CompletionError;
use parley_types::llm::{CompletionRequest, HistoryContext, Prompt};
use parley_types::turn::ConversationTurn;

use crate::llm::BoxCompletionProvider;

use super::prompt::SUMMARY_SYSTEM_PROMPT;

/// Folds turns into a running natural-language summary.
pub trait Summarizer: Send + Sync {
    /// Produce an updated summary from `previous` plus `turns` (oldest first).
    fn fold(
        &self,
        previous: Option<&str>,
        turns: &[ConversationTurn],
    ) -> impl Future<Output = Result<String, CompletionError>> + Send;
}

/// Summarizer backed by the completion interface.
pub struct CompletionSummarizer {
    provider: Arc<BoxCompletionProvider>,
    model: String,
}

impl CompletionSummarizer {
    pub fn new(provider: Arc<BoxCompletionProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    fn request(&self, previous: Option<&str>, turns: &[ConversationTurn]) -> CompletionRequest {
        let instruction = match previous.filter(|p| !p.trim().is_empty()) {
            Some(summary) => format!(
                "Current summary:\n{summary}\n\nUpdate the summary to include the conversation above."
            ),
            None => "Summarize the conversation above.".to_string(),
        };

        CompletionRequest {
            model: self.model.clone(),
            prompt: Prompt {
                system: Some(SUMMARY_SYSTEM_PROMPT.to_string()),
                search_query: instruction.clone(),
                question: instruction,
                history: HistoryContext::Snippets(turns.iter().map(ConversationTurn::snippet).collect()),
                memory: None,
            },
            temperature: Some(0.0),
            max_tokens: Some(1024),
        }
    }
}

impl Summarizer for CompletionSummarizer {
    #[tracing::instrument(
        name = "fold_summary",
        skip(self, previous, turns),
        fields(model = %self.model, turn_count = turns.len())
    )]
    async fn fold(
        &self,
        previous: Option<&str>,
        turns: &[ConversationTurn],
    ) -> Result<String, CompletionError> {
        if turns.is_empty() {
            return Ok(previous.unwrap_or_default().to_string());
        }

        let request = self.request(previous, turns);
        let summary = self.provider.complete(&request).await?;
        Ok(summary.trim().to_string())
    }
}
