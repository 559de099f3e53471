//! Prompt and completion request types.
//!
//! These model what the context assembler hands to the external completion
//! interface: a structured prompt (system / history / memory / question) that
//! providers may consume as-is or flatten into chat messages.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of a message in a flattened completion prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single message in a flattened completion prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

/// The historical context chosen by the active context tier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tier", content = "value", rename_all = "snake_case")]
pub enum HistoryContext {
    /// No prior context (empty thread, or nothing qualified).
    #[default]
    Empty,
    /// Rendered turn snippets, oldest first.
    Snippets(Vec<String>),
    /// A running natural-language summary of the thread.
    Summary(String),
}

impl HistoryContext {
    pub fn is_empty(&self) -> bool {
        match self {
            HistoryContext::Empty => true,
            HistoryContext::Snippets(lines) => lines.is_empty(),
            HistoryContext::Summary(text) => text.trim().is_empty(),
        }
    }
}

/// Structured prompt handed to the completion interface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// The caller's original question.
    pub question: String,
    /// The (possibly rewritten) query used for retrieval.
    pub search_query: String,
    pub history: HistoryContext,
    /// Long-term memory search result, kept apart from conversational history.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,
}

impl Prompt {
    /// A bare prompt with no context, used for auxiliary calls.
    pub fn bare(system: Option<String>, question: impl Into<String>) -> Self {
        let question = question.into();
        Self {
            system,
            search_query: question.clone(),
            question,
            history: HistoryContext::Empty,
            memory: None,
        }
    }

    /// Render the user-facing half of the prompt as one message body.
    ///
    /// History and long-term memory get distinct labels so the model never
    /// confuses recalled documents with what was said in this thread.
    pub fn render_user_message(&self) -> String {
        let mut sections = Vec::new();

        match &self.history {
            HistoryContext::Empty => {}
            HistoryContext::Snippets(lines) if lines.is_empty() => {}
            HistoryContext::Snippets(lines) => {
                sections.push(format!("Conversation history:\n{}", lines.join("\n")));
            }
            HistoryContext::Summary(text) => {
                sections.push(format!("Conversation summary:\n{text}"));
            }
        }

        if let Some(memory) = self.memory.as_deref().filter(|m| !m.trim().is_empty()) {
            sections.push(format!("Long-term memory:\n{memory}"));
        }

        if self.search_query != self.question {
            sections.push(format!("Search query: {}", self.search_query));
        }

        sections.push(format!("Question: {}", self.question));
        sections.join("\n\n")
    }

    /// Flatten into chat messages: optional system message plus one user message.
    pub fn to_messages(&self) -> Vec<Message> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &self.system {
            messages.push(Message {
                role: MessageRole::System,
                content: system.clone(),
            });
        }
        messages.push(Message {
            role: MessageRole::User,
            content: self.render_user_message(),
        });
        messages
    }
}

/// Request to the external completion interface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: Prompt,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt(history: HistoryContext, memory: Option<&str>) -> Prompt {
        Prompt {
            system: Some("You are a neurology expert.".to_string()),
            question: "What does it measure?".to_string(),
            search_query: "What does encephalography measure?".to_string(),
            history,
            memory: memory.map(str::to_string),
        }
    }

    #[test]
    fn test_render_with_snippets_and_memory() {
        let p = prompt(
            HistoryContext::Snippets(vec!["At t, by user: What is EEG?".to_string()]),
            Some("EEG records electrical activity."),
        );
        let body = p.render_user_message();
        assert!(body.starts_with("Conversation history:\nAt t, by user: What is EEG?"));
        assert!(body.contains("Long-term memory:\nEEG records electrical activity."));
        assert!(body.contains("Search query: What does encephalography measure?"));
        assert!(body.ends_with("Question: What does it measure?"));
    }

    #[test]
    fn test_render_skips_empty_sections() {
        let mut p = prompt(HistoryContext::Snippets(vec![]), Some("   "));
        p.search_query = p.question.clone();
        assert_eq!(p.render_user_message(), "Question: What does it measure?");
    }

    #[test]
    fn test_render_summary_tier() {
        let p = prompt(HistoryContext::Summary("The user asked about EEG.".to_string()), None);
        assert!(p.render_user_message().starts_with("Conversation summary:\nThe user asked about EEG."));
    }

    #[test]
    fn test_to_messages_includes_system_first() {
        let messages = prompt(HistoryContext::Empty, None).to_messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::System);
        assert_eq!(messages[1].role, MessageRole::User);
    }

    #[test]
    fn test_bare_prompt_has_no_system_message() {
        let messages = Prompt::bare(None, "ping").to_messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "Question: ping");
    }

    #[test]
    fn test_history_context_is_empty() {
        assert!(HistoryContext::Empty.is_empty());
        assert!(HistoryContext::Snippets(vec![]).is_empty());
        assert!(HistoryContext::Summary(" ".to_string()).is_empty());
        assert!(!HistoryContext::Summary("x".to_string()).is_empty());
    }
}
