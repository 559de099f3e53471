//! Fixed prompts used by auxiliary completion calls.

/// System prompt for the standalone question rewrite.
pub const STANDALONE_SYSTEM_PROMPT: &str = r#"Given the conversation history and a follow-up question, rewrite the follow-up as a standalone question.
The standalone question must be understandable without the history: replace pronouns and references with what they point to.
Reply with the standalone question only. If the question is already standalone, repeat it unchanged."#;

/// System prompt for folding new turns into the running summary.
pub const SUMMARY_SYSTEM_PROMPT: &str = r#"You maintain a running summary of a conversation. Preserve:
1. Facts the user shared or asked about
2. Answers and conclusions the assistant gave
3. Open questions

Keep the summary under 300 words. Write in third person (e.g., "The user asked about..." "The assistant explained...").
Reply with the updated summary only."#;

/// Prefix of the assistant turn that echoes a long-term memory result into the thread.
pub const MEMORY_ECHO_PREFIX: &str = "Memory: ";

/// Render a memory echo turn body.
pub fn memory_echo(response: &str) -> String {
    format!("{MEMORY_ECHO_PREFIX}{response}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_echo() {
        assert_eq!(memory_echo("EEG records brain activity."), "Memory: EEG records brain activity.");
    }

    #[test]
    fn test_prompts_ask_for_bare_output() {
        assert!(STANDALONE_SYSTEM_PROMPT.contains("standalone question only"));
        assert!(SUMMARY_SYSTEM_PROMPT.contains("updated summary only"));
        assert!(SUMMARY_SYSTEM_PROMPT.contains("third person"));
    }
}
