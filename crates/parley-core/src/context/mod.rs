pub mod assembler;
pub mod prompt;
pub mod summarizer;

pub use assembler::{AssembledContext, ContextAssembler};
pub use summarizer::{CompletionSummarizer, Summarizer};
