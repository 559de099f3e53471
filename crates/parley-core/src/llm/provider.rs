//! CompletionProvider trait definition.
//!
//! The external completion interface: a structured prompt and a model
//! identifier in, generated text out. No local timeout is imposed here;
//! cancellation belongs to the implementation.

use parley_types::error::CompletionError;
use parley_types::llm::CompletionRequest;

/// Trait for completion backends.
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
/// Wrap an implementation in [`BoxCompletionProvider`](super::BoxCompletionProvider)
/// for runtime selection.
pub trait CompletionProvider: Send + Sync {
    /// Human-readable provider name.
    fn name(&self) -> &str;

    /// Send a completion request and receive the generated text.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<String, CompletionError>> + Send;
}
