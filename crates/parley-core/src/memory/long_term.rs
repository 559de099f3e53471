//! Long-term memory collaborator.
//!
//! An optional external search (embeddings, document index, ...) consulted
//! while assembling context. Absence is a valid configuration, and a failed
//! lookup only drops its context block.

use std::future::Future;
use std::pin::Pin;

use parley_types::error::MemoryError;

/// Result of a long-term memory search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryResponse {
    pub response: String,
}

impl MemoryResponse {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
        }
    }
}

/// Trait for long-term memory backends.
pub trait LongTermMemory: Send + Sync {
    fn search(
        &self,
        query: &str,
    ) -> impl Future<Output = Result<MemoryResponse, MemoryError>> + Send;
}

/// Object-safe version of [`LongTermMemory`] with boxed futures.
pub trait LongTermMemoryDyn: Send + Sync {
    fn search_boxed<'a>(
        &'a self,
        query: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<MemoryResponse, MemoryError>> + Send + 'a>>;
}

impl<T: LongTermMemory> LongTermMemoryDyn for T {
    fn search_boxed<'a>(
        &'a self,
        query: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<MemoryResponse, MemoryError>> + Send + 'a>> {
        Box::pin(self.search(query))
    }
}

/// Type-erased long-term memory.
pub struct BoxLongTermMemory {
    inner: Box<dyn LongTermMemoryDyn + Send + Sync>,
}

impl BoxLongTermMemory {
    pub fn new<T: LongTermMemory + 'static>(memory: T) -> Self {
        Self {
            inner: Box::new(memory),
        }
    }

    pub async fn search(&self, query: &str) -> Result<MemoryResponse, MemoryError> {
        self.inner.search_boxed(query).await
    }
}
