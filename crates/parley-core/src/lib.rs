//! Business logic and port definitions for Parley.
//!
//! This crate defines the `MessageStore` port that the infrastructure layer
//! implements, plus everything that runs on top of it: approximate retrieval,
//! context assembly, the manager registry and the conversation manager.
//! It depends only on `parley-types` -- never on `parley-infra` or any
//! database crate.

pub mod context;
pub mod conversation;
pub mod llm;
pub mod memory;
pub mod retrieval;
pub mod retry;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;
