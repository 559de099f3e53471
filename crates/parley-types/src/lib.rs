//! Shared domain types for Parley.
//!
//! This crate contains the types used across the session memory engine:
//! persisted conversation turns, prompt/completion shapes, manager
//! configuration, and the error taxonomy.
//!
//! Zero infrastructure dependencies -- only serde, chrono, thiserror.

pub mod config;
pub mod error;
pub mod llm;
pub mod turn;
