//! Message store abstraction.
//!
//! The `MessageStore` trait is the durable, append-only log of conversation
//! turns. The infrastructure layer implements it over SQLite.

pub mod repository;

pub use repository::MessageStore;
