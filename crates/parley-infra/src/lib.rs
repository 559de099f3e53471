//! Infrastructure layer for Parley.
//!
//! Contains the SQLite implementation of the `MessageStore` port defined in
//! `parley-core`, plus configuration loading from the data directory.

pub mod config;
pub mod sqlite;
