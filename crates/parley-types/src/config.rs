//! Configuration types for Parley.
//!
//! `GlobalConfig` represents the top-level `config.toml`. `ManagerConfig` is
//! the per-manager context policy, selected once at construction time.

use serde::{Deserialize, Serialize};

/// Top-level configuration.
///
/// Loaded from `~/.parley/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// SQLite URL; defaults to `{data_dir}/parley.db` when absent.
    #[serde(default)]
    pub database_url: Option<String>,

    /// Maximum number of idle conversation managers kept alive (0 = unbounded).
    #[serde(default = "default_registry_capacity")]
    pub registry_capacity: usize,

    /// Context policy applied to managers that do not override it.
    #[serde(default)]
    pub defaults: ManagerConfig,
}

fn default_registry_capacity() -> usize {
    256
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            registry_capacity: default_registry_capacity(),
            defaults: ManagerConfig::default(),
        }
    }
}

/// Per-manager context policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagerConfig {
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default)]
    pub temperature: Option<f64>,

    #[serde(default)]
    pub max_tokens: Option<u32>,

    #[serde(default)]
    pub system_prompt: Option<String>,

    /// Rewrite follow-ups into a standalone search query before retrieval.
    #[serde(default = "default_true")]
    pub standalone_question: bool,

    /// Query the long-term memory collaborator (when one is configured).
    #[serde(default = "default_true")]
    pub query_memory_before_ask: bool,

    /// Number of turns shown to the standalone rewrite.
    #[serde(default = "default_window")]
    pub rewrite_window: usize,

    /// Keep only alphanumerics and spaces in the search query.
    #[serde(default)]
    pub sanitize_search_query: bool,

    #[serde(default)]
    pub history: HistoryTier,
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_true() -> bool {
    true
}

fn default_window() -> usize {
    5
}

fn default_distance() -> usize {
    5
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: None,
            max_tokens: None,
            system_prompt: None,
            standalone_question: true,
            query_memory_before_ask: true,
            rewrite_window: default_window(),
            sanitize_search_query: false,
            history: HistoryTier::default(),
        }
    }
}

/// The source of historical context. Mutually exclusive per manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tier", rename_all = "snake_case")]
pub enum HistoryTier {
    /// Turns within `distance` edits of the search query, oldest `limit` first.
    FuzzySearch {
        #[serde(default = "default_distance")]
        distance: usize,
        #[serde(default = "default_window")]
        limit: usize,
    },
    /// A fixed window of stored turns, no filtering.
    Recency {
        #[serde(default = "default_window")]
        window: usize,
        #[serde(default)]
        anchor: WindowAnchor,
    },
    /// A running summary folded from the whole thread.
    Summary,
}

impl Default for HistoryTier {
    fn default() -> Self {
        HistoryTier::FuzzySearch {
            distance: default_distance(),
            limit: default_window(),
        }
    }
}

/// Which end of the thread a recency window is taken from.
///
/// `First` is the established contract: the earliest turns of the thread.
/// `Last` is an explicit opt-in for a true most-recent window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowAnchor {
    #[default]
    First,
    Last,
}
