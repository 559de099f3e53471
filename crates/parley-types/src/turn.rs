//! Conversation turn types.
//!
//! A turn is one persisted message in a conversation thread. Turns are scoped
//! by `(agent_key, session_id)` and are immutable once written, except for the
//! `quality` annotation.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// Who authored a turn.
///
/// Maps to the CHECK constraint in the SQLite schema:
/// `CHECK (role IN ('system', 'user', 'assistant', 'tool'))`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    System,
    User,
    Assistant,
    Tool,
}

impl fmt::Display for TurnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnRole::System => write!(f, "system"),
            TurnRole::User => write!(f, "user"),
            TurnRole::Assistant => write!(f, "assistant"),
            TurnRole::Tool => write!(f, "tool"),
        }
    }
}

impl FromStr for TurnRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "system" => Ok(TurnRole::System),
            "user" => Ok(TurnRole::User),
            "assistant" => Ok(TurnRole::Assistant),
            "tool" => Ok(TurnRole::Tool),
            other => Err(format!("invalid turn role: '{other}'")),
        }
    }
}

/// A single persisted turn within a conversation thread.
///
/// Turns are totally ordered by `(created_at, id)`. Both fields are assigned
/// by the store at write time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub id: i64,
    pub session_id: String,
    /// Which expert/chain the turn belongs to.
    pub agent_key: String,
    pub role: TurnRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
    /// Optional feedback score; the only mutable field.
    pub quality: Option<i64>,
}

impl ConversationTurn {
    /// Render the turn as a single prompt-ready line.
    ///
    /// Format: `At {created_at}, by {role}: {content}`.
    pub fn snippet(&self) -> String {
        format!(
            "At {}, by {}: {}",
            format_timestamp(&self.created_at),
            self.role,
            self.content
        )
    }
}

/// Most recent activity of one conversation thread for an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionActivity {
    pub session_id: String,
    pub last_active_at: DateTime<Utc>,
    pub turn_count: u64,
}

/// Canonical timestamp text: RFC 3339, UTC, fixed microsecond precision.
///
/// Fixed precision keeps lexical order equal to chronological order, which
/// the store relies on for `ORDER BY created_at`.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}
