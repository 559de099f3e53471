//! CLI command definitions for the `parley` binary.
//!
//! Uses clap derive macros. Threads are always addressed as
//! `<agent> <session>`, matching the store's scoping key.

pub mod session;
pub mod status;
pub mod turn;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

use parley_types::turn::TurnRole;

/// Browse and maintain conversation threads.
#[derive(Parser)]
#[command(name = "parley", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Data directory holding config.toml and the database (default: ~/.parley).
    #[arg(long, global = true, env = "PARLEY_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List an agent's sessions, most recently active first.
    Sessions {
        /// Agent key.
        agent: String,
    },

    /// Show the turns of a session in store order.
    History {
        agent: String,
        session: String,

        /// Only the first N turns.
        #[arg(long, conflicts_with = "latest")]
        first: Option<usize>,

        /// Only the last N turns.
        #[arg(long)]
        latest: Option<usize>,
    },

    /// Fuzzy-search a session by edit distance.
    Search {
        agent: String,
        session: String,
        query: String,

        /// Maximum edit distance (defaults to the configured fuzzy tier).
        #[arg(short, long)]
        distance: Option<usize>,

        /// Maximum number of results (defaults to the configured fuzzy tier).
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Append a turn to a session.
    Append {
        agent: String,
        session: String,
        content: String,

        /// Author of the turn: system, user, assistant or tool.
        #[arg(long, default_value = "user")]
        role: TurnRole,
    },

    /// Set or clear the quality score of a turn.
    #[command(allow_negative_numbers = true)]
    Rate {
        /// Turn id.
        turn_id: i64,

        /// Quality score.
        #[arg(required_unless_present = "clear")]
        quality: Option<i64>,

        /// Remove the score instead of setting one.
        #[arg(long, conflicts_with = "quality")]
        clear: bool,
    },

    /// Delete a resource.
    #[command(alias = "rm")]
    Delete {
        #[command(subcommand)]
        resource: DeleteResource,
    },

    /// Print a fresh session id.
    #[command(name = "new-session")]
    NewSession,

    /// Show data directory, configuration and store totals.
    Status,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum DeleteResource {
    /// Delete every turn of a session.
    Session {
        agent: String,
        session: String,

        /// Skip the confirmation prompt.
        #[arg(long)]
        force: bool,
    },
}

/// Shorten `text` to at most `max` characters, marking the cut with "...".
pub(crate) fn truncate(text: &str, max: usize) -> String {
    let single_line = text.replace('\n', " ");
    if single_line.chars().count() <= max {
        return single_line;
    }
    let kept: String = single_line.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_rate_negative_and_clear() {
        let cli = Cli::try_parse_from(["parley", "rate", "7", "-1"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Rate { turn_id: 7, quality: Some(-1), clear: false }
        ));

        let cli = Cli::try_parse_from(["parley", "rate", "7", "--clear"]).unwrap();
        assert!(matches!(cli.command, Commands::Rate { quality: None, clear: true, .. }));

        assert!(Cli::try_parse_from(["parley", "rate", "7"]).is_err());
    }

    #[test]
    fn test_parse_append_role() {
        let cli = Cli::try_parse_from(["parley", "append", "agentA", "s1", "hi", "--role", "assistant"])
            .unwrap();
        assert!(matches!(cli.command, Commands::Append { role: TurnRole::Assistant, .. }));
        assert!(Cli::try_parse_from(["parley", "append", "agentA", "s1", "hi", "--role", "robot"]).is_err());
    }

    #[test]
    fn test_history_window_flags_conflict() {
        assert!(
            Cli::try_parse_from(["parley", "history", "a", "s", "--first", "2", "--latest", "2"]).is_err()
        );
    }

    #[test]
    fn test_truncate_is_char_aware() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("encephalography", 8), "encep...");
        assert_eq!(truncate("日本語のテキスト", 5), "日本...");
        assert_eq!(truncate("two\nlines", 20), "two lines");
    }
}
