//! Turn commands: history, fuzzy search, append, rate.

use anyhow::{Context, Result, bail};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use parley_core::retrieval::sanitize_query;
use parley_core::store::MessageStore;
use parley_types::config::HistoryTier;
use parley_types::error::StorageError;
use parley_types::turn::{ConversationTurn, TurnRole};

use super::truncate;
use crate::state::AppState;

const DEFAULT_DISTANCE: usize = 5;
const DEFAULT_LIMIT: usize = 5;
const PREVIEW_CHARS: usize = 80;

/// Which slice of a thread `history` prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryWindow {
    All,
    First(usize),
    Latest(usize),
}

impl HistoryWindow {
    pub fn from_flags(first: Option<usize>, latest: Option<usize>) -> Self {
        match (first, latest) {
            (Some(n), _) => HistoryWindow::First(n),
            (None, Some(n)) => HistoryWindow::Latest(n),
            (None, None) => HistoryWindow::All,
        }
    }
}

/// Show the turns of a session in store order.
///
/// # Examples
///
/// ```bash
/// parley history neurology-expert s1
/// parley history neurology-expert s1 --latest 10 --json
/// ```
pub async fn history(
    state: &AppState,
    agent: &str,
    session: &str,
    window: HistoryWindow,
    json: bool,
) -> Result<()> {
    let turns = match window {
        HistoryWindow::All => state.store.read_all(session, agent).await?,
        HistoryWindow::First(n) => state.store.read_recent(session, agent, n).await?,
        HistoryWindow::Latest(n) => state.store.read_latest(session, agent, n).await?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&turns)?);
        return Ok(());
    }

    if turns.is_empty() {
        println!();
        println!(
            "  {} No turns in session '{}' for '{}'.",
            style("i").blue().bold(),
            session,
            style(agent).cyan()
        );
        println!();
        return Ok(());
    }

    println!();
    println!(
        "  Session '{}' for '{}'",
        style(session).bold(),
        style(agent).cyan().bold()
    );
    println!();
    println!("{}", turn_table(&turns));
    println!();

    Ok(())
}

/// Fuzzy-search a session. Distance and limit default to the configured
/// fuzzy tier, and the configured sanitization applies.
///
/// # Examples
///
/// ```bash
/// parley search neurology-expert s1 "What is encephalography" --distance 3
/// ```
pub async fn search(
    state: &AppState,
    agent: &str,
    session: &str,
    query: &str,
    distance: Option<usize>,
    limit: Option<usize>,
    json: bool,
) -> Result<()> {
    let (default_distance, default_limit) = match state.config.defaults.history {
        HistoryTier::FuzzySearch { distance, limit } => (distance, limit),
        _ => (DEFAULT_DISTANCE, DEFAULT_LIMIT),
    };
    let distance = distance.unwrap_or(default_distance);
    let limit = limit.unwrap_or(default_limit);

    let query = if state.config.defaults.sanitize_search_query {
        sanitize_query(query)
    } else {
        query.to_string()
    };

    let turns = state
        .retrieval
        .search_turns(session, agent, &query, distance, limit)
        .await
        .context("Fuzzy search failed")?;

    if json {
        let snippets: Vec<String> = turns.iter().map(ConversationTurn::snippet).collect();
        let out = serde_json::json!({
            "query": query,
            "max_distance": distance,
            "limit": limit,
            "snippets": snippets,
            "turns": turns,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if turns.is_empty() {
        println!();
        println!(
            "  {} No turns within {} edit{} of '{}'.",
            style("i").blue().bold(),
            distance,
            if distance == 1 { "" } else { "s" },
            style(&query).yellow()
        );
        println!();
        return Ok(());
    }

    println!();
    println!("{}", turn_table(&turns));
    println!();
    println!(
        "  {} match{} (oldest first, max distance {})",
        style(turns.len()).bold(),
        if turns.len() == 1 { "" } else { "es" },
        distance
    );
    println!();

    Ok(())
}

/// Append one turn to a session.
pub async fn append(
    state: &AppState,
    agent: &str,
    session: &str,
    content: &str,
    role: TurnRole,
    json: bool,
) -> Result<()> {
    if content.trim().is_empty() {
        bail!("Turn content must not be empty");
    }

    let id = state
        .store
        .append(session, agent, role, content)
        .await
        .context("Failed to append turn")?;

    if json {
        println!("{}", serde_json::json!({"id": id, "role": role, "session_id": session}));
    } else {
        println!(
            "  {} Appended {} turn #{} to '{}'.",
            style("✓").green().bold(),
            role,
            id,
            session
        );
    }

    Ok(())
}

/// Set (`Some`) or clear (`None`) a turn's quality score.
pub async fn rate(state: &AppState, turn_id: i64, quality: Option<i64>, json: bool) -> Result<()> {
    match state.store.set_quality(turn_id, quality).await {
        Ok(()) => {}
        Err(StorageError::NotFound) => bail!("Turn #{turn_id} not found"),
        Err(e) => return Err(e).context("Failed to update quality"),
    }

    if json {
        println!("{}", serde_json::json!({"id": turn_id, "quality": quality}));
    } else {
        match quality {
            Some(q) => println!("  {} Turn #{} rated {}.", style("✓").green().bold(), turn_id, q),
            None => println!("  {} Turn #{} rating cleared.", style("✓").green().bold(), turn_id),
        }
    }

    Ok(())
}

fn turn_table(turns: &[ConversationTurn]) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("#").fg(Color::White),
        Cell::new("Time").fg(Color::White),
        Cell::new("Role").fg(Color::White),
        Cell::new("Content").fg(Color::White),
        Cell::new("Quality").fg(Color::White),
    ]);

    for turn in turns {
        table.add_row(vec![
            Cell::new(turn.id).fg(Color::DarkGrey),
            Cell::new(turn.created_at.format("%Y-%m-%d %H:%M:%S").to_string()).fg(Color::White),
            role_cell(turn.role),
            Cell::new(truncate(&turn.content, PREVIEW_CHARS)),
            Cell::new(turn.quality.map(|q| q.to_string()).unwrap_or_default()).fg(Color::Yellow),
        ]);
    }

    table
}

fn role_cell(role: TurnRole) -> Cell {
    let color = match role {
        TurnRole::User => Color::Cyan,
        TurnRole::Assistant => Color::Green,
        TurnRole::System => Color::Magenta,
        TurnRole::Tool => Color::DarkGrey,
    };
    Cell::new(role.to_string()).fg(color)
}
