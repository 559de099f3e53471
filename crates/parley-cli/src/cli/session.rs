//! Session commands: list, delete, new id.

use anyhow::{Context, Result};
use chrono::Utc;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use dialoguer::Confirm;
use uuid::Uuid;

use parley_core::store::MessageStore;

use crate::state::AppState;

/// List sessions of an agent, most recently active first.
///
/// # Examples
///
/// ```bash
/// parley sessions neurology-expert
/// parley sessions neurology-expert --json
/// ```
pub async fn list_sessions(state: &AppState, agent: &str, json: bool) -> Result<()> {
    let sessions = state
        .store
        .list_sessions(agent)
        .await
        .with_context(|| format!("Failed to list sessions for '{agent}'"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&sessions)?);
        return Ok(());
    }

    if sessions.is_empty() {
        println!();
        println!(
            "  {} No sessions found for '{}'.",
            style("i").blue().bold(),
            style(agent).cyan()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Session").fg(Color::White),
        Cell::new("Last active").fg(Color::White),
        Cell::new("Idle").fg(Color::White),
        Cell::new("Turns").fg(Color::White),
    ]);

    let now = Utc::now();
    for session in &sessions {
        table.add_row(vec![
            Cell::new(&session.session_id).fg(Color::Cyan),
            Cell::new(session.last_active_at.format("%Y-%m-%d %H:%M").to_string()).fg(Color::White),
            Cell::new(format_duration(now - session.last_active_at)).fg(Color::DarkGrey),
            Cell::new(session.turn_count.to_string()).fg(Color::White),
        ]);
    }

    println!();
    println!("  Sessions for '{}'", style(agent).cyan().bold());
    println!();
    println!("{table}");
    println!();
    println!(
        "  {} session{}",
        style(sessions.len()).bold(),
        if sessions.len() == 1 { "" } else { "s" }
    );
    println!();

    Ok(())
}

/// Delete every turn of a session, with confirmation.
///
/// # Examples
///
/// ```bash
/// parley delete session neurology-expert 0190c4d2-...
/// parley delete session neurology-expert 0190c4d2-... --force
/// ```
pub async fn delete_session(
    state: &AppState,
    agent: &str,
    session: &str,
    force: bool,
    json: bool,
) -> Result<()> {
    if !force && !json {
        let turns = state.store.read_all(session, agent).await?;
        if turns.is_empty() {
            println!(
                "  {} Session '{}' has no turns for '{}'.",
                style("i").blue().bold(),
                session,
                style(agent).cyan()
            );
            return Ok(());
        }

        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Delete session '{}' ({} turns)?",
                style(session).red().bold(),
                turns.len()
            ))
            .default(false)
            .interact()?;

        if !confirmed {
            println!("  Cancelled.");
            return Ok(());
        }
    }

    let removed = state
        .store
        .delete_session(session, agent)
        .await
        .with_context(|| format!("Failed to delete session '{session}'"))?;

    if json {
        println!(
            "{}",
            serde_json::json!({"agent_key": agent, "session_id": session, "removed": removed})
        );
    } else {
        println!(
            "  {} Session '{}' deleted ({} turn{}).",
            style("x").red().bold(),
            session,
            removed,
            if removed == 1 { "" } else { "s" }
        );
    }

    Ok(())
}

/// Print a fresh, time-ordered session id.
pub fn new_session(json: bool) -> Result<()> {
    let id = Uuid::now_v7();
    if json {
        println!("{}", serde_json::json!({"session_id": id.to_string()}));
    } else {
        println!("{id}");
    }
    Ok(())
}

fn format_duration(duration: chrono::TimeDelta) -> String {
    let total_secs = duration.num_seconds().max(0);
    let days = total_secs / 86_400;
    let hours = (total_secs % 86_400) / 3600;
    let mins = (total_secs % 3600) / 60;

    if days > 0 {
        format!("{days}d {hours}h")
    } else if hours > 0 {
        format!("{hours}h {mins}m")
    } else if mins > 0 {
        format!("{mins}m")
    } else {
        format!("{total_secs}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(TimeDelta::seconds(42)), "42s");
        assert_eq!(format_duration(TimeDelta::seconds(125)), "2m");
        assert_eq!(format_duration(TimeDelta::seconds(3 * 3600 + 60)), "3h 1m");
        assert_eq!(format_duration(TimeDelta::seconds(2 * 86_400 + 3600)), "2d 1h");
        assert_eq!(format_duration(TimeDelta::seconds(-5)), "0s");
    }
}
