//! Status command: data directory, effective configuration and store totals.

use anyhow::Result;
use console::style;

use parley_types::config::{HistoryTier, WindowAnchor};

use crate::state::AppState;

pub async fn status(state: &AppState, json: bool) -> Result<()> {
    let totals = state.store.totals().await?;
    let config = &state.config;

    if json {
        let status = serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "data_dir": state.data_dir.display().to_string(),
            "database_url": state.database_url,
            "registry_capacity": config.registry_capacity,
            "defaults": config.defaults,
            "store": {
                "turns": totals.turns,
                "agents": totals.agents,
                "sessions": totals.sessions,
            },
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!();
    println!("  {} Parley v{}", style("◆").bold(), env!("CARGO_PKG_VERSION"));
    println!();

    println!("  {}", style("── Storage ──").dim());
    println!("  Data dir: {}", style(state.data_dir.display()).cyan());
    println!("  Database: {}", style(&state.database_url).cyan());
    println!();

    println!("  {}", style("── Defaults ──").dim());
    println!("  Model:    {}", style(&config.defaults.model).bold());
    println!("  Context:  {}", describe_tier(&config.defaults.history));
    println!(
        "  Rewrite:  {}",
        if config.defaults.standalone_question {
            style(format!("on (window {})", config.defaults.rewrite_window)).green()
        } else {
            style("off".to_string()).dim()
        }
    );
    println!(
        "  Registry: {}",
        match config.registry_capacity {
            0 => "unbounded".to_string(),
            n => format!("{n} managers"),
        }
    );
    println!();

    println!("  {}", style("── Store ──").dim());
    println!("  Turns:    {}", style(totals.turns).bold());
    println!("  Sessions: {}", style(totals.sessions).bold());
    println!("  Agents:   {}", style(totals.agents).bold());
    println!();

    Ok(())
}

fn describe_tier(tier: &HistoryTier) -> String {
    match tier {
        HistoryTier::FuzzySearch { distance, limit } => {
            format!("fuzzy search (distance {distance}, limit {limit})")
        }
        HistoryTier::Recency { window, anchor: WindowAnchor::First } => {
            format!("first {window} turns")
        }
        HistoryTier::Recency { window, anchor: WindowAnchor::Last } => {
            format!("last {window} turns")
        }
        HistoryTier::Summary => "running summary".to_string(),
    }
}
