//! Parley CLI entry point.
//!
//! Binary name: `parley`
//!
//! Parses CLI arguments, opens the session store, then dispatches to the
//! command handler.

mod cli;
mod state;

use clap::Parser;
use clap_complete::generate;
use tracing_subscriber::EnvFilter;

use cli::turn::HistoryWindow;
use cli::{Cli, Commands, DeleteResource};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,parley_core=debug,parley_infra=debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Commands that don't need the store
    match &cli.command {
        Commands::Completions { shell } => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            generate(*shell, &mut cmd, "parley", &mut std::io::stdout());
            return Ok(());
        }
        Commands::NewSession => return cli::session::new_session(cli.json),
        _ => {}
    }

    let state = AppState::init(cli.data_dir.clone()).await?;

    match cli.command {
        Commands::Sessions { agent } => {
            cli::session::list_sessions(&state, &agent, cli.json).await?;
        }

        Commands::History {
            agent,
            session,
            first,
            latest,
        } => {
            let window = HistoryWindow::from_flags(first, latest);
            cli::turn::history(&state, &agent, &session, window, cli.json).await?;
        }

        Commands::Search {
            agent,
            session,
            query,
            distance,
            limit,
        } => {
            cli::turn::search(&state, &agent, &session, &query, distance, limit, cli.json).await?;
        }

        Commands::Append {
            agent,
            session,
            content,
            role,
        } => {
            cli::turn::append(&state, &agent, &session, &content, role, cli.json).await?;
        }

        Commands::Rate {
            turn_id,
            quality,
            clear,
        } => {
            let quality = if clear { None } else { quality };
            cli::turn::rate(&state, turn_id, quality, cli.json).await?;
        }

        Commands::Delete { resource } => match resource {
            DeleteResource::Session {
                agent,
                session,
                force,
            } => {
                cli::session::delete_session(&state, &agent, &session, force, cli.json).await?;
            }
        },

        Commands::Status => {
            cli::status::status(&state, cli.json).await?;
        }

        Commands::Completions { .. } | Commands::NewSession => unreachable!("handled above"),
    }

    state.store.pool().close().await;
    Ok(())
}
