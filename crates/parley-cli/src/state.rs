//! Application state wiring the store and retrieval engine together.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use parley_core::retrieval::RetrievalEngine;
use parley_infra::config::{database_url, load_global_config, resolve_data_dir};
use parley_infra::sqlite::{DatabasePool, SqliteMessageStore};
use parley_types::config::GlobalConfig;

/// Shared state for CLI commands.
pub struct AppState {
    pub store: Arc<SqliteMessageStore>,
    pub retrieval: RetrievalEngine<SqliteMessageStore>,
    pub config: GlobalConfig,
    pub data_dir: PathBuf,
    pub database_url: String,
}

impl AppState {
    /// Initialize from `data_dir`, or the resolved default when absent.
    pub async fn init(data_dir: Option<PathBuf>) -> anyhow::Result<Self> {
        Self::init_at(data_dir.unwrap_or_else(resolve_data_dir)).await
    }

    /// Initialize against an explicit data directory: load config, open the
    /// database and run migrations.
    pub async fn init_at(data_dir: PathBuf) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(&data_dir)
            .await
            .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

        let config = load_global_config(&data_dir).await;
        let database_url = database_url(&config, &data_dir);
        let pool = DatabasePool::new(&database_url)
            .await
            .with_context(|| format!("Failed to open database at {database_url}"))?;

        let store = Arc::new(SqliteMessageStore::new(pool));
        let retrieval = RetrievalEngine::new(Arc::clone(&store));
        tracing::debug!(data_dir = %data_dir.display(), "app state ready");

        Ok(Self {
            store,
            retrieval,
            config,
            data_dir,
            database_url,
        })
    }
}
