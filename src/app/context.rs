use std::path::PathBuf;
use std::sync::Arc;

use crate::app::error::{NewsstandError, Result};
use crate::client::ClientRegistry;
use crate::config::IngestConfig;
use crate::fetcher::{Fetcher, HttpFetcher};
use crate::orchestrator::{Orchestrator, DEFAULT_WORKERS};
use crate::store::SqliteStore;

/// Wires the pipeline together once at process start: store, client
/// registry and orchestrator. There is no ambient global state; consumers
/// hold this context and pass it where needed.
pub struct AppContext {
    pub store: Arc<SqliteStore>,
    pub registry: Arc<ClientRegistry>,
    pub orchestrator: Orchestrator,
}

impl AppContext {
    pub fn new(db_path: Option<PathBuf>, config: &IngestConfig) -> Result<Self> {
        let db_path = match db_path {
            Some(p) => p,
            None => Self::default_db_path()?,
        };
        let store = Arc::new(SqliteStore::new(&db_path)?);
        Self::wire(store, config)
    }

    pub fn in_memory() -> Result<Self> {
        Self::in_memory_with_config(&IngestConfig::default())
    }

    pub fn in_memory_with_config(config: &IngestConfig) -> Result<Self> {
        let store = Arc::new(SqliteStore::in_memory()?);
        Self::wire(store, config)
    }

    fn wire(store: Arc<SqliteStore>, config: &IngestConfig) -> Result<Self> {
        let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new());
        let registry = Arc::new(ClientRegistry::from_sources(
            config.effective_sources(),
            fetcher,
            config.backoff.policy(),
        ));
        let orchestrator = Orchestrator::with_workers(
            registry.clone(),
            store.clone(),
            config.workers.unwrap_or(DEFAULT_WORKERS),
        );

        Ok(Self {
            store,
            registry,
            orchestrator,
        })
    }

    fn default_db_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| NewsstandError::Config("Could not find data directory".into()))?;
        let newsstand_dir = data_dir.join("newsstand");
        std::fs::create_dir_all(&newsstand_dir)?;
        Ok(newsstand_dir.join("newsstand.db"))
    }
}
