use std::sync::Arc;

use anyhow::Result;
use tracing::warn;
use watchkeep_config::Config;
use watchkeep_contracts::scheduler::TaskScheduler;
use watchkeep_core::backend::DirectoryBackend;
use watchkeep_core::providers::{TmdbMetadataService, TmdbSettings};
use watchkeep_core::watched::{Reconciler, WatchedStore};

/// Store wiring shared by every command.
#[derive(Debug)]
pub struct Host {
    config: Config,
    backend: Arc<DirectoryBackend>,
}

impl Host {
    pub fn new(config: Config) -> Self {
        let backend = Arc::new(DirectoryBackend::new(&config.store.data_dir));
        Self { config, backend }
    }

    pub fn key(&self) -> &str {
        &self.config.store.key
    }

    pub fn backend(&self) -> &Arc<DirectoryBackend> {
        &self.backend
    }

    /// Whether background reconciliation may run for this invocation.
    pub fn can_reconcile(&self, requested: bool) -> bool {
        if !requested || !self.config.reconcile {
            return false;
        }
        if self.config.tmdb.api_key.is_none() {
            warn!(
                target: "watchkeepctl",
                "TMDB_API_KEY is not set; skipping legacy reconciliation"
            );
            return false;
        }
        true
    }

    fn metadata(&self) -> Result<TmdbMetadataService> {
        let tmdb = &self.config.tmdb;
        let mut settings =
            TmdbSettings::new(tmdb.api_key.clone().unwrap_or_default())?;
        if let Some(base_url) = &tmdb.base_url {
            settings.base_url = base_url.clone();
        }
        settings.language = tmdb.language.clone();
        Ok(TmdbMetadataService::new(settings))
    }

    pub fn open(
        &self,
        scheduler: Arc<dyn TaskScheduler>,
    ) -> Result<WatchedStore> {
        let reconciler = Reconciler::new(Arc::new(self.metadata()?));
        let store = WatchedStore::with_reconciler(
            self.key(),
            reconciler,
            self.backend.clone(),
            scheduler,
        )?;
        Ok(store)
    }
}
