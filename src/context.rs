//! Application context: everything a lookup needs, built once at startup
//! and passed around explicitly.

use crate::config::Config;
use crate::datasets::DatasetCatalog;
use crate::executor::pool::WorkerPool;
use crate::reference::cache::ReferenceCache;
use crate::search::engine::SearchService;

use anyhow::Context;
use std::sync::Arc;

#[derive(Clone)]
pub struct LookupContext {
    pub pool: WorkerPool,
    pub references: Arc<ReferenceCache>,
    pub search: SearchService,
}

impl LookupContext {
    /// Loads reference data and starts the worker pool.
    ///
    /// Must be called from inside a Tokio runtime.
    pub fn build(config: &Config) -> anyhow::Result<Self> {
        let references = match &config.reference_file {
            Some(path) => ReferenceCache::from_json_file(path)?,
            None => {
                tracing::info!("No reference file configured, vehicle codes stay raw");
                ReferenceCache::empty()
            }
        };

        let pool = WorkerPool::for_datasets(config.pool_size, &config.data_dir)
            .context("starting worker pool")?;

        Ok(Self::with_parts(pool, references, config.max_phone_subjects))
    }

    pub fn with_parts(
        pool: WorkerPool,
        references: ReferenceCache,
        max_phone_subjects: usize,
    ) -> Self {
        let references = Arc::new(references);
        let search = SearchService::new(DatasetCatalog::new(&pool), references.clone())
            .with_max_phone_subjects(max_phone_subjects);

        Self {
            pool,
            references,
            search,
        }
    }

    pub async fn shutdown(&self) -> anyhow::Result<()> {
        self.pool.shutdown().await.context("shutting down worker pool")
    }
}
