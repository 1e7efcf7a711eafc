//! Shared API state.

use std::sync::Arc;

use siteforge_blocks::TemplateCatalog;
use siteforge_jobs::{JobQueue, SiteStorage};
use siteforge_render::SiteRenderer;
use siteforge_store::Database;

/// Everything request handlers need. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub queue: JobQueue,
    pub catalog: Arc<TemplateCatalog>,
    pub renderer: Arc<SiteRenderer>,
    pub storage: SiteStorage,

    /// Parent domain of published sites (`<slug>.<publish_domain>`)
    pub publish_domain: Arc<str>,
}

impl AppState {
    pub fn new(
        queue: JobQueue,
        catalog: TemplateCatalog,
        renderer: SiteRenderer,
        storage: SiteStorage,
        publish_domain: &str,
    ) -> Self {
        Self {
            db: queue.db().clone(),
            queue,
            catalog: Arc::new(catalog),
            renderer: Arc::new(renderer),
            storage,
            publish_domain: Arc::from(publish_domain.trim_matches('.').to_lowercase()),
        }
    }
}
