//! API server command.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use siteforge_jobs::{
    DomainVerifier, HickoryResolver, JobQueue, ManagedCertificates, Publisher, SiteStorage,
};
use siteforge_render::SiteRenderer;
use siteforge_server::{ApiServer, AppState};
use siteforge_store::{Database, JobKind};

use crate::config::Config;

/// Run the API server with its job workers.
pub async fn run(config: Config, port: Option<u16>) -> Result<()> {
    let db = Database::connect(&config.database.url)
        .await
        .with_context(|| format!("Failed to open database {}", config.database.url))?;

    let storage = SiteStorage::from_config(&config.storage).context("Failed to set up storage")?;
    let catalog = config.catalog()?;
    let publish_domain = config.publish.domain.clone();

    let publisher = Arc::new(Publisher::new(
        db.clone(),
        storage.clone(),
        SiteRenderer::new(config.render_config()),
        publish_domain.clone(),
    ));
    let resolver = HickoryResolver::from_system_conf().context("Failed to set up DNS resolver")?;
    let verifier = Arc::new(DomainVerifier::new(
        db.clone(),
        Arc::new(resolver),
        Arc::new(ManagedCertificates::new(Duration::ZERO)),
        config.jobs.ssl_delay(),
    ));

    let queue = JobQueue::builder(db)
        .workers(config.jobs.workers)
        .handler(JobKind::PublishSite, publisher, config.jobs.publish_options())
        .handler(JobKind::VerifyDomain, verifier.clone(), config.jobs.verify_options())
        .build();
    queue.recover().await.context("Failed to recover unfinished jobs")?;
    verifier
        .resume_provisioning()
        .await
        .context("Failed to resume SSL provisioning")?;

    tracing::info!(
        "Publishing to *.{} using {} templates",
        publish_domain,
        catalog.len()
    );

    let state = AppState::new(
        queue,
        catalog,
        SiteRenderer::new(config.render_config()),
        storage,
        &publish_domain,
    );

    let mut server_config = config.server.clone();
    if let Some(port) = port {
        server_config.port = port;
    }

    ApiServer::new(server_config, state).start().await?;

    Ok(())
}
