//! Publishing: render a project and deploy it to object storage.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use siteforge_render::SiteRenderer;
use siteforge_store::{Database, JobRecord};

use crate::error::JobError;
use crate::queue::JobHandler;
use crate::storage::SiteStorage;

/// What a successful publish produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishOutcome {
    pub success: bool,
    pub published_url: String,
    pub deployment_id: Uuid,
    pub site_path: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublishJobData {
    project_id: Uuid,
    user_id: Uuid,
}

/// Object key prefix for one deployment of a site.
pub fn site_path(slug: &str, deployment_id: Uuid) -> String {
    format!("sites/{}-{}", slug, deployment_id)
}

/// Object key of a deployment's page.
pub fn index_key(site_path: &str) -> String {
    format!("{}/index.html", site_path)
}

/// Public URL of a published site.
pub fn published_url(slug: &str, publish_domain: &str) -> String {
    format!("https://{}.{}", slug, publish_domain)
}

/// Renders projects and uploads each publish to a fresh deployment path.
pub struct Publisher {
    db: Database,
    storage: SiteStorage,
    renderer: SiteRenderer,
    publish_domain: String,
}

impl Publisher {
    pub fn new(db: Database, storage: SiteStorage, renderer: SiteRenderer, publish_domain: impl Into<String>) -> Self {
        Self {
            db,
            storage,
            renderer,
            publish_domain: publish_domain.into(),
        }
    }

    /// Publish the owner's project.
    ///
    /// Every call uploads to a new `sites/<slug>-<uuid>` path; earlier
    /// deployments are left in place.
    pub async fn publish(&self, project_id: Uuid, owner: Uuid) -> Result<PublishOutcome, JobError> {
        let project = self
            .db
            .get_project(project_id, owner)
            .await?
            .ok_or_else(|| JobError::NotFound("Project".to_string()))?;

        let html = self
            .renderer
            .render(&project.to_document())
            .map_err(|e| JobError::Render(e.to_string()))?;

        let deployment_id = Uuid::new_v4();
        let site_path = site_path(&project.slug, deployment_id);
        self.storage.put_html(&index_key(&site_path), html).await?;

        let published_url = published_url(&project.slug, &self.publish_domain);
        let recorded = self
            .db
            .mark_published(project.id, &published_url, &site_path, Utc::now())
            .await?;
        if !recorded {
            return Err(JobError::NotFound("Project".to_string()));
        }

        tracing::info!("Published {} to {} ({})", project.slug, published_url, site_path);

        Ok(PublishOutcome {
            success: true,
            published_url,
            deployment_id,
            site_path,
        })
    }
}

#[async_trait]
impl JobHandler for Publisher {
    async fn run(&self, job: &JobRecord) -> Result<Value, JobError> {
        let data: PublishJobData =
            serde_json::from_value(job.data.clone()).map_err(|e| JobError::InvalidData(e.to_string()))?;

        let outcome = self.publish(data.project_id, data.user_id).await?;
        serde_json::to_value(outcome).map_err(|e| JobError::InvalidData(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::queue::{JobOptions, JobQueue};
    use siteforge_blocks::{Block, BlockKind};
    use siteforge_store::{JobKind, JobStatus, NewProject, ProjectRecord};

    async fn setup() -> (Database, SiteStorage, ProjectRecord) {
        let db = Database::in_memory().await.unwrap();
        let project = db
            .create_project(NewProject {
                owner_id: Uuid::new_v4(),
                title: "Bella Vista".to_string(),
                slug: "bella-vista".to_string(),
                content: vec![Block::new(BlockKind::Hero), Block::new(BlockKind::Contact)],
                ..Default::default()
            })
            .await
            .unwrap();
        (db, SiteStorage::in_memory(), project)
    }

    #[tokio::test]
    async fn publishes_to_fresh_deployment_path() {
        let (db, storage, project) = setup().await;
        let publisher = Publisher::new(db.clone(), storage.clone(), SiteRenderer::default(), "sites.test");

        let first = publisher.publish(project.id, project.owner_id).await.unwrap();
        let second = publisher.publish(project.id, project.owner_id).await.unwrap();

        assert_eq!(first.published_url, "https://bella-vista.sites.test");
        assert!(first.site_path.starts_with("sites/bella-vista-"));
        assert_ne!(first.site_path, second.site_path);

        let html = storage.get_html(&index_key(&first.site_path)).await.unwrap().unwrap();
        assert!(html.contains("<title>Bella Vista</title>"));
        assert!(html.contains(&project.id.to_string()));
        assert!(storage.get_html(&index_key(&second.site_path)).await.unwrap().is_some());

        let stored = db.get_project(project.id, project.owner_id).await.unwrap().unwrap();
        assert!(stored.is_published);
        assert_eq!(stored.deployment_path.as_deref(), Some(second.site_path.as_str()));
    }

    #[tokio::test]
    async fn other_owners_cannot_publish() {
        let (db, storage, project) = setup().await;
        let publisher = Publisher::new(db, storage, SiteRenderer::default(), "sites.test");

        let err = publisher.publish(project.id, Uuid::new_v4()).await.unwrap_err();

        assert!(matches!(err, JobError::NotFound(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn runs_through_the_queue() {
        let (db, storage, project) = setup().await;
        let publisher = Arc::new(Publisher::new(
            db.clone(),
            storage,
            SiteRenderer::default(),
            "sites.test",
        ));
        let queue = JobQueue::builder(db)
            .handler(JobKind::PublishSite, publisher, JobOptions::publish())
            .build();

        let job = queue.publish_site(project.id, project.owner_id).await.unwrap();
        let done = queue.wait_for(job.id, Duration::from_secs(5)).await.unwrap().unwrap();

        assert_eq!(done.status, JobStatus::Completed);
        let outcome: PublishOutcome = serde_json::from_value(done.result.unwrap()).unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.published_url, "https://bella-vista.sites.test");
    }
}
