//! Project queries.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::database::Database;
use crate::error::{is_unique_violation, StoreError};
use crate::models::{format_time, now, to_json, NewProject, ProjectRecord, ProjectUpdate};

const T: &str = "projects";

impl Database {
    /// Insert a project. Fails with [`StoreError::SlugTaken`] on a slug clash.
    pub async fn create_project(&self, new: NewProject) -> Result<ProjectRecord, StoreError> {
        let now = now();
        let project = ProjectRecord {
            id: Uuid::new_v4(),
            owner_id: new.owner_id,
            title: new.title,
            slug: new.slug,
            description: new.description,
            content: new.content,
            styles: new.styles,
            seo_title: new.seo_title,
            seo_description: new.seo_description,
            favicon: new.favicon,
            custom_css: new.custom_css,
            template_id: new.template_id,
            is_published: false,
            published_url: None,
            published_at: None,
            deployment_path: None,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO projects (
                id, owner_id, title, slug, description, content, styles,
                seo_title, seo_description, favicon, custom_css, template_id,
                is_published, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?)
            "#,
        )
        .bind(project.id.to_string())
        .bind(project.owner_id.to_string())
        .bind(&project.title)
        .bind(&project.slug)
        .bind(&project.description)
        .bind(to_json(T, "content", &project.content)?)
        .bind(to_json(T, "styles", &project.styles)?)
        .bind(&project.seo_title)
        .bind(&project.seo_description)
        .bind(&project.favicon)
        .bind(&project.custom_css)
        .bind(&project.template_id)
        .bind(format_time(now))
        .bind(format_time(now))
        .execute(self.pool())
        .await
        .map_err(|e| slug_error(e, &project.slug))?;

        tracing::debug!("Created project {} ({})", project.id, project.slug);
        Ok(project)
    }

    /// Fetch a project owned by `owner`.
    pub async fn get_project(&self, id: Uuid, owner: Uuid) -> Result<Option<ProjectRecord>, StoreError> {
        let row = sqlx::query("SELECT * FROM projects WHERE id = ? AND owner_id = ?")
            .bind(id.to_string())
            .bind(owner.to_string())
            .fetch_optional(self.pool())
            .await?;

        row.as_ref().map(ProjectRecord::from_row).transpose()
    }

    /// All of an owner's projects, most recently updated first.
    pub async fn list_projects(&self, owner: Uuid) -> Result<Vec<ProjectRecord>, StoreError> {
        let rows = sqlx::query("SELECT * FROM projects WHERE owner_id = ? ORDER BY updated_at DESC")
            .bind(owner.to_string())
            .fetch_all(self.pool())
            .await?;

        rows.iter().map(ProjectRecord::from_row).collect()
    }

    /// Apply a partial update. Returns `None` if the project does not exist
    /// for this owner.
    pub async fn update_project(
        &self,
        id: Uuid,
        owner: Uuid,
        update: ProjectUpdate,
    ) -> Result<Option<ProjectRecord>, StoreError> {
        let Some(mut project) = self.get_project(id, owner).await? else {
            return Ok(None);
        };

        update.apply(&mut project);
        project.updated_at = now();

        sqlx::query(
            r#"
            UPDATE projects SET
                title = ?, slug = ?, description = ?, content = ?, styles = ?,
                seo_title = ?, seo_description = ?, favicon = ?, custom_css = ?,
                updated_at = ?
            WHERE id = ? AND owner_id = ?
            "#,
        )
        .bind(&project.title)
        .bind(&project.slug)
        .bind(&project.description)
        .bind(to_json(T, "content", &project.content)?)
        .bind(to_json(T, "styles", &project.styles)?)
        .bind(&project.seo_title)
        .bind(&project.seo_description)
        .bind(&project.favicon)
        .bind(&project.custom_css)
        .bind(format_time(project.updated_at))
        .bind(id.to_string())
        .bind(owner.to_string())
        .execute(self.pool())
        .await
        .map_err(|e| slug_error(e, &project.slug))?;

        Ok(Some(project))
    }

    /// Delete a project. Returns whether a row was removed.
    pub async fn delete_project(&self, id: Uuid, owner: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM projects WHERE id = ? AND owner_id = ?")
            .bind(id.to_string())
            .bind(owner.to_string())
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Whether any project, of any owner, uses `slug`.
    pub async fn slug_exists(&self, slug: &str) -> Result<bool, StoreError> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM projects WHERE slug = ?")
            .bind(slug)
            .fetch_optional(self.pool())
            .await?;

        Ok(found.is_some())
    }

    /// Record a successful deployment. Returns whether the project still exists.
    pub async fn mark_published(
        &self,
        id: Uuid,
        published_url: &str,
        deployment_path: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE projects SET
                is_published = 1, published_url = ?, published_at = ?,
                deployment_path = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(published_url)
        .bind(format_time(at))
        .bind(deployment_path)
        .bind(format_time(at))
        .bind(id.to_string())
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deployment path of the published project with this slug, for public
    /// site hosting.
    pub async fn deployment_for_slug(&self, slug: &str) -> Result<Option<String>, StoreError> {
        let path: Option<Option<String>> = sqlx::query_scalar(
            "SELECT deployment_path FROM projects WHERE slug = ? AND is_published = 1",
        )
        .bind(slug)
        .fetch_optional(self.pool())
        .await?;

        Ok(path.flatten())
    }

    /// Deployment path of the project a verified custom domain points at.
    pub async fn deployment_for_domain(&self, domain: &str) -> Result<Option<String>, StoreError> {
        let path: Option<Option<String>> = sqlx::query_scalar(
            r#"
            SELECT p.deployment_path
            FROM domains d JOIN projects p ON p.id = d.project_id
            WHERE d.domain = ? AND d.status = 'VERIFIED' AND p.is_published = 1
            "#,
        )
        .bind(domain)
        .fetch_optional(self.pool())
        .await?;

        Ok(path.flatten())
    }
}

fn slug_error(err: sqlx::Error, slug: &str) -> StoreError {
    if is_unique_violation(&err) {
        StoreError::SlugTaken(slug.to_string())
    } else {
        err.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use siteforge_blocks::{Block, BlockKind};

    fn new_project(owner: Uuid, slug: &str) -> NewProject {
        NewProject {
            owner_id: owner,
            title: format!("Site {}", slug),
            slug: slug.to_string(),
            content: vec![Block::new(BlockKind::Hero)],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn creates_and_reads_back() {
        let db = Database::in_memory().await.unwrap();
        let owner = Uuid::new_v4();

        let created = db.create_project(new_project(owner, "bakery")).await.unwrap();
        let loaded = db.get_project(created.id, owner).await.unwrap().unwrap();

        assert_eq!(loaded, created);
        assert_eq!(loaded.content.len(), 1);
        assert!(!loaded.is_published);
    }

    #[tokio::test]
    async fn reads_are_scoped_by_owner() {
        let db = Database::in_memory().await.unwrap();
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();

        let created = db.create_project(new_project(owner, "mine")).await.unwrap();

        assert!(db.get_project(created.id, stranger).await.unwrap().is_none());
        assert!(db.list_projects(stranger).await.unwrap().is_empty());
        assert!(!db.delete_project(created.id, stranger).await.unwrap());
        assert!(db
            .update_project(created.id, stranger, ProjectUpdate::default())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn duplicate_slug_is_rejected() {
        let db = Database::in_memory().await.unwrap();

        db.create_project(new_project(Uuid::new_v4(), "taken")).await.unwrap();
        let err = db
            .create_project(new_project(Uuid::new_v4(), "taken"))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::SlugTaken(slug) if slug == "taken"));
        assert!(db.slug_exists("taken").await.unwrap());
        assert!(!db.slug_exists("free").await.unwrap());
    }

    #[tokio::test]
    async fn lists_most_recently_updated_first() {
        let db = Database::in_memory().await.unwrap();
        let owner = Uuid::new_v4();

        let first = db.create_project(new_project(owner, "first")).await.unwrap();
        let second = db.create_project(new_project(owner, "second")).await.unwrap();

        db.update_project(
            first.id,
            owner,
            ProjectUpdate {
                title: Some("Touched".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let slugs: Vec<String> = db
            .list_projects(owner)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.slug)
            .collect();
        assert_eq!(slugs, vec!["first".to_string(), second.slug]);
    }

    #[tokio::test]
    async fn partial_update_keeps_other_fields() {
        let db = Database::in_memory().await.unwrap();
        let owner = Uuid::new_v4();
        let created = db.create_project(new_project(owner, "cafe")).await.unwrap();

        let updated = db
            .update_project(
                created.id,
                owner,
                ProjectUpdate {
                    seo_title: Some("Best Cafe".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.seo_title.as_deref(), Some("Best Cafe"));
        assert_eq!(updated.title, created.title);
        assert_eq!(updated.content, created.content);
        assert!(updated.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn publishing_exposes_deployment() {
        let db = Database::in_memory().await.unwrap();
        let owner = Uuid::new_v4();
        let created = db.create_project(new_project(owner, "live")).await.unwrap();

        assert_eq!(db.deployment_for_slug("live").await.unwrap(), None);

        let recorded = db
            .mark_published(created.id, "https://live.sites.test", "sites/live-abc", Utc::now())
            .await
            .unwrap();
        assert!(recorded);

        let project = db.get_project(created.id, owner).await.unwrap().unwrap();
        assert!(project.is_published);
        assert!(project.published_at.is_some());
        assert_eq!(project.published_url.as_deref(), Some("https://live.sites.test"));
        assert_eq!(
            db.deployment_for_slug("live").await.unwrap().as_deref(),
            Some("sites/live-abc")
        );
    }

    #[tokio::test]
    async fn publishing_a_deleted_project_records_nothing() {
        let db = Database::in_memory().await.unwrap();
        let owner = Uuid::new_v4();
        let created = db.create_project(new_project(owner, "gone")).await.unwrap();
        db.delete_project(created.id, owner).await.unwrap();

        let recorded = db
            .mark_published(created.id, "https://gone.sites.test", "sites/gone-abc", Utc::now())
            .await
            .unwrap();

        assert!(!recorded);
        assert_eq!(db.deployment_for_slug("gone").await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_removes_row() {
        let db = Database::in_memory().await.unwrap();
        let owner = Uuid::new_v4();
        let created = db.create_project(new_project(owner, "gone")).await.unwrap();

        assert!(db.delete_project(created.id, owner).await.unwrap());
        assert!(db.get_project(created.id, owner).await.unwrap().is_none());
        assert!(!db.slug_exists("gone").await.unwrap());
    }
}
