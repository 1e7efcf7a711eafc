//! Job row queries.
//!
//! Rows move `PENDING -> PROCESSING -> COMPLETED | FAILED`, and back to
//! `PENDING` between retries. Every transition out of a state is a
//! conditional update on that state, so two workers can never both run the
//! same attempt and terminal rows are never rewritten.

use serde_json::Value;
use uuid::Uuid;

use crate::database::Database;
use crate::error::StoreError;
use crate::models::{format_time, now, to_json, JobRecord, JobStatus, NewJob};

impl Database {
    /// Insert a `PENDING` job.
    pub async fn create_job(&self, new: NewJob) -> Result<JobRecord, StoreError> {
        let job = JobRecord {
            id: Uuid::new_v4(),
            kind: new.kind,
            status: JobStatus::Pending,
            owner_id: new.owner_id,
            data: new.data,
            result: None,
            error: None,
            attempts: 0,
            max_attempts: new.max_attempts.max(1),
            project_id: new.project_id,
            domain_id: new.domain_id,
            created_at: now(),
            completed_at: None,
        };

        sqlx::query(
            r#"
            INSERT INTO jobs (
                id, kind, status, owner_id, data, attempts, max_attempts,
                project_id, domain_id, created_at
            )
            VALUES (?, ?, ?, ?, ?, 0, ?, ?, ?, ?)
            "#,
        )
        .bind(job.id.to_string())
        .bind(job.kind.as_str())
        .bind(job.status.as_str())
        .bind(job.owner_id.to_string())
        .bind(to_json("jobs", "data", &job.data)?)
        .bind(job.max_attempts as i64)
        .bind(job.project_id.map(|id| id.to_string()))
        .bind(job.domain_id.map(|id| id.to_string()))
        .bind(format_time(job.created_at))
        .execute(self.pool())
        .await?;

        Ok(job)
    }

    /// Fetch a job by id. Used by workers.
    pub async fn get_job(&self, id: Uuid) -> Result<Option<JobRecord>, StoreError> {
        let row = sqlx::query("SELECT * FROM jobs WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(self.pool())
            .await?;

        row.as_ref().map(JobRecord::from_row).transpose()
    }

    /// Fetch a job created by `owner`.
    pub async fn get_job_for_owner(&self, id: Uuid, owner: Uuid) -> Result<Option<JobRecord>, StoreError> {
        let row = sqlx::query("SELECT * FROM jobs WHERE id = ? AND owner_id = ?")
            .bind(id.to_string())
            .bind(owner.to_string())
            .fetch_optional(self.pool())
            .await?;

        row.as_ref().map(JobRecord::from_row).transpose()
    }

    /// Move a pending job to `PROCESSING` and count the attempt.
    ///
    /// Returns false when the job is not pending, in which case the caller
    /// must not run it.
    pub async fn claim_job(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE jobs SET status = 'PROCESSING', attempts = attempts + 1 WHERE id = ? AND status = 'PENDING'",
        )
        .bind(id.to_string())
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Return a processing job to `PENDING` for another attempt.
    pub async fn release_job(&self, id: Uuid, error: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE jobs SET status = 'PENDING', error = ? WHERE id = ? AND status = 'PROCESSING'",
        )
        .bind(error)
        .bind(id.to_string())
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Finish a processing job successfully.
    pub async fn complete_job(&self, id: Uuid, result: &Value) -> Result<bool, StoreError> {
        let outcome = sqlx::query(
            r#"
            UPDATE jobs SET status = 'COMPLETED', result = ?, error = NULL, completed_at = ?
            WHERE id = ? AND status = 'PROCESSING'
            "#,
        )
        .bind(to_json("jobs", "result", result)?)
        .bind(format_time(now()))
        .bind(id.to_string())
        .execute(self.pool())
        .await?;

        Ok(outcome.rows_affected() == 1)
    }

    /// Finish a job as failed. Applies to pending or processing jobs.
    pub async fn fail_job(&self, id: Uuid, error: &str) -> Result<bool, StoreError> {
        let outcome = sqlx::query(
            r#"
            UPDATE jobs SET status = 'FAILED', error = ?, completed_at = ?
            WHERE id = ? AND status IN ('PENDING', 'PROCESSING')
            "#,
        )
        .bind(error)
        .bind(format_time(now()))
        .bind(id.to_string())
        .execute(self.pool())
        .await?;

        Ok(outcome.rows_affected() == 1)
    }

    /// Jobs left unfinished by a previous process, oldest first.
    ///
    /// Rows stuck in `PROCESSING` are reset to `PENDING` so they can be
    /// claimed again.
    pub async fn recover_jobs(&self) -> Result<Vec<JobRecord>, StoreError> {
        sqlx::query("UPDATE jobs SET status = 'PENDING' WHERE status = 'PROCESSING'")
            .execute(self.pool())
            .await?;

        let rows = sqlx::query("SELECT * FROM jobs WHERE status = 'PENDING' ORDER BY created_at ASC")
            .fetch_all(self.pool())
            .await?;

        rows.iter().map(JobRecord::from_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JobKind;
    use serde_json::json;

    fn new_job(owner: Uuid) -> NewJob {
        NewJob {
            kind: JobKind::PublishSite,
            owner_id: owner,
            data: json!({ "projectId": "p" }),
            max_attempts: 3,
            project_id: None,
            domain_id: None,
        }
    }

    #[tokio::test]
    async fn claim_is_exclusive() {
        let db = Database::in_memory().await.unwrap();
        let job = db.create_job(new_job(Uuid::new_v4())).await.unwrap();

        assert!(db.claim_job(job.id).await.unwrap());
        assert!(!db.claim_job(job.id).await.unwrap());

        let loaded = db.get_job(job.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, JobStatus::Processing);
        assert_eq!(loaded.attempts, 1);
    }

    #[tokio::test]
    async fn release_allows_another_attempt() {
        let db = Database::in_memory().await.unwrap();
        let job = db.create_job(new_job(Uuid::new_v4())).await.unwrap();

        db.claim_job(job.id).await.unwrap();
        assert!(db.release_job(job.id, "dns not ready").await.unwrap());
        assert!(db.claim_job(job.id).await.unwrap());

        let loaded = db.get_job(job.id).await.unwrap().unwrap();
        assert_eq!(loaded.attempts, 2);
        assert_eq!(loaded.error.as_deref(), Some("dns not ready"));
        assert!(loaded.has_attempts_left());
    }

    #[tokio::test]
    async fn terminal_states_are_final() {
        let db = Database::in_memory().await.unwrap();
        let job = db.create_job(new_job(Uuid::new_v4())).await.unwrap();

        db.claim_job(job.id).await.unwrap();
        assert!(db.complete_job(job.id, &json!({ "success": true })).await.unwrap());

        assert!(!db.fail_job(job.id, "late failure").await.unwrap());
        assert!(!db.claim_job(job.id).await.unwrap());
        assert!(!db.release_job(job.id, "x").await.unwrap());

        let loaded = db.get_job(job.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, JobStatus::Completed);
        assert_eq!(loaded.result, Some(json!({ "success": true })));
        assert!(loaded.completed_at.is_some());
        assert_eq!(loaded.error, None);
    }

    #[tokio::test]
    async fn owner_scoped_lookup() {
        let db = Database::in_memory().await.unwrap();
        let owner = Uuid::new_v4();
        let job = db.create_job(new_job(owner)).await.unwrap();

        assert!(db.get_job_for_owner(job.id, owner).await.unwrap().is_some());
        assert!(db.get_job_for_owner(job.id, Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn recovers_interrupted_jobs() {
        let db = Database::in_memory().await.unwrap();
        let owner = Uuid::new_v4();
        let running = db.create_job(new_job(owner)).await.unwrap();
        let waiting = db.create_job(new_job(owner)).await.unwrap();
        let done = db.create_job(new_job(owner)).await.unwrap();

        db.claim_job(running.id).await.unwrap();
        db.claim_job(done.id).await.unwrap();
        db.complete_job(done.id, &json!({})).await.unwrap();

        let recovered: Vec<Uuid> = db.recover_jobs().await.unwrap().into_iter().map(|j| j.id).collect();

        assert_eq!(recovered.len(), 2);
        assert!(recovered.contains(&running.id));
        assert!(recovered.contains(&waiting.id));
    }
}
