//! In-process job queue backed by persisted job rows.
//!
//! A job is a row in the `jobs` table plus a scheduled delivery. Delivery is
//! a tokio task that sleeps for the job's delay, waits for a worker permit,
//! claims the row and runs the handler registered for the job's kind. Retries
//! are rescheduled with exponential backoff. Because state lives in the
//! database, unfinished jobs are picked up again by [`JobQueue::recover`]
//! after a restart.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use backon::{BackoffBuilder, ExponentialBuilder};
use serde_json::{json, Value};
use tokio::sync::Semaphore;
use uuid::Uuid;

use siteforge_store::{Database, JobKind, JobRecord, NewJob};

use crate::error::JobError;

/// Upper bound on a single backoff delay.
const MAX_BACKOFF: Duration = Duration::from_secs(24 * 60 * 60);

/// Scheduling options for one kind of job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobOptions {
    /// Total attempts, including the first
    pub max_attempts: u32,

    /// Delay before the first attempt
    pub initial_delay: Duration,

    /// Delay before the first retry; doubles on each further retry
    pub backoff: Duration,
}

impl JobOptions {
    /// Publishing: three attempts, retried after 2 s then 4 s.
    pub fn publish() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::ZERO,
            backoff: Duration::from_secs(2),
        }
    }

    /// Domain verification: first check after 30 s, ten attempts, retried
    /// after 1 min, 2 min, 4 min and so on.
    pub fn verify() -> Self {
        Self {
            max_attempts: 10,
            initial_delay: Duration::from_secs(30),
            backoff: Duration::from_secs(60),
        }
    }

    /// Delay before the next attempt once `attempts_made` attempts have run,
    /// or `None` when no attempts are left.
    pub fn retry_delay(&self, attempts_made: u32) -> Option<Duration> {
        if attempts_made == 0 || attempts_made >= self.max_attempts {
            return None;
        }

        ExponentialBuilder::default()
            .with_min_delay(self.backoff)
            .with_max_delay(MAX_BACKOFF)
            .with_factor(2.0)
            .with_max_times(self.max_attempts.saturating_sub(1) as usize)
            .build()
            .nth(attempts_made as usize - 1)
    }
}

/// Runs jobs of one kind.
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// Run one attempt. The returned value is stored as the job result.
    async fn run(&self, job: &JobRecord) -> Result<Value, JobError>;

    /// Called once when the job has failed for good.
    async fn on_failed(&self, _job: &JobRecord, _error: &JobError) {}
}

struct Registration {
    handler: Arc<dyn JobHandler>,
    options: JobOptions,
}

struct Inner {
    db: Database,
    handlers: HashMap<JobKind, Registration>,
    permits: Arc<Semaphore>,
}

/// Handle to the job queue. Cheap to clone.
#[derive(Clone)]
pub struct JobQueue {
    inner: Arc<Inner>,
}

/// Builder for [`JobQueue`].
pub struct JobQueueBuilder {
    db: Database,
    workers: usize,
    handlers: HashMap<JobKind, Registration>,
}

impl JobQueueBuilder {
    /// Maximum number of jobs running at once.
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Register the handler for a kind of job.
    pub fn handler(mut self, kind: JobKind, handler: Arc<dyn JobHandler>, options: JobOptions) -> Self {
        self.handlers.insert(kind, Registration { handler, options });
        self
    }

    pub fn build(self) -> JobQueue {
        JobQueue {
            inner: Arc::new(Inner {
                db: self.db,
                handlers: self.handlers,
                permits: Arc::new(Semaphore::new(self.workers)),
            }),
        }
    }
}

impl JobQueue {
    pub fn builder(db: Database) -> JobQueueBuilder {
        JobQueueBuilder {
            db,
            workers: 4,
            handlers: HashMap::new(),
        }
    }

    pub fn db(&self) -> &Database {
        &self.inner.db
    }

    /// Options registered for a kind of job.
    pub fn options(&self, kind: JobKind) -> Option<JobOptions> {
        self.inner.handlers.get(&kind).map(|r| r.options)
    }

    /// Persist a job and schedule its first attempt.
    pub async fn enqueue(&self, mut new: NewJob) -> Result<JobRecord, JobError> {
        let options = self
            .options(new.kind)
            .ok_or(JobError::NoHandler(new.kind.queue_name()))?;
        new.max_attempts = options.max_attempts;

        let job = self.inner.db.create_job(new).await?;
        tracing::info!(
            "Queued {} job {} (first attempt in {:?})",
            job.kind.queue_name(),
            job.id,
            options.initial_delay
        );

        self.schedule(job.id, options.initial_delay);
        Ok(job)
    }

    /// Queue a publish of `project_id` on behalf of `owner`.
    pub async fn publish_site(&self, project_id: Uuid, owner: Uuid) -> Result<JobRecord, JobError> {
        self.enqueue(NewJob {
            kind: JobKind::PublishSite,
            owner_id: owner,
            data: json!({ "projectId": project_id, "userId": owner }),
            max_attempts: 0,
            project_id: Some(project_id),
            domain_id: None,
        })
        .await
    }

    /// Queue verification of a custom domain.
    pub async fn verify_domain(&self, domain_id: Uuid, owner: Uuid) -> Result<JobRecord, JobError> {
        self.enqueue(NewJob {
            kind: JobKind::VerifyDomain,
            owner_id: owner,
            data: json!({ "domainId": domain_id }),
            max_attempts: 0,
            project_id: None,
            domain_id: Some(domain_id),
        })
        .await
    }

    /// Reschedule jobs a previous process left unfinished.
    pub async fn recover(&self) -> Result<usize, JobError> {
        let jobs = self.inner.db.recover_jobs().await?;
        for job in &jobs {
            self.schedule(job.id, Duration::ZERO);
        }
        if !jobs.is_empty() {
            tracing::info!("Recovered {} unfinished jobs", jobs.len());
        }
        Ok(jobs.len())
    }

    /// Stop starting new attempts. Running attempts finish normally.
    pub fn shutdown(&self) {
        self.inner.permits.close();
    }

    /// Poll until a job reaches a terminal state or `timeout` elapses.
    pub async fn wait_for(&self, id: Uuid, timeout: Duration) -> Result<Option<JobRecord>, JobError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let job = self.inner.db.get_job(id).await?;
            match job {
                Some(job) if job.status.is_terminal() => return Ok(Some(job)),
                None => return Ok(None),
                Some(job) if tokio::time::Instant::now() >= deadline => return Ok(Some(job)),
                Some(_) => tokio::time::sleep(Duration::from_millis(10)).await,
            }
        }
    }

    fn schedule(&self, id: Uuid, delay: Duration) {
        let queue = self.clone();
        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let Ok(_permit) = queue.inner.permits.clone().acquire_owned().await else {
                tracing::debug!("Queue closed, dropping delivery of job {}", id);
                return;
            };
            if let Err(e) = queue.process(id).await {
                tracing::error!("Job {} could not be processed: {}", id, e);
            }
        });
    }

    async fn process(&self, id: Uuid) -> Result<(), JobError> {
        let db = &self.inner.db;

        if !db.claim_job(id).await? {
            tracing::debug!("Job {} is not pending, skipping", id);
            return Ok(());
        }
        let job = db
            .get_job(id)
            .await?
            .ok_or_else(|| JobError::NotFound(format!("Job {}", id)))?;

        let Some(registration) = self.inner.handlers.get(&job.kind) else {
            let err = JobError::NoHandler(job.kind.queue_name());
            db.fail_job(id, &err.to_string()).await?;
            return Err(err);
        };

        tracing::info!(
            "Processing {} job {} (attempt {}/{})",
            job.kind.queue_name(),
            id,
            job.attempts,
            job.max_attempts
        );

        match registration.handler.run(&job).await {
            Ok(result) => {
                db.complete_job(id, &result).await?;
                tracing::info!("Job {} completed", id);
            }
            Err(err) => {
                let retry = if err.is_retryable() {
                    registration.options.retry_delay(job.attempts)
                } else {
                    None
                };

                match retry {
                    Some(delay) => {
                        tracing::warn!("Job {} failed, retrying in {:?}: {}", id, delay, err);
                        db.release_job(id, &err.to_string()).await?;
                        self.schedule(id, delay);
                    }
                    None => {
                        tracing::error!("Job {} failed: {}", id, err);
                        db.fail_job(id, &err.to_string()).await?;
                        registration.handler.on_failed(&job, &err).await;
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use siteforge_store::JobStatus;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_attempts: u32) -> JobOptions {
        JobOptions {
            max_attempts,
            initial_delay: Duration::ZERO,
            backoff: Duration::from_millis(5),
        }
    }

    /// Fails with a retryable error until the given attempt.
    struct Flaky {
        succeed_on: u32,
        calls: AtomicU32,
        failed_hook: AtomicU32,
    }

    impl Flaky {
        fn new(succeed_on: u32) -> Arc<Self> {
            Arc::new(Self {
                succeed_on,
                calls: AtomicU32::new(0),
                failed_hook: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl JobHandler for Flaky {
        async fn run(&self, job: &JobRecord) -> Result<Value, JobError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if job.attempts >= self.succeed_on {
                Ok(json!({ "attempt": job.attempts }))
            } else {
                Err(JobError::DnsPending("example.com".to_string()))
            }
        }

        async fn on_failed(&self, _job: &JobRecord, _error: &JobError) {
            self.failed_hook.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Broken;

    #[async_trait]
    impl JobHandler for Broken {
        async fn run(&self, _job: &JobRecord) -> Result<Value, JobError> {
            Err(JobError::NotFound("Project".to_string()))
        }
    }

    async fn queue_with(handler: Arc<dyn JobHandler>, options: JobOptions) -> JobQueue {
        let db = Database::in_memory().await.unwrap();
        JobQueue::builder(db)
            .workers(2)
            .handler(JobKind::PublishSite, handler, options)
            .build()
    }

    #[test]
    fn publish_backoff_doubles() {
        let options = JobOptions::publish();

        assert_eq!(options.retry_delay(1), Some(Duration::from_secs(2)));
        assert_eq!(options.retry_delay(2), Some(Duration::from_secs(4)));
        assert_eq!(options.retry_delay(3), None);
    }

    #[test]
    fn verify_backoff_starts_at_a_minute() {
        let options = JobOptions::verify();

        assert_eq!(options.initial_delay, Duration::from_secs(30));
        assert_eq!(options.retry_delay(1), Some(Duration::from_secs(60)));
        assert_eq!(options.retry_delay(3), Some(Duration::from_secs(240)));
        assert_eq!(options.retry_delay(10), None);
    }

    #[tokio::test]
    async fn retries_until_success() {
        let handler = Flaky::new(3);
        let queue = queue_with(handler.clone(), fast(3)).await;

        let job = queue.publish_site(Uuid::new_v4(), Uuid::new_v4()).await.unwrap();
        let done = queue.wait_for(job.id, Duration::from_secs(5)).await.unwrap().unwrap();

        assert_eq!(done.status, JobStatus::Completed);
        assert_eq!(done.attempts, 3);
        assert_eq!(done.result, Some(json!({ "attempt": 3 })));
        assert_eq!(handler.calls.load(Ordering::SeqCst), 3);
        assert_eq!(handler.failed_hook.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fails_after_last_attempt() {
        let handler = Flaky::new(u32::MAX);
        let queue = queue_with(handler.clone(), fast(2)).await;

        let job = queue.publish_site(Uuid::new_v4(), Uuid::new_v4()).await.unwrap();
        let done = queue.wait_for(job.id, Duration::from_secs(5)).await.unwrap().unwrap();

        assert_eq!(done.status, JobStatus::Failed);
        assert_eq!(done.attempts, 2);
        assert!(done.error.unwrap().contains("example.com"));
        assert_eq!(handler.failed_hook.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn non_retryable_errors_fail_immediately() {
        let queue = queue_with(Arc::new(Broken), fast(5)).await;

        let job = queue.publish_site(Uuid::new_v4(), Uuid::new_v4()).await.unwrap();
        let done = queue.wait_for(job.id, Duration::from_secs(5)).await.unwrap().unwrap();

        assert_eq!(done.status, JobStatus::Failed);
        assert_eq!(done.attempts, 1);
    }

    #[tokio::test]
    async fn unregistered_kinds_are_rejected() {
        let queue = queue_with(Arc::new(Broken), fast(1)).await;

        let err = queue
            .verify_domain(Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap_err();

        assert!(matches!(err, JobError::NoHandler("verify-domain")));
    }

    #[tokio::test]
    async fn recovers_pending_rows() {
        let handler = Flaky::new(1);
        let queue = queue_with(handler.clone(), fast(1)).await;

        let job = queue
            .db()
            .create_job(NewJob {
                kind: JobKind::PublishSite,
                owner_id: Uuid::new_v4(),
                data: json!({}),
                max_attempts: 1,
                project_id: None,
                domain_id: None,
            })
            .await
            .unwrap();

        assert_eq!(queue.recover().await.unwrap(), 1);
        let done = queue.wait_for(job.id, Duration::from_secs(5)).await.unwrap().unwrap();
        assert_eq!(done.status, JobStatus::Completed);
    }
}
