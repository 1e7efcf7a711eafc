//! Connection pool and schema migrations.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::error::StoreError;

/// Ordered schema migrations. Each entry is applied once, recorded in
/// `_migrations` by its 1-based position.
const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS projects (
        id TEXT PRIMARY KEY NOT NULL,
        owner_id TEXT NOT NULL,
        title TEXT NOT NULL,
        slug TEXT NOT NULL UNIQUE,
        description TEXT,
        content TEXT NOT NULL,
        styles TEXT NOT NULL,
        seo_title TEXT,
        seo_description TEXT,
        favicon TEXT,
        custom_css TEXT,
        template_id TEXT,
        is_published INTEGER NOT NULL DEFAULT 0,
        published_url TEXT,
        published_at TEXT,
        deployment_path TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_projects_owner ON projects (owner_id, updated_at);
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS domains (
        id TEXT PRIMARY KEY NOT NULL,
        owner_id TEXT NOT NULL,
        project_id TEXT REFERENCES projects (id) ON DELETE SET NULL,
        domain TEXT NOT NULL UNIQUE,
        verification_token TEXT NOT NULL,
        status TEXT NOT NULL,
        ssl_status TEXT,
        dns_records TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_domains_owner ON domains (owner_id, created_at);
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS jobs (
        id TEXT PRIMARY KEY NOT NULL,
        kind TEXT NOT NULL,
        status TEXT NOT NULL,
        owner_id TEXT NOT NULL,
        data TEXT NOT NULL,
        result TEXT,
        error TEXT,
        attempts INTEGER NOT NULL DEFAULT 0,
        max_attempts INTEGER NOT NULL,
        project_id TEXT,
        domain_id TEXT,
        created_at TEXT NOT NULL,
        completed_at TEXT
    );
    CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs (status);
    "#,
];

/// Handle to the siteforge database.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect to `url` (e.g. `sqlite://siteforge.db`), creating the file if
    /// needed, and run migrations.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.migrate().await?;
        tracing::debug!("Connected to {}", url);
        Ok(db)
    }

    /// A private in-memory database. Uses a single pooled connection, since
    /// every SQLite memory connection is its own database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Wrap an existing pool. Does not run migrations.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Apply any migrations not yet recorded.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query("CREATE TABLE IF NOT EXISTS _migrations (version INTEGER PRIMARY KEY)")
            .execute(&self.pool)
            .await?;

        let current: Option<i64> = sqlx::query_scalar("SELECT MAX(version) FROM _migrations")
            .fetch_one(&self.pool)
            .await?;
        let current = current.unwrap_or(0);

        for (index, sql) in MIGRATIONS.iter().enumerate() {
            let version = index as i64 + 1;
            if version <= current {
                continue;
            }

            let mut tx = self.pool.begin().await?;
            sqlx::raw_sql(sql)
                .execute(&mut *tx)
                .await
                .map_err(|e| StoreError::Migration {
                    version,
                    message: e.to_string(),
                })?;
            sqlx::query("INSERT INTO _migrations (version) VALUES (?)")
                .bind(version)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;

            tracing::info!("Applied database migration v{}", version);
        }

        Ok(())
    }

    /// Close the pool, waiting for connections to be returned.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
