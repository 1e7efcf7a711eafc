//! Persisted records and their status enums.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use siteforge_blocks::{Block, SiteDocument, StyleSettings};

use crate::error::StoreError;

/// Verification state of a custom domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DomainStatus {
    Pending,
    Verified,
    Failed,
}

impl DomainStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Verified => "VERIFIED",
            Self::Failed => "FAILED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "VERIFIED" => Some(Self::Verified),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Certificate state of a verified domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SslStatus {
    Pending,
    Provisioned,
    Failed,
}

impl SslStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Provisioned => "PROVISIONED",
            Self::Failed => "FAILED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "PROVISIONED" => Some(Self::Provisioned),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Lifecycle of a background job row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "PROCESSING" => Some(Self::Processing),
            "COMPLETED" => Some(Self::Completed),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Completed and failed jobs never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// What a job does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobKind {
    PublishSite,
    VerifyDomain,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PublishSite => "PUBLISH_SITE",
            Self::VerifyDomain => "VERIFY_DOMAIN",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PUBLISH_SITE" => Some(Self::PublishSite),
            "VERIFY_DOMAIN" => Some(Self::VerifyDomain),
            _ => None,
        }
    }

    /// Queue name used in logs.
    pub fn queue_name(&self) -> &'static str {
        match self {
            Self::PublishSite => "publish-site",
            Self::VerifyDomain => "verify-domain",
        }
    }
}

/// A DNS record the user must create for a custom domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    pub value: String,
    pub ttl: u32,
}

/// A persisted website project.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRecord {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub content: Vec<Block>,
    pub styles: StyleSettings,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
    pub favicon: Option<String>,
    pub custom_css: Option<String>,
    pub template_id: Option<String>,
    pub is_published: bool,
    pub published_url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub deployment_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProjectRecord {
    /// The renderable view of this project.
    pub fn to_document(&self) -> SiteDocument {
        SiteDocument {
            id: self.id.to_string(),
            title: self.title.clone(),
            slug: self.slug.clone(),
            description: self.description.clone(),
            content: self.content.clone(),
            styles: self.styles.clone(),
            seo_title: self.seo_title.clone(),
            seo_description: self.seo_description.clone(),
            favicon: self.favicon.clone(),
            custom_css: self.custom_css.clone(),
        }
    }

    pub(crate) fn from_row(row: &SqliteRow) -> Result<Self, StoreError> {
        const T: &str = "projects";
        Ok(Self {
            id: uuid_col(row, T, "id")?,
            owner_id: uuid_col(row, T, "owner_id")?,
            title: row.try_get("title")?,
            slug: row.try_get("slug")?,
            description: row.try_get("description")?,
            content: json_col(row, T, "content")?,
            styles: json_col(row, T, "styles")?,
            seo_title: row.try_get("seo_title")?,
            seo_description: row.try_get("seo_description")?,
            favicon: row.try_get("favicon")?,
            custom_css: row.try_get("custom_css")?,
            template_id: row.try_get("template_id")?,
            is_published: row.try_get("is_published")?,
            published_url: row.try_get("published_url")?,
            published_at: opt_time_col(row, T, "published_at")?,
            deployment_path: row.try_get("deployment_path")?,
            created_at: time_col(row, T, "created_at")?,
            updated_at: time_col(row, T, "updated_at")?,
        })
    }
}

/// Fields for a new project. The slug must already be unique.
#[derive(Debug, Clone, Default)]
pub struct NewProject {
    pub owner_id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub content: Vec<Block>,
    pub styles: StyleSettings,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
    pub favicon: Option<String>,
    pub custom_css: Option<String>,
    pub template_id: Option<String>,
}

/// A partial project update. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectUpdate {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub content: Option<Vec<Block>>,
    pub styles: Option<StyleSettings>,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
    pub favicon: Option<String>,
    pub custom_css: Option<String>,
}

impl ProjectUpdate {
    pub(crate) fn apply(self, project: &mut ProjectRecord) {
        if let Some(title) = self.title {
            project.title = title;
        }
        if let Some(slug) = self.slug {
            project.slug = slug;
        }
        if let Some(description) = self.description {
            project.description = Some(description);
        }
        if let Some(content) = self.content {
            project.content = content;
        }
        if let Some(styles) = self.styles {
            project.styles = styles;
        }
        if let Some(seo_title) = self.seo_title {
            project.seo_title = Some(seo_title);
        }
        if let Some(seo_description) = self.seo_description {
            project.seo_description = Some(seo_description);
        }
        if let Some(favicon) = self.favicon {
            project.favicon = Some(favicon);
        }
        if let Some(custom_css) = self.custom_css {
            project.custom_css = Some(custom_css);
        }
    }
}

/// A custom domain attached to an owner and optionally a project.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainRecord {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub project_id: Option<Uuid>,
    pub domain: String,
    pub verification_token: String,
    pub status: DomainStatus,
    pub ssl_status: Option<SslStatus>,
    pub dns_records: Vec<DnsRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DomainRecord {
    pub(crate) fn from_row(row: &SqliteRow) -> Result<Self, StoreError> {
        const T: &str = "domains";
        let status: String = row.try_get("status")?;
        let ssl_status: Option<String> = row.try_get("ssl_status")?;

        Ok(Self {
            id: uuid_col(row, T, "id")?,
            owner_id: uuid_col(row, T, "owner_id")?,
            project_id: opt_uuid_col(row, T, "project_id")?,
            domain: row.try_get("domain")?,
            verification_token: row.try_get("verification_token")?,
            status: DomainStatus::parse(&status)
                .ok_or_else(|| StoreError::corrupt(T, "status", &status))?,
            ssl_status: ssl_status
                .map(|s| SslStatus::parse(&s).ok_or_else(|| StoreError::corrupt(T, "ssl_status", &s)))
                .transpose()?,
            dns_records: json_col(row, T, "dns_records")?,
            created_at: time_col(row, T, "created_at")?,
            updated_at: time_col(row, T, "updated_at")?,
        })
    }
}

/// Fields for a new domain. The name must already be normalised.
#[derive(Debug, Clone)]
pub struct NewDomain {
    pub owner_id: Uuid,
    pub project_id: Option<Uuid>,
    pub domain: String,
    pub verification_token: String,
    pub dns_records: Vec<DnsRecord>,
}

/// A background job row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub id: Uuid,
    pub kind: JobKind,
    pub status: JobStatus,
    pub owner_id: Uuid,
    pub data: Value,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub attempts: u32,
    pub max_attempts: u32,
    pub project_id: Option<Uuid>,
    pub domain_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobRecord {
    /// Whether another attempt is allowed after the current one.
    pub fn has_attempts_left(&self) -> bool {
        self.attempts < self.max_attempts
    }

    pub(crate) fn from_row(row: &SqliteRow) -> Result<Self, StoreError> {
        const T: &str = "jobs";
        let kind: String = row.try_get("kind")?;
        let status: String = row.try_get("status")?;
        let result: Option<String> = row.try_get("result")?;
        let attempts: i64 = row.try_get("attempts")?;
        let max_attempts: i64 = row.try_get("max_attempts")?;

        Ok(Self {
            id: uuid_col(row, T, "id")?,
            kind: JobKind::parse(&kind).ok_or_else(|| StoreError::corrupt(T, "kind", &kind))?,
            status: JobStatus::parse(&status)
                .ok_or_else(|| StoreError::corrupt(T, "status", &status))?,
            owner_id: uuid_col(row, T, "owner_id")?,
            data: json_col(row, T, "data")?,
            result: result
                .map(|r| serde_json::from_str(&r).map_err(|e| StoreError::corrupt(T, "result", e)))
                .transpose()?,
            error: row.try_get("error")?,
            attempts: attempts.max(0) as u32,
            max_attempts: max_attempts.max(0) as u32,
            project_id: opt_uuid_col(row, T, "project_id")?,
            domain_id: opt_uuid_col(row, T, "domain_id")?,
            created_at: time_col(row, T, "created_at")?,
            completed_at: opt_time_col(row, T, "completed_at")?,
        })
    }
}

/// Fields for a new job.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub kind: JobKind,
    pub owner_id: Uuid,
    pub data: Value,
    pub max_attempts: u32,
    pub project_id: Option<Uuid>,
    pub domain_id: Option<Uuid>,
}

/// Current time at the precision timestamps are stored with.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Timestamps are stored as fixed-width RFC 3339 text so they sort correctly.
pub(crate) fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_time(table: &'static str, column: &'static str, s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::corrupt(table, column, e))
}

fn time_col(row: &SqliteRow, table: &'static str, column: &'static str) -> Result<DateTime<Utc>, StoreError> {
    let raw: String = row.try_get(column)?;
    parse_time(table, column, &raw)
}

fn opt_time_col(
    row: &SqliteRow,
    table: &'static str,
    column: &'static str,
) -> Result<Option<DateTime<Utc>>, StoreError> {
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|s| parse_time(table, column, &s)).transpose()
}

fn uuid_col(row: &SqliteRow, table: &'static str, column: &'static str) -> Result<Uuid, StoreError> {
    let raw: String = row.try_get(column)?;
    Uuid::parse_str(&raw).map_err(|e| StoreError::corrupt(table, column, e))
}

fn opt_uuid_col(
    row: &SqliteRow,
    table: &'static str,
    column: &'static str,
) -> Result<Option<Uuid>, StoreError> {
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|s| Uuid::parse_str(&s).map_err(|e| StoreError::corrupt(table, column, e)))
        .transpose()
}

fn json_col<T: serde::de::DeserializeOwned>(
    row: &SqliteRow,
    table: &'static str,
    column: &'static str,
) -> Result<T, StoreError> {
    let raw: String = row.try_get(column)?;
    serde_json::from_str(&raw).map_err(|e| StoreError::corrupt(table, column, e))
}

/// Serialize a value for a JSON text column.
pub(crate) fn to_json<T: Serialize>(
    table: &'static str,
    column: &'static str,
    value: &T,
) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|e| StoreError::corrupt(table, column, e))
}
