//! SQLite persistence for siteforge.
//!
//! Projects, custom domains and background job rows live in one SQLite
//! database accessed through `sqlx`. Project and domain reads are always
//! scoped by owner; the only unscoped lookups are the ones the job workers
//! and public site hosting need.

pub mod database;
pub mod domains;
pub mod error;
pub mod jobs;
pub mod models;
pub mod projects;

pub use database::Database;
pub use error::StoreError;
pub use models::{
    DnsRecord, DomainRecord, DomainStatus, JobKind, JobRecord, JobStatus, NewDomain, NewJob,
    NewProject, ProjectRecord, ProjectUpdate, SslStatus,
};
