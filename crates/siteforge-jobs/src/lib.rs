//! Background jobs for siteforge.
//!
//! Publishing renders a project and uploads it to object storage under a
//! fresh deployment path. Domain verification polls DNS for the ownership
//! TXT record with exponential backoff, then provisions a certificate. Both
//! run on [`JobQueue`], an in-process queue whose state lives in the
//! database.

pub mod domain;
pub mod error;
pub mod publish;
pub mod queue;
pub mod storage;

pub use domain::{
    required_records, CertificateProvisioner, DomainVerifier, HickoryResolver, ManagedCertificates,
    TxtResolver,
};
pub use error::JobError;
pub use publish::{PublishOutcome, Publisher};
pub use queue::{JobHandler, JobOptions, JobQueue};
pub use storage::{SiteStorage, StorageBackend, StorageConfig};
