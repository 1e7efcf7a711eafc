//! Custom domain verification.
//!
//! A domain is proven by a TXT record at `_site-verification.<domain>`
//! containing the token issued when the domain was added. Once verified, a
//! certificate is provisioned after a short settle delay.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hickory_resolver::TokioAsyncResolver;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use siteforge_store::{Database, DnsRecord, DomainStatus, JobRecord, SslStatus};

use crate::error::JobError;
use crate::queue::JobHandler;

/// Label prefixed to a domain for its verification record.
pub const VERIFICATION_PREFIX: &str = "_site-verification";

/// TTL suggested for the records users create.
pub const RECORD_TTL: u32 = 300;

/// Host of a domain's verification TXT record.
pub fn verification_host(domain: &str) -> String {
    format!("{}.{}", VERIFICATION_PREFIX, domain)
}

/// The TXT and CNAME records a user must create for `domain`.
pub fn required_records(domain: &str, token: &str, publish_domain: &str) -> Vec<DnsRecord> {
    vec![
        DnsRecord {
            record_type: "TXT".to_string(),
            name: verification_host(domain),
            value: token.to_string(),
            ttl: RECORD_TTL,
        },
        DnsRecord {
            record_type: "CNAME".to_string(),
            name: domain.to_string(),
            value: publish_domain.to_string(),
            ttl: RECORD_TTL,
        },
    ]
}

/// Looks up TXT records.
#[async_trait]
pub trait TxtResolver: Send + Sync {
    /// All TXT strings published at `name`.
    async fn txt_records(&self, name: &str) -> Result<Vec<String>, JobError>;
}

/// [`TxtResolver`] using the system DNS configuration.
pub struct HickoryResolver {
    resolver: TokioAsyncResolver,
}

impl HickoryResolver {
    pub fn from_system_conf() -> Result<Self, JobError> {
        let resolver =
            TokioAsyncResolver::tokio_from_system_conf().map_err(|e| JobError::Resolver(e.to_string()))?;
        Ok(Self { resolver })
    }
}

#[async_trait]
impl TxtResolver for HickoryResolver {
    async fn txt_records(&self, name: &str) -> Result<Vec<String>, JobError> {
        let lookup = self
            .resolver
            .txt_lookup(name)
            .await
            .map_err(|e| JobError::Resolver(e.to_string()))?;

        Ok(lookup
            .iter()
            .map(|txt| {
                txt.txt_data()
                    .iter()
                    .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
                    .collect::<String>()
            })
            .collect())
    }
}

/// Issues TLS certificates for verified domains.
#[async_trait]
pub trait CertificateProvisioner: Send + Sync {
    async fn provision(&self, domain: &str) -> Result<(), String>;
}

/// Certificates terminated by a managed edge in front of the site host.
///
/// Nothing needs issuing locally; the edge is given time to pick up the
/// new hostname before the certificate is reported provisioned.
pub struct ManagedCertificates {
    propagation: Duration,
}

impl ManagedCertificates {
    pub fn new(propagation: Duration) -> Self {
        Self { propagation }
    }
}

#[async_trait]
impl CertificateProvisioner for ManagedCertificates {
    async fn provision(&self, domain: &str) -> Result<(), String> {
        tokio::time::sleep(self.propagation).await;
        tracing::debug!("Edge certificate ready for {}", domain);
        Ok(())
    }
}

/// Whether any TXT record at the verification host contains `token`.
/// Lookup failures count as not found.
pub async fn has_verification_record(resolver: &dyn TxtResolver, domain: &str, token: &str) -> bool {
    let host = verification_host(domain);
    match resolver.txt_records(&host).await {
        Ok(records) => records.iter().any(|record| record.contains(token)),
        Err(e) => {
            tracing::debug!("TXT lookup for {} failed: {}", host, e);
            false
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyJobData {
    domain_id: Uuid,
}

/// Runs verification attempts and the follow-up certificate provisioning.
pub struct DomainVerifier {
    db: Database,
    resolver: Arc<dyn TxtResolver>,
    certificates: Arc<dyn CertificateProvisioner>,
    ssl_delay: Duration,
}

impl DomainVerifier {
    pub fn new(
        db: Database,
        resolver: Arc<dyn TxtResolver>,
        certificates: Arc<dyn CertificateProvisioner>,
        ssl_delay: Duration,
    ) -> Self {
        Self {
            db,
            resolver,
            certificates,
            ssl_delay,
        }
    }

    /// One verification attempt.
    ///
    /// On success the domain becomes `VERIFIED` with SSL `PENDING`, and
    /// provisioning is started in the background. A domain that is already
    /// verified but still waiting on its certificate has provisioning
    /// restarted. A missing record is a retryable [`JobError::DnsPending`].
    pub async fn verify(&self, domain_id: Uuid) -> Result<Value, JobError> {
        let domain = self
            .db
            .domain_by_id(domain_id)
            .await?
            .ok_or_else(|| JobError::NotFound("Domain".to_string()))?;

        if domain.status == DomainStatus::Verified {
            if domain.ssl_status == Some(SslStatus::Pending) {
                self.spawn_provisioning(domain.id, domain.domain);
            }
            return Ok(json!({ "success": true, "status": "VERIFIED" }));
        }

        if !has_verification_record(self.resolver.as_ref(), &domain.domain, &domain.verification_token).await {
            return Err(JobError::DnsPending(domain.domain));
        }

        self.db.mark_domain_verified(domain.id).await?;
        tracing::info!("Domain {} verified", domain.domain);

        self.spawn_provisioning(domain.id, domain.domain);

        Ok(json!({ "success": true, "status": "VERIFIED" }))
    }

    /// Restart provisioning for verified domains left with SSL `PENDING`,
    /// such as after a restart during the settle delay. Returns how many
    /// domains were picked up.
    pub async fn resume_provisioning(&self) -> Result<usize, JobError> {
        let domains = self.db.domains_awaiting_ssl().await?;
        for domain in &domains {
            tracing::info!("Resuming SSL provisioning for {}", domain.domain);
            self.spawn_provisioning(domain.id, domain.domain.clone());
        }
        Ok(domains.len())
    }

    fn spawn_provisioning(&self, domain_id: Uuid, domain: String) {
        let db = self.db.clone();
        let certificates = self.certificates.clone();
        let delay = self.ssl_delay;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let status = match certificates.provision(&domain).await {
                Ok(()) => {
                    tracing::info!("SSL provisioned for {}", domain);
                    SslStatus::Provisioned
                }
                Err(e) => {
                    tracing::error!("SSL provisioning failed for {}: {}", domain, e);
                    SslStatus::Failed
                }
            };

            if let Err(e) = db.set_ssl_status(domain_id, status).await {
                tracing::error!("Failed to record SSL status for {}: {}", domain, e);
            }
        });
    }
}

#[async_trait]
impl JobHandler for DomainVerifier {
    async fn run(&self, job: &JobRecord) -> Result<Value, JobError> {
        let data: VerifyJobData =
            serde_json::from_value(job.data.clone()).map_err(|e| JobError::InvalidData(e.to_string()))?;
        self.verify(data.domain_id).await
    }

    async fn on_failed(&self, job: &JobRecord, error: &JobError) {
        let Some(domain_id) = job.domain_id else {
            return;
        };
        if matches!(error, JobError::NotFound(_)) {
            return;
        }

        match self.db.set_domain_status(domain_id, DomainStatus::Failed).await {
            Ok(true) => tracing::warn!("Domain {} marked FAILED", domain_id),
            Ok(false) => {}
            Err(e) => tracing::error!("Failed to mark domain {} FAILED: {}", domain_id, e),
        }
    }
}
