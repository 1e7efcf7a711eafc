//! Custom domain queries.

use uuid::Uuid;

use crate::database::Database;
use crate::error::{is_unique_violation, StoreError};
use crate::models::{format_time, now, to_json, DomainRecord, DomainStatus, NewDomain, SslStatus};

impl Database {
    /// Register a domain in the `PENDING` state.
    pub async fn create_domain(&self, new: NewDomain) -> Result<DomainRecord, StoreError> {
        let now = now();
        let domain = DomainRecord {
            id: Uuid::new_v4(),
            owner_id: new.owner_id,
            project_id: new.project_id,
            domain: new.domain,
            verification_token: new.verification_token,
            status: DomainStatus::Pending,
            ssl_status: None,
            dns_records: new.dns_records,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO domains (
                id, owner_id, project_id, domain, verification_token, status,
                ssl_status, dns_records, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, NULL, ?, ?, ?)
            "#,
        )
        .bind(domain.id.to_string())
        .bind(domain.owner_id.to_string())
        .bind(domain.project_id.map(|id| id.to_string()))
        .bind(&domain.domain)
        .bind(&domain.verification_token)
        .bind(domain.status.as_str())
        .bind(to_json("domains", "dns_records", &domain.dns_records)?)
        .bind(format_time(now))
        .bind(format_time(now))
        .execute(self.pool())
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::DomainTaken(domain.domain.clone())
            } else {
                e.into()
            }
        })?;

        Ok(domain)
    }

    /// Fetch a domain owned by `owner`.
    pub async fn get_domain(&self, id: Uuid, owner: Uuid) -> Result<Option<DomainRecord>, StoreError> {
        let row = sqlx::query("SELECT * FROM domains WHERE id = ? AND owner_id = ?")
            .bind(id.to_string())
            .bind(owner.to_string())
            .fetch_optional(self.pool())
            .await?;

        row.as_ref().map(DomainRecord::from_row).transpose()
    }

    /// Fetch a domain by id regardless of owner. Used by the verification worker.
    pub async fn domain_by_id(&self, id: Uuid) -> Result<Option<DomainRecord>, StoreError> {
        let row = sqlx::query("SELECT * FROM domains WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(self.pool())
            .await?;

        row.as_ref().map(DomainRecord::from_row).transpose()
    }

    /// Look a domain up by its hostname.
    pub async fn find_domain(&self, name: &str) -> Result<Option<DomainRecord>, StoreError> {
        let row = sqlx::query("SELECT * FROM domains WHERE domain = ?")
            .bind(name)
            .fetch_optional(self.pool())
            .await?;

        row.as_ref().map(DomainRecord::from_row).transpose()
    }

    /// All of an owner's domains, newest first.
    pub async fn list_domains(&self, owner: Uuid) -> Result<Vec<DomainRecord>, StoreError> {
        let rows = sqlx::query("SELECT * FROM domains WHERE owner_id = ? ORDER BY created_at DESC")
            .bind(owner.to_string())
            .fetch_all(self.pool())
            .await?;

        rows.iter().map(DomainRecord::from_row).collect()
    }

    /// Verified domains whose certificate has not been issued yet.
    pub async fn domains_awaiting_ssl(&self) -> Result<Vec<DomainRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM domains WHERE status = 'VERIFIED' AND ssl_status = 'PENDING' ORDER BY updated_at",
        )
        .fetch_all(self.pool())
        .await?;

        rows.iter().map(DomainRecord::from_row).collect()
    }

    /// Delete a domain. Returns whether a row was removed.
    pub async fn delete_domain(&self, id: Uuid, owner: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM domains WHERE id = ? AND owner_id = ?")
            .bind(id.to_string())
            .bind(owner.to_string())
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Set the verification status. Returns whether the domain still exists.
    pub async fn set_domain_status(&self, id: Uuid, status: DomainStatus) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE domains SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(format_time(now()))
            .bind(id.to_string())
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Mark a domain verified with certificate issuance pending.
    pub async fn mark_domain_verified(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE domains SET status = 'VERIFIED', ssl_status = 'PENDING', updated_at = ? WHERE id = ?",
        )
        .bind(format_time(now()))
        .bind(id.to_string())
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Set the certificate status. Returns whether the domain still exists.
    pub async fn set_ssl_status(&self, id: Uuid, status: SslStatus) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE domains SET ssl_status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(format_time(now()))
            .bind(id.to_string())
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DnsRecord;
    use pretty_assertions::assert_eq;

    fn new_domain(owner: Uuid, name: &str) -> NewDomain {
        NewDomain {
            owner_id: owner,
            project_id: None,
            domain: name.to_string(),
            verification_token: "token-123".to_string(),
            dns_records: vec![DnsRecord {
                record_type: "TXT".to_string(),
                name: format!("_site-verification.{}", name),
                value: "token-123".to_string(),
                ttl: 300,
            }],
        }
    }

    #[tokio::test]
    async fn new_domains_start_pending() {
        let db = Database::in_memory().await.unwrap();
        let owner = Uuid::new_v4();

        let created = db.create_domain(new_domain(owner, "shop.example.com")).await.unwrap();
        let loaded = db.get_domain(created.id, owner).await.unwrap().unwrap();

        assert_eq!(loaded, created);
        assert_eq!(loaded.status, DomainStatus::Pending);
        assert_eq!(loaded.ssl_status, None);
        assert_eq!(loaded.dns_records.len(), 1);
    }

    #[tokio::test]
    async fn lists_domains_awaiting_ssl() {
        let db = Database::in_memory().await.unwrap();
        let owner = Uuid::new_v4();
        let waiting = db.create_domain(new_domain(owner, "waiting.example.com")).await.unwrap();
        let done = db.create_domain(new_domain(owner, "done.example.com")).await.unwrap();
        db.create_domain(new_domain(owner, "unverified.example.com")).await.unwrap();

        db.mark_domain_verified(waiting.id).await.unwrap();
        db.mark_domain_verified(done.id).await.unwrap();
        db.set_ssl_status(done.id, SslStatus::Provisioned).await.unwrap();

        let awaiting = db.domains_awaiting_ssl().await.unwrap();

        assert_eq!(awaiting.len(), 1);
        assert_eq!(awaiting[0].id, waiting.id);
    }

    #[tokio::test]
    async fn duplicate_names_are_rejected() {
        let db = Database::in_memory().await.unwrap();

        db.create_domain(new_domain(Uuid::new_v4(), "dup.example.com")).await.unwrap();
        let err = db
            .create_domain(new_domain(Uuid::new_v4(), "dup.example.com"))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::DomainTaken(_)));
    }

    #[tokio::test]
    async fn verification_sets_ssl_pending() {
        let db = Database::in_memory().await.unwrap();
        let created = db
            .create_domain(new_domain(Uuid::new_v4(), "ok.example.com"))
            .await
            .unwrap();

        assert!(db.mark_domain_verified(created.id).await.unwrap());
        assert!(db.set_ssl_status(created.id, SslStatus::Provisioned).await.unwrap());

        let loaded = db.domain_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, DomainStatus::Verified);
        assert_eq!(loaded.ssl_status, Some(SslStatus::Provisioned));
    }

    #[tokio::test]
    async fn updates_on_missing_domain_report_false() {
        let db = Database::in_memory().await.unwrap();

        assert!(!db.set_domain_status(Uuid::new_v4(), DomainStatus::Failed).await.unwrap());
    }

    #[tokio::test]
    async fn owner_scoping_and_lookup_by_name() {
        let db = Database::in_memory().await.unwrap();
        let owner = Uuid::new_v4();
        let created = db.create_domain(new_domain(owner, "a.example.com")).await.unwrap();

        assert!(db.get_domain(created.id, Uuid::new_v4()).await.unwrap().is_none());
        assert_eq!(db.list_domains(owner).await.unwrap().len(), 1);
        assert_eq!(
            db.find_domain("a.example.com").await.unwrap().map(|d| d.id),
            Some(created.id)
        );

        assert!(!db.delete_domain(created.id, Uuid::new_v4()).await.unwrap());
        assert!(db.delete_domain(created.id, owner).await.unwrap());
        assert!(db.find_domain("a.example.com").await.unwrap().is_none());
    }
}
