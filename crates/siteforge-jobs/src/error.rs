//! Job errors.

use siteforge_store::StoreError;

/// Errors raised while running a job.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Invalid job data: {0}")]
    InvalidData(String),

    #[error("No handler registered for {0} jobs")]
    NoHandler(&'static str),

    #[error("Verification record not found for {0}")]
    DnsPending(String),

    #[error("Render failed: {0}")]
    Render(String),

    #[error("Storage error: {0}")]
    Storage(#[from] object_store::Error),

    #[error("Storage configuration error: {0}")]
    StorageConfig(String),

    #[error("DNS resolver error: {0}")]
    Resolver(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl JobError {
    /// Whether another attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::DnsPending(_) | Self::Storage(_) | Self::Store(_) | Self::Resolver(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_records_are_not_retried() {
        assert!(!JobError::NotFound("Project".into()).is_retryable());
        assert!(!JobError::InvalidData("bad".into()).is_retryable());
        assert!(JobError::DnsPending("example.com".into()).is_retryable());
    }
}
