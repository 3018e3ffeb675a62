use thiserror::Error;

pub type RepoSyncResult<T> = Result<T, RepoSyncError>;

#[derive(Debug, Error)]
pub enum RepoSyncError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("GitHub API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Repository not found in mirror: {0}")]
    RepositoryNotFound(String),

    #[error("Version conflict on {path}: {message}")]
    Conflict { path: String, message: String },

    #[error("Rate limited: retry after {retry_after_seconds}s")]
    RateLimited { retry_after_seconds: u64 },

    #[error("Invalid file payload for {path}: {reason}")]
    InvalidPayload { path: String, reason: String },

    #[error("Edit partially applied ({completed:?} done): {source}")]
    PartiallyApplied {
        completed: Vec<String>,
        #[source]
        source: Box<RepoSyncError>
    },

    #[error("Snapshot store error: {0}")]
    StoreError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Server error: {0}")]
    ServerError(String)
}

impl RepoSyncError {
    /// True for failures that originate at the remote host.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::HttpError(_)
                | Self::AuthenticationError(_)
                | Self::ApiError { .. }
                | Self::Conflict { .. }
                | Self::RateLimited { .. }
                | Self::InvalidPayload { .. }
                | Self::PartiallyApplied { .. }
        )
    }

    pub fn is_conflict(&self) -> bool {
        match self {
            Self::Conflict { .. } => true,
            Self::PartiallyApplied { source, .. } => source.is_conflict(),
            _ => false
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::HttpError(_) | Self::RateLimited { .. })
    }

    pub fn retry_after(&self) -> Option<u64> {
        if let Self::RateLimited {
            retry_after_seconds
        } = self
        {
            Some(*retry_after_seconds)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_classification() {
        let conflict = RepoSyncError::Conflict {
            path: ".tags".to_string(),
            message: "sha mismatch".to_string()
        };
        assert!(conflict.is_upstream());
        assert!(conflict.is_conflict());
        assert!(!conflict.is_retryable());

        let missing = RepoSyncError::RepositoryNotFound("demo".to_string());
        assert!(!missing.is_upstream());

        let config = RepoSyncError::ConfigError("owner missing".to_string());
        assert!(!config.is_upstream());
    }

    #[test]
    fn test_partial_apply_keeps_source_kind() {
        let err = RepoSyncError::PartiallyApplied {
            completed: vec!["update description".to_string()],
            source: Box::new(RepoSyncError::Conflict {
                path: ".tags".to_string(),
                message: "stale".to_string()
            })
        };
        assert!(err.is_upstream());
        assert!(err.is_conflict());
        assert!(err.to_string().contains("update description"));
    }

    #[test]
    fn test_rate_limit_retry_after() {
        let rate_limited = RepoSyncError::RateLimited {
            retry_after_seconds: 60
        };
        assert!(rate_limited.is_retryable());
        assert_eq!(rate_limited.retry_after(), Some(60));

        let auth_error = RepoSyncError::AuthenticationError("bad token".to_string());
        assert!(!auth_error.is_retryable());
        assert_eq!(auth_error.retry_after(), None);
    }
}
