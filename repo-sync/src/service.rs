use crate::config::RepoSyncConfig;
use crate::error::RepoSyncResult;
use crate::github::RepoHost;
use crate::mirror::{FetchError, MirrorBuilder};
use crate::model::{EditRequest, Mirror};
use crate::reconcile::{ReconcileOutcome, Reconciler};
use crate::store::MirrorStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Entry point the front end drives: refresh on read, reconcile on write.
pub struct RepoSyncService {
    builder: MirrorBuilder,
    reconciler: Reconciler,
    store: Arc<dyn MirrorStore>
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefreshReport {
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub repositories: usize,
    pub mirror: Mirror,
    pub errors: Vec<FetchError>
}

impl RefreshReport {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            ..Default::default()
        }
    }

    pub fn complete(&mut self) {
        self.completed_at = Some(Utc::now());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

impl RepoSyncService {
    pub fn new(
        config: &RepoSyncConfig,
        client: Arc<dyn RepoHost>,
        store: Arc<dyn MirrorStore>
    ) -> Self {
        Self {
            builder: MirrorBuilder::new(client.clone(), config.max_concurrency),
            reconciler: Reconciler::new(client, config.commit_message_prefix.clone()),
            store
        }
    }

    /// Rebuilds the mirror for `owner` and replaces the stored snapshot.
    pub async fn refresh(&self, owner: &str) -> RepoSyncResult<RefreshReport> {
        let mut report = RefreshReport::new();
        info!(owner = %owner, "Starting mirror refresh");

        let build = self.builder.build(owner).await?;
        self.store.save(&build.mirror).await?;

        report.repositories = build.mirror.len();
        report.mirror = build.mirror;
        report.errors = build.fetch_errors;
        report.complete();

        info!(
            repositories = report.repositories,
            errors = report.errors.len(),
            "Mirror refresh completed"
        );

        Ok(report)
    }

    /// Reconciles `edit` against the last stored snapshot.
    pub async fn apply_edit(
        &self,
        owner: &str,
        edit: &EditRequest
    ) -> RepoSyncResult<ReconcileOutcome> {
        let snapshot = self.snapshot().await?;
        self.reconciler.reconcile(owner, &snapshot, edit).await
    }

    /// Last stored mirror, empty if no refresh has happened yet.
    pub async fn snapshot(&self) -> RepoSyncResult<Mirror> {
        Ok(self.store.load().await?.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_report() {
        let mut report = RefreshReport::new();
        assert!(report.completed_at.is_none());
        assert!(!report.has_errors());

        report.errors.push(FetchError {
            repository: "demo".to_string(),
            path: ".tags".to_string(),
            error: "timeout".to_string(),
            timestamp: Utc::now()
        });
        assert!(report.has_errors());

        report.complete();
        assert!(report.completed_at.is_some());
    }

    #[test]
    fn test_refresh_report_serialization() {
        let report = RefreshReport::new();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["repositories"], 0);
        assert!(json["mirror"].as_array().unwrap().is_empty());
    }
}
