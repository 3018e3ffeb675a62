//! Turning an edited record back into marker files on GitHub.
//!
//! Deciding what to change is pure ([`EditDelta`], [`plan_presence`],
//! [`plan_tags`]); only [`Reconciler`] talks to the host. Mutations run one
//! at a time in a fixed order: description, presence markers, tags file.
//! Nothing is rolled back when a later step fails.

use crate::error::{RepoSyncError, RepoSyncResult};
use crate::github::RepoHost;
use crate::markers::{self, PRESENCE_MARKERS, TAGS_FILE};
use crate::model::{EditRequest, FilePresence, RepoMetadata};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EditDelta {
    pub description_changed: bool,
    pub presence_changed: bool,
    pub tags_changed: bool
}

impl EditDelta {
    pub fn between(stored: &RepoMetadata, edit: &EditRequest) -> Self {
        Self {
            description_changed: stored.description != edit.description,
            presence_changed: stored.file_presence != edit.file_presence,
            tags_changed: stored.category != edit.category || stored.tags != edit.tags
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.description_changed || self.presence_changed || self.tags_changed)
    }
}

/// A single remote write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Mutation {
    UpdateDescription {
        description: Option<String>
    },
    CreateMarker {
        path: String
    },
    DeleteMarker {
        path: String
    },
    CreateTags {
        content: String
    },
    UpdateTags {
        content: String,
        expected_version: String
    }
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UpdateDescription { .. } => write!(f, "update description"),
            Self::CreateMarker { path } => write!(f, "create {}", path),
            Self::DeleteMarker { path } => write!(f, "delete {}", path),
            Self::CreateTags { .. } => write!(f, "create {}", TAGS_FILE),
            Self::UpdateTags { .. } => write!(f, "update {}", TAGS_FILE)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    Applied { mutations: Vec<Mutation> },
    NoChange
}

/// Deletes for markers that must go, then creates for markers that are
/// missing. Markers already in the right state produce nothing.
pub fn plan_presence(present: &[&str], target: FilePresence) -> Vec<Mutation> {
    let wanted = markers::target_markers(target);

    let deletes = PRESENCE_MARKERS
        .iter()
        .filter(|m| present.contains(m) && !wanted.contains(m))
        .map(|m| Mutation::DeleteMarker {
            path: (*m).to_string()
        });
    let creates = PRESENCE_MARKERS
        .iter()
        .filter(|m| !present.contains(m) && wanted.contains(m))
        .map(|m| Mutation::CreateMarker {
            path: (*m).to_string()
        });

    deletes.chain(creates).collect()
}

pub fn plan_tags(edit: &EditRequest, existing_version: Option<String>) -> Mutation {
    let content = markers::encode_tags(&edit.category, &edit.tags);
    match existing_version {
        Some(expected_version) => Mutation::UpdateTags {
            content,
            expected_version
        },
        None => Mutation::CreateTags { content }
    }
}

pub struct Reconciler {
    client: Arc<dyn RepoHost>,
    commit_message_prefix: String
}

impl Reconciler {
    pub fn new(client: Arc<dyn RepoHost>, commit_message_prefix: impl Into<String>) -> Self {
        Self {
            client,
            commit_message_prefix: commit_message_prefix.into()
        }
    }

    /// Applies `edit` against the record of the same name in `snapshot`.
    pub async fn reconcile(
        &self,
        owner: &str,
        snapshot: &[RepoMetadata],
        edit: &EditRequest
    ) -> RepoSyncResult<ReconcileOutcome> {
        let stored = snapshot
            .iter()
            .find(|r| r.name == edit.name)
            .ok_or_else(|| RepoSyncError::RepositoryNotFound(edit.name.clone()))?;

        let delta = EditDelta::between(stored, edit);
        if delta.is_empty() {
            debug!(repo = %edit.name, "Edit matches mirror, nothing to do");
            return Ok(ReconcileOutcome::NoChange);
        }

        let repo = stored.name.as_str();
        let mut completed: Vec<Mutation> = Vec::new();

        if delta.description_changed {
            let mutation = Mutation::UpdateDescription {
                description: edit.description.clone()
            };
            self.step(owner, repo, mutation, &mut completed).await?;
        }

        if delta.presence_changed {
            let present = self
                .current_markers(owner, repo)
                .await
                .map_err(|e| abort(&completed, e))?;
            for mutation in plan_presence(&present, edit.file_presence) {
                self.step(owner, repo, mutation, &mut completed).await?;
            }
        }

        if delta.tags_changed {
            let existing = self
                .client
                .get_file(owner, repo, TAGS_FILE)
                .await
                .map_err(|e| abort(&completed, e))?;
            let mutation = plan_tags(edit, existing.map(|f| f.version));
            self.step(owner, repo, mutation, &mut completed).await?;
        }

        info!(
            repo = %repo,
            description_changed = delta.description_changed,
            presence_changed = delta.presence_changed,
            tags_changed = delta.tags_changed,
            mutations = completed.len(),
            "Edit applied"
        );

        Ok(ReconcileOutcome::Applied {
            mutations: completed
        })
    }

    /// Presence markers that exist on the host right now.
    async fn current_markers(&self, owner: &str, repo: &str) -> RepoSyncResult<Vec<&'static str>> {
        let [personal, mycrolinks] = PRESENCE_MARKERS;
        let (has_personal, has_mycrolinks) = tokio::join!(
            self.client.get_file(owner, repo, personal),
            self.client.get_file(owner, repo, mycrolinks)
        );

        let mut present = Vec::with_capacity(2);
        if has_personal?.is_some() {
            present.push(personal);
        }
        if has_mycrolinks?.is_some() {
            present.push(mycrolinks);
        }
        Ok(present)
    }

    async fn step(
        &self,
        owner: &str,
        repo: &str,
        mutation: Mutation,
        completed: &mut Vec<Mutation>
    ) -> RepoSyncResult<()> {
        debug!(repo = %repo, mutation = %mutation, "Applying mutation");
        match self.apply(owner, repo, &mutation).await {
            Ok(()) => {
                completed.push(mutation);
                Ok(())
            }
            Err(e) => {
                warn!(repo = %repo, mutation = %mutation, error = %e, "Mutation failed, aborting edit");
                Err(abort(completed, e))
            }
        }
    }

    async fn apply(&self, owner: &str, repo: &str, mutation: &Mutation) -> RepoSyncResult<()> {
        match mutation {
            Mutation::UpdateDescription { description } => {
                self.client
                    .update_description(owner, repo, description.as_deref())
                    .await
            }
            Mutation::CreateMarker { path } => {
                let message = self.commit_message("Visibility");
                self.client
                    .create_or_update_file(owner, repo, path, b"", None, &message)
                    .await
                    .map(|_| ())
            }
            Mutation::DeleteMarker { path } => {
                let message = self.commit_message("Visibility");
                let deleted = self.client.delete_file(owner, repo, path, &message).await?;
                if !deleted {
                    debug!(repo = %repo, path = %path, "Marker already gone");
                }
                Ok(())
            }
            Mutation::CreateTags { content } => {
                let message = self.commit_message("Tags");
                self.client
                    .create_or_update_file(owner, repo, TAGS_FILE, content.as_bytes(), None, &message)
                    .await
                    .map(|_| ())
            }
            Mutation::UpdateTags {
                content,
                expected_version
            } => {
                let message = self.commit_message("Tags");
                self.client
                    .create_or_update_file(
                        owner,
                        repo,
                        TAGS_FILE,
                        content.as_bytes(),
                        Some(expected_version.as_str()),
                        &message
                    )
                    .await
                    .map(|_| ())
            }
        }
    }

    fn commit_message(&self, subject: &str) -> String {
        format!(
            "{} {} {}",
            self.commit_message_prefix,
            subject,
            Utc::now().to_rfc3339()
        )
    }
}

/// Wraps a failure with the steps that already landed, if any.
fn abort(completed: &[Mutation], error: RepoSyncError) -> RepoSyncError {
    if completed.is_empty() {
        error
    } else {
        RepoSyncError::PartiallyApplied {
            completed: completed.iter().map(ToString::to_string).collect(),
            source: Box::new(error)
        }
    }
}
