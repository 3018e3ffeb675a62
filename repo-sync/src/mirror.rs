use crate::error::RepoSyncResult;
use crate::github::RepoHost;
use crate::markers::{self, MYCROLINKS_MARKER, PERSONAL_MARKER, TAGS_FILE};
use crate::model::{Mirror, RemoteRepository, RepoMetadata, Visibility};
use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Builds a fresh mirror of every repository an owner holds.
pub struct MirrorBuilder {
    client: Arc<dyn RepoHost>,
    max_concurrency: usize
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchError {
    pub repository: String,
    pub path: String,
    pub error: String,
    pub timestamp: DateTime<Utc>
}

#[derive(Debug, Clone)]
pub struct MirrorBuild {
    pub mirror: Mirror,
    pub fetch_errors: Vec<FetchError>
}

impl MirrorBuilder {
    pub fn new(client: Arc<dyn RepoHost>, max_concurrency: usize) -> Self {
        Self {
            client,
            max_concurrency: max_concurrency.max(1)
        }
    }

    pub async fn build(&self, owner: &str) -> RepoSyncResult<MirrorBuild> {
        let mut repos = self.fetch_all_repositories(owner).await?;
        info!(owner = %owner, count = repos.len(), "Fetched repositories from GitHub");

        repos.sort_by(|a, b| a.name.cmp(&b.name));

        // `buffered` yields in input order, so the mirror stays sorted by name.
        let results: Vec<(RepoMetadata, Vec<FetchError>)> = stream::iter(repos)
            .map(|repo| self.process_repository(owner, repo))
            .buffered(self.max_concurrency)
            .collect()
            .await;

        let mut mirror = Vec::with_capacity(results.len());
        let mut fetch_errors = Vec::new();
        for (record, errors) in results {
            mirror.push(record);
            fetch_errors.extend(errors);
        }

        Ok(MirrorBuild {
            mirror,
            fetch_errors
        })
    }

    async fn fetch_all_repositories(&self, owner: &str) -> RepoSyncResult<Vec<RemoteRepository>> {
        let mut all_repos = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .client
                .list_repositories(owner, page_token.as_deref())
                .await?;
            all_repos.extend(page.repositories);
            page_token = page.next_page_token;

            if page_token.is_none() {
                break;
            }
        }

        Ok(all_repos)
    }

    async fn process_repository(
        &self,
        owner: &str,
        repo: RemoteRepository
    ) -> (RepoMetadata, Vec<FetchError>) {
        debug!(repo = %repo.name, "Processing repository");

        let (personal, mycrolinks, tags) = tokio::join!(
            self.fetch_optional(owner, &repo.name, PERSONAL_MARKER),
            self.fetch_optional(owner, &repo.name, MYCROLINKS_MARKER),
            self.fetch_optional(owner, &repo.name, TAGS_FILE)
        );

        let mut errors = Vec::new();
        let mut settle = |result: Result<Option<String>, FetchError>| match result {
            Ok(content) => content,
            Err(e) => {
                errors.push(e);
                None
            }
        };
        let personal = settle(personal);
        let mycrolinks = settle(mycrolinks);
        let tags = settle(tags);

        let decoded = markers::decode(
            personal.as_deref(),
            mycrolinks.as_deref(),
            tags.as_deref()
        );

        let record = RepoMetadata {
            name: repo.name,
            url: repo.url,
            description: repo.description,
            created_at: repo.created_at,
            updated_at: repo.updated_at,
            visibility: Visibility::from_private_flag(repo.is_private),
            file_presence: decoded.file_presence,
            category: decoded.category,
            tags: decoded.tags
        };

        (record, errors)
    }

    /// Not-found comes back as `Ok(None)`; anything else is reported so the
    /// caller can log it and carry on as if the file were absent.
    async fn fetch_optional(
        &self,
        owner: &str,
        repo: &str,
        path: &str
    ) -> Result<Option<String>, FetchError> {
        match self.client.get_file(owner, repo, path).await {
            Ok(file) => Ok(file.map(|f| f.text())),
            Err(e) => {
                warn!(repo = %repo, path = %path, error = %e, "Failed to fetch marker file, treating as absent");
                Err(FetchError {
                    repository: repo.to_string(),
                    path: path.to_string(),
                    error: e.to_string(),
                    timestamp: Utc::now()
                })
            }
        }
    }
}
