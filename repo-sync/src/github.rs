use crate::config::RepoSyncConfig;
use crate::error::{RepoSyncError, RepoSyncResult};
use crate::model::{RemoteFile, RemoteRepository, RepoPage};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Operations the mirror builder and reconciler need from the remote host.
#[async_trait]
pub trait RepoHost: Send + Sync {
    /// One page of the owner's repositories, in whatever order the host uses.
    async fn list_repositories(
        &self,
        owner: &str,
        page_token: Option<&str>
    ) -> RepoSyncResult<RepoPage>;

    /// `Ok(None)` when the file does not exist.
    async fn get_file(&self, owner: &str, repo: &str, path: &str)
    -> RepoSyncResult<Option<RemoteFile>>;

    /// Writes `content` and returns the new version token. With
    /// `expected_version` set the host rejects the write if the file moved on.
    async fn create_or_update_file(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        content: &[u8],
        expected_version: Option<&str>,
        message: &str
    ) -> RepoSyncResult<String>;

    /// Returns `false` if there was nothing to delete.
    async fn delete_file(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        message: &str
    ) -> RepoSyncResult<bool>;

    async fn update_description(
        &self,
        owner: &str,
        repo: &str,
        description: Option<&str>
    ) -> RepoSyncResult<()>;
}

const PAGE_SIZE: u32 = 100;
const USER_AGENT: &str = "github-repo-manager";

pub struct GithubClient {
    client: Client,
    base_url: String,
    api_token: String
}

impl GithubClient {
    pub fn new(config: &RepoSyncConfig) -> RepoSyncResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(USER_AGENT)
            .build()
            .map_err(RepoSyncError::HttpError)?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone()
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!(method = %method, url = %url, "Making GitHub API request");

        self.client
            .request(method, url)
            .header("Authorization", format!("Bearer {}", self.api_token))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
    }

    fn contents_path(owner: &str, repo: &str, path: &str) -> String {
        format!(
            "/repos/{}/{}/contents/{}",
            urlencoding::encode(owner),
            urlencoding::encode(repo),
            urlencoding::encode(path)
        )
    }

    /// Maps non-success statuses onto the error taxonomy.
    async fn check(&self, response: Response, target: &str) -> RepoSyncResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let rate_limited = status == StatusCode::TOO_MANY_REQUESTS
            || (status == StatusCode::FORBIDDEN
                && response
                    .headers()
                    .get("x-ratelimit-remaining")
                    .and_then(|v| v.to_str().ok())
                    == Some("0"));

        if rate_limited {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(RepoSyncError::RateLimited {
                retry_after_seconds: retry_after
            });
        }

        let body = response.text().await.unwrap_or_default();
        match status {
            StatusCode::UNAUTHORIZED => Err(RepoSyncError::AuthenticationError(
                "Invalid GitHub access token".to_string()
            )),
            StatusCode::CONFLICT => Err(RepoSyncError::Conflict {
                path: target.to_string(),
                message: body
            }),
            status => Err(RepoSyncError::ApiError {
                status: status.as_u16(),
                message: body
            })
        }
    }

    fn extract_next_page(&self, headers: &reqwest::header::HeaderMap) -> Option<String> {
        headers
            .get("link")
            .and_then(|v| v.to_str().ok())
            .and_then(|link| {
                for part in link.split(',') {
                    if part.contains("rel=\"next\"") {
                        let url_part = part.split(';').next()?;
                        let url = url_part
                            .trim()
                            .trim_start_matches('<')
                            .trim_end_matches('>');
                        return page_param(url);
                    }
                }
                None
            })
    }

    fn decode_contents(path: &str, body: ContentsResponse) -> RepoSyncResult<RemoteFile> {
        if body.kind != "file" {
            return Err(RepoSyncError::InvalidPayload {
                path: path.to_string(),
                reason: format!("expected a file, found {}", body.kind)
            });
        }

        let encoded: String = body
            .content
            .unwrap_or_default()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        let content = STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| RepoSyncError::InvalidPayload {
                path: path.to_string(),
                reason: e.to_string()
            })?;

        Ok(RemoteFile {
            content,
            version: body.sha
        })
    }
}

fn page_param(url: &str) -> Option<String> {
    let query = url.split_once('?')?.1;
    query
        .split('&')
        .find_map(|pair| pair.strip_prefix("page="))
        .map(|s| s.to_string())
}

#[async_trait]
impl RepoHost for GithubClient {
    async fn list_repositories(
        &self,
        owner: &str,
        page_token: Option<&str>
    ) -> RepoSyncResult<RepoPage> {
        let mut path = format!(
            "/user/repos?visibility=all&affiliation=owner&per_page={}",
            PAGE_SIZE
        );
        if let Some(page) = page_token {
            path.push_str(&format!("&page={}", urlencoding::encode(page)));
        }

        let response = self.request(Method::GET, &path).send().await?;
        let response = self.check(response, &path).await?;
        let next_page_token = self.extract_next_page(response.headers());
        let repos: Vec<GithubRepoResponse> = response.json().await?;

        Ok(RepoPage {
            repositories: repos
                .into_iter()
                .filter(|r| r.owner.login.eq_ignore_ascii_case(owner))
                .map(|r| RemoteRepository {
                    name: r.name,
                    url: r.html_url,
                    description: r.description,
                    created_at: r.created_at,
                    updated_at: r.updated_at,
                    is_private: r.private
                })
                .collect(),
            next_page_token
        })
    }

    async fn get_file(
        &self,
        owner: &str,
        repo: &str,
        path: &str
    ) -> RepoSyncResult<Option<RemoteFile>> {
        let url_path = Self::contents_path(owner, repo, path);
        let response = self.request(Method::GET, &url_path).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = self.check(response, path).await?;
        let body: ContentsResponse = response.json().await?;
        Self::decode_contents(path, body).map(Some)
    }

    async fn create_or_update_file(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        content: &[u8],
        expected_version: Option<&str>,
        message: &str
    ) -> RepoSyncResult<String> {
        let url_path = Self::contents_path(owner, repo, path);
        let body = PutContentsRequest {
            message,
            content: STANDARD.encode(content),
            sha: expected_version
        };

        let response = self
            .request(Method::PUT, &url_path)
            .json(&body)
            .send()
            .await?;
        let response = self.check(response, path).await?;
        let written: PutContentsResponse = response.json().await?;
        Ok(written.content.sha)
    }

    async fn delete_file(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        message: &str
    ) -> RepoSyncResult<bool> {
        // The contents API wants the blob sha of the file being removed.
        let Some(current) = self.get_file(owner, repo, path).await? else {
            return Ok(false);
        };

        let url_path = Self::contents_path(owner, repo, path);
        let body = DeleteContentsRequest {
            message,
            sha: &current.version
        };

        let response = self
            .request(Method::DELETE, &url_path)
            .json(&body)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        self.check(response, path).await?;
        Ok(true)
    }

    async fn update_description(
        &self,
        owner: &str,
        repo: &str,
        description: Option<&str>
    ) -> RepoSyncResult<()> {
        let path = format!(
            "/repos/{}/{}",
            urlencoding::encode(owner),
            urlencoding::encode(repo)
        );
        let response = self
            .request(Method::PATCH, &path)
            .json(&UpdateRepoRequest { description })
            .send()
            .await?;
        self.check(response, repo).await?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct GithubRepoResponse {
    name: String,
    html_url: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    private: bool,
    owner: GithubOwner
}

#[derive(Debug, Deserialize)]
struct GithubOwner {
    login: String
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    #[serde(rename = "type")]
    kind: String,
    sha: String,
    content: Option<String>
}

#[derive(Debug, Serialize)]
struct PutContentsRequest<'a> {
    message: &'a str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>
}

#[derive(Debug, Deserialize)]
struct PutContentsResponse {
    content: WrittenContent
}

#[derive(Debug, Deserialize)]
struct WrittenContent {
    sha: String
}

#[derive(Debug, Serialize)]
struct DeleteContentsRequest<'a> {
    message: &'a str,
    sha: &'a str
}

#[derive(Debug, Serialize)]
struct UpdateRepoRequest<'a> {
    description: Option<&'a str>
}

pub fn create_github_client(config: &RepoSyncConfig) -> RepoSyncResult<Arc<dyn RepoHost>> {
    Ok(Arc::new(GithubClient::new(config)?))
}
