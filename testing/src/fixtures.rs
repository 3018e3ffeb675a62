use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use repo_sync::model::{RemoteFile, RemoteRepository, RepoPage};
use repo_sync::{FilePresence, RepoHost, RepoMetadata, RepoSyncError, RepoSyncResult, Visibility};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};

static TEST_COUNTER: AtomicU32 = AtomicU32::new(0);

pub fn unique_id(prefix: &str) -> String {
    let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("{}-{}", prefix, id)
}

/// Every call the fake host has seen, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    ListRepositories {
        page_token: Option<String>
    },
    GetFile {
        repo: String,
        path: String
    },
    CreateOrUpdateFile {
        repo: String,
        path: String,
        content: String,
        expected_version: Option<String>
    },
    DeleteFile {
        repo: String,
        path: String
    },
    UpdateDescription {
        repo: String,
        description: Option<String>
    }
}

impl HostCall {
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Self::ListRepositories { .. } | Self::GetFile { .. })
    }
}

#[derive(Default)]
struct HostState {
    repos: Vec<RemoteRepository>,
    files: HashMap<(String, String), (String, u32)>,
    descriptions: HashMap<String, Option<String>>,
    // Writes that land right after the next read of the same file.
    pending_races: HashMap<(String, String), String>,
    calls: Vec<HostCall>
}

/// In-memory stand-in for GitHub.
///
/// Files carry a version counter so stale `expected_version` writes fail
/// with a conflict the same way the contents API does.
pub struct FakeRepoHost {
    state: Mutex<HostState>,
    page_size: usize,
    failing_reads: HashSet<(String, String)>,
    failing_writes: HashSet<(String, String)>,
    fail_listing: bool
}

impl Default for FakeRepoHost {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeRepoHost {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(HostState::default()),
            page_size: 100,
            failing_reads: HashSet::new(),
            failing_writes: HashSet::new(),
            fail_listing: false
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_repo(self, repo: RemoteRepository) -> Self {
        {
            let mut state = self.state.lock();
            state
                .descriptions
                .insert(repo.name.clone(), repo.description.clone());
            state.repos.push(repo);
        }
        self
    }

    pub fn with_file(self, repo: &str, path: &str, content: &str) -> Self {
        self.state
            .lock()
            .files
            .insert((repo.to_string(), path.to_string()), (content.to_string(), 1));
        self
    }

    pub fn failing_read(mut self, repo: &str, path: &str) -> Self {
        self.failing_reads
            .insert((repo.to_string(), path.to_string()));
        self
    }

    pub fn failing_write(mut self, repo: &str, path: &str) -> Self {
        self.failing_writes
            .insert((repo.to_string(), path.to_string()));
        self
    }

    pub fn failing_description(mut self, repo: &str) -> Self {
        self.failing_writes.insert((repo.to_string(), String::new()));
        self
    }

    pub fn failing_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.state.lock().calls.clone()
    }

    pub fn mutations(&self) -> Vec<HostCall> {
        self.calls().into_iter().filter(HostCall::is_mutation).collect()
    }

    pub fn file(&self, repo: &str, path: &str) -> Option<String> {
        self.state
            .lock()
            .files
            .get(&(repo.to_string(), path.to_string()))
            .map(|(content, _)| content.clone())
    }

    pub fn file_version(&self, repo: &str, path: &str) -> Option<String> {
        self.state
            .lock()
            .files
            .get(&(repo.to_string(), path.to_string()))
            .map(|(_, version)| format!("v{}", version))
    }

    pub fn description(&self, repo: &str) -> Option<String> {
        self.state.lock().descriptions.get(repo).cloned().flatten()
    }

    /// Changes a file behind the caller's back, bumping its version.
    pub fn touch_file(&self, repo: &str, path: &str, content: &str) {
        let mut state = self.state.lock();
        Self::bump(&mut state, (repo.to_string(), path.to_string()), content);
    }

    /// Another writer updates `path` immediately after the next read of it,
    /// so the version the reader saw is already stale when it writes.
    pub fn racing_write(self, repo: &str, path: &str, content: &str) -> Self {
        self.state
            .lock()
            .pending_races
            .insert((repo.to_string(), path.to_string()), content.to_string());
        self
    }

    fn bump(state: &mut HostState, key: (String, String), content: &str) {
        let entry = state.files.entry(key).or_insert_with(|| (String::new(), 0));
        entry.0 = content.to_string();
        entry.1 += 1;
    }

    fn injected_failure(path: &str) -> RepoSyncError {
        RepoSyncError::ApiError {
            status: 502,
            message: format!("injected failure for {}", path)
        }
    }
}

#[async_trait]
impl RepoHost for FakeRepoHost {
    async fn list_repositories(
        &self,
        _owner: &str,
        page_token: Option<&str>
    ) -> RepoSyncResult<RepoPage> {
        let mut state = self.state.lock();
        state.calls.push(HostCall::ListRepositories {
            page_token: page_token.map(str::to_string)
        });

        if self.fail_listing {
            return Err(Self::injected_failure("repository listing"));
        }

        let page: usize = page_token.and_then(|t| t.parse().ok()).unwrap_or(0);
        let start = page * self.page_size;
        let end = (start + self.page_size).min(state.repos.len());
        let repositories = state.repos.get(start..end).unwrap_or_default().to_vec();

        Ok(RepoPage {
            repositories,
            next_page_token: (end < state.repos.len()).then(|| (page + 1).to_string())
        })
    }

    async fn get_file(
        &self,
        _owner: &str,
        repo: &str,
        path: &str
    ) -> RepoSyncResult<Option<RemoteFile>> {
        let mut state = self.state.lock();
        state.calls.push(HostCall::GetFile {
            repo: repo.to_string(),
            path: path.to_string()
        });

        let key = (repo.to_string(), path.to_string());
        if self.failing_reads.contains(&key) {
            return Err(Self::injected_failure(path));
        }

        let file = state.files.get(&key).map(|(content, version)| RemoteFile {
            content: content.clone().into_bytes(),
            version: format!("v{}", version)
        });
        if let Some(content) = state.pending_races.remove(&key) {
            Self::bump(&mut state, key, &content);
        }
        Ok(file)
    }

    async fn create_or_update_file(
        &self,
        _owner: &str,
        repo: &str,
        path: &str,
        content: &[u8],
        expected_version: Option<&str>,
        _message: &str
    ) -> RepoSyncResult<String> {
        let mut state = self.state.lock();
        let text = String::from_utf8_lossy(content).into_owned();
        state.calls.push(HostCall::CreateOrUpdateFile {
            repo: repo.to_string(),
            path: path.to_string(),
            content: text.clone(),
            expected_version: expected_version.map(str::to_string)
        });

        let key = (repo.to_string(), path.to_string());
        if self.failing_writes.contains(&key) {
            return Err(Self::injected_failure(path));
        }

        let current = state.files.get(&key).map(|(_, v)| format!("v{}", v));
        match (current.as_deref(), expected_version) {
            (Some(current), Some(expected)) if current != expected => {
                return Err(RepoSyncError::Conflict {
                    path: path.to_string(),
                    message: format!("expected {}, found {}", expected, current)
                });
            }
            (Some(_), None) => {
                return Err(RepoSyncError::ApiError {
                    status: 422,
                    message: "sha wasn't supplied".to_string()
                });
            }
            _ => {}
        }

        let next = state.files.get(&key).map_or(1, |(_, v)| v + 1);
        state.files.insert(key, (text, next));
        Ok(format!("v{}", next))
    }

    async fn delete_file(
        &self,
        _owner: &str,
        repo: &str,
        path: &str,
        _message: &str
    ) -> RepoSyncResult<bool> {
        let mut state = self.state.lock();
        state.calls.push(HostCall::DeleteFile {
            repo: repo.to_string(),
            path: path.to_string()
        });

        let key = (repo.to_string(), path.to_string());
        if self.failing_writes.contains(&key) {
            return Err(Self::injected_failure(path));
        }
        Ok(state.files.remove(&key).is_some())
    }

    async fn update_description(
        &self,
        _owner: &str,
        repo: &str,
        description: Option<&str>
    ) -> RepoSyncResult<()> {
        let mut state = self.state.lock();
        state.calls.push(HostCall::UpdateDescription {
            repo: repo.to_string(),
            description: description.map(str::to_string)
        });

        if self.failing_writes.contains(&(repo.to_string(), String::new())) {
            return Err(Self::injected_failure("description"));
        }
        state
            .descriptions
            .insert(repo.to_string(), description.map(str::to_string));
        Ok(())
    }
}

/// A listed repository with fixed timestamps.
pub fn remote_repo(name: &str, private: bool) -> RemoteRepository {
    let created = Utc.with_ymd_and_hms(2021, 5, 1, 9, 0, 0).unwrap();
    RemoteRepository {
        name: name.to_string(),
        url: format!("https://github.com/octocat/{}", name),
        description: Some(format!("{} repository", name)),
        created_at: created,
        updated_at: created,
        is_private: private
    }
}

/// Mirror record matching [`remote_repo`] with the given marker state.
pub fn metadata(name: &str, presence: FilePresence, category: &str, tags: &[&str]) -> RepoMetadata {
    let remote = remote_repo(name, false);
    RepoMetadata {
        name: remote.name,
        url: remote.url,
        description: remote.description,
        created_at: remote.created_at,
        updated_at: remote.updated_at,
        visibility: Visibility::Public,
        file_presence: presence,
        category: category.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect()
    }
}
