use repo_sync::markers::{MYCROLINKS_MARKER, PERSONAL_MARKER, TAGS_FILE};
use repo_sync::{
    FilePresence, InMemoryStore, MirrorStore, RepoSyncConfig, RepoSyncService, Visibility
};
use std::sync::Arc;
use testing::{FakeRepoHost, HostCall, remote_repo};

fn config() -> RepoSyncConfig {
    RepoSyncConfig {
        owner: "octocat".to_string(),
        api_token: "test".to_string(),
        max_concurrency: 3,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_refresh_orders_mirror_by_name() {
    let host = FakeRepoHost::new()
        .with_page_size(2)
        .with_repo(remote_repo("website", false))
        .with_repo(remote_repo("dotfiles", true))
        .with_repo(remote_repo("Zettel", false))
        .with_repo(remote_repo("api", false))
        .with_repo(remote_repo("notes", true));
    let host = Arc::new(host);
    let store = Arc::new(InMemoryStore::new());
    let service = RepoSyncService::new(&config(), host.clone(), store.clone());

    let report = service.refresh("octocat").await.unwrap();

    let names: Vec<&str> = report.mirror.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Zettel", "api", "dotfiles", "notes", "website"]);
    assert_eq!(report.repositories, 5);
    assert!(report.completed_at.is_some());

    let pages = host
        .calls()
        .into_iter()
        .filter(|c| matches!(c, HostCall::ListRepositories { .. }))
        .count();
    assert_eq!(pages, 3);
}

#[tokio::test]
async fn test_refresh_persists_snapshot() {
    let host = FakeRepoHost::new()
        .with_repo(remote_repo("site", false))
        .with_file("site", PERSONAL_MARKER, "")
        .with_file("site", TAGS_FILE, "web\nhugo\n  blog ");
    let store = Arc::new(InMemoryStore::new());
    let service = RepoSyncService::new(&config(), Arc::new(host), store.clone());

    service.refresh("octocat").await.unwrap();

    let stored = store.load().await.unwrap().unwrap();
    assert_eq!(stored.len(), 1);
    let site = &stored[0];
    assert_eq!(site.file_presence, FilePresence::Personal);
    assert_eq!(site.visibility, Visibility::Public);
    assert_eq!(site.category, "web");
    assert_eq!(site.tags, vec!["hugo", "blog"]);
    assert_eq!(site.description.as_deref(), Some("site repository"));
}

#[tokio::test]
async fn test_refresh_replaces_previous_snapshot() {
    let stale = vec![testing::metadata("deleted-repo", FilePresence::Common, "", &[])];
    let store = Arc::new(InMemoryStore::with_snapshot(stale));
    let host = FakeRepoHost::new().with_repo(remote_repo("fresh", false));
    let service = RepoSyncService::new(&config(), Arc::new(host), store.clone());

    service.refresh("octocat").await.unwrap();

    let stored = service.snapshot().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].name, "fresh");
}

#[tokio::test]
async fn test_refresh_tolerates_marker_fetch_failures() {
    let host = FakeRepoHost::new()
        .with_repo(remote_repo("flaky", false))
        .with_repo(remote_repo("steady", false))
        .with_file("flaky", PERSONAL_MARKER, "")
        .with_file("flaky", MYCROLINKS_MARKER, "")
        .with_file("steady", MYCROLINKS_MARKER, "")
        .failing_read("flaky", MYCROLINKS_MARKER);
    let store = Arc::new(InMemoryStore::new());
    let service = RepoSyncService::new(&config(), Arc::new(host), store);

    let report = service.refresh("octocat").await.unwrap();

    assert!(report.has_errors());
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].repository, "flaky");
    assert_eq!(report.mirror[0].file_presence, FilePresence::Personal);
    assert_eq!(report.mirror[1].file_presence, FilePresence::Mycrolinks);
}

#[tokio::test]
async fn test_refresh_fails_when_listing_fails() {
    let host = FakeRepoHost::new()
        .with_repo(remote_repo("site", false))
        .failing_listing();
    let previous = vec![testing::metadata("site", FilePresence::Private, "", &[])];
    let store = Arc::new(InMemoryStore::with_snapshot(previous.clone()));
    let service = RepoSyncService::new(&config(), Arc::new(host), store.clone());

    let err = service.refresh("octocat").await.unwrap_err();
    assert!(err.is_upstream());

    // A failed refresh leaves the last good snapshot in place.
    assert_eq!(store.load().await.unwrap().unwrap(), previous);
}

#[tokio::test]
async fn test_refresh_of_empty_account() {
    let store = Arc::new(InMemoryStore::new());
    let service = RepoSyncService::new(&config(), Arc::new(FakeRepoHost::new()), store.clone());

    let report = service.refresh("octocat").await.unwrap();
    assert!(report.mirror.is_empty());
    assert_eq!(store.load().await.unwrap(), Some(Vec::new()));
}
