pub mod config;
pub mod error;
pub mod github;
pub mod markers;
pub mod mirror;
pub mod model;
pub mod reconcile;
pub mod server;
pub mod service;
pub mod store;

pub use config::RepoSyncConfig;
pub use error::{RepoSyncError, RepoSyncResult};
pub use github::{GithubClient, RepoHost};
pub use mirror::MirrorBuilder;
pub use model::{EditRequest, FilePresence, Mirror, RepoMetadata, Visibility};
pub use reconcile::{ReconcileOutcome, Reconciler};
pub use server::MirrorServer;
pub use service::{RefreshReport, RepoSyncService};
pub use store::{InMemoryStore, JsonFileStore, MirrorStore};
