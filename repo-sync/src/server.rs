use crate::config::RepoSyncConfig;
use crate::error::{RepoSyncError, RepoSyncResult};
use crate::model::EditRequest;
use crate::reconcile::ReconcileOutcome;
use crate::service::RepoSyncService;
use axum::{
    Router,
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post}
};
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

pub struct MirrorServer {
    config: RepoSyncConfig,
    service: Arc<RepoSyncService>
}

#[derive(Clone)]
pub struct AppState {
    owner: String,
    service: Arc<RepoSyncService>
}

impl AppState {
    pub fn new(owner: impl Into<String>, service: Arc<RepoSyncService>) -> Self {
        Self {
            owner: owner.into(),
            service
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/repos", get(refresh_repos))
        .route("/repos/cached", get(cached_repos))
        .route("/update", post(update_repo))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

impl MirrorServer {
    pub fn new(config: RepoSyncConfig, service: Arc<RepoSyncService>) -> Self {
        Self { config, service }
    }

    pub async fn run(&self) -> RepoSyncResult<()> {
        let app = router(AppState::new(
            self.config.owner.clone(),
            self.service.clone()
        ));

        let addr = format!("0.0.0.0:{}", self.config.listen_port);
        info!(addr = %addr, owner = %self.config.owner, "Starting mirror server");

        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| RepoSyncError::ServerError(format!("Failed to bind: {}", e)))?;

        axum::serve(listener, app)
            .await
            .map_err(|e| RepoSyncError::ServerError(format!("Server error: {}", e)))?;

        Ok(())
    }
}

async fn health_check() -> StatusCode {
    StatusCode::OK
}

async fn refresh_repos(State(state): State<AppState>) -> Response {
    match state.service.refresh(&state.owner).await {
        Ok(report) => {
            if report.has_errors() {
                warn!(errors = report.errors.len(), "Refresh completed with fetch errors");
            }
            Json(report.mirror).into_response()
        }
        Err(e) => error_response(&e)
    }
}

async fn cached_repos(State(state): State<AppState>) -> Response {
    match state.service.snapshot().await {
        Ok(mirror) => Json(mirror).into_response(),
        Err(e) => error_response(&e)
    }
}

async fn update_repo(State(state): State<AppState>, Json(edit): Json<EditRequest>) -> Response {
    match state.service.apply_edit(&state.owner, &edit).await {
        Ok(ReconcileOutcome::NoChange) => StatusCode::NO_CONTENT.into_response(),
        Ok(outcome @ ReconcileOutcome::Applied { .. }) => {
            info!(repo = %edit.name, "Updated repo");
            (StatusCode::OK, Json(outcome)).into_response()
        }
        Err(e) => error_response(&e)
    }
}

fn status_for(err: &RepoSyncError) -> StatusCode {
    match err {
        RepoSyncError::RepositoryNotFound(_) => StatusCode::NOT_FOUND,
        e if e.is_conflict() => StatusCode::CONFLICT,
        e if e.is_upstream() => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR
    }
}

fn error_response(err: &RepoSyncError) -> Response {
    let status = status_for(err);
    if status.is_server_error() {
        error!(error = %err, "Request failed");
    }

    let mut body = json!({ "error": err.to_string() });
    if let RepoSyncError::PartiallyApplied { completed, .. } = err {
        body["completed"] = json!(completed);
    }
    (status, Json(body)).into_response()
}
