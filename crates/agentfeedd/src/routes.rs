//! JSON handlers. The SSE feed lives in [`crate::stream`].

use agentfeed_core::{AgentDescriptor, AgentRun, NewPost, Post, PostId, ThreadId, ThreadSnapshot};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::app::AppState;
use crate::error::ApiError;

const DEFAULT_AUTHOR: &str = "anonymous";

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub text: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub author_handle: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreatePostResponse {
    pub post: Post,
    pub triggered_runs: Vec<AgentRun>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RunsQuery {
    #[serde(default)]
    pub active: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub uptime_secs: u64,
    pub runs_in_flight: usize,
    pub watched_threads: usize,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: state.started_at.elapsed().as_secs(),
        runs_in_flight: state.orchestrator.runs_in_flight(),
        watched_threads: state.orchestrator.hub().thread_count(),
    })
}

/// GET /agents
pub async fn list_agents(State(state): State<AppState>) -> Json<Vec<AgentDescriptor>> {
    Json(state.orchestrator.registry().list())
}

/// POST /posts
///
/// Stores the post, then triggers every mentioned agent. Responds before
/// any agent has replied; progress arrives on the thread's stream.
pub async fn create_post(
    State(state): State<AppState>,
    Json(req): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<CreatePostResponse>), ApiError> {
    let text = req.text.trim();
    if text.is_empty() {
        return Err(ApiError::bad_request("post text must not be empty"));
    }
    let author = req
        .author_handle
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .unwrap_or(DEFAULT_AUTHOR);

    let new_post = NewPost {
        author_handle: author.to_string(),
        text: text.to_string(),
        parent_id: req.parent_id.map(PostId),
    };
    let post = state.orchestrator.store().create_post(new_post).await?;
    let triggered_runs = state.orchestrator.handle_new_post(&post).await;

    info!(
        post_id = %post.id,
        thread_id = %post.thread_id,
        triggered = triggered_runs.len(),
        "post accepted"
    );
    Ok((
        StatusCode::CREATED,
        Json(CreatePostResponse {
            post,
            triggered_runs,
        }),
    ))
}

/// GET /threads/{id}
pub async fn get_thread(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ThreadSnapshot>, ApiError> {
    let snapshot = state.orchestrator.store().get_thread(&ThreadId(id)).await?;
    Ok(Json(snapshot))
}

/// DELETE /threads/{id}
pub async fn delete_thread(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.orchestrator.delete_thread(&ThreadId(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /threads/{id}/runs[?active=true]
///
/// Polling fallback for clients without a live stream.
pub async fn list_runs(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<RunsQuery>,
) -> Json<Vec<AgentRun>> {
    let thread_id = ThreadId(id);
    let runs = if query.active {
        state.orchestrator.active_runs(&thread_id)
    } else {
        state.orchestrator.list_runs(&thread_id)
    };
    Json(runs)
}
