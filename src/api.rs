use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::scheduler::{PollStatus, StatusHandle};
use crate::seen::SeenStore;

#[derive(Clone)]
pub struct AppState {
    pub status: StatusHandle,
    pub store: Arc<dyn SeenStore>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/status", get(status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct StatusResp {
    #[serde(flatten)]
    poll: PollStatus,
    seen_count: u64,
}

async fn status(State(state): State<AppState>) -> Result<Json<StatusResp>, (StatusCode, String)> {
    let seen_count = state
        .store
        .count()
        .await
        .map_err(|e| (StatusCode::SERVICE_UNAVAILABLE, e.to_string()))?;
    Ok(Json(StatusResp {
        poll: state.status.snapshot(),
        seen_count,
    }))
}
