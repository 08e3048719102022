use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tracing::{error, warn};

use wird_core::{CommandSink, SubscriberId, WirdError};
use wird_scheduler::WirdService;

/// Shared application state for API handlers.
pub struct AppState {
    pub service: WirdService,
}

/// Build the admin router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/triggers", get(list_triggers))
        .route("/api/triggers/:name/fire", post(fire_trigger))
        .route("/api/subscribers/:id/preview", get(preview))
        .with_state(state)
}

fn status_for(err: &WirdError) -> StatusCode {
    match err {
        WirdError::UnknownTrigger(_) | WirdError::UnknownSubscriber(_) => StatusCode::NOT_FOUND,
        WirdError::MalformedPreference { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "wird",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn list_triggers(State(state): State<Arc<AppState>>) -> Json<Value> {
    let triggers = state.service.triggers();
    Json(json!({ "count": triggers.len(), "triggers": triggers }))
}

/// Runs the trigger to completion before answering.
async fn fire_trigger(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    match state.service.trigger_now(&name).await {
        Ok(()) => Ok(Json(json!({ "status": "fired", "trigger": name }))),
        Err(e) => {
            warn!(trigger = %name, kind = e.kind(), error = %e, "Manual fire failed");
            Err(status_for(&e))
        }
    }
}

async fn preview(
    State(state): State<Arc<AppState>>,
    Path(id): Path<SubscriberId>,
) -> Result<Json<Value>, StatusCode> {
    match state.service.get_delivery_preview(id).await {
        Ok(preview) => Ok(Json(json!(preview))),
        Err(e) => {
            let status = status_for(&e);
            if status == StatusCode::INTERNAL_SERVER_ERROR {
                error!(subscriber_id = id, error = %e, "Preview failed");
            }
            Err(status)
        }
    }
}
