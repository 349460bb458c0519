//! REST endpoints driving conversations.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tracing::{debug, warn};
use uuid::Uuid;

use super::registry::SessionRegistry;
use crate::error::FlowError;
use crate::flow::responses::{FormValues, ResponseValue};
use crate::flow::reveal::Conversation;
use crate::flow::validate::ValidationResult;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
}

/// Build the Axum router for the flow API.
pub fn flow_routes(registry: Arc<SessionRegistry>) -> Router {
    let state = AppState { registry };

    Router::new()
        .route("/health", get(health))
        .route("/api/flows", post(create_flow))
        .route("/api/flows/{id}", get(get_flow).delete(delete_flow))
        .route("/api/flows/{id}/choose", post(choose))
        .route("/api/flows/{id}/fields/{name}", put(update_field))
        .route("/api/flows/{id}/form", post(submit_form))
        .route("/api/flows/{id}/restart", post(restart_flow))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({"error": message.into()}))).into_response()
}

fn flow_error(err: FlowError) -> Response {
    let status = match &err {
        FlowError::InvalidOperation { .. } => StatusCode::CONFLICT,
        FlowError::UnknownOption { .. }
        | FlowError::EmptySelection(_)
        | FlowError::UnknownField { .. } => StatusCode::UNPROCESSABLE_ENTITY,
    };
    debug!(status = status.as_u16(), error = %err, "Flow input rejected");
    error_response(status, err.to_string())
}

async fn lookup(state: &AppState, id: &str) -> Result<Arc<Conversation>, Response> {
    let flow_id = Uuid::parse_str(id)
        .map_err(|_| error_response(StatusCode::BAD_REQUEST, "Invalid flow ID"))?;
    state
        .registry
        .get(flow_id)
        .await
        .ok_or_else(|| error_response(StatusCode::NOT_FOUND, "Flow not found"))
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "qualify-chat",
        "flow": state.registry.catalog().name(),
    }))
}

// ── Conversations ───────────────────────────────────────────────────────

async fn create_flow(State(state): State<AppState>) -> Response {
    let (id, snapshot) = state.registry.create().await;
    (
        StatusCode::CREATED,
        Json(json!({"id": id, "snapshot": snapshot})),
    )
        .into_response()
}

async fn get_flow(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match lookup(&state, &id).await {
        Ok(conversation) => Json(conversation.snapshot().await).into_response(),
        Err(response) => response,
    }
}

async fn delete_flow(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let Ok(flow_id) = Uuid::parse_str(&id) else {
        return error_response(StatusCode::BAD_REQUEST, "Invalid flow ID");
    };
    if state.registry.remove(flow_id).await {
        Json(json!({"status": "closed"})).into_response()
    } else {
        error_response(StatusCode::NOT_FOUND, "Flow not found")
    }
}

async fn restart_flow(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match lookup(&state, &id).await {
        Ok(conversation) => Json(conversation.restart().await).into_response(),
        Err(response) => response,
    }
}

// ── Inputs ──────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ChooseRequest {
    value: Option<String>,
    values: Option<Vec<String>>,
}

async fn choose(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ChooseRequest>,
) -> Response {
    let conversation = match lookup(&state, &id).await {
        Ok(c) => c,
        Err(response) => return response,
    };

    let result = match (body.values, body.value) {
        (Some(values), _) => conversation.choose_many(&values).await,
        (None, Some(value)) => conversation.choose(&value).await,
        (None, None) => {
            return error_response(
                StatusCode::UNPROCESSABLE_ENTITY,
                "Expected \"value\" or \"values\"",
            );
        }
    };

    match result {
        Ok(_) => Json(conversation.snapshot().await).into_response(),
        Err(e) => flow_error(e),
    }
}

#[derive(Deserialize)]
struct FieldRequest {
    value: ResponseValue,
}

async fn update_field(
    State(state): State<AppState>,
    Path((id, name)): Path<(String, String)>,
    Json(body): Json<FieldRequest>,
) -> Response {
    let conversation = match lookup(&state, &id).await {
        Ok(c) => c,
        Err(response) => return response,
    };

    match conversation.update_field(&name, body.value).await {
        Ok(()) => Json(conversation.snapshot().await).into_response(),
        Err(e) => flow_error(e),
    }
}

#[derive(Deserialize)]
struct FormRequest {
    #[serde(default)]
    values: FormValues,
}

async fn submit_form(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<FormRequest>,
) -> Response {
    let conversation = match lookup(&state, &id).await {
        Ok(c) => c,
        Err(response) => return response,
    };

    match conversation.submit_form(body.values).await {
        Ok(ValidationResult::Valid) => Json(conversation.snapshot().await).into_response(),
        Ok(ValidationResult::Invalid(issue)) => {
            warn!(flow_id = %id, field = %issue.field, "Form submission invalid");
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({
                    "error": issue.message(),
                    "issue": issue,
                    "snapshot": conversation.snapshot().await,
                })),
            )
                .into_response()
        }
        Err(e) => flow_error(e),
    }
}
