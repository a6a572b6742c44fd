use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use super::AppState;
use crate::estimator::EstimateError;
use crate::models::*;

// ============================================================
// Error Handling
// ============================================================

/// Map a pipeline error to a response.
///
/// User-correctable errors (unknown client, bad ticket fields) are returned
/// as-is with BAD_REQUEST. Anything else is logged server-side and the client
/// only sees a generic message.
fn estimate_error(e: EstimateError) -> (StatusCode, String) {
    if e.is_user_error() {
        tracing::warn!("Validation error: {}", e);
        return (StatusCode::BAD_REQUEST, e.to_string());
    }

    tracing::error!("Internal error: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

fn input_error(e: InputError) -> (StatusCode, String) {
    estimate_error(e.into())
}

fn session_not_found() -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, "Session not found".to_string())
}

// ============================================================
// Health
// ============================================================

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "sessions": state.sessions.len(),
    }))
}

// ============================================================
// Catalogues
// ============================================================

pub async fn list_clients(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.estimator.known_clients())
}

pub async fn list_line_items(State(state): State<AppState>) -> Json<Vec<LineItem>> {
    Json(state.estimator.known_line_item_categories())
}

// ============================================================
// Sessions
// ============================================================

pub async fn create_session(
    State(state): State<AppState>,
    Json(input): Json<CreateSessionInput>,
) -> Result<(StatusCode, Json<ProjectSession>), (StatusCode, String)> {
    if let Some(client) = &input.client {
        state
            .estimator
            .validate_client(client)
            .map_err(estimate_error)?;
    }

    Ok((StatusCode::CREATED, Json(state.sessions.create(input))))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProjectSession>, (StatusCode, String)> {
    state.sessions.get(id).map(Json).ok_or_else(session_not_found)
}

pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    if state.sessions.delete(id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(session_not_found())
    }
}

pub async fn set_session_client(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<SetClientInput>,
) -> Result<Json<ProjectSession>, (StatusCode, String)> {
    // Session lookup first so a bad id is a 404 regardless of the client.
    state.sessions.get(id).ok_or_else(session_not_found)?;

    state
        .estimator
        .validate_client(&input.client)
        .map_err(estimate_error)?;

    state
        .sessions
        .set_client(id, input.client)
        .map(Json)
        .ok_or_else(session_not_found)
}

pub async fn reset_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProjectSession>, (StatusCode, String)> {
    state.sessions.reset(id).map(Json).ok_or_else(session_not_found)
}

// ============================================================
// Tickets
// ============================================================

pub async fn add_ticket(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<TicketInput>,
) -> Result<(StatusCode, Json<Ticket>), (StatusCode, String)> {
    state.sessions.get(id).ok_or_else(session_not_found)?;

    let record = state.estimator.parse_ticket(&input).map_err(input_error)?;

    state
        .sessions
        .add_ticket(id, record)
        .map(|t| (StatusCode::CREATED, Json(t)))
        .ok_or_else(session_not_found)
}

pub async fn list_tickets(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Ticket>>, (StatusCode, String)> {
    state
        .sessions
        .list_tickets(id)
        .map(Json)
        .ok_or_else(session_not_found)
}

// ============================================================
// Predictions
// ============================================================

pub async fn get_prediction(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PredictionReport>, (StatusCode, String)> {
    let session = state.sessions.get(id).ok_or_else(session_not_found)?;

    state
        .estimator
        .compute_prediction(&session)
        .map(Json)
        .map_err(estimate_error)
}

/// Predict a whole project sent in the request body without storing it.
pub async fn predict(
    State(state): State<AppState>,
    Json(input): Json<PredictInput>,
) -> Result<Json<PredictionReport>, (StatusCode, String)> {
    state
        .estimator
        .predict_input(&input)
        .map(Json)
        .map_err(estimate_error)
}
