use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use uuid::Uuid;

use crate::engine::matching::{accept_match, reject_match};
use crate::error::AppError;
use crate::models::matching::Match;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/matches", get(list_matches))
        .route("/matches/:id/accept", post(accept))
        .route("/matches/:id/reject", post(reject))
}

async fn list_matches(State(state): State<Arc<AppState>>) -> Json<Vec<Match>> {
    let matches = state
        .matches
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    Json(matches)
}

async fn accept(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Match>, AppError> {
    let updated = accept_match(&state, id).await?;
    Ok(Json(updated))
}

async fn reject(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Match>, AppError> {
    let updated = reject_match(&state, id).await?;
    Ok(Json(updated))
}
