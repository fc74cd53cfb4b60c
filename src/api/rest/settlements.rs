use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::routing::{get, post};
use serde::Deserialize;

use crate::error::AppError;
use crate::models::settlement::Settlement;
use crate::settlement::{PeriodRunResult, run_invoices, run_period};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/settlements/run", post(run_settlements))
        .route("/settlements", get(list_settlements))
        .route("/invoices/run", post(run_invoice_batch))
}

/// Period selector as passed by the external scheduler.
#[derive(Deserialize)]
pub struct RunPeriodRequest {
    pub year: i32,
    pub month: u32,
}

async fn run_settlements(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RunPeriodRequest>,
) -> Result<Json<PeriodRunResult>, AppError> {
    let result = run_period(&state, payload.year, payload.month)?;
    Ok(Json(result))
}

async fn list_settlements(State(state): State<Arc<AppState>>) -> Json<Vec<Settlement>> {
    let settlements = state
        .settlements
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    Json(settlements)
}

async fn run_invoice_batch(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RunPeriodRequest>,
) -> Result<Json<PeriodRunResult>, AppError> {
    let result = run_invoices(&state, payload.year, payload.month)?;
    Ok(Json(result))
}
