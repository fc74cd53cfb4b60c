use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::routing::{patch, post};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::carrier::{Carrier, CarrierStatus};
use crate::models::route::Route;
use crate::state::AppState;
use crate::validation::{RouteInput, validate_route};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/carriers", post(create_carrier).get(list_carriers))
        .route("/carriers/:id/routes", post(create_route))
        .route("/routes/:id", patch(update_route).delete(deactivate_route))
}

#[derive(Deserialize)]
pub struct CreateCarrierRequest {
    pub name: String,
    pub rating: f64,
    #[serde(default)]
    pub bank_account: Option<String>,
}

async fn create_carrier(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateCarrierRequest>,
) -> Result<Json<Carrier>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }

    let carrier = Carrier {
        id: Uuid::new_v4(),
        name: payload.name,
        status: CarrierStatus::Active,
        rating: payload.rating.clamp(1.0, 5.0),
        total_deliveries: 0,
        recent_deliveries: 0,
        recent_penalties: 0,
        bank_account: payload.bank_account,
        updated_at: Utc::now(),
    };

    state.carriers.insert(carrier.id, carrier.clone());
    Ok(Json(carrier))
}

async fn list_carriers(State(state): State<Arc<AppState>>) -> Json<Vec<Carrier>> {
    let carriers = state
        .carriers
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    Json(carriers)
}

async fn create_route(
    State(state): State<Arc<AppState>>,
    Path(carrier_id): Path<Uuid>,
    Json(payload): Json<RouteInput>,
) -> Result<Json<Route>, AppError> {
    if !state.carriers.contains_key(&carrier_id) {
        return Err(AppError::NotFound(format!(
            "carrier {carrier_id} not found"
        )));
    }

    check_route_input(&state, &payload)?;

    let route = Route {
        id: Uuid::new_v4(),
        carrier_id,
        start_station: payload.start_station,
        end_station: payload.end_station,
        departure_time: payload.departure_time,
        days_of_week: payload.days_of_week,
        active: true,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };

    state.routes.insert(route.id, route.clone());
    Ok(Json(route))
}

async fn update_route(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RouteInput>,
) -> Result<Json<Route>, AppError> {
    check_route_input(&state, &payload)?;

    let mut route = state
        .routes
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("route {id} not found")))?;

    route.start_station = payload.start_station;
    route.end_station = payload.end_station;
    route.departure_time = payload.departure_time;
    route.days_of_week = payload.days_of_week;
    route.updated_at = Utc::now();

    Ok(Json(route.clone()))
}

/// Routes referenced by history are deactivated, never removed.
async fn deactivate_route(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Route>, AppError> {
    let mut route = state
        .routes
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("route {id} not found")))?;

    route.active = false;
    route.updated_at = Utc::now();

    Ok(Json(route.clone()))
}

/// Field validation plus station existence, accumulated into one error
/// list so the form can show everything at once.
fn check_route_input(state: &AppState, payload: &RouteInput) -> Result<(), AppError> {
    let mut validation = validate_route(payload);

    for station in [&payload.start_station, &payload.end_station] {
        if state.catalog.station(station).is_none() {
            validation.errors.push(format!("unknown station: {station}"));
        }
    }

    if validation.errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(validation.errors))
    }
}
