use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::matching::{advance_delivery, cancel_request};
use crate::engine::queue::enqueue_request;
use crate::error::AppError;
use crate::models::request::{DeliveryRequest, PackageClass, RequestStatus, Urgency};
use crate::pricing::delivery_fee;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/requests", post(create_request))
        .route("/requests/:id", get(get_request))
        .route("/requests/:id/cancel", post(cancel))
        .route("/requests/:id/status", patch(update_status))
}

#[derive(Deserialize)]
pub struct CreateRequestRequest {
    pub requester_id: Uuid,
    pub pickup_station: String,
    pub dropoff_station: String,
    pub package_class: PackageClass,
    pub urgency: Urgency,
}

async fn create_request(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateRequestRequest>,
) -> Result<Json<DeliveryRequest>, AppError> {
    if payload.pickup_station == payload.dropoff_station {
        return Err(AppError::BadRequest(
            "pickup and dropoff station are identical".to_string(),
        ));
    }
    for station in [&payload.pickup_station, &payload.dropoff_station] {
        if state.catalog.station(station).is_none() {
            return Err(AppError::BadRequest(format!("unknown station: {station}")));
        }
    }

    let fee_won = delivery_fee(
        &state.catalog,
        &payload.pickup_station,
        &payload.dropoff_station,
        payload.package_class,
        payload.urgency,
    )
    .ok_or_else(|| {
        AppError::BadRequest("no travel data between these stations".to_string())
    })?;

    let request = DeliveryRequest {
        id: Uuid::new_v4(),
        requester_id: payload.requester_id,
        pickup_station: payload.pickup_station,
        dropoff_station: payload.dropoff_station,
        package_class: payload.package_class,
        urgency: payload.urgency,
        status: RequestStatus::Pending,
        fee_won,
        retry_count: 0,
        carrier_id: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
        completed_at: None,
    };

    state.requests.insert(request.id, request.clone());
    enqueue_request(&state, request.id).await?;

    Ok(Json(request))
}

async fn get_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeliveryRequest>, AppError> {
    let request = state
        .requests
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("request {id} not found")))?;

    Ok(Json(request.value().clone()))
}

async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeliveryRequest>, AppError> {
    let request = cancel_request(&state, id).await?;
    Ok(Json(request))
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: RequestStatus,
}

/// Post-acceptance lifecycle only; matching transitions belong to the
/// orchestrator.
async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<DeliveryRequest>, AppError> {
    match payload.status {
        RequestStatus::InTransit | RequestStatus::Completed => {}
        other => {
            return Err(AppError::BadRequest(format!(
                "status {other:?} cannot be set directly"
            )));
        }
    }

    let request = advance_delivery(&state, id, payload.status)?;
    Ok(Json(request))
}
