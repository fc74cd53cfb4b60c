use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

pub async fn enqueue_request(state: &AppState, request_id: Uuid) -> Result<(), AppError> {
    state
        .request_tx
        .send(request_id)
        .await
        .map_err(|err| AppError::Internal(format!("request queue send failed: {err}")))?;

    state.metrics.requests_in_queue.inc();
    Ok(())
}
