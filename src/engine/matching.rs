use std::sync::Arc;
use std::time::Instant;

use chrono::{Datelike, Utc};
use tokio::sync::mpsc;
use tokio::time::{Duration, sleep};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::engine::scoring::compute_score;
use crate::error::AppError;
use crate::models::carrier::{Candidate, CarrierStatus};
use crate::models::matching::{Match, MatchEvent, MatchEventKind, MatchStatus, ScoreBreakdown};
use crate::models::request::{DeliveryRequest, RequestStatus};
use crate::state::AppState;

#[derive(Debug, PartialEq)]
pub enum AttemptOutcome {
    /// An offer was placed and its acceptance window is running.
    Offered,
    /// Nobody scored above zero; the window still runs before the retry.
    NoCandidates,
    /// The request is resolved or already has an in-flight offer.
    Skipped,
}

/// Engine loop: consumes freshly created requests and runs their first
/// matching attempt. Later attempts are driven by timers and carrier
/// decisions, not by this queue.
pub async fn run_match_engine(state: Arc<AppState>, mut request_rx: mpsc::Receiver<Uuid>) {
    info!("matching engine started");

    while let Some(request_id) = request_rx.recv().await {
        state.metrics.requests_in_queue.dec();

        let start = Instant::now();
        match run_attempt(state.clone(), request_id).await {
            Ok(outcome) => {
                let label = match outcome {
                    AttemptOutcome::Offered => "offered",
                    AttemptOutcome::NoCandidates => "no_candidates",
                    AttemptOutcome::Skipped => "skipped",
                };
                state
                    .metrics
                    .matching_latency_seconds
                    .with_label_values(&[label])
                    .observe(start.elapsed().as_secs_f64());
            }
            Err(err) => {
                state
                    .metrics
                    .matching_latency_seconds
                    .with_label_values(&["error"])
                    .observe(start.elapsed().as_secs_f64());
                error!(request_id = %request_id, error = %err, "matching attempt failed");
            }
        }
    }

    warn!("matching engine stopped: request channel closed");
}

/// One matching attempt: score the eligible carriers, offer to the best
/// untried one, start the acceptance window.
pub async fn run_attempt(
    state: Arc<AppState>,
    request_id: Uuid,
) -> Result<AttemptOutcome, AppError> {
    let request = {
        let Some(mut stored) = state.requests.get_mut(&request_id) else {
            return Err(AppError::NotFound(format!("request {request_id} not found")));
        };
        match stored.status {
            RequestStatus::Pending => {
                stored.status = RequestStatus::Matching;
                stored.updated_at = Utc::now();
            }
            RequestStatus::Matching => {}
            _ => return Ok(AttemptOutcome::Skipped),
        }
        stored.clone()
    };

    // One in-flight offer per request.
    if state.pending_match_for(request_id).is_some() {
        return Ok(AttemptOutcome::Skipped);
    }

    let match_day = Utc::now().weekday().num_days_from_sunday() as u8;
    let detour_cap = state.policy.detour_cap(request.retry_count);
    let tried = state.tried_carriers(request_id);

    let candidates: Vec<Candidate> = state
        .carriers
        .iter()
        .filter(|entry| entry.status == CarrierStatus::Active && !tried.contains(&entry.id))
        .map(|entry| {
            let carrier = entry.value().clone();
            let routes = state
                .routes
                .iter()
                .filter(|route| route.carrier_id == carrier.id && route.active)
                .map(|route| route.value().clone())
                .collect();
            Candidate { carrier, routes }
        })
        .collect();

    let mut scored: Vec<(Candidate, u8, ScoreBreakdown)> = candidates
        .into_iter()
        .map(|candidate| {
            let (score, breakdown) = compute_score(
                &request,
                &candidate,
                match_day,
                detour_cap,
                &state.policy,
                &state.catalog,
            );
            (candidate, score, breakdown)
        })
        .filter(|(_, score, _)| *score > 0)
        .collect();

    scored.sort_by(|a, b| {
        b.1.cmp(&a.1)
            .then_with(|| b.0.carrier.rating.total_cmp(&a.0.carrier.rating))
            .then_with(|| a.0.carrier.recent_penalties.cmp(&b.0.carrier.recent_penalties))
            .then_with(|| a.0.carrier.id.cmp(&b.0.carrier.id))
    });

    let Some((best, score, breakdown)) = scored.into_iter().next() else {
        info!(
            request_id = %request_id,
            attempt = request.retry_count,
            detour_cap,
            "no scoring candidates; waiting out the window before retrying"
        );
        schedule_window(&state, request_id, None);
        return Ok(AttemptOutcome::NoCandidates);
    };

    let offer = Match {
        id: Uuid::new_v4(),
        request_id,
        carrier_id: best.carrier.id,
        attempt: request.retry_count,
        score,
        breakdown,
        status: MatchStatus::Pending,
        created_at: Utc::now(),
        decided_at: None,
    };
    state.matches.insert(offer.id, offer.clone());
    state
        .metrics
        .matches_total
        .with_label_values(&["offered"])
        .inc();
    state.emit(event(
        MatchEventKind::Offered,
        &request,
        Some(best.carrier.id),
        Some(offer.id),
    ));

    info!(
        request_id = %request_id,
        carrier_id = %best.carrier.id,
        score,
        attempt = request.retry_count,
        "match offered"
    );

    schedule_window(&state, request_id, Some(offer.id));
    Ok(AttemptOutcome::Offered)
}

/// Carrier accepted the offer. Duplicate accepts are no-ops; accepting an
/// offer resolved the other way is a business-rule conflict. The offer and
/// its request commit together under the request lock, so a concurrent
/// cancellation can never leave an accepted match on a resolved request.
pub async fn accept_match(state: &Arc<AppState>, match_id: Uuid) -> Result<Match, AppError> {
    let request_id = state
        .matches
        .get(&match_id)
        .map(|offer| offer.request_id)
        .ok_or_else(|| AppError::NotFound(format!("match {match_id} not found")))?;

    let (updated, request) = {
        let Some(mut request) = state.requests.get_mut(&request_id) else {
            return Err(AppError::Internal(format!(
                "request {request_id} missing for match {match_id}"
            )));
        };
        let Some(mut offer) = state.matches.get_mut(&match_id) else {
            return Err(AppError::NotFound(format!("match {match_id} not found")));
        };

        match offer.status {
            MatchStatus::Accepted => return Ok(offer.clone()),
            MatchStatus::Rejected | MatchStatus::Expired => {
                return Err(AppError::Conflict("match already resolved".to_string()));
            }
            MatchStatus::Pending => {}
        }

        // A request cancelled or failed mid-flight voids its pending offer.
        match request.status {
            RequestStatus::Pending | RequestStatus::Matching => {}
            _ => {
                offer.status = MatchStatus::Expired;
                offer.decided_at = Some(Utc::now());
                return Err(AppError::Conflict("request already resolved".to_string()));
            }
        }

        offer.status = MatchStatus::Accepted;
        offer.decided_at = Some(Utc::now());
        request.status = RequestStatus::Matched;
        request.carrier_id = Some(offer.carrier_id);
        request.updated_at = Utc::now();
        (offer.clone(), request.clone())
    };

    state.clear_timer(request_id);

    state
        .metrics
        .matches_total
        .with_label_values(&["accepted"])
        .inc();
    state.emit(event(
        MatchEventKind::Accepted,
        &request,
        Some(updated.carrier_id),
        Some(match_id),
    ));
    state.emit(event(
        MatchEventKind::RequestMatched,
        &request,
        Some(updated.carrier_id),
        Some(match_id),
    ));

    info!(
        request_id = %updated.request_id,
        carrier_id = %updated.carrier_id,
        "match accepted"
    );
    Ok(updated)
}

/// Carrier declined the offer: resolve it, penalize, and move on to the
/// next-ranked candidate (or fail once retries are exhausted).
pub async fn reject_match(state: &Arc<AppState>, match_id: Uuid) -> Result<Match, AppError> {
    let updated = {
        let Some(mut offer) = state.matches.get_mut(&match_id) else {
            return Err(AppError::NotFound(format!("match {match_id} not found")));
        };
        match offer.status {
            MatchStatus::Rejected => return Ok(offer.clone()),
            MatchStatus::Pending => {
                offer.status = MatchStatus::Rejected;
                offer.decided_at = Some(Utc::now());
                offer.clone()
            }
            MatchStatus::Accepted | MatchStatus::Expired => {
                return Err(AppError::Conflict("match already resolved".to_string()));
            }
        }
    };

    state.clear_timer(updated.request_id);
    penalize_carrier(state, updated.carrier_id);
    state
        .metrics
        .matches_total
        .with_label_values(&["rejected"])
        .inc();

    if let Some(request) = state
        .requests
        .get(&updated.request_id)
        .map(|r| r.value().clone())
    {
        state.emit(event(
            MatchEventKind::Rejected,
            &request,
            Some(updated.carrier_id),
            Some(match_id),
        ));
    }

    info!(
        request_id = %updated.request_id,
        carrier_id = %updated.carrier_id,
        "match rejected"
    );

    retry_or_fail(state.clone(), updated.request_id).await;
    Ok(updated)
}

/// Requester cancellation, valid any time before the request is matched.
pub async fn cancel_request(
    state: &Arc<AppState>,
    request_id: Uuid,
) -> Result<DeliveryRequest, AppError> {
    let updated = {
        let Some(mut request) = state.requests.get_mut(&request_id) else {
            return Err(AppError::NotFound(format!("request {request_id} not found")));
        };
        match request.status {
            RequestStatus::Cancelled => return Ok(request.clone()),
            RequestStatus::Pending | RequestStatus::Matching => {
                request.status = RequestStatus::Cancelled;
                request.updated_at = Utc::now();
                request.clone()
            }
            _ => {
                return Err(AppError::Conflict(
                    "request already matched or resolved".to_string(),
                ));
            }
        }
    };

    state.clear_timer(request_id);

    if let Some(pending) = state.pending_match_for(request_id) {
        if let Some(mut offer) = state.matches.get_mut(&pending.id) {
            offer.status = MatchStatus::Expired;
            offer.decided_at = Some(Utc::now());
        }
        state
            .metrics
            .matches_total
            .with_label_values(&["expired"])
            .inc();
    }

    state.emit(event(MatchEventKind::RequestCancelled, &updated, None, None));
    info!(request_id = %request_id, "request cancelled");
    Ok(updated)
}

/// Post-acceptance delivery lifecycle: matched -> in_transit -> completed.
/// Completion stamps the request and credits the carrier's history.
pub fn advance_delivery(
    state: &AppState,
    request_id: Uuid,
    next: RequestStatus,
) -> Result<DeliveryRequest, AppError> {
    let updated = {
        let Some(mut request) = state.requests.get_mut(&request_id) else {
            return Err(AppError::NotFound(format!("request {request_id} not found")));
        };
        match (request.status, next) {
            (current, wanted) if current == wanted => return Ok(request.clone()),
            (RequestStatus::Matched, RequestStatus::InTransit) => {
                request.status = RequestStatus::InTransit;
            }
            (RequestStatus::InTransit, RequestStatus::Completed) => {
                request.status = RequestStatus::Completed;
                request.completed_at = Some(Utc::now());
            }
            (current, wanted) => {
                return Err(AppError::Conflict(format!(
                    "cannot move request from {current:?} to {wanted:?}"
                )));
            }
        }
        request.updated_at = Utc::now();
        request.clone()
    };

    if updated.status == RequestStatus::Completed {
        if let Some(carrier_id) = updated.carrier_id {
            if let Some(mut carrier) = state.carriers.get_mut(&carrier_id) {
                carrier.total_deliveries += 1;
                carrier.recent_deliveries += 1;
                carrier.updated_at = Utc::now();
            }
        }
        state.emit(event(
            MatchEventKind::RequestCompleted,
            &updated,
            updated.carrier_id,
            None,
        ));
    }

    Ok(updated)
}

/// Start (or restart) the acceptance window for the current attempt. The
/// previous timer, if any, is aborted first.
fn schedule_window(state: &Arc<AppState>, request_id: Uuid, match_id: Option<Uuid>) {
    state.clear_timer(request_id);

    let window = Duration::from_millis(state.policy.acceptance_window_ms);
    let task_state = Arc::clone(state);
    let handle = tokio::spawn(async move {
        sleep(window).await;
        expire_attempt(task_state, request_id, match_id).await;
    });
    state.timers.insert(request_id, handle.abort_handle());
}

/// Window elapsed with no carrier decision. Expiry is a normal transition:
/// resolve the offer, then retry or fail.
async fn expire_attempt(state: Arc<AppState>, request_id: Uuid, match_id: Option<Uuid>) {
    state.timers.remove(&request_id);

    if let Some(match_id) = match_id {
        let expired = {
            let Some(mut offer) = state.matches.get_mut(&match_id) else {
                return;
            };
            if offer.status != MatchStatus::Pending {
                return;
            }
            offer.status = MatchStatus::Expired;
            offer.decided_at = Some(Utc::now());
            offer.clone()
        };

        penalize_carrier(&state, expired.carrier_id);
        state
            .metrics
            .matches_total
            .with_label_values(&["expired"])
            .inc();

        if let Some(request) = state.requests.get(&request_id).map(|r| r.value().clone()) {
            state.emit(event(
                MatchEventKind::Expired,
                &request,
                Some(expired.carrier_id),
                Some(match_id),
            ));
        }

        info!(request_id = %request_id, match_id = %match_id, "offer expired");
    }

    retry_or_fail(state, request_id).await;
}

async fn retry_or_fail(state: Arc<AppState>, request_id: Uuid) {
    let next_retry = {
        let Some(mut request) = state.requests.get_mut(&request_id) else {
            return;
        };
        if request.status != RequestStatus::Matching {
            return;
        }
        if request.retry_count < state.policy.max_retries {
            request.retry_count += 1;
            request.updated_at = Utc::now();
            Some(request.retry_count)
        } else {
            request.status = RequestStatus::Failed;
            request.updated_at = Utc::now();
            None
        }
    };

    match next_retry {
        Some(retry) => {
            info!(request_id = %request_id, retry, "retrying with widened criteria");
            let task_state = Arc::clone(&state);
            tokio::spawn(async move {
                if let Err(err) = run_attempt(task_state, request_id).await {
                    error!(request_id = %request_id, error = %err, "retry attempt failed");
                }
            });
        }
        None => {
            state.clear_timer(request_id);
            state
                .metrics
                .matches_total
                .with_label_values(&["failed"])
                .inc();
            if let Some(request) = state.requests.get(&request_id).map(|r| r.value().clone()) {
                state.emit(event(MatchEventKind::RequestFailed, &request, None, None));
            }
            warn!(request_id = %request_id, "matching exhausted; request failed");
        }
    }
}

fn penalize_carrier(state: &AppState, carrier_id: Uuid) {
    if let Some(mut carrier) = state.carriers.get_mut(&carrier_id) {
        carrier.recent_penalties += 1;
        carrier.updated_at = Utc::now();
    }
}

fn event(
    kind: MatchEventKind,
    request: &DeliveryRequest,
    carrier_id: Option<Uuid>,
    match_id: Option<Uuid>,
) -> MatchEvent {
    MatchEvent {
        kind,
        request_id: request.id,
        requester_id: request.requester_id,
        carrier_id,
        match_id,
        at: Utc::now(),
    }
}
