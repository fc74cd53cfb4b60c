use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum Coverage {
    Direct,
    Partial,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub coverage: Coverage,
    pub detour_minutes: u32,
    pub base_score: f64,
    pub rating_factor: f64,
    pub experience_bonus: f64,
    pub recency_bonus: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum MatchStatus {
    Pending,
    Accepted,
    Rejected,
    Expired,
}

/// One offer of a request to one carrier. A request accumulates a match
/// record per attempt; the orchestrator keeps at most one `Pending` at a
/// time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub id: Uuid,
    pub request_id: Uuid,
    pub carrier_id: Uuid,
    /// Attempt number, 0 for the first offer.
    pub attempt: u32,
    pub score: u8,
    pub breakdown: ScoreBreakdown,
    pub status: MatchStatus,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum MatchEventKind {
    Offered,
    Accepted,
    Rejected,
    Expired,
    RequestMatched,
    RequestFailed,
    RequestCancelled,
    RequestCompleted,
}

/// Notification hook payload: fire-and-forget, consumed by an external
/// push sender (here, WebSocket subscribers).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchEvent {
    pub kind: MatchEventKind,
    pub request_id: Uuid,
    pub requester_id: Uuid,
    pub carrier_id: Option<Uuid>,
    pub match_id: Option<Uuid>,
    pub at: DateTime<Utc>,
}
