use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum Urgency {
    Normal,
    Express,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum PackageClass {
    Small,
    Medium,
    Large,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum RequestStatus {
    Pending,
    Matching,
    Matched,
    InTransit,
    Completed,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryRequest {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub pickup_station: String,
    pub dropoff_station: String,
    pub package_class: PackageClass,
    pub urgency: Urgency,
    pub status: RequestStatus,
    pub fee_won: i64,
    /// Re-matching attempts consumed after the first offer, 0..=max_retries.
    pub retry_count: u32,
    pub carrier_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}
