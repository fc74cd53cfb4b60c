use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A carrier's recurring commute. Weekdays use 0 = Sunday .. 6 = Saturday.
/// Soft-deactivated (`active = false`) rather than deleted once referenced
/// by delivery history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub id: Uuid,
    pub carrier_id: Uuid,
    pub start_station: String,
    pub end_station: String,
    /// Departure time of day, `HH:MM` 24h.
    pub departure_time: String,
    pub days_of_week: Vec<u8>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Route {
    pub fn runs_on(&self, day: u8) -> bool {
        self.active && self.days_of_week.contains(&day)
    }
}
