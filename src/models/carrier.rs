use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::route::Route;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum CarrierStatus {
    Active,
    Inactive,
}

/// Settlement tier, derived from lifetime delivery volume.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum CarrierTier {
    Bronze,
    Silver,
    Gold,
}

impl CarrierTier {
    pub fn bonus_rate(self) -> f64 {
        match self {
            CarrierTier::Bronze => 0.05,
            CarrierTier::Silver => 0.10,
            CarrierTier::Gold => 0.15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Carrier {
    pub id: Uuid,
    pub name: String,
    pub status: CarrierStatus,
    /// Average rating, 1.0..=5.0.
    pub rating: f64,
    pub total_deliveries: u32,
    /// Deliveries completed in the last 30 days.
    pub recent_deliveries: u32,
    /// Rejections and ignored offers in the last 30 days.
    pub recent_penalties: u32,
    pub bank_account: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Carrier {
    pub fn tier(&self) -> CarrierTier {
        match self.total_deliveries {
            0..50 => CarrierTier::Bronze,
            50..200 => CarrierTier::Silver,
            _ => CarrierTier::Gold,
        }
    }
}

/// Read model handed to the scoring engine: one carrier plus the active
/// routes it declared. Built fresh per matching attempt, never persisted.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub carrier: Carrier,
    pub routes: Vec<Route>,
}
