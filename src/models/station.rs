use serde::{Deserialize, Serialize};

/// Immutable subway reference data. Created by administrative data loaders,
/// never mutated by end users.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Station {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub name_en: Option<String>,
    pub lines: Vec<String>,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub is_transfer: bool,
}

/// Directed inter-station travel estimate. Symmetric pairs may differ when
/// an express service runs one way only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TravelTime {
    pub from: String,
    pub to: String,
    pub minutes: u32,
    pub distance_km: f64,
    #[serde(default)]
    pub express: bool,
    #[serde(default)]
    pub transfers: u32,
}
