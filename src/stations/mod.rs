use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::AppError;
use crate::models::station::{Station, TravelTime};

/// Read-only subway reference data: stations, directed travel times, and
/// ordered per-line station sequences. Loaded once at startup and shared
/// across concurrent matching runs; invalidation means loading a new
/// catalog and swapping the `Arc`.
pub struct StationCatalog {
    stations: HashMap<String, Station>,
    travel: HashMap<(String, String), TravelTime>,
    line_paths: HashMap<String, Vec<String>>,
}

#[derive(Deserialize)]
struct CatalogFile {
    stations: Vec<Station>,
    travel_times: Vec<TravelTime>,
    #[serde(default)]
    line_paths: HashMap<String, Vec<String>>,
}

impl StationCatalog {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path.as_ref()).map_err(|err| {
            AppError::Internal(format!(
                "failed to read station data {}: {err}",
                path.as_ref().display()
            ))
        })?;
        let file: CatalogFile = serde_json::from_str(&raw)
            .map_err(|err| AppError::Internal(format!("invalid station data: {err}")))?;

        Ok(Self::from_parts(
            file.stations,
            file.travel_times,
            file.line_paths,
        ))
    }

    pub fn from_parts(
        stations: Vec<Station>,
        travel_times: Vec<TravelTime>,
        line_paths: HashMap<String, Vec<String>>,
    ) -> Self {
        let stations = stations
            .into_iter()
            .map(|s| (s.id.clone(), s))
            .collect::<HashMap<_, _>>();
        let travel = travel_times
            .into_iter()
            .map(|t| ((t.from.clone(), t.to.clone()), t))
            .collect::<HashMap<_, _>>();

        Self {
            stations,
            travel,
            line_paths,
        }
    }

    pub fn station(&self, id: &str) -> Option<&Station> {
        self.stations.get(id)
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn travel(&self, from: &str, to: &str) -> Option<&TravelTime> {
        self.travel.get(&(from.to_string(), to.to_string()))
    }

    /// Directed travel minutes. A zero-length leg is 0 minutes; unknown
    /// geography is `None`, never a guess.
    pub fn travel_minutes(&self, from: &str, to: &str) -> Option<u32> {
        if from == to {
            return Some(0);
        }
        self.travel(from, to).map(|t| t.minutes)
    }

    /// Whether pickup and dropoff both lie on some line path between
    /// `start` and `end`, in traversal order consistent with the
    /// start-to-end direction. A segment that is exactly the route's own
    /// endpoints always qualifies.
    pub fn segment_in_order(&self, start: &str, end: &str, pickup: &str, dropoff: &str) -> bool {
        if pickup == start && dropoff == end {
            return true;
        }

        self.line_paths.values().any(|path| {
            let idx = |id: &str| path.iter().position(|s| s == id);
            let (Some(si), Some(ei), Some(pi), Some(di)) =
                (idx(start), idx(end), idx(pickup), idx(dropoff))
            else {
                return false;
            };

            if si < ei {
                si <= pi && pi < di && di <= ei
            } else if si > ei {
                si >= pi && pi > di && di >= ei
            } else {
                false
            }
        })
    }
}
