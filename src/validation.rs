use serde::{Deserialize, Serialize};

/// Route fields as submitted by a carrier, before any persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteInput {
    pub start_station: String,
    pub end_station: String,
    /// `HH:MM`, 24h.
    pub departure_time: String,
    /// 0 = Sunday .. 6 = Saturday.
    pub days_of_week: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteValidation {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

/// Pure, synchronous route validation. Violations accumulate so a form
/// can surface every problem at once.
pub fn validate_route(input: &RouteInput) -> RouteValidation {
    let mut errors = Vec::new();

    if input.start_station == input.end_station {
        errors.push("start and end station are identical".to_string());
    }

    if input.days_of_week.is_empty() {
        errors.push("select at least one day".to_string());
    } else if input.days_of_week.iter().any(|d| *d > 6) {
        errors.push("days of week must be between 0 and 6".to_string());
    }

    if !valid_departure_time(&input.departure_time) {
        errors.push("invalid time format".to_string());
    }

    RouteValidation {
        is_valid: errors.is_empty(),
        errors,
    }
}

fn valid_departure_time(raw: &str) -> bool {
    let Some((hh, mm)) = raw.split_once(':') else {
        return false;
    };
    if hh.len() != 2 || mm.len() != 2 {
        return false;
    }
    // u8::parse accepts a leading `+`; only bare digits are a time.
    if !hh.bytes().all(|b| b.is_ascii_digit()) || !mm.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    let (Ok(hour), Ok(minute)) = (hh.parse::<u8>(), mm.parse::<u8>()) else {
        return false;
    };
    hour <= 23 && minute <= 59
}
