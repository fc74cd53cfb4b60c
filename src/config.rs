use std::env;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub station_data_path: String,
    pub request_queue_size: usize,
    pub event_buffer_size: usize,
    pub policy: MatchPolicy,
}

/// Tunable matching constants. The exact coefficients are deployment
/// configuration; the scoring properties (gating, monotonicity, bounds)
/// must hold for any sane values.
#[derive(Debug, Clone)]
pub struct MatchPolicy {
    /// Acceptance window per offer, in milliseconds.
    pub acceptance_window_ms: u64,
    /// Re-matching attempts after the first offer.
    pub max_retries: u32,
    /// Detour cap for the first attempt, minutes.
    pub max_detour_minutes: u32,
    /// Added to the detour cap per retry (widened search).
    pub detour_widen_minutes: u32,
    /// Score points lost per detour minute.
    pub detour_penalty_per_minute: f64,
    /// Detour penalty multiplier for express requests.
    pub express_detour_multiplier: f64,
    /// Floor of the base score for any compatible route.
    pub min_base_score: f64,
    /// Ratings at or above this carry no penalty.
    pub rating_penalty_threshold: f64,
    /// Base-score multiplier lost per star below the threshold.
    pub rating_penalty_per_star: f64,
    /// Cap of the lifetime-deliveries bonus.
    pub experience_bonus_cap: f64,
    /// Cap of the 30-day-deliveries bonus.
    pub recency_bonus_cap: f64,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            acceptance_window_ms: 30_000,
            max_retries: 3,
            max_detour_minutes: 15,
            detour_widen_minutes: 10,
            detour_penalty_per_minute: 2.0,
            express_detour_multiplier: 2.0,
            min_base_score: 40.0,
            rating_penalty_threshold: 4.0,
            rating_penalty_per_star: 0.10,
            experience_bonus_cap: 8.0,
            recency_bonus_cap: 4.0,
        }
    }
}

impl MatchPolicy {
    /// Detour cap for a given attempt, widening on every retry.
    pub fn detour_cap(&self, retry: u32) -> u32 {
        self.max_detour_minutes + retry * self.detour_widen_minutes
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        let policy = MatchPolicy {
            acceptance_window_ms: parse_or_default("ACCEPTANCE_WINDOW_MS", 30_000)?,
            max_retries: parse_or_default("MAX_RETRIES", 3)?,
            max_detour_minutes: parse_or_default("MAX_DETOUR_MINUTES", 15)?,
            detour_widen_minutes: parse_or_default("DETOUR_WIDEN_MINUTES", 10)?,
            ..MatchPolicy::default()
        };

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            station_data_path: env::var("STATION_DATA_PATH")
                .unwrap_or_else(|_| "data/stations.json".to_string()),
            request_queue_size: parse_or_default("REQUEST_QUEUE_SIZE", 1024)?,
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
            policy,
        })
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
