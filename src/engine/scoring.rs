use crate::config::MatchPolicy;
use crate::engine::compat::{RouteCompat, evaluate};
use crate::models::carrier::Candidate;
use crate::models::matching::{Coverage, ScoreBreakdown};
use crate::models::request::{DeliveryRequest, Urgency};
use crate::stations::StationCatalog;

/// Headroom below 100 reserved for activity bonuses, so that ratings and
/// detours stay visible even for saturated carriers.
const COMPAT_BASE: f64 = 88.0;

/// Compatibility score in [0, 100]. Pure function of the request and the
/// candidate snapshot: no clock, no randomness, replayable.
///
/// A candidate without a single compatible route scores a hard 0; no
/// amount of rating or history earns partial credit.
pub fn compute_score(
    request: &DeliveryRequest,
    candidate: &Candidate,
    match_day: u8,
    max_detour_minutes: u32,
    policy: &MatchPolicy,
    catalog: &StationCatalog,
) -> (u8, ScoreBreakdown) {
    let best = best_route(request, candidate, match_day, max_detour_minutes, catalog);

    let Some(compat) = best else {
        return (
            0,
            ScoreBreakdown {
                coverage: Coverage::None,
                detour_minutes: 0,
                base_score: 0.0,
                rating_factor: 0.0,
                experience_bonus: 0.0,
                recency_bonus: 0.0,
            },
        );
    };

    let per_minute = match request.urgency {
        Urgency::Normal => policy.detour_penalty_per_minute,
        Urgency::Express => policy.detour_penalty_per_minute * policy.express_detour_multiplier,
    };
    let base_score =
        (COMPAT_BASE - per_minute * compat.detour_minutes as f64).max(policy.min_base_score);

    let rating_factor = rating_factor(candidate.carrier.rating, policy);
    let experience_bonus = (((candidate.carrier.total_deliveries + 1) as f64).ln() * 1.8)
        .min(policy.experience_bonus_cap);
    let recency_bonus =
        (candidate.carrier.recent_deliveries as f64 * 0.5).min(policy.recency_bonus_cap);

    let total = (base_score * rating_factor + experience_bonus + recency_bonus).clamp(0.0, 100.0);

    (
        total.round() as u8,
        ScoreBreakdown {
            coverage: compat.coverage,
            detour_minutes: compat.detour_minutes,
            base_score,
            rating_factor,
            experience_bonus,
            recency_bonus,
        },
    )
}

/// The candidate's cheapest compatible route, if any.
fn best_route(
    request: &DeliveryRequest,
    candidate: &Candidate,
    match_day: u8,
    max_detour_minutes: u32,
    catalog: &StationCatalog,
) -> Option<RouteCompat> {
    candidate
        .routes
        .iter()
        .map(|route| evaluate(request, route, match_day, max_detour_minutes, catalog))
        .filter(|compat| compat.compatible)
        .min_by_key(|compat| compat.detour_minutes)
}

fn rating_factor(rating: f64, policy: &MatchPolicy) -> f64 {
    if rating >= policy.rating_penalty_threshold {
        return 1.0;
    }
    (1.0 - (policy.rating_penalty_threshold - rating) * policy.rating_penalty_per_star).max(0.0)
}
