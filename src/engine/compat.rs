use crate::models::matching::Coverage;
use crate::models::request::DeliveryRequest;
use crate::models::route::Route;
use crate::stations::StationCatalog;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteCompat {
    pub compatible: bool,
    pub detour_minutes: u32,
    pub coverage: Coverage,
}

impl RouteCompat {
    fn none() -> Self {
        Self {
            compatible: false,
            detour_minutes: 0,
            coverage: Coverage::None,
        }
    }
}

/// Whether a declared commute can carry a request, and at what detour
/// cost. Missing reference data fails closed: absent geography must never
/// produce an illegitimate match, and never an error either.
pub fn evaluate(
    request: &DeliveryRequest,
    route: &Route,
    match_day: u8,
    max_detour_minutes: u32,
    catalog: &StationCatalog,
) -> RouteCompat {
    if !route.runs_on(match_day) {
        return RouteCompat::none();
    }

    let known = [
        &route.start_station,
        &route.end_station,
        &request.pickup_station,
        &request.dropoff_station,
    ]
    .iter()
    .all(|id| catalog.station(id).is_some());
    if !known {
        return RouteCompat::none();
    }

    if catalog.segment_in_order(
        &route.start_station,
        &route.end_station,
        &request.pickup_station,
        &request.dropoff_station,
    ) {
        return RouteCompat {
            compatible: true,
            detour_minutes: 0,
            coverage: Coverage::Direct,
        };
    }

    // Off-path stations: price the commute start -> pickup -> dropoff -> end
    // against the direct run.
    let legs = [
        catalog.travel_minutes(&route.start_station, &request.pickup_station),
        catalog.travel_minutes(&request.pickup_station, &request.dropoff_station),
        catalog.travel_minutes(&request.dropoff_station, &route.end_station),
    ];
    let direct = catalog.travel_minutes(&route.start_station, &route.end_station);

    match (legs, direct) {
        ([Some(a), Some(b), Some(c)], Some(direct)) => {
            let detour_minutes = (a + b + c).saturating_sub(direct);
            if detour_minutes <= max_detour_minutes {
                RouteCompat {
                    compatible: true,
                    detour_minutes,
                    coverage: Coverage::Partial,
                }
            } else {
                RouteCompat::none()
            }
        }
        _ => RouteCompat::none(),
    }
}
