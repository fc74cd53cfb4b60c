use crate::models::request::{PackageClass, Urgency};
use crate::stations::StationCatalog;

const BASE_FARE_WON: i64 = 3_000;
const PER_MINUTE_WON: i64 = 100;
const EXPRESS_SURCHARGE_WON: i64 = 1_500;

/// Delivery fee in won, fixed at request creation. `None` when the
/// segment has no travel-time data; such a request is refused up front
/// rather than priced by guesswork.
pub fn delivery_fee(
    catalog: &StationCatalog,
    pickup: &str,
    dropoff: &str,
    package_class: PackageClass,
    urgency: Urgency,
) -> Option<i64> {
    let minutes = catalog.travel_minutes(pickup, dropoff)?;

    let size_surcharge = match package_class {
        PackageClass::Small => 0,
        PackageClass::Medium => 1_000,
        PackageClass::Large => 2_500,
    };
    let express_surcharge = match urgency {
        Urgency::Normal => 0,
        Urgency::Express => EXPRESS_SURCHARGE_WON,
    };

    Some(BASE_FARE_WON + PER_MINUTE_WON * minutes as i64 + size_surcharge + express_surcharge)
}
