use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Datelike, Utc};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use subway_dispatch::api::rest::router;
use subway_dispatch::config::MatchPolicy;
use subway_dispatch::engine::matching::run_match_engine;
use subway_dispatch::models::station::{Station, TravelTime};
use subway_dispatch::state::AppState;
use subway_dispatch::stations::StationCatalog;

fn station(id: &str, name: &str, lines: &[&str]) -> Station {
    Station {
        id: id.to_string(),
        name: name.to_string(),
        name_en: None,
        lines: lines.iter().map(|l| l.to_string()).collect(),
        lat: 37.5,
        lng: 127.0,
        is_transfer: lines.len() > 1,
    }
}

fn travel_pair(a: &str, b: &str, minutes: u32) -> Vec<TravelTime> {
    [(a, b), (b, a)]
        .into_iter()
        .map(|(from, to)| TravelTime {
            from: from.to_string(),
            to: to.to_string(),
            minutes,
            distance_km: minutes as f64 * 0.8,
            express: false,
            transfers: 0,
        })
        .collect()
}

fn catalog() -> StationCatalog {
    let stations = vec![
        station("seoul", "서울역", &["1", "4"]),
        station("sadang", "사당", &["2", "4"]),
        station("gangnam", "강남", &["2"]),
        station("seolleung", "선릉", &["2"]),
        station("samseong", "삼성", &["2"]),
    ];
    let travel_times = [
        travel_pair("seoul", "sadang", 14),
        travel_pair("seoul", "gangnam", 16),
        travel_pair("sadang", "gangnam", 7),
        travel_pair("sadang", "samseong", 13),
        travel_pair("gangnam", "seolleung", 4),
        travel_pair("gangnam", "samseong", 6),
        travel_pair("seolleung", "samseong", 2),
    ]
    .concat();
    let line_paths = HashMap::from([
        ("4".to_string(), vec!["seoul".into(), "sadang".into()]),
        (
            "2".to_string(),
            vec![
                "sadang".into(),
                "gangnam".into(),
                "seolleung".into(),
                "samseong".into(),
            ],
        ),
    ]);

    StationCatalog::from_parts(stations, travel_times, line_paths)
}

fn setup_with(policy: MatchPolicy) -> (axum::Router, Arc<AppState>) {
    let (state, request_rx) = AppState::new(catalog(), policy, 1024, 1024);
    let shared = Arc::new(state);
    tokio::spawn(run_match_engine(shared.clone(), request_rx));
    (router(shared.clone()), shared)
}

fn setup() -> (axum::Router, Arc<AppState>) {
    setup_with(MatchPolicy::default())
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn create_carrier(app: &axum::Router, name: &str, rating: f64) -> Value {
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/carriers",
            json!({ "name": name, "rating": rating, "bank_account": "국민 012-345" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    body_json(res).await
}

async fn create_route(app: &axum::Router, carrier_id: &str, start: &str, end: &str) -> Value {
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/carriers/{carrier_id}/routes"),
            json!({
                "start_station": start,
                "end_station": end,
                "departure_time": "08:30",
                "days_of_week": [0, 1, 2, 3, 4, 5, 6]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    body_json(res).await
}

async fn create_request_for(app: &axum::Router, pickup: &str, dropoff: &str) -> Value {
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/requests",
            json!({
                "requester_id": Uuid::new_v4(),
                "pickup_station": pickup,
                "dropoff_station": dropoff,
                "package_class": "Small",
                "urgency": "Normal"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    body_json(res).await
}

#[tokio::test]
async fn health_returns_ok() {
    let (app, _state) = setup();
    let response = app.oneshot(get_request("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["stations"], 5);
    assert_eq!(body["carriers"], 0);
    assert_eq!(body["requests"], 0);
}

#[tokio::test]
async fn metrics_returns_prometheus_format() {
    let (app, _state) = setup();
    let response = app.oneshot(get_request("/metrics")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("text/plain"));

    let body = body_string(response).await;
    assert!(body.contains("requests_in_queue"));
}

#[tokio::test]
async fn create_carrier_clamps_rating() {
    let (app, _state) = setup();
    let carrier = create_carrier(&app, "이민수", 9.9).await;
    assert_eq!(carrier["rating"], 5.0);
    assert_eq!(carrier["status"], "Active");
    assert_eq!(carrier["total_deliveries"], 0);
}

#[tokio::test]
async fn create_carrier_empty_name_returns_400() {
    let (app, _state) = setup();
    let res = app
        .oneshot(json_request(
            "POST",
            "/carriers",
            json!({ "name": "  ", "rating": 4.0 }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn invalid_route_returns_full_error_list() {
    let (app, _state) = setup();
    let carrier = create_carrier(&app, "박지훈", 4.5).await;
    let carrier_id = carrier["id"].as_str().unwrap();

    let res = app
        .oneshot(json_request(
            "POST",
            &format!("/carriers/{carrier_id}/routes"),
            json!({
                "start_station": "seoul",
                "end_station": "seoul",
                "departure_time": "25:99",
                "days_of_week": []
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = body_json(res).await;
    let errors: Vec<String> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e.as_str().unwrap().to_string())
        .collect();
    assert!(errors.contains(&"start and end station are identical".to_string()));
    assert!(errors.contains(&"select at least one day".to_string()));
    assert!(errors.contains(&"invalid time format".to_string()));
}

#[tokio::test]
async fn route_with_unknown_station_is_rejected() {
    let (app, _state) = setup();
    let carrier = create_carrier(&app, "박지훈", 4.5).await;
    let carrier_id = carrier["id"].as_str().unwrap();

    let res = app
        .oneshot(json_request(
            "POST",
            &format!("/carriers/{carrier_id}/routes"),
            json!({
                "start_station": "seoul",
                "end_station": "jamsil",
                "departure_time": "08:00",
                "days_of_week": [1, 2, 3]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = body_json(res).await;
    assert!(body["errors"][0].as_str().unwrap().contains("jamsil"));
}

#[tokio::test]
async fn deactivating_a_route_keeps_it_on_file() {
    let (app, _state) = setup();
    let carrier = create_carrier(&app, "최유나", 4.9).await;
    let route = create_route(&app, carrier["id"].as_str().unwrap(), "sadang", "samseong").await;
    let route_id = route["id"].as_str().unwrap();
    assert_eq!(route["active"], true);

    let res = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/routes/{route_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = body_json(res).await;
    assert_eq!(body["active"], false);
}

#[tokio::test]
async fn request_with_identical_stations_returns_400() {
    let (app, _state) = setup();
    let res = app
        .oneshot(json_request(
            "POST",
            "/requests",
            json!({
                "requester_id": Uuid::new_v4(),
                "pickup_station": "seoul",
                "dropoff_station": "seoul",
                "package_class": "Small",
                "urgency": "Normal"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn full_offer_accept_and_delivery_flow() {
    let (app, _state) = setup();

    let carrier = create_carrier(&app, "김기사", 4.8).await;
    let carrier_id = carrier["id"].as_str().unwrap().to_string();
    create_route(&app, &carrier_id, "sadang", "samseong").await;

    let request = create_request_for(&app, "gangnam", "seolleung").await;
    let request_id = request["id"].as_str().unwrap().to_string();
    assert_eq!(request["status"], "Pending");
    assert!(request["fee_won"].as_i64().unwrap() > 0);

    tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;

    let res = app.clone().oneshot(get_request("/matches")).await.unwrap();
    let matches = body_json(res).await;
    let list = matches.as_array().unwrap();
    assert_eq!(list.len(), 1);
    let offer = &list[0];
    assert_eq!(offer["request_id"], request_id);
    assert_eq!(offer["carrier_id"], carrier_id);
    assert_eq!(offer["status"], "Pending");
    assert!(offer["score"].as_u64().unwrap() > 0);
    assert_eq!(offer["breakdown"]["coverage"], "Direct");

    let offer_id = offer["id"].as_str().unwrap();
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/matches/{offer_id}/accept"),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["status"], "Accepted");

    // A duplicate accept is a no-op, not an error.
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/matches/{offer_id}/accept"),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .clone()
        .oneshot(get_request(&format!("/requests/{request_id}")))
        .await
        .unwrap();
    let matched = body_json(res).await;
    assert_eq!(matched["status"], "Matched");
    assert_eq!(matched["carrier_id"], carrier_id);

    for status in ["InTransit", "Completed"] {
        let res = app
            .clone()
            .oneshot(json_request(
                "PATCH",
                &format!("/requests/{request_id}/status"),
                json!({ "status": status }),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    let res = app.clone().oneshot(get_request("/carriers")).await.unwrap();
    let carriers = body_json(res).await;
    assert_eq!(carriers.as_array().unwrap()[0]["total_deliveries"], 1);
}

#[tokio::test]
async fn rejection_moves_the_offer_to_the_next_candidate() {
    let (app, state) = setup();

    let best = create_carrier(&app, "일등 기사", 5.0).await;
    let best_id = best["id"].as_str().unwrap().to_string();
    create_route(&app, &best_id, "sadang", "samseong").await;

    let fallback = create_carrier(&app, "이등 기사", 4.0).await;
    let fallback_id = fallback["id"].as_str().unwrap().to_string();
    create_route(&app, &fallback_id, "sadang", "samseong").await;

    let request = create_request_for(&app, "gangnam", "seolleung").await;
    let request_id: Uuid = request["id"].as_str().unwrap().parse().unwrap();

    tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;

    let first = state.pending_match_for(request_id).unwrap();
    assert_eq!(first.carrier_id.to_string(), best_id);

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/matches/{}/reject", first.id),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;

    let second = state.pending_match_for(request_id).unwrap();
    assert_eq!(second.carrier_id.to_string(), fallback_id);

    // Accepting the rejected offer afterwards is a conflict.
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/matches/{}/accept", first.id),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn unmatched_request_fails_after_all_retries() {
    let policy = MatchPolicy {
        acceptance_window_ms: 20,
        max_retries: 3,
        ..MatchPolicy::default()
    };
    let (app, _state) = setup_with(policy);

    // No carriers registered at all.
    let request = create_request_for(&app, "gangnam", "seolleung").await;
    let request_id = request["id"].as_str().unwrap();

    tokio::time::sleep(tokio::time::Duration::from_millis(400)).await;

    let res = app
        .clone()
        .oneshot(get_request(&format!("/requests/{request_id}")))
        .await
        .unwrap();
    let failed = body_json(res).await;
    assert_eq!(failed["status"], "Failed");
    assert_eq!(failed["retry_count"], 3);
}

#[tokio::test]
async fn cancellation_clears_the_pending_offer() {
    let (app, state) = setup();

    let carrier = create_carrier(&app, "김기사", 4.8).await;
    create_route(&app, carrier["id"].as_str().unwrap(), "sadang", "samseong").await;

    let request = create_request_for(&app, "gangnam", "seolleung").await;
    let request_id: Uuid = request["id"].as_str().unwrap().parse().unwrap();

    tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;
    let offer = state.pending_match_for(request_id).unwrap();

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/requests/{request_id}/cancel"),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["status"], "Cancelled");

    assert!(state.pending_match_for(request_id).is_none());
    let resolved = state.matches.get(&offer.id).unwrap().value().clone();
    assert_eq!(
        resolved.status,
        subway_dispatch::models::matching::MatchStatus::Expired
    );
}

#[tokio::test]
async fn settlement_run_covers_completed_deliveries() {
    let (app, _state) = setup();

    let carrier = create_carrier(&app, "정산 기사", 4.9).await;
    let carrier_id = carrier["id"].as_str().unwrap().to_string();
    create_route(&app, &carrier_id, "sadang", "samseong").await;

    let request = create_request_for(&app, "gangnam", "seolleung").await;
    let request_id = request["id"].as_str().unwrap().to_string();

    tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;

    let res = app.clone().oneshot(get_request("/matches")).await.unwrap();
    let offer_id = body_json(res).await[0]["id"].as_str().unwrap().to_string();
    app.clone()
        .oneshot(json_request(
            "POST",
            &format!("/matches/{offer_id}/accept"),
            json!({}),
        ))
        .await
        .unwrap();
    for status in ["InTransit", "Completed"] {
        app.clone()
            .oneshot(json_request(
                "PATCH",
                &format!("/requests/{request_id}/status"),
                json!({ "status": status }),
            ))
            .await
            .unwrap();
    }

    let now = Utc::now();
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/settlements/run",
            json!({ "year": now.year(), "month": now.month() }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let run = body_json(res).await;
    assert_eq!(run["generated"], 1);
    assert_eq!(run["errors"].as_array().unwrap().len(), 0);

    let res = app
        .clone()
        .oneshot(get_request("/settlements"))
        .await
        .unwrap();
    let settlements = body_json(res).await;
    let settlement = &settlements.as_array().unwrap()[0];
    assert_eq!(settlement["carrier_id"], carrier_id);
    assert_eq!(settlement["delivery_count"], 1);
    assert!(settlement["earnings"]["net"].as_i64().unwrap() > 0);

    // A second run for the same period settles nobody twice.
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/settlements/run",
            json!({ "year": now.year(), "month": now.month() }),
        ))
        .await
        .unwrap();
    assert_eq!(body_json(res).await["generated"], 0);

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/invoices/run",
            json!({ "year": now.year(), "month": now.month() }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["generated"], 1);
}

#[tokio::test]
async fn settlement_run_rejects_invalid_month() {
    let (app, _state) = setup();
    let res = app
        .oneshot(json_request(
            "POST",
            "/settlements/run",
            json!({ "year": 2026, "month": 13 }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}
