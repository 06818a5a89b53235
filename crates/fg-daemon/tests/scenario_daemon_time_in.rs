//! Scenario: time-in through the daemon.
//!
//! GREEN when:
//! - a time_in session verifies against the assigned children's homes, not
//!   the worker's own zone assignments;
//! - a verified session records one attendance event, visible on
//!   GET /v1/attendance;
//! - refusals map to stable codes (NOT_VERIFIED, CHILD_NOT_AT_ZONE,
//!   WRONG_PURPOSE, NO_ASSIGNED_CHILDREN).

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use fg_config::load_layered_yaml_from_strings;
use fg_daemon::{routes, state};
use fg_testkit::fixtures::{JOHNSON_HOME, SMITH_HOME};
use http_body_util::BodyExt;
use tower::ServiceExt;
use uuid::Uuid;

const DIRECTORY: &str = r#"
location:
  max_cached_age_ms: 0
zones:
  - { id: johnson-home, latitude: 40.7128, longitude: -74.0060, radius_meters: 100 }
  - { id: smith-home, latitude: 40.7589, longitude: -73.9851, radius_meters: 100 }
  - { id: office, latitude: 40.7000, longitude: -74.0100, radius_meters: 200 }
children:
  - { id: emma, name: Emma Johnson, home_zone: johnson-home }
  - { id: liam, name: Liam Smith, home_zone: smith-home }
actors:
  - { id: fw-1, role: field_worker, zones: [office], children: [emma, liam] }
  - { id: fw-2, role: field_worker, zones: [office] }
"#;

fn make_state() -> Arc<state::AppState> {
    let loaded = load_layered_yaml_from_strings(&[DIRECTORY]).expect("config");
    Arc::new(state::AppState::from_loaded(&loaded).expect("state"))
}

async fn call(st: &Arc<state::AppState>, req: Request<Body>) -> (StatusCode, serde_json::Value) {
    let resp = routes::build_router(Arc::clone(st))
        .oneshot(req)
        .await
        .expect("oneshot failed");
    let status = resp.status();
    let body = resp
        .into_body()
        .collect()
        .await
        .expect("body collect failed")
        .to_bytes();
    (
        status,
        serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null),
    )
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn open(st: &Arc<state::AppState>, actor: &str, purpose: &str) -> Uuid {
    let (status, json) = call(
        st,
        post_json(
            "/v1/sessions",
            serde_json::json!({ "actor_id": actor, "purpose": purpose }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    assert_eq!(json["session"]["purpose"], purpose);
    Uuid::parse_str(json["session"]["session_id"].as_str().expect("id")).expect("uuid")
}

async fn fix_and_settle(
    st: &Arc<state::AppState>,
    id: Uuid,
    at: fg_schemas::Coordinate,
) -> fg_verify::SessionSnapshot {
    let (status, _) = call(
        st,
        post_json(
            &format!("/v1/sessions/{id}/fix"),
            serde_json::json!({ "latitude": at.latitude, "longitude": at.longitude }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    st.session(id).await.expect("session").handle.settled().await
}

#[tokio::test]
async fn verified_time_in_records_attendance() {
    let st = make_state();
    let id = open(&st, "fw-1", "time_in").await;

    let snap = fix_and_settle(&st, id, SMITH_HOME).await;
    assert_eq!(snap.state, fg_verify::SessionState::Verified);
    assert_eq!(
        snap.matched_zone.map(|z| z.id.0),
        Some("smith-home".to_string())
    );

    let (status, json) = call(
        &st,
        post_json(
            "/v1/time-in",
            serde_json::json!({ "session_id": id, "child_id": "liam" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    assert_eq!(json["child_id"], "liam");
    assert_eq!(json["zone_id"], "smith-home");
    assert_eq!(json["actor_id"], "fw-1");

    let (status, json) = call(
        &st,
        Request::builder()
            .uri("/v1/attendance")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["events"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn child_is_inferred_from_matched_home() {
    let st = make_state();
    let id = open(&st, "fw-1", "time_in").await;
    fix_and_settle(&st, id, JOHNSON_HOME).await;

    let (status, json) = call(
        &st,
        post_json("/v1/time-in", serde_json::json!({ "session_id": id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    assert_eq!(json["child_id"], "emma");
}

#[tokio::test]
async fn wrong_child_for_home_is_refused() {
    let st = make_state();
    let id = open(&st, "fw-1", "time_in").await;
    fix_and_settle(&st, id, JOHNSON_HOME).await;

    let (status, json) = call(
        &st,
        post_json(
            "/v1/time-in",
            serde_json::json!({ "session_id": id, "child_id": "liam" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["code"], "CHILD_NOT_AT_ZONE");
    assert!(st.attendance.events().is_empty());
}

#[tokio::test]
async fn own_zone_does_not_count_for_time_in() {
    let st = make_state();
    let id = open(&st, "fw-1", "time_in").await;

    // The office is assigned to fw-1 but is nobody's home.
    let office = fg_schemas::Coordinate::new(40.7000, -74.0100);
    let snap = fix_and_settle(&st, id, office).await;
    assert_eq!(snap.state, fg_verify::SessionState::Denied);

    let (status, json) = call(
        &st,
        post_json("/v1/time-in", serde_json::json!({ "session_id": id })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["code"], "NOT_VERIFIED");
}

#[tokio::test]
async fn access_session_cannot_time_in() {
    let st = make_state();
    let id = open(&st, "fw-1", "access").await;

    let (status, json) = call(
        &st,
        post_json("/v1/time-in", serde_json::json!({ "session_id": id })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "WRONG_PURPOSE");
}

#[tokio::test]
async fn time_in_session_has_no_access_decision() {
    let st = make_state();
    let id = open(&st, "fw-1", "time_in").await;

    let (status, json) = call(
        &st,
        Request::builder()
            .uri(format!("/v1/sessions/{id}/access"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "WRONG_PURPOSE");
}

#[tokio::test]
async fn worker_without_children_cannot_open_time_in() {
    let st = make_state();
    let (status, json) = call(
        &st,
        post_json(
            "/v1/sessions",
            serde_json::json!({ "actor_id": "fw-2", "purpose": "time_in" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["code"], "NO_ASSIGNED_CHILDREN");
}
