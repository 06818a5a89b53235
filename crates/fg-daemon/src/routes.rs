//! Axum router and all HTTP handlers for fg-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. Scenario tests in `tests/` compose the bare router.

use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use fg_gate::evaluate;
use fg_schemas::{ActorId, ChildId, Coordinate, PositionSample};
use fg_verify::{record_time_in, SessionState, TimeInError};
use futures_util::{Stream, StreamExt};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    api_types::{
        AccessResponse, AttendanceResponse, CreateSessionRequest, CreateSessionResponse,
        ErrorResponse, FixErrorRequest, FixRequest, HealthResponse, NearestZone, RelayResponse,
        SessionClosedResponse, SessionView, TimeInRequest, ZonesResponse,
    },
    state::{AppState, BusMsg, SessionEntry, SessionPurpose},
};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/zones", get(zones))
        .route("/v1/stream", get(stream))
        .route("/v1/sessions", post(create_session))
        .route("/v1/sessions/:id", get(get_session).delete(delete_session))
        .route("/v1/sessions/:id/verify", post(verify_session))
        .route("/v1/sessions/:id/fix", post(post_fix))
        .route("/v1/sessions/:id/fix-error", post(post_fix_error))
        .route("/v1/sessions/:id/access", get(session_access))
        .route("/v1/time-in", post(time_in))
        .route("/v1/attendance", get(attendance))
        .with_state(state)
}

fn api_error(status: StatusCode, code: &str, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            code: code.to_string(),
        }),
    )
        .into_response()
}

async fn lookup(st: &AppState, id: Uuid) -> Result<Arc<SessionEntry>, Response> {
    st.session(id).await.ok_or_else(|| {
        api_error(
            StatusCode::NOT_FOUND,
            "UNKNOWN_SESSION",
            format!("no session {id}"),
        )
    })
}

fn view(entry: &SessionEntry) -> SessionView {
    SessionView::new(entry.id, entry.purpose, entry.handle.snapshot())
}

// ---------------------------------------------------------------------------
// GET /v1/health  GET /v1/zones
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service.to_string(),
            version: st.build.version.to_string(),
            config_hash: st.config_hash.clone(),
        }),
    )
}

pub(crate) async fn zones(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ZonesResponse {
        zones: st.config.zones.clone(),
    })
}

// ---------------------------------------------------------------------------
// POST /v1/sessions
// ---------------------------------------------------------------------------

/// Login-time entry point.
///
/// Access sessions follow the gate policy: exempt roles get no session at
/// all, gated roles get one and `auto_start` decides whether the first
/// check starts now. Time-in sessions always verify against the assigned
/// children's homes.
pub(crate) async fn create_session(
    State(st): State<Arc<AppState>>,
    Json(req): Json<CreateSessionRequest>,
) -> Response {
    let actor_id = ActorId::new(req.actor_id);
    let Some(actor) = st.actor(&actor_id).cloned() else {
        return api_error(
            StatusCode::NOT_FOUND,
            "UNKNOWN_ACTOR",
            format!("no actor {actor_id}"),
        );
    };
    let policy = &st.config.gate;

    let start = match req.purpose {
        SessionPurpose::Access => {
            if !policy.requires_verification(actor.role) {
                info!(actor = %actor.id, role = %actor.role, "session not required");
                return (
                    StatusCode::OK,
                    Json(CreateSessionResponse {
                        actor_id: actor.id,
                        requires_verification: false,
                        started: false,
                        session: None,
                    }),
                )
                    .into_response();
            }
            policy.should_auto_start(&actor)
        }
        SessionPurpose::TimeIn => {
            if actor.assigned_child_ids.is_empty() {
                return api_error(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "NO_ASSIGNED_CHILDREN",
                    format!("actor {} has no assigned children", actor.id),
                );
            }
            policy.auto_start
        }
    };

    let entry = st.open_session(&actor, req.purpose).await;
    if start {
        entry.begin_check();
    }

    let _ = st.bus.send(BusMsg::LogLine {
        level: "INFO".to_string(),
        msg: format!("{} session opened for {}", req.purpose.as_str(), actor.id),
    });

    (
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            actor_id: actor.id.clone(),
            requires_verification: true,
            started: start,
            session: Some(view(&entry)),
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// /v1/sessions/:id
// ---------------------------------------------------------------------------

pub(crate) async fn get_session(
    State(st): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Response {
    match lookup(&st, id).await {
        Ok(entry) => (StatusCode::OK, Json(view(&entry))).into_response(),
        Err(resp) => resp,
    }
}

/// Start or retry. Supersedes a check still in flight.
pub(crate) async fn verify_session(
    State(st): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Response {
    let entry = match lookup(&st, id).await {
        Ok(e) => e,
        Err(resp) => return resp,
    };
    let attempt = entry.begin_check();
    info!(session = %id, attempt = attempt.0, "verify requested");
    (StatusCode::ACCEPTED, Json(view(&entry))).into_response()
}

pub(crate) async fn post_fix(
    State(st): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<FixRequest>,
) -> Response {
    let entry = match lookup(&st, id).await {
        Ok(e) => e,
        Err(resp) => return resp,
    };
    let coordinate = match Coordinate::validated(req.latitude, req.longitude) {
        Ok(c) => c,
        Err(e) => {
            return api_error(StatusCode::BAD_REQUEST, "INVALID_COORDINATE", e.to_string())
        }
    };
    let sample = PositionSample::new(coordinate, req.accuracy_meters, Utc::now());
    let delivery = entry.relay.post(Ok(sample));
    info!(session = %id, %coordinate, ?delivery, "device fix relayed");
    (
        StatusCode::OK,
        Json(RelayResponse {
            session_id: id,
            delivery,
        }),
    )
        .into_response()
}

pub(crate) async fn post_fix_error(
    State(st): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<FixErrorRequest>,
) -> Response {
    let entry = match lookup(&st, id).await {
        Ok(e) => e,
        Err(resp) => return resp,
    };
    let delivery = entry.relay.post(Err(req.kind));
    warn!(session = %id, kind = req.kind.as_str(), ?delivery, "device error relayed");
    (
        StatusCode::OK,
        Json(RelayResponse {
            session_id: id,
            delivery,
        }),
    )
        .into_response()
}

/// Gate decision for an access session.
pub(crate) async fn session_access(
    State(st): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Response {
    let entry = match lookup(&st, id).await {
        Ok(e) => e,
        Err(resp) => return resp,
    };
    if entry.purpose != SessionPurpose::Access {
        return api_error(
            StatusCode::CONFLICT,
            "WRONG_PURPOSE",
            "access is decided by access sessions only",
        );
    }

    let snapshot = entry.handle.snapshot();
    let decision = evaluate(&st.config.gate, &entry.actor, Some(&snapshot));
    let nearest = match (&snapshot.state, &snapshot.sample) {
        (SessionState::Denied, Some(sample)) => {
            fg_geo::nearest_zone(sample.coordinate, entry.handle.zones()).map(|(zone, d)| {
                NearestZone {
                    zone_id: zone.id.clone(),
                    display_name: zone.display_name.clone(),
                    distance_meters: d,
                }
            })
        }
        _ => None,
    };
    (
        StatusCode::OK,
        Json(AccessResponse {
            session_id: id,
            actor_id: entry.actor.id.clone(),
            role: entry.actor.role,
            permitted: decision.permitted,
            message: decision.reason.message(),
            remediation: decision.reason.remediation(),
            reason: decision.reason,
            nearest,
        }),
    )
        .into_response()
}

/// Logout.
pub(crate) async fn delete_session(
    State(st): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Response {
    match st.close_session(id).await {
        Some(entry) => {
            let _ = st.bus.send(BusMsg::LogLine {
                level: "INFO".to_string(),
                msg: format!("session closed for {}", entry.actor.id),
            });
            (
                StatusCode::OK,
                Json(SessionClosedResponse {
                    session_id: id,
                    closed: true,
                }),
            )
                .into_response()
        }
        None => api_error(
            StatusCode::NOT_FOUND,
            "UNKNOWN_SESSION",
            format!("no session {id}"),
        ),
    }
}

// ---------------------------------------------------------------------------
// POST /v1/time-in  GET /v1/attendance
// ---------------------------------------------------------------------------

pub(crate) async fn time_in(
    State(st): State<Arc<AppState>>,
    Json(req): Json<TimeInRequest>,
) -> Response {
    let entry = match lookup(&st, req.session_id).await {
        Ok(e) => e,
        Err(resp) => return resp,
    };
    if entry.purpose != SessionPurpose::TimeIn {
        return api_error(
            StatusCode::CONFLICT,
            "WRONG_PURPOSE",
            "time-in requires a time_in session",
        );
    }

    let child_id = req.child_id.map(ChildId::new);
    let snapshot = entry.handle.snapshot();
    let result = record_time_in(
        &entry.actor,
        &snapshot,
        &st.config.children,
        child_id.as_ref(),
        &st.attendance,
        Utc::now(),
    );

    match result {
        Ok(event) => {
            let _ = st.bus.send(BusMsg::TimeIn(event.clone()));
            (StatusCode::CREATED, Json(event)).into_response()
        }
        Err(err) => {
            warn!(session = %req.session_id, error = %err, "time-in refused");
            let (status, code) = time_in_error_status(&err);
            api_error(status, code, err.to_string())
        }
    }
}

fn time_in_error_status(err: &TimeInError) -> (StatusCode, &'static str) {
    match err {
        TimeInError::SessionMismatch { .. } => (StatusCode::CONFLICT, "SESSION_MISMATCH"),
        TimeInError::NotVerified(_) => (StatusCode::FORBIDDEN, "NOT_VERIFIED"),
        TimeInError::ChildNotAssigned(_) => (StatusCode::FORBIDDEN, "CHILD_NOT_ASSIGNED"),
        TimeInError::ChildNotAtZone { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, "CHILD_NOT_AT_ZONE")
        }
        TimeInError::NoChildAtZone(_) => (StatusCode::UNPROCESSABLE_ENTITY, "NO_CHILD_AT_ZONE"),
        TimeInError::Sink(_) => (StatusCode::INTERNAL_SERVER_ERROR, "ATTENDANCE_SINK"),
    }
}

pub(crate) async fn attendance(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    Json(AttendanceResponse {
        events: st.attendance.events(),
    })
}

// ---------------------------------------------------------------------------
// GET /v1/stream  (SSE)
// ---------------------------------------------------------------------------

pub(crate) async fn stream(State(st): State<Arc<AppState>>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));
    headers.insert("Connection", HeaderValue::from_static("keep-alive"));

    let rx = st.bus.subscribe();
    let events = broadcast_to_sse(rx);

    (headers, Sse::new(events).keep_alive(KeepAlive::new())).into_response()
}

fn broadcast_to_sse(
    rx: broadcast::Receiver<BusMsg>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    BroadcastStream::new(rx).filter_map(|msg| async move {
        // Lagged receivers skip ahead.
        let m = msg.ok()?;
        let event_name = match &m {
            BusMsg::Heartbeat { .. } => "heartbeat",
            BusMsg::Session { .. } => "session",
            BusMsg::TimeIn(_) => "time_in",
            BusMsg::LogLine { .. } => "log",
        };
        let data = serde_json::to_string(&m).ok()?;
        Some(Ok(Event::default().event(event_name).data(data)))
    })
}
