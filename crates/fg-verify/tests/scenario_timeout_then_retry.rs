//! Scenario: provider timeout fails the session; manual retry recovers.
//!
//! GREEN when:
//! - Idle → Checking → Failed with `error_kind = Timeout`;
//! - `retry` moves the session back to Checking with attempt_count = 2;
//! - the fresh outcome overwrites the Failed state;
//! - nothing retries on its own after a failure.

use std::time::Duration;

use fg_location::{AcquireOptions, LocationError};
use fg_testkit::fixtures::{family_homes, field_worker, JOHNSON_HOME};
use fg_testkit::{provider_for, ScriptStep, ScriptedSource};
use fg_verify::*;

#[tokio::test(start_paused = true)]
async fn timeout_fails_then_retry_verifies() {
    let actor = field_worker("fw-2", &["johnson-home"]);
    let zones = fg_geo::resolve_zones(&actor.assigned_zone_ids, &family_homes());
    let source = ScriptedSource::new([ScriptStep::Hang, ScriptStep::at(JOHNSON_HOME)]);
    let provider = provider_for(source.clone());

    let handle = VerificationHandle::new(
        Session::new(&actor),
        zones,
        provider,
        AcquireOptions::default(),
    );
    assert_eq!(handle.snapshot().state, SessionState::Idle);

    handle.verify();
    assert_eq!(handle.snapshot().state, SessionState::Checking);

    let failed = handle.settled().await;
    assert_eq!(failed.state, SessionState::Failed);
    assert_eq!(failed.error_kind, Some(LocationError::Timeout));
    assert!(failed.matched_zone.is_none());
    assert_eq!(failed.attempt_count, 1);

    // No automatic retry: time passes, the session stays Failed.
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(handle.snapshot().state, SessionState::Failed);
    assert_eq!(source.reads(), 1);

    handle.retry();
    let checking = handle.snapshot();
    assert_eq!(checking.state, SessionState::Checking);
    assert_eq!(checking.attempt_count, 2);
    assert!(checking.error_kind.is_none());

    let verified = handle.settled().await;
    assert_eq!(verified.state, SessionState::Verified);
    assert_eq!(verified.error_kind, None);
    assert_eq!(
        verified.matched_zone.map(|z| z.id.0),
        Some("johnson-home".to_string())
    );
}

#[tokio::test]
async fn each_error_kind_surfaces_verbatim() {
    let actor = field_worker("fw-2", &["johnson-home"]);
    for err in [
        LocationError::PermissionDenied,
        LocationError::PositionUnavailable,
        LocationError::Timeout,
        LocationError::Unsupported,
    ] {
        let provider = provider_for(ScriptedSource::new([ScriptStep::Error(err)]));
        let handle =
            start_verification(&actor, family_homes(), provider, AcquireOptions::default());
        let snap = handle.settled().await;
        assert_eq!(snap.state, SessionState::Failed);
        assert_eq!(snap.error_kind, Some(err));
    }
}

#[tokio::test]
async fn reset_returns_to_idle() {
    let actor = field_worker("fw-2", &["johnson-home"]);
    let provider = provider_for(ScriptedSource::new([ScriptStep::at(JOHNSON_HOME)]));
    let handle = start_verification(&actor, family_homes(), provider, AcquireOptions::default());
    assert_eq!(handle.settled().await.state, SessionState::Verified);

    handle.reset();
    let snap = handle.snapshot();
    assert_eq!(snap.state, SessionState::Idle);
    assert_eq!(snap.attempt_count, 0);
    assert!(snap.matched_zone.is_none());
}

#[tokio::test]
async fn subscribers_see_checking_then_settled() {
    let actor = field_worker("fw-2", &["johnson-home"]);
    let provider = provider_for(ScriptedSource::new([ScriptStep::fix(0.0, 0.0)]));
    let handle = VerificationHandle::new(
        Session::new(&actor),
        family_homes(),
        provider,
        AcquireOptions::default(),
    );
    let mut rx = handle.subscribe();
    assert_eq!(rx.borrow_and_update().state, SessionState::Idle);

    handle.verify();
    let settled = handle.settled().await;
    assert_eq!(settled.state, SessionState::Denied);

    rx.changed().await.unwrap();
    assert_eq!(rx.borrow().state, SessionState::Denied);
}
