//! Scenario: last attempt started wins.
//!
//! GREEN when:
//! - starting a second check while the first is in flight cancels the first
//!   provider read;
//! - a resolution for the superseded attempt never changes session state,
//!   whether the newer attempt is still in flight or already settled;
//! - only the current attempt's resolution applies;
//! - attempt ids keep increasing across a logout, so a check started before
//!   `reset` can never be mistaken for one started after it.

use fg_location::{AcquireOptions, LocationError};
use fg_schemas::Coordinate;
use fg_testkit::fixtures::{family_homes, field_worker, JOHNSON_HOME};
use fg_testkit::{provider_for, GatedSource, PendingRead};
use fg_verify::*;

async fn wait_cancelled(read: &PendingRead) -> bool {
    for _ in 0..100 {
        if read.is_cancelled() {
            return true;
        }
        tokio::task::yield_now().await;
    }
    read.is_cancelled()
}

fn no_cache() -> AcquireOptions {
    AcquireOptions::from_millis(10_000, 0, true)
}

#[tokio::test]
async fn superseded_read_is_cancelled_and_ignored() {
    let actor = field_worker("fw-2", &["johnson-home"]);
    let (source, mut ctl) = GatedSource::new();
    let handle = start_verification(&actor, family_homes(), provider_for(source), no_cache());

    let first = ctl.next_read().await.expect("first read");
    let second_attempt = handle.retry();
    assert_eq!(second_attempt, AttemptId(2));
    let second = ctl.next_read().await.expect("second read");

    assert!(
        wait_cancelled(&first).await,
        "superseding must cancel the stale provider read"
    );

    // Even if the stale read could still deliver, state must not move.
    let _ = first.fail(LocationError::PermissionDenied);
    tokio::task::yield_now().await;
    let snap = handle.snapshot();
    assert_eq!(snap.state, SessionState::Checking);
    assert_eq!(snap.attempt_count, 2);

    assert!(second.resolve_at(JOHNSON_HOME));
    let settled = handle.settled().await;
    assert_eq!(settled.state, SessionState::Verified);
    assert_eq!(settled.attempt_count, 2);
}

#[test]
fn stale_outcome_after_newer_attempt_settled_is_discarded() {
    let actor = field_worker("fw-2", &["johnson-home"]);
    let zones = family_homes();
    let mut session = Session::new(&actor);

    let a1 = session.begin_attempt();
    let a2 = session.begin_attempt();

    // Stale resolution while the newer attempt is still in flight.
    let stale = VerificationOutcome::failed(LocationError::Timeout);
    assert_eq!(session.apply(a1, stale.clone()), ApplyResult::Stale);
    assert_eq!(session.state(), SessionState::Checking);

    let here = fg_schemas::PositionSample::new(JOHNSON_HOME, 5.0, chrono::Utc::now());
    let fresh = VerificationOutcome::from_acquisition(Ok(here), &zones);
    assert_eq!(session.apply(a2, fresh), ApplyResult::Applied);
    assert_eq!(session.state(), SessionState::Verified);

    // Stale resolution after the newer attempt already settled.
    assert_eq!(session.apply(a1, stale), ApplyResult::Stale);
    assert_eq!(session.state(), SessionState::Verified);
}

#[tokio::test]
async fn dropping_handle_cancels_inflight_read() {
    let actor = field_worker("fw-2", &["johnson-home"]);
    let (source, mut ctl) = GatedSource::new();
    let handle = start_verification(&actor, family_homes(), provider_for(source), no_cache());
    let read = ctl.next_read().await.expect("read");

    drop(handle);
    assert!(wait_cancelled(&read).await);
}

#[tokio::test]
async fn reset_during_check_discards_resolution() {
    let actor = field_worker("fw-2", &["johnson-home"]);
    let (source, mut ctl) = GatedSource::new();
    let handle = start_verification(&actor, family_homes(), provider_for(source), no_cache());
    let read = ctl.next_read().await.expect("read");

    handle.reset();
    let _ = read.resolve_at(Coordinate::new(40.7128, -74.0060));
    tokio::task::yield_now().await;
    assert_eq!(handle.snapshot().state, SessionState::Idle);
}

#[tokio::test]
async fn attempt_ids_survive_reset_and_old_read_cannot_land() {
    let actor = field_worker("fw-2", &["johnson-home"]);
    let (source, mut ctl) = GatedSource::new();
    let handle = VerificationHandle::new(
        Session::new(&actor),
        family_homes(),
        provider_for(source),
        no_cache(),
    );

    let before_logout = handle.verify();
    let old_read = ctl.next_read().await.expect("pre-logout read");
    handle.reset();

    let after_login = handle.verify();
    assert!(after_login > before_logout);
    assert_eq!(after_login, AttemptId(2));
    assert_eq!(handle.snapshot().attempt_count, 1);
    let new_read = ctl.next_read().await.expect("post-login read");

    let _ = old_read.resolve_at(JOHNSON_HOME);
    tokio::task::yield_now().await;
    assert_eq!(handle.snapshot().state, SessionState::Checking);

    assert!(new_read.fail(LocationError::PermissionDenied));
    let settled = handle.settled().await;
    assert_eq!(settled.state, SessionState::Failed);
    assert_eq!(settled.error_kind, Some(LocationError::PermissionDenied));
    assert_eq!(settled.attempt_count, 1);
}
