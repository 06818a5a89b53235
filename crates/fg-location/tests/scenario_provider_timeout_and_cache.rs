//! Scenario: bounded provider timing and cache semantics.
//!
//! GREEN when:
//! - a hung source resolves as `Timeout` once the provider timeout elapses;
//! - a fix younger than `max_cached_age` is served without a second read;
//! - an expired fix triggers a fresh read;
//! - source errors surface verbatim and are never cached;
//! - `UnsupportedSource` reports `Unsupported`.
//!
//! Uses paused tokio time so no test actually sleeps.

use std::time::Duration;

use fg_location::*;
use fg_testkit::{ScriptStep, ScriptedSource};

fn opts(timeout_ms: u64, max_cached_age_ms: u64) -> AcquireOptions {
    AcquireOptions::from_millis(timeout_ms, max_cached_age_ms, true)
}

#[tokio::test(start_paused = true)]
async fn hung_source_times_out() {
    let provider = BoundedProvider::new(ScriptedSource::new([ScriptStep::Hang]));

    let started = tokio::time::Instant::now();
    let res = provider.acquire_position(&opts(10_000, 0)).await;

    assert_eq!(res, Err(LocationError::Timeout));
    let waited = started.elapsed();
    assert!(waited >= Duration::from_millis(10_000));
    assert!(waited < Duration::from_millis(10_100), "waited {waited:?}");
    assert_eq!(provider.source().reads(), 1);
}

#[tokio::test(start_paused = true)]
async fn fresh_cache_skips_device_read() {
    let provider = BoundedProvider::new(ScriptedSource::new([
        ScriptStep::fix(40.7128, -74.0060),
        ScriptStep::fix(10.0, 10.0),
    ]));

    let first = provider.acquire_position(&opts(1_000, 60_000)).await.unwrap();
    tokio::time::advance(Duration::from_secs(30)).await;
    let second = provider.acquire_position(&opts(1_000, 60_000)).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(provider.source().reads(), 1, "second call must hit the cache");
}

#[tokio::test(start_paused = true)]
async fn expired_cache_reads_again() {
    let provider = BoundedProvider::new(ScriptedSource::new([
        ScriptStep::fix(40.7128, -74.0060),
        ScriptStep::fix(10.0, 10.0),
    ]));

    provider.acquire_position(&opts(1_000, 60_000)).await.unwrap();
    tokio::time::advance(Duration::from_secs(61)).await;
    let second = provider.acquire_position(&opts(1_000, 60_000)).await.unwrap();

    assert_eq!(second.coordinate.latitude, 10.0);
    assert_eq!(provider.source().reads(), 2);
}

#[tokio::test(start_paused = true)]
async fn zero_cache_age_always_reads() {
    let provider = BoundedProvider::new(ScriptedSource::new([
        ScriptStep::fix(1.0, 1.0),
        ScriptStep::fix(2.0, 2.0),
    ]));

    provider.acquire_position(&opts(1_000, 0)).await.unwrap();
    let second = provider.acquire_position(&opts(1_000, 0)).await.unwrap();

    assert_eq!(second.coordinate.latitude, 2.0);
    assert_eq!(provider.source().reads(), 2);
}

#[tokio::test(start_paused = true)]
async fn errors_surface_verbatim_and_are_not_cached() {
    let provider = BoundedProvider::new(ScriptedSource::new([
        ScriptStep::Error(LocationError::PermissionDenied),
        ScriptStep::Error(LocationError::PositionUnavailable),
        ScriptStep::fix(3.0, 3.0),
    ]));

    let o = opts(1_000, 60_000);
    assert_eq!(
        provider.acquire_position(&o).await,
        Err(LocationError::PermissionDenied)
    );
    assert_eq!(
        provider.acquire_position(&o).await,
        Err(LocationError::PositionUnavailable)
    );
    let ok = provider.acquire_position(&o).await.unwrap();
    assert_eq!(ok.coordinate.latitude, 3.0);
    assert_eq!(provider.source().reads(), 3);
}

#[tokio::test(start_paused = true)]
async fn clear_cache_forces_read() {
    let provider = BoundedProvider::new(ScriptedSource::new([
        ScriptStep::fix(1.0, 1.0),
        ScriptStep::fix(2.0, 2.0),
    ]));

    provider.acquire_position(&opts(1_000, 60_000)).await.unwrap();
    provider.clear_cache();
    let second = provider.acquire_position(&opts(1_000, 60_000)).await.unwrap();
    assert_eq!(second.coordinate.latitude, 2.0);
}

#[tokio::test]
async fn unsupported_platform_reports_unsupported() {
    let provider = BoundedProvider::new(UnsupportedSource);
    assert_eq!(
        provider.acquire_position(&AcquireOptions::default()).await,
        Err(LocationError::Unsupported)
    );
    assert_eq!(provider.name(), "unsupported");
}

#[tokio::test]
async fn fixed_source_reports_its_coordinate() {
    let c = fg_schemas::Coordinate::new(40.0, -74.0);
    let provider = BoundedProvider::new(FixedSource::new(c, 12.0));
    let s = provider
        .acquire_position(&AcquireOptions::default())
        .await
        .unwrap();
    assert_eq!(s.coordinate, c);
    assert_eq!(s.accuracy_meters, 12.0);
}

#[test]
fn default_options_follow_browser_defaults() {
    let o = AcquireOptions::default();
    assert_eq!(o.timeout, Duration::from_secs(10));
    assert_eq!(o.max_cached_age, Duration::from_secs(60));
    assert!(o.high_accuracy);
}
