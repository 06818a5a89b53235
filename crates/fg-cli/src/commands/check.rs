//! `fieldgate check`: one verification against a fixed fix.

use std::sync::Arc;

use anyhow::{Context, Result};
use fg_gate::evaluate;
use fg_location::{BoundedProvider, FixedSource};
use fg_schemas::{ActorId, Coordinate};
use fg_verify::{Session, SessionState, VerificationHandle};

pub struct CheckArgs {
    pub config_paths: Vec<String>,
    pub actor: String,
    pub lat: f64,
    pub lon: f64,
    pub accuracy: f64,
    pub time_in: bool,
}

/// Prints key=value lines then the snapshot as JSON. Returns whether the
/// action is permitted.
pub async fn run(args: CheckArgs) -> Result<bool> {
    let (config, hash) = super::load_config(&args.config_paths)?;
    let actor_id = ActorId::new(args.actor);
    let actor = config
        .actor(&actor_id)
        .with_context(|| format!("unknown actor '{}'", actor_id))?;
    let fix = Coordinate::validated(args.lat, args.lon)?;

    println!("config_hash={}", hash);
    println!("actor_id={}", actor.id);
    println!("role={}", actor.role);

    if !args.time_in && !config.gate.requires_verification(actor.role) {
        let decision = evaluate(&config.gate, actor, None);
        println!("permitted={}", decision.permitted);
        println!("message={}", decision.reason.message());
        return Ok(decision.permitted);
    }

    let provider = Arc::new(BoundedProvider::new(FixedSource::new(fix, args.accuracy)));
    let handle = if args.time_in {
        VerificationHandle::for_time_in(
            actor,
            &config.children,
            &config.zones,
            provider,
            config.location,
        )
    } else {
        VerificationHandle::new(
            Session::new(actor),
            config.zones_for(actor),
            provider,
            config.location,
        )
    };
    handle.verify();
    let snapshot = handle.settled().await;

    // Time-in has no access gate; a verified home is the permission.
    let (permitted, message) = if args.time_in {
        let ok = snapshot.state == SessionState::Verified;
        let msg = match (&snapshot.matched_zone, ok) {
            (Some(zone), true) => format!("At {}.", zone.display_name),
            _ => "Not at an assigned child's home.".to_string(),
        };
        (ok, msg)
    } else {
        let decision = evaluate(&config.gate, actor, Some(&snapshot));
        (decision.permitted, decision.reason.message())
    };

    println!("state={}", snapshot.state.as_str());
    println!(
        "matched_zone={}",
        snapshot
            .matched_zone
            .as_ref()
            .map(|z| z.id.as_str())
            .unwrap_or("none")
    );
    if let (SessionState::Denied, Some(sample)) = (snapshot.state, &snapshot.sample) {
        if let Some((zone, d)) = fg_geo::nearest_zone(sample.coordinate, handle.zones()) {
            println!("nearest_zone={} distance_meters={:.0}", zone.id, d);
        }
    }
    println!("permitted={}", permitted);
    println!("message={}", message);
    println!(
        "{}",
        serde_json::to_string_pretty(&snapshot).context("snapshot serialize failed")?
    );

    Ok(permitted)
}
