//! fg-verify
//!
//! Verification session: orchestrates one actor's location check.
//!
//! # Layers
//!
//! - [`Session`]: the pure state machine. Transitions are plain method
//!   calls; no clock, no IO, no async.
//! - [`VerificationHandle`]: drives a `Session` with a location provider on
//!   the tokio runtime, one spawned task per attempt.
//! - [`record_time_in`]: turns a verified session into an attendance event.
//!
//! # Supersede policy
//!
//! Starting a check while one is in flight supersedes it. The session hands
//! out a new [`AttemptId`], the handle aborts the stale task (dropping the
//! provider future), and if a stale resolution still arrives the session
//! discards it because its attempt id is no longer current. The last attempt
//! *started* wins, never the last one resolved.

mod handle;
mod outcome;
mod session;
mod timein;

pub use handle::{start_verification, VerificationHandle};
pub use outcome::{VerificationOutcome, VerificationStatus};
pub use session::{ApplyResult, AttemptId, Session, SessionSnapshot, SessionState};
pub use timein::{
    record_time_in, time_in_zones, AttendanceSink, MemoryAttendanceSink, TimeInError, TimeInEvent,
};
