use std::time::SystemTime;

use time::OffsetDateTime;

/// Request and response bodies of the game endpoints.
pub mod action;
/// Health check payloads.
pub mod health;
/// Session snapshots pushed to clients.
pub mod session;
/// Server-Sent Events payloads.
pub mod sse;
/// Custom validators for request bodies.
pub mod validation;

/// Milliseconds since the Unix epoch, the unit clients use for countdowns.
fn epoch_millis(time: SystemTime) -> i64 {
    (OffsetDateTime::from(time).unix_timestamp_nanos() / 1_000_000) as i64
}
