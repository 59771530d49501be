//! Retry policy for idempotent Graph reads.
//!
//! Applied to token exchange, recording lookup, and subscription listing.
//! Writes (create/renew/delete) are single-attempt.

use backon::ExponentialBuilder;
use std::time::Duration;

/// Jittered exponential backoff: up to 3 attempts, 200ms initial delay,
/// capped at 5s.
pub(crate) fn read_backoff() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(200))
        .with_max_delay(Duration::from_secs(5))
        .with_max_times(2)
        .with_jitter()
}
