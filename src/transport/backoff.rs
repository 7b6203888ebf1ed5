//! Reconnection back-off

use std::time::Duration;

/// Delay before reconnection attempt number `attempt` (1-based).
///
/// Computed as `min(base * 2^(attempt - 1), max)`. Attempt 0 is treated as 1.
pub fn reconnect_delay(base: Duration, max: Duration, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1);
    let multiplier = 2u32.checked_pow(exponent).unwrap_or(u32::MAX);
    base.checked_mul(multiplier).unwrap_or(max).min(max)
}
