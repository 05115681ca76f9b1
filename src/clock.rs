//! Monotonic session clock.
//!
//! Timestamps are `f64` seconds measured from a process-wide origin captured
//! on first use. The wire format carries the same floats, so frame math never
//! crosses a unit boundary.

use once_cell::sync::Lazy;
use std::time::Instant;

static ORIGIN: Lazy<Instant> = Lazy::new(Instant::now);

/// Seconds elapsed since the process-wide clock origin.
pub fn now_seconds() -> f64 {
    ORIGIN.elapsed().as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_is_monotonic() {
        let first = now_seconds();
        let second = now_seconds();
        assert!(second >= first);
    }
}
