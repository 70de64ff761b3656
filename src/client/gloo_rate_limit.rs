//! Window timer backed by browser timeouts.

use std::time::Duration;

pub(super) use web_time::Instant;

pub(super) async fn sleep_until(deadline: Instant) {
    // browser timers have millisecond resolution; round up so we never wake before the deadline
    let remaining = deadline.saturating_duration_since(Instant::now());
    gloo_timers::future::sleep(remaining + Duration::from_millis(1)).await
}
