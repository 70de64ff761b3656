//! Window timer backed by the tokio clock.

pub(super) use tokio::time::Instant;

pub(super) async fn sleep_until(deadline: Instant) {
    tokio::time::sleep_until(deadline).await
}
