//! Platform sleep for hook driver loops.

use std::time::Duration;

use chrono::{DateTime, FixedOffset, Local};

/// Current local time with its UTC offset.
pub fn local_now() -> DateTime<FixedOffset> {
    Local::now().fixed_offset()
}

#[cfg(target_arch = "wasm32")]
pub async fn sleep(duration: Duration) {
    let millis = duration.as_millis().min(u32::MAX as u128) as u32;
    gloo_timers::future::TimeoutFuture::new(millis).await;
}

#[cfg(not(target_arch = "wasm32"))]
pub async fn sleep(duration: Duration) {
    tokio::time::sleep(duration).await;
}

/// Sleep until `deadline`, returning immediately if it has passed.
pub async fn sleep_until(deadline: DateTime<FixedOffset>) {
    let remaining = (deadline - local_now()).to_std().unwrap_or(Duration::ZERO);
    if !remaining.is_zero() {
        sleep(remaining).await;
    }
}
