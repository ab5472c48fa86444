//! Tick task for time-based updates
//!
//! Provides periodic ticks to the coordinator for:
//! - Deferred command timers (direction settle, emergency phase two,
//!   motors-off fallback)
//! - Link silence detection

use defmt::*;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Instant, Ticker};

/// Tick interval in milliseconds
///
/// Bounds how late a deferred command can fire; the shortest deferred
/// delay is 100 ms.
pub const TICK_INTERVAL_MS: u32 = 50;

/// Signal to notify the coordinator of a tick
pub static TICK_SIGNAL: Signal<CriticalSectionRawMutex, u32> = Signal::new();

/// Tick task - sends periodic tick signals with timestamp
///
/// Timestamps are uptime milliseconds; every task stamps time from the
/// same clock so deferred deadlines compare correctly.
#[embassy_executor::task]
pub async fn tick_task() {
    info!("Tick task started");

    let mut ticker = Ticker::every(Duration::from_millis(TICK_INTERVAL_MS as u64));

    loop {
        ticker.next().await;

        let now_ms = Instant::now().as_millis() as u32;

        // Signal the coordinator
        TICK_SIGNAL.signal(now_ms);
    }
}
