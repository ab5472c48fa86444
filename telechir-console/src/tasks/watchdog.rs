//! Movement watchdog scheduler task
//!
//! Drives the coordinator's movement monitor on a fixed cadence. The
//! monitor itself applies a coarser per-servo evaluation interval on top
//! of this tick.
//!
//! The watchdog starts once and runs for the life of the process; a
//! second start request is a no-op.

use defmt::*;
use embassy_time::{Duration, Instant, Ticker};
use portable_atomic::{AtomicBool, Ordering};

use crate::channels::WATCHDOG_POLL;

static WATCHDOG_ACTIVE: AtomicBool = AtomicBool::new(false);

/// Watchdog task - requests a monitor evaluation on every tick
#[embassy_executor::task]
pub async fn watchdog_task(tick_ms: u32) {
    if WATCHDOG_ACTIVE.swap(true, Ordering::AcqRel) {
        warn!("Watchdog already running, ignoring second start");
        return;
    }
    info!("Movement watchdog started ({} ms tick)", tick_ms);

    let mut ticker = Ticker::every(Duration::from_millis(tick_ms as u64));

    loop {
        ticker.next().await;
        let now_ms = Instant::now().as_millis() as u32;
        WATCHDOG_POLL.signal(now_ms);
    }
}
