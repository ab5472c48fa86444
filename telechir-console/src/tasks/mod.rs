//! Embassy async tasks
//!
//! Each task runs independently and communicates via channels/signals.

pub mod coordinator;
pub mod input;
pub mod link_rx;
pub mod link_tx;
pub mod tick;
pub mod watchdog;

pub use coordinator::coordinator_task;
pub use input::{input_task, Button, ButtonRole, KnobBank};
pub use link_rx::link_rx_task;
pub use link_tx::link_tx_task;
pub use tick::tick_task;
pub use watchdog::watchdog_task;
