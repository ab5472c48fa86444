//! Rover link transmit task
//!
//! Drains the outbound command queue, encodes each command into a frame,
//! and writes it to the rover radio UART.

use defmt::*;
use embassy_rp::uart::BufferedUartTx;
use embedded_io_async::Write;

use telechir_protocol::frame::MAX_FRAME_SIZE;

use crate::channels::OUTBOUND_CHANNEL;

/// Link TX task - sends command frames to the rover
#[embassy_executor::task]
pub async fn link_tx_task(mut tx: BufferedUartTx) {
    info!("Link TX task started");

    let mut buf = [0u8; MAX_FRAME_SIZE];

    loop {
        let outbound = OUTBOUND_CHANNEL.receive().await;

        let frame = match outbound.command.to_frame(outbound.seq) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Failed to encode command: {:?}", e);
                continue;
            }
        };

        match frame.encode(&mut buf) {
            Ok(len) => {
                if let Err(e) = tx.write_all(&buf[..len]).await {
                    warn!("UART write error: {:?}", e);
                } else {
                    trace!("TX seq {} ({} bytes)", outbound.seq, len);
                }
            }
            Err(e) => {
                warn!("Failed to encode frame: {:?}", e);
            }
        }
    }
}
