//! Rover link receive task
//!
//! Receives frames from the rover radio UART and dispatches telemetry to
//! the coordinator.

use defmt::*;
use embassy_rp::uart::BufferedUartRx;
use embedded_io_async::Read;

use telechir_protocol::{FrameParser, RobotMessage};

use crate::channels::TELEMETRY_CHANNEL;

/// Buffer size for UART receive
const RX_BUF_SIZE: usize = 256;

/// Link RX task - receives and parses frames from the rover
#[embassy_executor::task]
pub async fn link_rx_task(mut rx: BufferedUartRx) {
    info!("Link RX task started");

    let mut parser = FrameParser::new();
    let mut buf = [0u8; RX_BUF_SIZE];

    loop {
        // Read available bytes
        match rx.read(&mut buf).await {
            Ok(n) if n > 0 => {
                trace!("RX: {} bytes", n);

                // Feed bytes to parser
                for &byte in &buf[..n] {
                    match parser.feed(byte) {
                        Ok(Some(frame)) => match RobotMessage::from_frame(&frame) {
                            Ok(message) => {
                                // Dispatch to the coordinator, dropping if
                                // full (video frames outpace a stalled
                                // coordinator)
                                if TELEMETRY_CHANNEL.try_send(message).is_err() {
                                    warn!("Telemetry channel full, dropping message");
                                }
                            }
                            Err(e) => {
                                warn!("Failed to parse telemetry: {:?}", e);
                            }
                        },
                        Ok(None) => {
                            // Need more bytes
                        }
                        Err(e) => {
                            warn!("Frame parse error: {:?}", e);
                        }
                    }
                }
            }
            Ok(_) => {
                // No bytes read, continue
            }
            Err(e) => {
                warn!("UART read error: {:?}", e);
            }
        }
    }
}
