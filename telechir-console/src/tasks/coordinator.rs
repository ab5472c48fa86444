//! Coordinator task
//!
//! Owns the console state and is the only task that mutates it. Selects
//! over operator input, inbound telemetry, the deferred-timer tick, and
//! the watchdog cadence; after every event it drains the console's
//! outbound commands to the link and echoes new log entries to defmt.

use defmt::*;
use embassy_futures::select::{select4, Either4};
use embassy_time::Instant;

use telechir_core::config::ConsoleConfig;
use telechir_core::console::Console;
use telechir_core::panel::{motor_lines, servo_line};
use telechir_protocol::{RobotMessage, ServoId, ServoSpeed};

use crate::channels::{InputAction, INPUT_CHANNEL, OUTBOUND_CHANNEL, TELEMETRY_CHANNEL, WATCHDOG_POLL};
use crate::tasks::tick::TICK_SIGNAL;

/// Declare the link down after this much RX silence
const LINK_TIMEOUT_MS: u32 = 3000;

/// Coordinator task - main control loop
#[embassy_executor::task]
pub async fn coordinator_task(config: ConsoleConfig) {
    info!("Coordinator task started");

    let mut console = Console::new(config);

    // Knob angle per servo; the move buttons send the servo here
    let mut knob_angle: [u16; 2] = [0; 2];

    // Link supervision from RX activity
    let mut link_up = false;
    let mut last_rx_ms: u32 = 0;

    // Log entries already echoed to defmt
    let mut echoed_logs: u32 = 0;

    loop {
        match select4(
            TELEMETRY_CHANNEL.receive(),
            INPUT_CHANNEL.receive(),
            TICK_SIGNAL.wait(),
            WATCHDOG_POLL.wait(),
        )
        .await
        {
            Either4::First(message) => {
                let now_ms = Instant::now().as_millis() as u32;

                // Any telemetry proves the link is alive
                last_rx_ms = now_ms;
                if !link_up {
                    link_up = true;
                    console.on_connect(now_ms);
                    info!("Link: {}", console.link_health().label());
                }

                console.handle_message(now_ms, &message);
                render_status(&console, &message);
            }

            Either4::Second(action) => {
                let now_ms = Instant::now().as_millis() as u32;
                debug!("Input: {:?}", action);
                handle_input(&mut console, &mut knob_angle, now_ms, action);
            }

            Either4::Third(now_ms) => {
                console.tick(now_ms);

                // Link silence detection
                if link_up && now_ms.saturating_sub(last_rx_ms) > LINK_TIMEOUT_MS {
                    link_up = false;
                    console.on_disconnect(now_ms);
                    info!("Link: {}", console.link_health().label());
                }
            }

            Either4::Fourth(now_ms) => {
                console.poll_monitor(now_ms);
            }
        }

        flush_outbound(&mut console);
        echo_logs(&console, &mut echoed_logs);
    }
}

fn servo_index(servo: ServoId) -> usize {
    match servo {
        ServoId::Pan => 0,
        ServoId::Rotate => 1,
    }
}

/// Apply one operator input to the console
fn handle_input(
    console: &mut Console,
    knob_angle: &mut [u16; 2],
    now_ms: u32,
    action: InputAction,
) {
    match action {
        InputAction::DriveKey { key, pressed } => {
            if pressed {
                console.press_key(now_ms, key);
            } else {
                console.release_key(now_ms, key);
            }
        }
        InputAction::ServoKnob { servo, angle } => {
            // The knob doubles as move target and rotation limit, like the
            // panel slider it replaces
            knob_angle[servo_index(servo)] = angle;
            console.set_limit(now_ms, servo, angle);
        }
        InputAction::DriveSpeedKnob { value } => {
            console.set_drive_speed(value);
        }
        InputAction::ServoMove { servo } => {
            let angle = knob_angle[servo_index(servo)];
            console.move_servo(now_ms, servo, angle, None);
        }
        InputAction::ServoStop { servo } => {
            console.stop_servo(now_ms, servo);
        }
        InputAction::ServoSpeedCycle { servo } => {
            let next = match console.servo(servo).speed {
                ServoSpeed::Low => ServoSpeed::Medium,
                ServoSpeed::Medium => ServoSpeed::High,
                ServoSpeed::High => ServoSpeed::Low,
            };
            console.set_speed(now_ms, servo, next);
        }
        InputAction::ServoReverse { servo } => {
            console.toggle_direction(now_ms, servo);
        }
        InputAction::StreamToggle => {
            if console.stream().is_active() {
                console.stream_stop(now_ms);
            } else {
                console.stream_start(now_ms, None);
            }
        }
    }
}

/// Refresh the status readout for telemetry that changes it
fn render_status(console: &Console, message: &RobotMessage) {
    match message {
        RobotMessage::ServoStatus { servo, .. } => {
            info!("{}", servo_line(*servo, console.servo(*servo)).as_str());
        }
        RobotMessage::MotorStatus { .. } => {
            let (mode, motors) = console.motor_status();
            info!("{}", motor_lines(mode, motors).as_str());
        }
        RobotMessage::DeviceStatus { .. } => {
            info!("Link: {}", console.link_health().label());
        }
        _ => {}
    }
}

/// Move queued commands to the link TX task
fn flush_outbound(console: &mut Console) {
    while let Some(outbound) = console.take_outbound() {
        let seq = outbound.seq;
        if OUTBOUND_CHANNEL.try_send(outbound).is_err() {
            warn!("Outbound channel full, dropping command seq {}", seq);
        }
    }
}

/// Echo log panel entries that arrived since the last call
fn echo_logs(console: &Console, echoed: &mut u32) {
    let panel = console.log_panel();
    let new = panel.total().wrapping_sub(*echoed) as usize;
    *echoed = panel.total();

    // Entries older than the panel window are gone; echo what remains
    let new = new.min(panel.len());
    for entry in panel.iter().skip(panel.len() - new) {
        if entry.error {
            warn!("{}", entry.text.as_str());
        } else {
            info!("{}", entry.text.as_str());
        }
    }
}
