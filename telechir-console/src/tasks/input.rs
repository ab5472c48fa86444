//! Operator input task
//!
//! Scans the pendant's buttons and knobs and turns debounced changes into
//! [`InputAction`]s for the coordinator.
//!
//! Buttons are active-low with internal pull-ups. Direction keys report
//! both edges (press drives, release of the last key cuts power); every
//! other button reports presses only. The three knobs (pan angle, rotate
//! angle, drive speed) are potentiometers on the ADC; a knob value is
//! reported once it settles, mimicking a slider being released.

use defmt::*;
use embassy_rp::adc::{Adc, Async, Channel as AdcChannel};
use embassy_rp::gpio::Input;
use embassy_time::{Duration, Ticker};
use heapless::Vec;

use telechir_core::drive::DirectionKey;
use telechir_protocol::ServoId;

use crate::channels::{InputAction, INPUT_CHANNEL};

/// Button scan interval
const SCAN_INTERVAL_MS: u64 = 10;

/// Consecutive scans a contact must hold before a state change counts
const DEBOUNCE_SCANS: u8 = 3;

/// Knobs are sampled every Nth button scan
const KNOB_SCAN_DIVIDER: u8 = 5;

/// Scans a knob must hold still before its value is reported
const KNOB_SETTLE_SCANS: u8 = 4;

/// Maximum buttons on the pendant
pub const MAX_BUTTONS: usize = 16;

/// What a button press means
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonRole {
    Drive(DirectionKey),
    Move(ServoId),
    Stop(ServoId),
    SpeedCycle(ServoId),
    Reverse(ServoId),
    Stream,
}

/// One debounced button
pub struct Button {
    input: Input<'static>,
    role: ButtonRole,
    debounce: u8,
    pressed: bool,
}

impl Button {
    pub fn new(input: Input<'static>, role: ButtonRole) -> Self {
        Self {
            input,
            role,
            debounce: 0,
            pressed: false,
        }
    }

    /// Sample the contact; returns the new state on a debounced edge
    fn scan(&mut self) -> Option<bool> {
        let raw = self.input.is_low();
        if raw == self.pressed {
            self.debounce = 0;
            return None;
        }
        self.debounce += 1;
        if self.debounce < DEBOUNCE_SCANS {
            return None;
        }
        self.debounce = 0;
        self.pressed = raw;
        Some(raw)
    }
}

/// A potentiometer with settle detection
struct Knob {
    emitted: u16,
    candidate: u16,
    stable_scans: u8,
    jitter: u16,
}

impl Knob {
    fn new(jitter: u16) -> Self {
        Self {
            emitted: 0,
            candidate: 0,
            stable_scans: 0,
            jitter,
        }
    }

    /// Feed a scaled sample; returns the value once it has settled
    fn update(&mut self, value: u16) -> Option<u16> {
        if value.abs_diff(self.candidate) > self.jitter {
            self.candidate = value;
            self.stable_scans = 0;
            return None;
        }
        if self.candidate.abs_diff(self.emitted) <= self.jitter {
            return None;
        }
        self.stable_scans += 1;
        if self.stable_scans < KNOB_SETTLE_SCANS {
            return None;
        }
        self.stable_scans = 0;
        self.emitted = self.candidate;
        Some(self.candidate)
    }
}

/// The pendant's three ADC knobs
pub struct KnobBank {
    pub pan: AdcChannel<'static>,
    pub rotate: AdcChannel<'static>,
    pub drive_speed: AdcChannel<'static>,
}

/// Scale a 12-bit ADC reading onto 0..=max
fn scale(raw: u16, max: u16) -> u16 {
    (raw as u32 * max as u32 / 4095) as u16
}

async fn emit(action: InputAction) {
    // Block rather than drop: input ordering matters for key state
    INPUT_CHANNEL.send(action).await;
}

/// Input task - scans buttons and knobs
#[embassy_executor::task]
pub async fn input_task(
    mut buttons: Vec<Button, MAX_BUTTONS>,
    mut adc: Adc<'static, Async>,
    mut knobs: KnobBank,
) {
    info!("Input task started ({} buttons)", buttons.len());

    let mut ticker = Ticker::every(Duration::from_millis(SCAN_INTERVAL_MS));
    let mut knob_divider: u8 = 0;

    let mut pan_knob = Knob::new(2);
    let mut rotate_knob = Knob::new(4);
    let mut speed_knob = Knob::new(3);

    loop {
        ticker.next().await;

        for button in buttons.iter_mut() {
            let Some(pressed) = button.scan() else {
                continue;
            };

            match button.role {
                ButtonRole::Drive(key) => {
                    emit(InputAction::DriveKey { key, pressed }).await;
                }
                // The remaining roles act on press only
                _ if !pressed => {}
                ButtonRole::Move(servo) => {
                    emit(InputAction::ServoMove { servo }).await;
                }
                ButtonRole::Stop(servo) => {
                    emit(InputAction::ServoStop { servo }).await;
                }
                ButtonRole::SpeedCycle(servo) => {
                    emit(InputAction::ServoSpeedCycle { servo }).await;
                }
                ButtonRole::Reverse(servo) => {
                    emit(InputAction::ServoReverse { servo }).await;
                }
                ButtonRole::Stream => {
                    emit(InputAction::StreamToggle).await;
                }
            }
        }

        knob_divider += 1;
        if knob_divider < KNOB_SCAN_DIVIDER {
            continue;
        }
        knob_divider = 0;

        if let Ok(raw) = adc.read(&mut knobs.pan).await {
            if let Some(angle) = pan_knob.update(scale(raw, 180)) {
                emit(InputAction::ServoKnob {
                    servo: ServoId::Pan,
                    angle,
                })
                .await;
            }
        }

        if let Ok(raw) = adc.read(&mut knobs.rotate).await {
            if let Some(angle) = rotate_knob.update(scale(raw, 360)) {
                emit(InputAction::ServoKnob {
                    servo: ServoId::Rotate,
                    angle,
                })
                .await;
            }
        }

        if let Ok(raw) = adc.read(&mut knobs.drive_speed).await {
            if let Some(value) = speed_knob.update(scale(raw, 255)) {
                emit(InputAction::DriveSpeedKnob {
                    value: value as u8,
                })
                .await;
            }
        }
    }
}
