//! Console coordinator
//!
//! Ties the servo model, rotation limiter, movement monitor, drive
//! controls, and stream state to the rover link. Every operation returns
//! its effects through the outbound command queue and the log panel
//! instead of doing I/O, so the whole control surface is testable on the
//! host and the firmware stays a thin shell.
//!
//! All methods take the current uptime in milliseconds; the coordinator
//! keeps no clock of its own.

pub mod pending;

pub use pending::{PendingAcks, PendingKind};

use core::fmt::Write as _;

use heapless::{Deque, String, Vec};
use telechir_protocol::{
    ConsoleCommand, DriveCommand, DriveMode, MotorReadout, RobotMessage, ServoAction, ServoId,
    ServoRequest, ServoSpeed, StatusKind, StreamParams,
};

use crate::config::ConsoleConfig;
use crate::drive::{DirectionKey, DriveKeys};
use crate::monitor::{EmergencyPlan, MovementMonitor};
use crate::panel::{servo_name, speed_label, LinkHealth, LogPanel, MAX_LOG_TEXT};
use crate::rotation::{RotationLimiter, RotationTracker};
use crate::servo::{ServoBank, ServoKind, ServoState};
use crate::stream::StreamState;

/// Maximum commands queued for transmission
pub const OUTBOX_CAPACITY: usize = 16;

/// Maximum timers armed at once
pub const DEFERRED_CAPACITY: usize = 8;

/// A command ready for the link, stamped with its sequence number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Outbound {
    pub seq: u8,
    pub command: ConsoleCommand,
}

/// Action postponed to a later tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeferredAction {
    /// Flip and send the direction inversion after the settle time
    SendReverse(ServoId),
    /// Second phase of an emergency stop
    EmergencyFollowup(ServoRequest),
    /// Backup stop if the motors-off command is still unacknowledged
    MotorsOffFallback { seq: u8 },
}

#[derive(Debug, Clone, Copy)]
struct Deferred {
    due_ms: u32,
    action: DeferredAction,
}

/// The console's single-threaded control state
pub struct Console {
    config: ConsoleConfig,
    servos: ServoBank,
    limiter: RotationLimiter,
    monitor: MovementMonitor,
    stream: StreamState,
    panel: LogPanel,
    keys: DriveKeys,
    drive_speed: u8,
    link_up: bool,
    motors_connected: bool,
    servos_connected: bool,
    motor_mode: DriveMode,
    motors: [MotorReadout; 4],
    pending: PendingAcks,
    deferred: Vec<Deferred, DEFERRED_CAPACITY>,
    outbox: Deque<Outbound, OUTBOX_CAPACITY>,
    next_seq: u8,
}

impl Console {
    /// Create a console from its configuration
    pub fn new(config: ConsoleConfig) -> Self {
        Self {
            servos: ServoBank::new(),
            limiter: RotationLimiter::new(),
            monitor: MovementMonitor::new(
                config.watchdog.check_interval_ms,
                config.watchdog.strike_limit,
            ),
            stream: StreamState::new(),
            panel: LogPanel::new(),
            keys: DriveKeys::new(),
            drive_speed: config.drive_speed,
            link_up: false,
            motors_connected: false,
            servos_connected: false,
            motor_mode: DriveMode::Off,
            motors: [MotorReadout::default(); 4],
            pending: PendingAcks::new(),
            deferred: Vec::new(),
            outbox: Deque::new(),
            next_seq: 1,
            config,
        }
    }

    // --- accessors ---

    pub fn servo(&self, servo: ServoId) -> &ServoState {
        self.servos.get(servo)
    }

    pub fn rotation(&self, servo: ServoId) -> &RotationTracker {
        self.limiter.tracker(servo)
    }

    pub fn log_panel(&self) -> &LogPanel {
        &self.panel
    }

    pub fn stream(&self) -> &StreamState {
        &self.stream
    }

    pub fn link_health(&self) -> LinkHealth {
        LinkHealth::classify(self.link_up, self.motors_connected, self.servos_connected)
    }

    pub fn motor_status(&self) -> (DriveMode, &[MotorReadout; 4]) {
        (self.motor_mode, &self.motors)
    }

    pub fn drive_speed(&self) -> u8 {
        self.drive_speed
    }

    /// Set the base speed used by the direction controls
    pub fn set_drive_speed(&mut self, speed: u8) {
        self.drive_speed = speed;
    }

    /// Next command for the link, if any
    pub fn take_outbound(&mut self) -> Option<Outbound> {
        self.outbox.pop_front()
    }

    pub fn has_outbound(&self) -> bool {
        !self.outbox.is_empty()
    }

    // --- link lifecycle ---

    /// The transport came up; re-synchronize all device state
    pub fn on_connect(&mut self, now_ms: u32) {
        self.link_up = true;
        self.log(now_ms, false, format_args!("Link to rover up, requesting status"));
        self.send(now_ms, ConsoleCommand::StatusRequest(StatusKind::Devices), None);
        self.send(now_ms, ConsoleCommand::StatusRequest(StatusKind::Motors), None);
        self.send(now_ms, ConsoleCommand::StatusRequest(StatusKind::Servos), None);
    }

    /// The transport went down
    pub fn on_disconnect(&mut self, now_ms: u32) {
        self.link_up = false;
        self.motors_connected = false;
        self.servos_connected = false;
        self.log(now_ms, true, format_args!("Link to rover lost"));
    }

    // --- servo operations ---

    /// Command a servo to an absolute angle
    ///
    /// `speed` of `None` keeps the servo's current setting. The request is
    /// rejected locally when the link is down or the angle exceeds the
    /// configured limit.
    pub fn move_servo(
        &mut self,
        now_ms: u32,
        servo: ServoId,
        angle: u16,
        speed: Option<ServoSpeed>,
    ) {
        let name = servo_name(servo);
        if !self.link_up {
            self.log(
                now_ms,
                true,
                format_args!("No link to rover, cannot move {name}"),
            );
            return;
        }

        let limit = self.servos.get(servo).limit;
        let range = ServoKind::of(servo).range();
        if angle > limit || limit > range {
            self.log(
                now_ms,
                true,
                format_args!("Invalid angle {angle}° for {name} (0-{limit})"),
            );
            return;
        }

        let speed = match speed {
            Some(speed) => {
                self.servos.get_mut(servo).speed = speed;
                speed
            }
            None => self.servos.get(servo).speed,
        };

        // Fresh episode for the rotation limiter
        self.limiter.reset(servo);

        let state = self.servos.get_mut(servo);
        state.moving = true;
        state.target_angle = angle;

        self.send(
            now_ms,
            ConsoleCommand::Servo(ServoRequest::new(
                servo,
                ServoAction::Move {
                    angle,
                    speed,
                    force: false,
                },
            )),
            Some(PendingKind::ServoMove(servo)),
        );
    }

    /// Halt a servo
    pub fn stop_servo(&mut self, now_ms: u32, servo: ServoId) {
        let name = servo_name(servo);
        if !self.link_up {
            self.log(
                now_ms,
                true,
                format_args!("No link to rover, cannot stop {name}"),
            );
            return;
        }

        // Stopped locally right away; the rover confirms asynchronously
        self.servos.get_mut(servo).moving = false;
        self.limiter.reset(servo);

        self.send(
            now_ms,
            ConsoleCommand::Servo(ServoRequest::new(
                servo,
                ServoAction::Stop {
                    priority: true,
                    force: true,
                },
            )),
            Some(PendingKind::ServoStop(servo)),
        );
    }

    /// Change a servo's per-episode rotation limit
    ///
    /// The limit is clamped to the servo's physical range and applied
    /// locally even when the link is down.
    pub fn set_limit(&mut self, now_ms: u32, servo: ServoId, limit: u16) {
        let limit = ServoState::clamp_limit(ServoKind::of(servo), limit);
        self.servos.get_mut(servo).limit = limit;
        self.limiter.reset(servo);

        if self.link_up {
            self.send(
                now_ms,
                ConsoleCommand::Servo(ServoRequest::new(servo, ServoAction::SetLimit { limit })),
                Some(PendingKind::ServoLimit(servo, limit)),
            );
        }
    }

    /// Change a servo's speed setting
    pub fn set_speed(&mut self, now_ms: u32, servo: ServoId, speed: ServoSpeed) {
        self.servos.get_mut(servo).speed = speed;

        if self.link_up {
            self.send(
                now_ms,
                ConsoleCommand::Servo(ServoRequest::new(servo, ServoAction::SetSpeed { speed })),
                Some(PendingKind::ServoSpeed(servo, speed)),
            );
        }
    }

    /// Invert a servo's direction
    ///
    /// The servo is stopped first; the inversion itself is sent after the
    /// settle time so the mechanics come to rest before reversing.
    pub fn toggle_direction(&mut self, now_ms: u32, servo: ServoId) {
        if !self.link_up {
            self.log(
                now_ms,
                true,
                format_args!("No link to rover, cannot change direction"),
            );
            return;
        }

        self.stop_servo(now_ms, servo);
        let due_ms = now_ms.saturating_add(self.config.timeouts.direction_settle_ms);
        self.defer(now_ms, due_ms, DeferredAction::SendReverse(servo));
    }

    // --- drive operations ---

    /// Send a wheel motor drive command
    pub fn drive(&mut self, now_ms: u32, command: DriveCommand) {
        if !self.link_up {
            self.log(now_ms, true, format_args!("No link to rover"));
            return;
        }
        self.send(
            now_ms,
            ConsoleCommand::Drive(command),
            Some(PendingKind::Drive),
        );
    }

    /// Cut power to all wheel motors
    ///
    /// Arms a backup stop: if no acknowledgment arrives within the
    /// fallback timeout, a zero-speed drive command is sent as well. A
    /// late acknowledgment and the backup command can both take effect;
    /// rover-side commands are idempotent.
    pub fn motors_off(&mut self, now_ms: u32) {
        if !self.link_up {
            self.log(now_ms, true, format_args!("No link to rover"));
            return;
        }
        self.log(now_ms, false, format_args!("Sending motors off"));
        if let Some(seq) = self.send(
            now_ms,
            ConsoleCommand::MotorsOff,
            Some(PendingKind::MotorsOff),
        ) {
            let due_ms = now_ms.saturating_add(self.config.timeouts.ack_fallback_ms);
            self.defer(now_ms, due_ms, DeferredAction::MotorsOffFallback { seq });
        }
    }

    /// A direction key went down
    pub fn press_key(&mut self, now_ms: u32, key: DirectionKey) {
        // Held-key repeats do not re-send the command
        if self.keys.press(key) {
            let command = key.command(self.drive_speed);
            self.drive(now_ms, command);
        }
    }

    /// A direction key came up
    pub fn release_key(&mut self, now_ms: u32, key: DirectionKey) {
        if self.keys.release(key) {
            self.motors_off(now_ms);
        }
    }

    /// The console lost focus (sleep, lid close); stop everything
    pub fn focus_lost(&mut self, now_ms: u32) {
        self.keys.clear();
        self.motors_off(now_ms);
    }

    // --- stream operations ---

    /// Start the video stream
    ///
    /// `params` of `None` uses the configured defaults.
    pub fn stream_start(&mut self, now_ms: u32, params: Option<StreamParams>) {
        if !self.link_up {
            self.log(
                now_ms,
                true,
                format_args!("No link to rover, cannot start stream"),
            );
            return;
        }
        let params = params.unwrap_or_else(|| self.config.stream.params());
        self.stream.start(params);
        self.log(now_ms, false, format_args!("Starting video stream"));
        self.send(
            now_ms,
            ConsoleCommand::StreamStart(params),
            Some(PendingKind::StreamStart),
        );
    }

    /// Stop the video stream
    pub fn stream_stop(&mut self, now_ms: u32) {
        if !self.link_up {
            self.log(now_ms, true, format_args!("No link to rover"));
            return;
        }
        self.stream.stop();
        self.log(now_ms, false, format_args!("Stopping video stream"));
        self.send(
            now_ms,
            ConsoleCommand::StreamStop,
            Some(PendingKind::StreamStop),
        );
    }

    // --- inbound telemetry ---

    /// Process a message from the rover
    pub fn handle_message(&mut self, now_ms: u32, message: &RobotMessage) {
        match message {
            RobotMessage::Ack { seq, success } => self.on_ack(now_ms, *seq, *success),
            RobotMessage::ServoAngle { servo, angle } => {
                self.report_angle(now_ms, *servo, *angle);
            }
            RobotMessage::ServoStatus {
                servo,
                angle,
                limit,
                speed,
                moving,
                reverse,
            } => {
                self.apply_status(now_ms, *servo, *angle, *limit, *speed, *moving, *reverse);
            }
            RobotMessage::ServoStopped { servo } => {
                let name = servo_name(*servo);
                self.log(now_ms, false, format_args!("{name} servo stopped"));
            }
            RobotMessage::MotorStatus { mode, motors } => {
                self.motor_mode = *mode;
                self.motors = *motors;
            }
            RobotMessage::DeviceStatus {
                motors_connected,
                servos_connected,
            } => {
                self.motors_connected = *motors_connected;
                self.servos_connected = *servos_connected;
                let motors = if *motors_connected {
                    "connected"
                } else {
                    "disconnected"
                };
                let servos = if *servos_connected {
                    "connected"
                } else {
                    "disconnected"
                };
                self.log(now_ms, false, format_args!("Motor board: {motors}"));
                self.log(now_ms, false, format_args!("Servo board: {servos}"));
            }
            RobotMessage::VideoFrame {
                fps,
                width,
                height,
                ..
            } => {
                // Frames outside an active stream are dropped
                let _ = self.stream.on_frame(*fps, *width, *height);
            }
            RobotMessage::StreamStatus { active } => {
                if self.stream.on_status(*active) {
                    let text = if *active {
                        "Video stream started"
                    } else {
                        "Video stream stopped"
                    };
                    self.log(now_ms, false, format_args!("{text}"));
                }
            }
        }
    }

    /// Live angle report for a servo
    fn report_angle(&mut self, now_ms: u32, servo: ServoId, angle: u16) {
        let state = self.servos.get_mut(servo);
        let prev = state.angle;
        state.angle = angle;

        if prev != angle && state.moving {
            let limit = state.limit;
            if self.limiter.update(servo, angle, limit) {
                let name = servo_name(servo);
                self.log(
                    now_ms,
                    true,
                    format_args!("{name} reached its {limit}° rotation limit, stopping"),
                );
                self.stop_servo(now_ms, servo);
            }
        }
    }

    /// Merge a full per-servo status record
    fn apply_status(
        &mut self,
        now_ms: u32,
        servo: ServoId,
        angle: u16,
        limit: u16,
        speed: ServoSpeed,
        moving: bool,
        reverse: bool,
    ) {
        self.report_angle(now_ms, servo, angle);

        let state = self.servos.get_mut(servo);
        state.limit = limit;

        let was_moving = state.moving;
        state.moving = moving;
        state.speed = speed;
        state.reverse = reverse;

        // A moving → stopped edge ends the episode
        if was_moving && !moving {
            self.limiter.reset(servo);
        }
    }

    /// Resolve a command acknowledgment
    fn on_ack(&mut self, now_ms: u32, seq: u8, success: bool) {
        let Some(kind) = self.pending.take(seq) else {
            // Late or duplicate acknowledgment
            return;
        };

        match kind {
            PendingKind::ServoMove(servo) => {
                let name = servo_name(servo);
                if success {
                    let state = *self.servos.get(servo);
                    let label = speed_label(state.speed);
                    self.log(
                        now_ms,
                        false,
                        format_args!("{name} moving to {}° at {label} speed", state.target_angle),
                    );
                } else {
                    self.log(now_ms, true, format_args!("Failed to move {name}"));
                    // The move never started
                    self.servos.get_mut(servo).moving = false;
                }
            }
            PendingKind::ServoStop(servo) => {
                let name = servo_name(servo);
                if success {
                    self.log(now_ms, false, format_args!("{name} stopped"));
                } else {
                    self.log(now_ms, true, format_args!("Failed to stop {name}"));
                }
            }
            PendingKind::ServoLimit(servo, limit) => {
                let name = servo_name(servo);
                if success {
                    self.log(
                        now_ms,
                        false,
                        format_args!("{name} rotation limit set to {limit}°"),
                    );
                } else {
                    self.log(now_ms, true, format_args!("Failed to set {name} limit"));
                }
            }
            PendingKind::ServoSpeed(servo, speed) => {
                if success {
                    let name = servo_name(servo);
                    let label = speed_label(speed);
                    self.log(now_ms, false, format_args!("{name} speed set to {label}"));
                }
            }
            PendingKind::ServoReverse(servo) => {
                let name = servo_name(servo);
                if success {
                    let reversed = self.servos.get(servo).reverse;
                    let text = if reversed { "inverted" } else { "normal" };
                    self.log(now_ms, false, format_args!("{name} direction {text}"));
                } else {
                    // Roll back the optimistic flip
                    let state = self.servos.get_mut(servo);
                    state.reverse = !state.reverse;
                    self.log(
                        now_ms,
                        true,
                        format_args!("Failed to change {name} direction"),
                    );
                }
            }
            PendingKind::Drive => {
                if success {
                    self.log(now_ms, false, format_args!("Drive command sent"));
                } else {
                    self.log(now_ms, true, format_args!("Drive command rejected"));
                }
            }
            PendingKind::MotorsOff => {
                if success {
                    self.log(now_ms, false, format_args!("Motors off"));
                } else {
                    self.log(now_ms, true, format_args!("Failed to switch motors off"));
                }
            }
            PendingKind::StreamStart => {
                if !success {
                    self.log(now_ms, true, format_args!("Failed to start video stream"));
                }
            }
            PendingKind::StreamStop => {
                if !success {
                    self.log(now_ms, true, format_args!("Failed to stop video stream"));
                }
            }
        }
    }

    // --- timers ---

    /// Run one movement watchdog evaluation
    ///
    /// Call on the watchdog tick cadence; the monitor applies its own
    /// coarser per-servo interval on top.
    pub fn poll_monitor(&mut self, now_ms: u32) {
        let escalations = self.monitor.poll(now_ms, &self.servos);
        for servo in escalations {
            let name = servo_name(servo);
            self.log(
                now_ms,
                true,
                format_args!("Unexpected movement on {name}, sending emergency stop"),
            );

            if !self.link_up {
                continue;
            }

            let state = self.servos.get_mut(servo);
            state.moving = false;
            let plan = EmergencyPlan::for_servo(
                servo,
                state.angle,
                self.config.watchdog.escalation_delay_ms,
            );

            self.send(now_ms, ConsoleCommand::Servo(plan.immediate), None);
            let due_ms = now_ms.saturating_add(plan.followup_delay_ms);
            self.defer(
                now_ms,
                due_ms,
                DeferredAction::EmergencyFollowup(plan.followup),
            );
        }
    }

    /// Release deferred actions that have come due
    pub fn tick(&mut self, now_ms: u32) {
        let mut due: Vec<DeferredAction, DEFERRED_CAPACITY> = Vec::new();
        let mut index = 0;
        while index < self.deferred.len() {
            if self.deferred[index].due_ms <= now_ms {
                let entry = self.deferred.remove(index);
                // Same capacity as the source; push cannot fail
                let _ = due.push(entry.action);
            } else {
                index += 1;
            }
        }

        for action in due {
            match action {
                DeferredAction::SendReverse(servo) => {
                    if !self.link_up {
                        self.log(
                            now_ms,
                            true,
                            format_args!("No link to rover, cannot change direction"),
                        );
                        continue;
                    }
                    // Optimistic flip; rolled back if the rover refuses
                    let state = self.servos.get_mut(servo);
                    state.reverse = !state.reverse;
                    self.send(
                        now_ms,
                        ConsoleCommand::Servo(ServoRequest::new(servo, ServoAction::Reverse)),
                        Some(PendingKind::ServoReverse(servo)),
                    );
                }
                DeferredAction::EmergencyFollowup(request) => {
                    if self.link_up {
                        self.send(now_ms, ConsoleCommand::Servo(request), None);
                    }
                }
                DeferredAction::MotorsOffFallback { seq } => {
                    if self.pending.contains(seq) {
                        self.log(
                            now_ms,
                            true,
                            format_args!("No reply to motors off, sending backup stop"),
                        );
                        self.send(
                            now_ms,
                            ConsoleCommand::Drive(DriveCommand::Synchronized {
                                speed: 0,
                                reverse: false,
                            }),
                            None,
                        );
                    }
                }
            }
        }
    }

    // --- internals ---

    fn alloc_seq(&mut self) -> u8 {
        let seq = self.next_seq;
        // SEQ 0 is reserved for telemetry frames
        self.next_seq = if self.next_seq == u8::MAX {
            1
        } else {
            self.next_seq + 1
        };
        seq
    }

    /// Queue a command, tracking it for acknowledgment when `kind` is set
    fn send(
        &mut self,
        now_ms: u32,
        command: ConsoleCommand,
        kind: Option<PendingKind>,
    ) -> Option<u8> {
        let seq = self.alloc_seq();
        if self.outbox.push_back(Outbound { seq, command }).is_err() {
            self.log(
                now_ms,
                true,
                format_args!("Command queue full, dropping command"),
            );
            return None;
        }
        if let Some(kind) = kind {
            self.pending.insert(seq, kind);
        }
        Some(seq)
    }

    fn defer(&mut self, now_ms: u32, due_ms: u32, action: DeferredAction) {
        if self.deferred.push(Deferred { due_ms, action }).is_err() {
            self.log(now_ms, true, format_args!("Too many pending timers"));
        }
    }

    fn log(&mut self, now_ms: u32, error: bool, args: core::fmt::Arguments<'_>) {
        let mut text: String<MAX_LOG_TEXT> = String::new();
        let _ = write!(text, "{args}");
        self.panel.push(now_ms / 1000, error, text.as_str());
    }
}
