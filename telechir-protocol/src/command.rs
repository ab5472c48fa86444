//! Command messages sent from the console to the rover
//!
//! Commands cover the three controllable subsystems: the camera-head
//! servos, the four wheel motors, and the video stream. Each command frame
//! carries a sequence number; the rover answers with an `Ack` echoing it.

use crate::frame::{Frame, FrameError, MAX_PAYLOAD_SIZE};
use heapless::Vec;

// Message type IDs: console → rover
pub const MSG_SERVO: u8 = 0x01;
pub const MSG_DRIVE: u8 = 0x02;
pub const MSG_MOTORS_OFF: u8 = 0x03;
pub const MSG_STREAM_START: u8 = 0x04;
pub const MSG_STREAM_STOP: u8 = 0x05;
pub const MSG_STATUS_REQUEST: u8 = 0x06;

// Servo action codes within MSG_SERVO payloads
const ACTION_MOVE: u8 = 0x01;
const ACTION_STOP: u8 = 0x02;
const ACTION_LIMIT: u8 = 0x03;
const ACTION_SPEED: u8 = 0x04;
const ACTION_REVERSE: u8 = 0x05;

// Drive mode codes within MSG_DRIVE payloads
const DRIVE_SYNCHRONIZED: u8 = 0x01;
const DRIVE_DIFFERENTIAL: u8 = 0x02;
const DRIVE_INDEPENDENT: u8 = 0x03;

/// Identifies one of the two camera-head servos
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ServoId {
    /// Positional servo tilting the camera (0-180°)
    Pan,
    /// Continuous-rotation servo turning the head (0-360°)
    Rotate,
}

impl ServoId {
    /// Both servos, in wire order
    pub const ALL: [ServoId; 2] = [ServoId::Pan, ServoId::Rotate];

    /// Parse a servo id from its wire format byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(ServoId::Pan),
            0x01 => Some(ServoId::Rotate),
            _ => None,
        }
    }

    /// Convert to wire format byte
    pub fn to_byte(self) -> u8 {
        match self {
            ServoId::Pan => 0x00,
            ServoId::Rotate => 0x01,
        }
    }
}

/// Servo speed setting (three-step, as exposed on the console)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ServoSpeed {
    /// Slowest setting (also used by recovery commands)
    Low,
    #[default]
    Medium,
    High,
}

impl ServoSpeed {
    /// Parse a speed from its wire format byte (1-3)
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(ServoSpeed::Low),
            2 => Some(ServoSpeed::Medium),
            3 => Some(ServoSpeed::High),
            _ => None,
        }
    }

    /// Convert to wire format byte (1-3)
    pub fn to_byte(self) -> u8 {
        match self {
            ServoSpeed::Low => 1,
            ServoSpeed::Medium => 2,
            ServoSpeed::High => 3,
        }
    }
}

/// A single servo operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ServoAction {
    /// Move to an absolute angle at the given speed
    ///
    /// `force` bypasses rover-side interlocks; set by recovery commands.
    Move {
        angle: u16,
        speed: ServoSpeed,
        force: bool,
    },
    /// Halt movement
    Stop { priority: bool, force: bool },
    /// Set the per-episode rotation limit
    SetLimit { limit: u16 },
    /// Change the speed setting without moving
    SetSpeed { speed: ServoSpeed },
    /// Invert the rotation direction
    Reverse,
}

/// A servo action addressed to a specific servo
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ServoRequest {
    pub servo: ServoId,
    pub action: ServoAction,
}

impl ServoRequest {
    pub fn new(servo: ServoId, action: ServoAction) -> Self {
        Self { servo, action }
    }
}

/// Wheel motor drive command
///
/// The rover has four wheel motors driven in one of three transmission
/// modes. Speeds are raw PWM duty values (0-255).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriveCommand {
    /// All four motors at the same speed
    Synchronized { speed: u8, reverse: bool },
    /// Left pair and right pair driven separately (turning)
    Differential {
        left: u8,
        right: u8,
        reverse_left: bool,
        reverse_right: bool,
    },
    /// Each motor driven independently
    Independent {
        speeds: [u8; 4],
        reverse: [bool; 4],
    },
}

/// Video stream parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StreamParams {
    /// JPEG quality (0-100)
    pub quality: u8,
    pub width: u16,
    pub height: u16,
    pub fps: u8,
}

impl Default for StreamParams {
    fn default() -> Self {
        Self {
            quality: 80,
            width: 640,
            height: 480,
            fps: 30,
        }
    }
}

/// Which status report to request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StatusKind {
    /// Device-board connectivity (motor and servo controllers)
    Devices,
    /// Wheel motor state
    Motors,
    /// Full per-servo records
    Servos,
}

impl StatusKind {
    fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(StatusKind::Devices),
            0x02 => Some(StatusKind::Motors),
            0x03 => Some(StatusKind::Servos),
            _ => None,
        }
    }

    fn to_byte(self) -> u8 {
        match self {
            StatusKind::Devices => 0x01,
            StatusKind::Motors => 0x02,
            StatusKind::Servos => 0x03,
        }
    }
}

/// Commands from the console to the rover
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConsoleCommand {
    /// Camera-head servo operation
    Servo(ServoRequest),
    /// Wheel motor drive mode
    Drive(DriveCommand),
    /// Cut power to all wheel motors
    MotorsOff,
    /// Start the video stream with the given parameters
    StreamStart(StreamParams),
    /// Stop the video stream
    StreamStop,
    /// Request a status report
    StatusRequest(StatusKind),
}

fn push_byte(payload: &mut Vec<u8, MAX_PAYLOAD_SIZE>, byte: u8) -> Result<(), FrameError> {
    payload.push(byte).map_err(|_| FrameError::PayloadTooLarge)
}

fn push_u16(payload: &mut Vec<u8, MAX_PAYLOAD_SIZE>, value: u16) -> Result<(), FrameError> {
    payload
        .extend_from_slice(&value.to_le_bytes())
        .map_err(|_| FrameError::PayloadTooLarge)
}

fn read_u16(bytes: &[u8]) -> u16 {
    u16::from_le_bytes([bytes[0], bytes[1]])
}

impl ConsoleCommand {
    /// Encode this command into a frame stamped with `seq`
    pub fn to_frame(&self, seq: u8) -> Result<Frame, FrameError> {
        match self {
            ConsoleCommand::Servo(request) => {
                let mut payload = Vec::<u8, MAX_PAYLOAD_SIZE>::new();
                push_byte(&mut payload, request.servo.to_byte())?;
                match request.action {
                    ServoAction::Move {
                        angle,
                        speed,
                        force,
                    } => {
                        push_byte(&mut payload, ACTION_MOVE)?;
                        push_u16(&mut payload, angle)?;
                        push_byte(&mut payload, speed.to_byte())?;
                        push_byte(&mut payload, force as u8)?;
                    }
                    ServoAction::Stop { priority, force } => {
                        push_byte(&mut payload, ACTION_STOP)?;
                        push_byte(&mut payload, (priority as u8) | ((force as u8) << 1))?;
                    }
                    ServoAction::SetLimit { limit } => {
                        push_byte(&mut payload, ACTION_LIMIT)?;
                        push_u16(&mut payload, limit)?;
                    }
                    ServoAction::SetSpeed { speed } => {
                        push_byte(&mut payload, ACTION_SPEED)?;
                        push_byte(&mut payload, speed.to_byte())?;
                    }
                    ServoAction::Reverse => {
                        push_byte(&mut payload, ACTION_REVERSE)?;
                    }
                }
                Frame::new(seq, MSG_SERVO, &payload)
            }
            ConsoleCommand::Drive(drive) => {
                let mut payload = Vec::<u8, MAX_PAYLOAD_SIZE>::new();
                match *drive {
                    DriveCommand::Synchronized { speed, reverse } => {
                        push_byte(&mut payload, DRIVE_SYNCHRONIZED)?;
                        push_byte(&mut payload, speed)?;
                        push_byte(&mut payload, reverse as u8)?;
                    }
                    DriveCommand::Differential {
                        left,
                        right,
                        reverse_left,
                        reverse_right,
                    } => {
                        push_byte(&mut payload, DRIVE_DIFFERENTIAL)?;
                        push_byte(&mut payload, left)?;
                        push_byte(&mut payload, right)?;
                        push_byte(
                            &mut payload,
                            (reverse_left as u8) | ((reverse_right as u8) << 1),
                        )?;
                    }
                    DriveCommand::Independent { speeds, reverse } => {
                        push_byte(&mut payload, DRIVE_INDEPENDENT)?;
                        for speed in speeds {
                            push_byte(&mut payload, speed)?;
                        }
                        let mut mask = 0u8;
                        for (i, rev) in reverse.iter().enumerate() {
                            mask |= (*rev as u8) << i;
                        }
                        push_byte(&mut payload, mask)?;
                    }
                }
                Frame::new(seq, MSG_DRIVE, &payload)
            }
            ConsoleCommand::MotorsOff => Ok(Frame::empty(seq, MSG_MOTORS_OFF)),
            ConsoleCommand::StreamStart(params) => {
                let mut payload = Vec::<u8, MAX_PAYLOAD_SIZE>::new();
                push_byte(&mut payload, params.quality)?;
                push_u16(&mut payload, params.width)?;
                push_u16(&mut payload, params.height)?;
                push_byte(&mut payload, params.fps)?;
                Frame::new(seq, MSG_STREAM_START, &payload)
            }
            ConsoleCommand::StreamStop => Ok(Frame::empty(seq, MSG_STREAM_STOP)),
            ConsoleCommand::StatusRequest(kind) => {
                Frame::new(seq, MSG_STATUS_REQUEST, &[kind.to_byte()])
            }
        }
    }

    /// Parse a command from a frame (for rover-side handling or simulation)
    pub fn from_frame(frame: &Frame) -> Result<Self, FrameError> {
        match frame.msg_type {
            MSG_SERVO => {
                if frame.payload.len() < 2 {
                    return Err(FrameError::InvalidFrame);
                }
                let servo =
                    ServoId::from_byte(frame.payload[0]).ok_or(FrameError::InvalidFrame)?;
                let args = &frame.payload[2..];
                let action = match frame.payload[1] {
                    ACTION_MOVE => {
                        if args.len() != 4 {
                            return Err(FrameError::InvalidFrame);
                        }
                        ServoAction::Move {
                            angle: read_u16(args),
                            speed: ServoSpeed::from_byte(args[2])
                                .ok_or(FrameError::InvalidFrame)?,
                            force: args[3] != 0,
                        }
                    }
                    ACTION_STOP => {
                        if args.len() != 1 {
                            return Err(FrameError::InvalidFrame);
                        }
                        ServoAction::Stop {
                            priority: args[0] & 0x01 != 0,
                            force: args[0] & 0x02 != 0,
                        }
                    }
                    ACTION_LIMIT => {
                        if args.len() != 2 {
                            return Err(FrameError::InvalidFrame);
                        }
                        ServoAction::SetLimit {
                            limit: read_u16(args),
                        }
                    }
                    ACTION_SPEED => {
                        if args.len() != 1 {
                            return Err(FrameError::InvalidFrame);
                        }
                        ServoAction::SetSpeed {
                            speed: ServoSpeed::from_byte(args[0])
                                .ok_or(FrameError::InvalidFrame)?,
                        }
                    }
                    ACTION_REVERSE => {
                        if !args.is_empty() {
                            return Err(FrameError::InvalidFrame);
                        }
                        ServoAction::Reverse
                    }
                    _ => return Err(FrameError::InvalidFrame),
                };
                Ok(ConsoleCommand::Servo(ServoRequest { servo, action }))
            }
            MSG_DRIVE => {
                if frame.payload.is_empty() {
                    return Err(FrameError::InvalidFrame);
                }
                let args = &frame.payload[1..];
                let drive = match frame.payload[0] {
                    DRIVE_SYNCHRONIZED => {
                        if args.len() != 2 {
                            return Err(FrameError::InvalidFrame);
                        }
                        DriveCommand::Synchronized {
                            speed: args[0],
                            reverse: args[1] != 0,
                        }
                    }
                    DRIVE_DIFFERENTIAL => {
                        if args.len() != 3 {
                            return Err(FrameError::InvalidFrame);
                        }
                        DriveCommand::Differential {
                            left: args[0],
                            right: args[1],
                            reverse_left: args[2] & 0x01 != 0,
                            reverse_right: args[2] & 0x02 != 0,
                        }
                    }
                    DRIVE_INDEPENDENT => {
                        if args.len() != 5 {
                            return Err(FrameError::InvalidFrame);
                        }
                        let mut reverse = [false; 4];
                        for (i, rev) in reverse.iter_mut().enumerate() {
                            *rev = args[4] & (1 << i) != 0;
                        }
                        DriveCommand::Independent {
                            speeds: [args[0], args[1], args[2], args[3]],
                            reverse,
                        }
                    }
                    _ => return Err(FrameError::InvalidFrame),
                };
                Ok(ConsoleCommand::Drive(drive))
            }
            MSG_MOTORS_OFF => Ok(ConsoleCommand::MotorsOff),
            MSG_STREAM_START => {
                if frame.payload.len() != 6 {
                    return Err(FrameError::InvalidFrame);
                }
                Ok(ConsoleCommand::StreamStart(StreamParams {
                    quality: frame.payload[0],
                    width: read_u16(&frame.payload[1..]),
                    height: read_u16(&frame.payload[3..]),
                    fps: frame.payload[5],
                }))
            }
            MSG_STREAM_STOP => Ok(ConsoleCommand::StreamStop),
            MSG_STATUS_REQUEST => {
                if frame.payload.len() != 1 {
                    return Err(FrameError::InvalidFrame);
                }
                Ok(ConsoleCommand::StatusRequest(
                    StatusKind::from_byte(frame.payload[0]).ok_or(FrameError::InvalidFrame)?,
                ))
            }
            _ => Err(FrameError::InvalidFrame),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_servo_move_roundtrip() {
        let original = ConsoleCommand::Servo(ServoRequest::new(
            ServoId::Pan,
            ServoAction::Move {
                angle: 135,
                speed: ServoSpeed::High,
                force: false,
            },
        ));
        let frame = original.to_frame(9).unwrap();
        assert_eq!(frame.seq, 9);
        assert_eq!(frame.msg_type, MSG_SERVO);
        assert_eq!(ConsoleCommand::from_frame(&frame).unwrap(), original);
    }

    #[test]
    fn test_servo_stop_flags() {
        let original = ConsoleCommand::Servo(ServoRequest::new(
            ServoId::Rotate,
            ServoAction::Stop {
                priority: true,
                force: true,
            },
        ));
        let frame = original.to_frame(0).unwrap();
        assert_eq!(frame.payload[0], 0x01); // rotate servo
        assert_eq!(frame.payload[2], 0x03); // both flags set
        assert_eq!(ConsoleCommand::from_frame(&frame).unwrap(), original);
    }

    #[test]
    fn test_drive_differential_roundtrip() {
        let original = ConsoleCommand::Drive(DriveCommand::Differential {
            left: 64,
            right: 128,
            reverse_left: true,
            reverse_right: false,
        });
        let frame = original.to_frame(1).unwrap();
        assert_eq!(ConsoleCommand::from_frame(&frame).unwrap(), original);
    }

    #[test]
    fn test_drive_independent_mask() {
        let original = ConsoleCommand::Drive(DriveCommand::Independent {
            speeds: [85, 170, 255, 0],
            reverse: [true, false, false, true],
        });
        let frame = original.to_frame(1).unwrap();
        assert_eq!(frame.payload[5], 0b1001);
        assert_eq!(ConsoleCommand::from_frame(&frame).unwrap(), original);
    }

    #[test]
    fn test_stream_start_defaults() {
        let original = ConsoleCommand::StreamStart(StreamParams::default());
        let frame = original.to_frame(4).unwrap();
        let parsed = ConsoleCommand::from_frame(&frame).unwrap();
        match parsed {
            ConsoleCommand::StreamStart(params) => {
                assert_eq!(params.quality, 80);
                assert_eq!(params.width, 640);
                assert_eq!(params.height, 480);
                assert_eq!(params.fps, 30);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_status_request_roundtrip() {
        for kind in [StatusKind::Devices, StatusKind::Motors, StatusKind::Servos] {
            let original = ConsoleCommand::StatusRequest(kind);
            let frame = original.to_frame(0).unwrap();
            assert_eq!(ConsoleCommand::from_frame(&frame).unwrap(), original);
        }
    }

    #[test]
    fn test_truncated_servo_payload_rejected() {
        let frame = Frame::new(0, MSG_SERVO, &[0x00, ACTION_MOVE, 0x10]).unwrap();
        assert_eq!(
            ConsoleCommand::from_frame(&frame),
            Err(FrameError::InvalidFrame)
        );
    }

    #[test]
    fn test_unknown_action_rejected() {
        let frame = Frame::new(0, MSG_SERVO, &[0x00, 0x77]).unwrap();
        assert_eq!(
            ConsoleCommand::from_frame(&frame),
            Err(FrameError::InvalidFrame)
        );
    }
}
