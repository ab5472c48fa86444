//! Telemetry messages sent from the rover to the console
//!
//! Telemetry frames always carry SEQ 0; the only message that refers to a
//! sequence number is `Ack`, which echoes the acknowledged command's SEQ in
//! its payload.

use crate::command::{ServoId, ServoSpeed};
use crate::frame::{Frame, FrameError, MAX_PAYLOAD_SIZE};
use heapless::Vec;

// Message type IDs: rover → console
pub const MSG_ACK: u8 = 0x20;
pub const MSG_SERVO_ANGLE: u8 = 0x21;
pub const MSG_SERVO_STATUS: u8 = 0x22;
pub const MSG_SERVO_STOPPED: u8 = 0x23;
pub const MSG_MOTOR_STATUS: u8 = 0x24;
pub const MSG_DEVICE_STATUS: u8 = 0x25;
pub const MSG_VIDEO_FRAME: u8 = 0x26;
pub const MSG_STREAM_STATUS: u8 = 0x27;

/// Video frame metadata bytes preceding the image data
const VIDEO_HEADER_LEN: usize = 5;

/// Maximum JPEG chunk bytes per video frame message
pub const MAX_VIDEO_CHUNK: usize = MAX_PAYLOAD_SIZE - VIDEO_HEADER_LEN;

/// Wheel motor transmission mode as reported by the rover
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriveMode {
    #[default]
    Off,
    Synchronized,
    Differential,
    Independent,
}

impl DriveMode {
    fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(DriveMode::Off),
            0x01 => Some(DriveMode::Synchronized),
            0x02 => Some(DriveMode::Differential),
            0x03 => Some(DriveMode::Independent),
            _ => None,
        }
    }

    fn to_byte(self) -> u8 {
        match self {
            DriveMode::Off => 0x00,
            DriveMode::Synchronized => 0x01,
            DriveMode::Differential => 0x02,
            DriveMode::Independent => 0x03,
        }
    }
}

/// Reported state of a single wheel motor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MotorReadout {
    /// PWM duty (0-255)
    pub speed: u8,
    pub reverse: bool,
}

/// Messages from the rover to the console
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RobotMessage {
    /// Acknowledgment of a command, by sequence number
    Ack { seq: u8, success: bool },
    /// Live angle report for a servo
    ServoAngle { servo: ServoId, angle: u16 },
    /// Full per-servo record (sent once per servo on status sync)
    ServoStatus {
        servo: ServoId,
        angle: u16,
        limit: u16,
        speed: ServoSpeed,
        moving: bool,
        reverse: bool,
    },
    /// Confirmation that a servo has come to a stop
    ServoStopped { servo: ServoId },
    /// Wheel motor state report
    MotorStatus {
        mode: DriveMode,
        motors: [MotorReadout; 4],
    },
    /// Connectivity of the rover's device boards
    DeviceStatus {
        motors_connected: bool,
        servos_connected: bool,
    },
    /// One video frame chunk with its metadata
    ///
    /// The console does not decode image data; it reads the metadata and
    /// hands the bytes to the screen.
    VideoFrame {
        fps: u8,
        width: u16,
        height: u16,
        data: Vec<u8, MAX_VIDEO_CHUNK>,
    },
    /// Stream lifecycle notification
    StreamStatus { active: bool },
}

fn read_u16(bytes: &[u8]) -> u16 {
    u16::from_le_bytes([bytes[0], bytes[1]])
}

impl RobotMessage {
    /// Encode this message into a frame (for rover-side use or simulation)
    pub fn to_frame(&self) -> Result<Frame, FrameError> {
        match self {
            RobotMessage::Ack { seq, success } => {
                Frame::new(0, MSG_ACK, &[*seq, *success as u8])
            }
            RobotMessage::ServoAngle { servo, angle } => {
                let [lo, hi] = angle.to_le_bytes();
                Frame::new(0, MSG_SERVO_ANGLE, &[servo.to_byte(), lo, hi])
            }
            RobotMessage::ServoStatus {
                servo,
                angle,
                limit,
                speed,
                moving,
                reverse,
            } => {
                let [angle_lo, angle_hi] = angle.to_le_bytes();
                let [limit_lo, limit_hi] = limit.to_le_bytes();
                let flags = (*moving as u8) | ((*reverse as u8) << 1);
                Frame::new(
                    0,
                    MSG_SERVO_STATUS,
                    &[
                        servo.to_byte(),
                        angle_lo,
                        angle_hi,
                        limit_lo,
                        limit_hi,
                        speed.to_byte(),
                        flags,
                    ],
                )
            }
            RobotMessage::ServoStopped { servo } => {
                Frame::new(0, MSG_SERVO_STOPPED, &[servo.to_byte()])
            }
            RobotMessage::MotorStatus { mode, motors } => {
                let mut payload = Vec::<u8, MAX_PAYLOAD_SIZE>::new();
                payload
                    .push(mode.to_byte())
                    .map_err(|_| FrameError::PayloadTooLarge)?;
                for motor in motors {
                    payload
                        .push(motor.speed)
                        .map_err(|_| FrameError::PayloadTooLarge)?;
                    payload
                        .push(motor.reverse as u8)
                        .map_err(|_| FrameError::PayloadTooLarge)?;
                }
                Frame::new(0, MSG_MOTOR_STATUS, &payload)
            }
            RobotMessage::DeviceStatus {
                motors_connected,
                servos_connected,
            } => {
                let flags = (*motors_connected as u8) | ((*servos_connected as u8) << 1);
                Frame::new(0, MSG_DEVICE_STATUS, &[flags])
            }
            RobotMessage::VideoFrame {
                fps,
                width,
                height,
                data,
            } => {
                let mut payload = Vec::<u8, MAX_PAYLOAD_SIZE>::new();
                let [w_lo, w_hi] = width.to_le_bytes();
                let [h_lo, h_hi] = height.to_le_bytes();
                payload
                    .extend_from_slice(&[*fps, w_lo, w_hi, h_lo, h_hi])
                    .map_err(|_| FrameError::PayloadTooLarge)?;
                payload
                    .extend_from_slice(data)
                    .map_err(|_| FrameError::PayloadTooLarge)?;
                Frame::new(0, MSG_VIDEO_FRAME, &payload)
            }
            RobotMessage::StreamStatus { active } => {
                Frame::new(0, MSG_STREAM_STATUS, &[*active as u8])
            }
        }
    }

    /// Parse a telemetry message from a frame
    pub fn from_frame(frame: &Frame) -> Result<Self, FrameError> {
        let payload = &frame.payload;
        match frame.msg_type {
            MSG_ACK => {
                if payload.len() != 2 {
                    return Err(FrameError::InvalidFrame);
                }
                Ok(RobotMessage::Ack {
                    seq: payload[0],
                    success: payload[1] != 0,
                })
            }
            MSG_SERVO_ANGLE => {
                if payload.len() != 3 {
                    return Err(FrameError::InvalidFrame);
                }
                Ok(RobotMessage::ServoAngle {
                    servo: ServoId::from_byte(payload[0]).ok_or(FrameError::InvalidFrame)?,
                    angle: read_u16(&payload[1..]),
                })
            }
            MSG_SERVO_STATUS => {
                if payload.len() != 7 {
                    return Err(FrameError::InvalidFrame);
                }
                Ok(RobotMessage::ServoStatus {
                    servo: ServoId::from_byte(payload[0]).ok_or(FrameError::InvalidFrame)?,
                    angle: read_u16(&payload[1..]),
                    limit: read_u16(&payload[3..]),
                    speed: ServoSpeed::from_byte(payload[5]).ok_or(FrameError::InvalidFrame)?,
                    moving: payload[6] & 0x01 != 0,
                    reverse: payload[6] & 0x02 != 0,
                })
            }
            MSG_SERVO_STOPPED => {
                if payload.len() != 1 {
                    return Err(FrameError::InvalidFrame);
                }
                Ok(RobotMessage::ServoStopped {
                    servo: ServoId::from_byte(payload[0]).ok_or(FrameError::InvalidFrame)?,
                })
            }
            MSG_MOTOR_STATUS => {
                if payload.len() != 9 {
                    return Err(FrameError::InvalidFrame);
                }
                let mode = DriveMode::from_byte(payload[0]).ok_or(FrameError::InvalidFrame)?;
                let mut motors = [MotorReadout::default(); 4];
                for (i, motor) in motors.iter_mut().enumerate() {
                    motor.speed = payload[1 + i * 2];
                    motor.reverse = payload[2 + i * 2] != 0;
                }
                Ok(RobotMessage::MotorStatus { mode, motors })
            }
            MSG_DEVICE_STATUS => {
                if payload.len() != 1 {
                    return Err(FrameError::InvalidFrame);
                }
                Ok(RobotMessage::DeviceStatus {
                    motors_connected: payload[0] & 0x01 != 0,
                    servos_connected: payload[0] & 0x02 != 0,
                })
            }
            MSG_VIDEO_FRAME => {
                if payload.len() < VIDEO_HEADER_LEN {
                    return Err(FrameError::InvalidFrame);
                }
                let mut data = Vec::new();
                data.extend_from_slice(&payload[VIDEO_HEADER_LEN..])
                    .map_err(|_| FrameError::PayloadTooLarge)?;
                Ok(RobotMessage::VideoFrame {
                    fps: payload[0],
                    width: read_u16(&payload[1..]),
                    height: read_u16(&payload[3..]),
                    data,
                })
            }
            MSG_STREAM_STATUS => {
                if payload.len() != 1 {
                    return Err(FrameError::InvalidFrame);
                }
                Ok(RobotMessage::StreamStatus {
                    active: payload[0] != 0,
                })
            }
            _ => Err(FrameError::InvalidFrame),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ack_roundtrip() {
        let original = RobotMessage::Ack {
            seq: 17,
            success: false,
        };
        let frame = original.to_frame().unwrap();
        assert_eq!(frame.seq, 0);
        assert_eq!(RobotMessage::from_frame(&frame).unwrap(), original);
    }

    #[test]
    fn test_servo_angle_roundtrip() {
        let original = RobotMessage::ServoAngle {
            servo: ServoId::Rotate,
            angle: 300,
        };
        let frame = original.to_frame().unwrap();
        assert_eq!(RobotMessage::from_frame(&frame).unwrap(), original);
    }

    #[test]
    fn test_servo_status_flags() {
        let original = RobotMessage::ServoStatus {
            servo: ServoId::Pan,
            angle: 45,
            limit: 90,
            speed: ServoSpeed::Low,
            moving: true,
            reverse: true,
        };
        let frame = original.to_frame().unwrap();
        assert_eq!(frame.payload[6], 0x03);
        assert_eq!(RobotMessage::from_frame(&frame).unwrap(), original);
    }

    #[test]
    fn test_motor_status_roundtrip() {
        let original = RobotMessage::MotorStatus {
            mode: DriveMode::Differential,
            motors: [
                MotorReadout {
                    speed: 128,
                    reverse: true,
                },
                MotorReadout {
                    speed: 255,
                    reverse: false,
                },
                MotorReadout {
                    speed: 128,
                    reverse: true,
                },
                MotorReadout {
                    speed: 255,
                    reverse: false,
                },
            ],
        };
        let frame = original.to_frame().unwrap();
        assert_eq!(RobotMessage::from_frame(&frame).unwrap(), original);
    }

    #[test]
    fn test_device_status_roundtrip() {
        let original = RobotMessage::DeviceStatus {
            motors_connected: true,
            servos_connected: false,
        };
        let frame = original.to_frame().unwrap();
        assert_eq!(frame.payload[0], 0x01);
        assert_eq!(RobotMessage::from_frame(&frame).unwrap(), original);
    }

    #[test]
    fn test_video_frame_roundtrip() {
        let mut data = Vec::<u8, MAX_VIDEO_CHUNK>::new();
        data.extend_from_slice(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10])
            .unwrap();
        let original = RobotMessage::VideoFrame {
            fps: 30,
            width: 640,
            height: 480,
            data,
        };
        let frame = original.to_frame().unwrap();
        assert_eq!(RobotMessage::from_frame(&frame).unwrap(), original);
    }

    #[test]
    fn test_video_frame_empty_data_allowed() {
        let original = RobotMessage::VideoFrame {
            fps: 0,
            width: 0,
            height: 0,
            data: Vec::new(),
        };
        let frame = original.to_frame().unwrap();
        assert_eq!(RobotMessage::from_frame(&frame).unwrap(), original);
    }

    #[test]
    fn test_truncated_video_frame_rejected() {
        let frame = Frame::new(0, MSG_VIDEO_FRAME, &[30, 0x80]).unwrap();
        assert_eq!(
            RobotMessage::from_frame(&frame),
            Err(FrameError::InvalidFrame)
        );
    }

    #[test]
    fn test_unknown_type_rejected() {
        let frame = Frame::empty(0, 0x7F);
        assert_eq!(
            RobotMessage::from_frame(&frame),
            Err(FrameError::InvalidFrame)
        );
    }
}
