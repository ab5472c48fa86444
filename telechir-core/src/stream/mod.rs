//! Video stream lifecycle
//!
//! The console never decodes video; it tracks whether the stream is
//! active, the parameters it was requested with, and the per-frame
//! statistics shown on the status overlay.

use telechir_protocol::StreamParams;

/// Statistics from the most recent video frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StreamStats {
    pub fps: u8,
    pub width: u16,
    pub height: u16,
    /// Frames accepted since the stream started
    pub frames: u32,
}

/// Console-side view of the video stream
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamState {
    active: bool,
    params: StreamParams,
    stats: StreamStats,
}

impl StreamState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn params(&self) -> StreamParams {
        self.params
    }

    pub fn stats(&self) -> StreamStats {
        self.stats
    }

    /// Mark the stream as requested with the given parameters
    ///
    /// The console flips to active optimistically; a later
    /// [`StreamState::on_status`] confirms or corrects.
    pub fn start(&mut self, params: StreamParams) {
        self.active = true;
        self.params = params;
        self.stats = StreamStats::default();
    }

    /// Mark the stream as stopped
    pub fn stop(&mut self) {
        self.active = false;
    }

    /// Apply a stream lifecycle notification from the rover
    ///
    /// Returns true if the active flag changed.
    pub fn on_status(&mut self, active: bool) -> bool {
        let changed = self.active != active;
        self.active = active;
        if changed && !active {
            self.stats = StreamStats::default();
        }
        changed
    }

    /// Record an incoming frame's metadata
    ///
    /// Frames arriving while the stream is inactive are dropped; returns
    /// whether the frame was accepted.
    pub fn on_frame(&mut self, fps: u8, width: u16, height: u16) -> bool {
        if !self.active {
            return false;
        }
        self.stats.fps = fps;
        self.stats.width = width;
        self.stats.height = height;
        self.stats.frames = self.stats.frames.saturating_add(1);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_dropped_while_inactive() {
        let mut stream = StreamState::new();
        assert!(!stream.on_frame(30, 640, 480));
        assert_eq!(stream.stats().frames, 0);
    }

    #[test]
    fn test_start_accepts_frames() {
        let mut stream = StreamState::new();
        stream.start(StreamParams::default());
        assert!(stream.on_frame(24, 640, 480));
        assert!(stream.on_frame(25, 640, 480));
        let stats = stream.stats();
        assert_eq!(stats.fps, 25);
        assert_eq!(stats.frames, 2);
    }

    #[test]
    fn test_stop_notification_clears_stats() {
        let mut stream = StreamState::new();
        stream.start(StreamParams::default());
        stream.on_frame(30, 640, 480);
        assert!(stream.on_status(false));
        assert_eq!(stream.stats().frames, 0);
        assert!(!stream.is_active());
    }

    #[test]
    fn test_status_echo_is_not_a_change() {
        let mut stream = StreamState::new();
        stream.start(StreamParams::default());
        assert!(!stream.on_status(true));
    }
}
