//! Pending acknowledgment bookkeeping
//!
//! Each tracked command remembers enough intent to react to its
//! acknowledgment: log the confirmation, or roll back an optimistic
//! state change on failure. Entries for commands the rover never answers
//! are eventually evicted by newer traffic.

use heapless::Vec;
use telechir_protocol::{ServoId, ServoSpeed};

/// Maximum commands awaiting acknowledgment
pub const PENDING_CAPACITY: usize = 16;

/// What was asked of the rover, for acknowledgment handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PendingKind {
    ServoMove(ServoId),
    ServoStop(ServoId),
    ServoLimit(ServoId, u16),
    ServoSpeed(ServoId, ServoSpeed),
    ServoReverse(ServoId),
    Drive,
    MotorsOff,
    StreamStart,
    StreamStop,
}

/// Commands in flight, keyed by sequence number
#[derive(Debug, Clone, Default)]
pub struct PendingAcks {
    entries: Vec<(u8, PendingKind), PENDING_CAPACITY>,
}

impl PendingAcks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a command; the oldest entry is evicted when full
    pub fn insert(&mut self, seq: u8, kind: PendingKind) {
        if self.entries.is_full() {
            self.entries.remove(0);
        }
        // Cannot fail after the eviction above
        let _ = self.entries.push((seq, kind));
    }

    /// Resolve a sequence number, removing its entry
    pub fn take(&mut self, seq: u8) -> Option<PendingKind> {
        let index = self.entries.iter().position(|(s, _)| *s == seq)?;
        Some(self.entries.remove(index).1)
    }

    /// True while the sequence number is still unresolved
    pub fn contains(&self, seq: u8) -> bool {
        self.entries.iter().any(|(s, _)| *s == seq)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_removes_entry() {
        let mut pending = PendingAcks::new();
        pending.insert(1, PendingKind::MotorsOff);
        pending.insert(2, PendingKind::Drive);

        assert_eq!(pending.take(1), Some(PendingKind::MotorsOff));
        assert!(!pending.contains(1));
        assert!(pending.contains(2));
        assert_eq!(pending.take(1), None);
    }

    #[test]
    fn test_full_table_evicts_oldest() {
        let mut pending = PendingAcks::new();
        for seq in 0..PENDING_CAPACITY as u8 {
            pending.insert(seq, PendingKind::Drive);
        }
        pending.insert(99, PendingKind::MotorsOff);

        assert_eq!(pending.len(), PENDING_CAPACITY);
        assert!(!pending.contains(0));
        assert!(pending.contains(99));
    }
}
