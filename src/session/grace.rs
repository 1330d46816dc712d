//! Reconnection grace timer table
//!
//! Each participant has at most one pending grace timer, keyed by the
//! structured `(session, participant)` tuple. Entries are generation-stamped:
//! arming returns a fresh generation, and an expiry only takes effect when its
//! generation still matches the table. A rejoin cancels the entry, turning the
//! already-scheduled expiry into a verified no-op, which keeps the manager
//! safe under reentrancy.

use crate::types::{ParticipantId, SessionId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Composite key for one participant's pending timer
pub type GraceKey = (SessionId, ParticipantId);

/// Table of pending disconnect/leave grace timers
#[derive(Debug, Default)]
pub struct GraceTable {
    entries: Mutex<HashMap<GraceKey, u64>>,
    next_generation: AtomicU64,
}

impl GraceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm (or re-arm) the timer for a participant
    ///
    /// An existing entry is replaced, resetting the window rather than
    /// stacking a second timer. Returns the generation the scheduled expiry
    /// must present.
    pub fn arm(&self, session_id: &str, participant_id: &str) -> u64 {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed) + 1;
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(
                (session_id.to_string(), participant_id.to_string()),
                generation,
            );
        }
        generation
    }

    /// Cancel a pending timer, if any; returns whether one was pending
    pub fn cancel(&self, session_id: &str, participant_id: &str) -> bool {
        self.entries
            .lock()
            .map(|mut entries| {
                entries
                    .remove(&(session_id.to_string(), participant_id.to_string()))
                    .is_some()
            })
            .unwrap_or(false)
    }

    /// Claim an expiry
    ///
    /// Succeeds only when the entry is still pending under the same
    /// generation; a cancelled or replaced timer firing late gets `false`
    /// and must not touch any session state.
    pub fn try_expire(&self, session_id: &str, participant_id: &str, generation: u64) -> bool {
        let Ok(mut entries) = self.entries.lock() else {
            return false;
        };

        let key = (session_id.to_string(), participant_id.to_string());
        match entries.get(&key) {
            Some(&pending) if pending == generation => {
                entries.remove(&key);
                true
            }
            _ => false,
        }
    }

    /// Number of timers currently pending
    pub fn pending_count(&self) -> usize {
        self.entries
            .lock()
            .map(|entries| entries.len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arm_and_expire() {
        let table = GraceTable::new();
        let generation = table.arm("R1", "p1");

        assert_eq!(table.pending_count(), 1);
        assert!(table.try_expire("R1", "p1", generation));
        assert_eq!(table.pending_count(), 0);

        // Expiry claims are one-shot
        assert!(!table.try_expire("R1", "p1", generation));
    }

    #[test]
    fn test_cancel_invalidates_expiry() {
        let table = GraceTable::new();
        let generation = table.arm("R1", "p1");

        assert!(table.cancel("R1", "p1"));
        assert!(!table.try_expire("R1", "p1", generation));
        assert!(!table.cancel("R1", "p1"));
    }

    #[test]
    fn test_rearm_replaces_rather_than_stacks() {
        let table = GraceTable::new();
        let first = table.arm("R1", "p1");
        let second = table.arm("R1", "p1");

        assert_eq!(table.pending_count(), 1);
        // The replaced timer's expiry is a no-op; the fresh one wins
        assert!(!table.try_expire("R1", "p1", first));
        assert!(table.try_expire("R1", "p1", second));
    }

    #[test]
    fn test_keys_are_scoped_per_participant() {
        let table = GraceTable::new();
        let blue = table.arm("R1", "p-blue");
        let red = table.arm("R1", "p-red");

        assert_eq!(table.pending_count(), 2);
        assert!(table.try_expire("R1", "p-blue", blue));
        assert!(table.try_expire("R1", "p-red", red));
    }
}
