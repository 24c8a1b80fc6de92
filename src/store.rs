//! Sequence-addressed packet store with gap tracking.
//!
//! Slot `i` holds the packet with sequence `i + 1`. When a packet arrives
//! ahead of the current length, every skipped slot is filled with `None`
//! and its sequence number queued as an outstanding gap.

use std::collections::VecDeque;
use tracing::{debug, warn};

use crate::types::Packet;

/// Default cap on accepted sequence numbers.
pub const DEFAULT_MAX_SEQUENCE: u32 = 65_536;

/// What [`SequenceStore::record`] did with a packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Packet extended the store; `opened` lists the gaps it created.
    Appended { opened: Vec<u32> },
    /// Packet overwrote an existing slot.
    Patched,
    /// Slot already held an identical packet.
    Unchanged,
    /// Sequence below 1 or above the configured maximum.
    Rejected,
}

#[derive(Debug, Clone)]
pub struct SequenceStore {
    slots: Vec<Option<Packet>>,
    gaps: VecDeque<u32>,
    max_sequence: u32,
}

impl SequenceStore {
    pub fn new() -> Self {
        Self::with_max_sequence(DEFAULT_MAX_SEQUENCE)
    }

    pub fn with_max_sequence(max_sequence: u32) -> Self {
        Self {
            slots: Vec::new(),
            gaps: VecDeque::new(),
            max_sequence,
        }
    }

    /// Place `packet` at `sequence - 1`, backfilling placeholders as needed.
    pub fn record(&mut self, packet: Packet) -> RecordOutcome {
        let sequence = match u32::try_from(packet.sequence) {
            Ok(seq) if (1..=self.max_sequence).contains(&seq) => seq,
            _ => {
                warn!(
                    "Rejecting packet with sequence {} (accepted range 1..={})",
                    packet.sequence, self.max_sequence
                );
                return RecordOutcome::Rejected;
            }
        };
        let index = (sequence - 1) as usize;

        if index >= self.slots.len() {
            let mut opened = Vec::new();
            while self.slots.len() < index {
                self.slots.push(None);
                let missing = self.slots.len() as u32;
                self.gaps.push_back(missing);
                opened.push(missing);
            }
            if let (Some(first), Some(last)) = (opened.first(), opened.last()) {
                warn!("Gap before sequence {}: missing {}..={}", sequence, first, last);
            }
            self.slots.push(Some(packet));
            debug!("Stored packet {}", sequence);
            return RecordOutcome::Appended { opened };
        }

        if let Some(pos) = self.gaps.iter().position(|&gap| gap == sequence) {
            self.gaps.remove(pos);
        }

        let slot = &mut self.slots[index];
        if slot.as_ref() == Some(&packet) {
            return RecordOutcome::Unchanged;
        }
        *slot = Some(packet);
        debug!("Patched packet {}", sequence);
        RecordOutcome::Patched
    }

    /// Next outstanding gap in discovery order.
    pub fn next_gap(&mut self) -> Option<u32> {
        self.gaps.pop_front()
    }

    /// Outstanding gaps, oldest first.
    pub fn gaps(&self) -> impl Iterator<Item = u32> + '_ {
        self.gaps.iter().copied()
    }

    pub fn pending_gaps(&self) -> usize {
        self.gaps.len()
    }

    pub fn snapshot(&self) -> &[Option<Packet>] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn into_slots(self) -> Vec<Option<Packet>> {
        self.slots
    }

    /// All packets, or `None` if any slot is still a placeholder.
    pub fn into_packets(self) -> Option<Vec<Packet>> {
        self.slots.into_iter().collect()
    }
}

impl Default for SequenceStore {
    fn default() -> Self {
        Self::new()
    }
}
