//! Final integrity check over a reconstructed packet set.

use std::fmt;

use crate::types::Packet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
    /// Slot was never filled.
    Missing,
    /// Symbol is blank or not printable ASCII, or the side byte is not a buy/sell indicator.
    Malformed,
    /// Slot holds a packet whose sequence is not its position.
    OutOfPlace { found: i32 },
}

/// One problem at a 1-based position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Violation {
    pub position: u32,
    pub kind: ViolationKind,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ViolationKind::Missing => write!(f, "position {}: missing", self.position),
            ViolationKind::Malformed => write!(f, "position {}: malformed fields", self.position),
            ViolationKind::OutOfPlace { found } => {
                write!(f, "position {}: holds sequence {}", self.position, found)
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// Offending positions in ascending order, each listed once.
    pub fn positions(&self) -> Vec<u32> {
        let mut positions: Vec<u32> = self.violations.iter().map(|v| v.position).collect();
        positions.dedup();
        positions
    }
}

/// Walk every slot once and report each position that is missing,
/// malformed or holds the wrong sequence.
pub fn validate(slots: &[Option<Packet>]) -> ValidationReport {
    let mut violations = Vec::new();

    for (index, slot) in slots.iter().enumerate() {
        let position = index as u32 + 1;
        let Some(packet) = slot else {
            violations.push(Violation {
                position,
                kind: ViolationKind::Missing,
            });
            continue;
        };

        if !packet.is_well_formed() {
            violations.push(Violation {
                position,
                kind: ViolationKind::Malformed,
            });
        }
        if packet.index() != Some(index) {
            violations.push(Violation {
                position,
                kind: ViolationKind::OutOfPlace {
                    found: packet.sequence,
                },
            });
        }
    }

    ValidationReport { violations }
}
