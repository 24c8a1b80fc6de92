use serde::{Serialize, Serializer};
use std::time::Duration;
use thiserror::Error;

use crate::validate::ValidationReport;

/// Width of the fixed ASCII symbol field.
pub const SYMBOL_LEN: usize = 4;

/// Size of one packet record on the wire: symbol(4) + side(1) + quantity(4) + price(4) + sequence(4).
pub const PACKET_SIZE: usize = SYMBOL_LEN + 1 + 4 + 4 + 4;

/// Request tag asking the server to stream every packet from the beginning.
pub const REQUEST_STREAM_ALL: u8 = 0x01;

/// Request tag asking the server to retransmit a single packet.
pub const REQUEST_RESEND: u8 = 0x02;

/// Highest sequence number a resend request can carry (one byte on the wire).
pub const MAX_RESEND_SEQUENCE: u32 = u8::MAX as u32;

/// Buy/sell indicator carried in the side byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'B' => Some(Side::Buy),
            b'S' => Some(Side::Sell),
            _ => None,
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            Side::Buy => b'B',
            Side::Sell => b'S',
        }
    }
}

/// One market event record.
///
/// Fields are kept exactly as they arrived on the wire: decoding never
/// rejects a record, so a corrupt symbol or side byte is carried through
/// and reported later by [`crate::validate::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Packet {
    #[serde(serialize_with = "serialize_symbol")]
    pub symbol: [u8; SYMBOL_LEN],
    #[serde(serialize_with = "serialize_side")]
    pub side: u8,
    pub quantity: i32,
    pub price: i32,
    pub sequence: i32,
}

impl Packet {
    pub fn new(symbol: [u8; SYMBOL_LEN], side: Side, quantity: i32, price: i32, sequence: i32) -> Self {
        Self {
            symbol,
            side: side.as_byte(),
            quantity,
            price,
            sequence,
        }
    }

    /// The symbol as text, if it is valid UTF-8.
    pub fn symbol_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.symbol).ok()
    }

    pub fn side(&self) -> Option<Side> {
        Side::from_byte(self.side)
    }

    /// True when the symbol is printable ASCII (space padding allowed, but
    /// not all blank) and the side byte is a known indicator.
    pub fn is_well_formed(&self) -> bool {
        let printable = self.symbol.iter().all(|&b| b.is_ascii_graphic() || b == b' ');
        let blank = self.symbol.iter().all(|&b| b == b' ');
        printable && !blank && self.side().is_some()
    }

    /// Zero-based store index for this packet, or `None` for sequences below 1.
    pub fn index(&self) -> Option<usize> {
        usize::try_from(self.sequence).ok()?.checked_sub(1)
    }
}

fn serialize_symbol<S: Serializer>(symbol: &[u8; SYMBOL_LEN], serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&String::from_utf8_lossy(symbol))
}

fn serialize_side<S: Serializer>(side: &u8, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(&char::from(*side))
}

/// Client to server request frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    /// `[0x01]`
    StreamAll,
    /// `[0x02, seq]`
    Resend(u8),
}

impl Request {
    /// Build a resend request, checking that the sequence fits the one-byte field.
    pub fn resend(sequence: u32) -> Result<Self> {
        resend_sequence(sequence).map(Request::Resend)
    }
}

/// Narrow `sequence` to the one-byte resend field.
pub(crate) fn resend_sequence(sequence: u32) -> Result<u8> {
    u8::try_from(sequence).map_err(|_| FetchError::ResendOutOfRange(sequence))
}

/// Errors produced while fetching and reconstructing a packet set
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("timed out connecting to {endpoint} after {after:?}")]
    ConnectTimeout { endpoint: String, after: Duration },

    #[error("no data from server for {after:?}")]
    ReadTimeout { after: Duration },

    #[error("sequence {0} does not fit a resend request (max {MAX_RESEND_SEQUENCE})")]
    ResendOutOfRange(u32),

    #[error("unknown request tag: {0:#04x}")]
    UnknownRequest(u8),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid packets at positions {:?}", report.positions())]
    Invalid {
        report: ValidationReport,
        packets: Vec<Option<Packet>>,
    },
}

pub type Result<T> = std::result::Result<T, FetchError>;
