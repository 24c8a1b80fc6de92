//! # packet-feed
//!
//! Client for a binary market-data packet feed. A fetch requests the full
//! packet stream, detects sequence gaps as packets arrive, asks the server
//! to resend each missing packet, and validates that the result is a
//! complete `1..=N` sequence.
//!
//! ## Quick Start
//!
//! ```no_run
//! use packet_feed::{FetchConfig, PacketClient};
//!
//! # async fn run() -> packet_feed::Result<()> {
//! let client = PacketClient::new(FetchConfig::new("127.0.0.1:3000"));
//! let packets = client.fetch().await?;
//! println!("fetched {} packets", packets.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Protocol Overview
//!
//! Client to server:
//!
//! | Request    | Bytes         | Meaning                                 |
//! |------------|---------------|-----------------------------------------|
//! | Stream-all | `[0x01]`      | Stream every packet from the beginning  |
//! | Resend     | `[0x02, seq]` | Retransmit one packet (seq fits a byte) |
//!
//! Server to client: back-to-back 17-byte records, ended by the server
//! closing the connection. A resend is answered with exactly one record.
//!
//! - SYMBOL (4B): ASCII ticker
//! - SIDE (1B): `B` or `S`
//! - QUANTITY (4B BE): signed
//! - PRICE (4B BE): signed
//! - SEQUENCE (4B BE): 1-based position in the feed
//!
//! ## Fetch Flow
//!
//! 1. Initial fetch on one connection fills a [`SequenceStore`]; a packet
//!    that arrives ahead of the expected sequence leaves placeholders and
//!    queues the skipped numbers as gaps.
//! 2. If gaps remain, a second connection requests each one in turn.
//! 3. [`validate`] checks every slot before the packets are returned.

pub mod codec;
pub mod config;
pub mod frame;
pub mod store;
pub mod tcp;
pub mod types;
pub mod validate;

// Re-export main types for convenience
pub use codec::{PacketCodec, RequestCodec};
pub use config::{FetchConfig, ReplyCorrelation};
pub use frame::{decode_packets, encode_resend, encode_stream_all};
pub use store::{RecordOutcome, SequenceStore};
pub use tcp::{PacketClient, PacketServer, ServerScript};
pub use types::{FetchError, Packet, Request, Result, Side, PACKET_SIZE};
pub use validate::{validate, ValidationReport, Violation, ViolationKind};
