//! Wire encoding for request frames and packet records.
//!
//! Requests are one or two bytes:
//!
//! | Request    | Bytes          |
//! |------------|----------------|
//! | Stream-all | `[0x01]`       |
//! | Resend     | `[0x02, seq]`  |
//!
//! Replies are a plain concatenation of 17-byte records with no header:
//! ASCII symbol (4B), side (1B), then quantity, price and sequence as
//! big-endian `i32`.

use byteorder::{BigEndian, ByteOrder};
use bytes::{Buf, BufMut, BytesMut};

use crate::types::{
    resend_sequence, FetchError, Packet, Request, Result, PACKET_SIZE, REQUEST_RESEND,
    REQUEST_STREAM_ALL, SYMBOL_LEN,
};

/// Encode the stream-all request.
pub fn encode_stream_all() -> [u8; 1] {
    [REQUEST_STREAM_ALL]
}

/// Encode a resend request for `sequence`.
pub fn encode_resend(sequence: u32) -> Result<[u8; 2]> {
    resend_sequence(sequence).map(resend_frame)
}

fn resend_frame(seq: u8) -> [u8; 2] {
    [REQUEST_RESEND, seq]
}

/// Append the wire form of `request` to `dst`.
pub fn encode_request(request: Request, dst: &mut BytesMut) {
    match request {
        Request::StreamAll => dst.put_slice(&encode_stream_all()),
        Request::Resend(seq) => dst.put_slice(&resend_frame(seq)),
    }
}

/// Append the 17-byte record for `packet` to `dst`.
pub fn encode_packet(packet: &Packet, dst: &mut BytesMut) {
    let mut record = [0u8; PACKET_SIZE];
    record[..SYMBOL_LEN].copy_from_slice(&packet.symbol);
    record[SYMBOL_LEN] = packet.side;
    BigEndian::write_i32(&mut record[5..9], packet.quantity);
    BigEndian::write_i32(&mut record[9..13], packet.price);
    BigEndian::write_i32(&mut record[13..17], packet.sequence);
    dst.extend_from_slice(&record);
}

/// Decode exactly one record. `record` must be `PACKET_SIZE` bytes long.
fn decode_record(record: &[u8]) -> Packet {
    let mut symbol = [0u8; SYMBOL_LEN];
    symbol.copy_from_slice(&record[..SYMBOL_LEN]);

    Packet {
        symbol,
        side: record[SYMBOL_LEN],
        quantity: BigEndian::read_i32(&record[5..9]),
        price: BigEndian::read_i32(&record[9..13]),
        sequence: BigEndian::read_i32(&record[13..17]),
    }
}

/// Decode every complete record in `buf`.
///
/// Returns the packets in arrival order and the number of bytes consumed.
/// Anything past the last complete record is left for the caller to keep
/// until more data arrives.
pub fn decode_packets(buf: &[u8]) -> (Vec<Packet>, usize) {
    let packets: Vec<Packet> = buf.chunks_exact(PACKET_SIZE).map(decode_record).collect();
    let consumed = packets.len() * PACKET_SIZE;
    (packets, consumed)
}

/// Try to take one record off the front of `buf`.
pub fn try_decode_packet(buf: &mut BytesMut) -> Option<Packet> {
    let (packets, consumed) = decode_packets(buf.get(..PACKET_SIZE)?);
    buf.advance(consumed);
    packets.into_iter().next()
}

/// Try to take one request frame off the front of `buf` (server side).
pub fn try_decode_request(buf: &mut BytesMut) -> Result<Option<Request>> {
    let Some(&tag) = buf.first() else {
        return Ok(None);
    };

    match tag {
        REQUEST_STREAM_ALL => {
            buf.advance(1);
            Ok(Some(Request::StreamAll))
        }
        REQUEST_RESEND => {
            if buf.len() < 2 {
                return Ok(None);
            }
            let seq = buf[1];
            buf.advance(2);
            Ok(Some(Request::Resend(seq)))
        }
        other => Err(FetchError::UnknownRequest(other)),
    }
}
