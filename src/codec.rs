//! `tokio_util` codecs for both ends of the connection.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

use crate::frame::{encode_packet, encode_request, try_decode_packet, try_decode_request};
use crate::types::{FetchError, Packet, Request};

/// Client side codec: writes requests, reads packet records.
///
/// A partial record still buffered when the peer closes is dropped with a
/// warning instead of failing the stream.
#[derive(Debug, Default)]
pub struct PacketCodec {
    discarded: usize,
}

impl PacketCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes dropped at end-of-stream because they did not form a full record.
    pub fn discarded(&self) -> usize {
        self.discarded
    }
}

impl Decoder for PacketCodec {
    type Item = Packet;
    type Error = FetchError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        Ok(try_decode_packet(src))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(packet) = self.decode(src)? {
            return Ok(Some(packet));
        }
        if !src.is_empty() {
            warn!("Dropping {} trailing bytes of an incomplete record", src.len());
            self.discarded += src.len();
            src.clear();
        }
        Ok(None)
    }
}

impl Encoder<Request> for PacketCodec {
    type Error = FetchError;

    fn encode(&mut self, item: Request, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_request(item, dst);
        Ok(())
    }
}

/// Server side codec: reads requests, writes packet records.
#[derive(Debug, Default)]
pub struct RequestCodec;

impl Decoder for RequestCodec {
    type Item = Request;
    type Error = FetchError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        try_decode_request(src)
    }
}

impl Encoder<Packet> for RequestCodec {
    type Error = FetchError;

    fn encode(&mut self, item: Packet, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_packet(&item, dst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Side, PACKET_SIZE};

    fn record(sequence: i32) -> BytesMut {
        let mut buf = BytesMut::new();
        encode_packet(&Packet::new(*b"IBM ", Side::Sell, 5, 7, sequence), &mut buf);
        buf
    }

    #[test]
    fn test_decode_waits_for_full_record() {
        let mut codec = PacketCodec::new();
        let full = record(1);

        let mut buf = BytesMut::from(&full[..10]);
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        assert_eq!(buf.len(), 10);

        buf.extend_from_slice(&full[10..]);
        let packet = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(packet.sequence, 1);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_eof_drops_partial() {
        let mut codec = PacketCodec::new();
        let mut buf = record(1);
        buf.extend_from_slice(&record(2)[..5]);

        assert_eq!(codec.decode_eof(&mut buf).unwrap().map(|p| p.sequence), Some(1));
        assert_eq!(codec.decode_eof(&mut buf).unwrap(), None);
        assert!(buf.is_empty());
        assert_eq!(codec.discarded(), 5);
    }

    #[test]
    fn test_request_encoding() {
        let mut codec = PacketCodec::new();
        let mut buf = BytesMut::new();
        codec.encode(Request::StreamAll, &mut buf).unwrap();
        codec.encode(Request::Resend(3), &mut buf).unwrap();
        assert_eq!(&buf[..], &[1, 2, 3]);
    }

    #[test]
    fn test_server_codec() {
        let mut codec = RequestCodec;
        let mut buf = BytesMut::from(&[0x02, 0x04][..]);
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(Request::Resend(4)));

        let mut out = BytesMut::new();
        codec
            .encode(Packet::new(*b"IBM ", Side::Sell, 5, 7, 4), &mut out)
            .unwrap();
        assert_eq!(out.len(), PACKET_SIZE);
        assert_eq!(out, record(4));
    }
}
