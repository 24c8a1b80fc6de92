//! Initial fetch: request the full stream and record every packet until the
//! server closes the connection.

use futures::SinkExt;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;
use tracing::{debug, info};

use super::next_packet;
use crate::codec::PacketCodec;
use crate::store::{RecordOutcome, SequenceStore};
use crate::types::{Request, Result};

/// What the initial fetch saw.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchSummary {
    /// Complete records decoded
    pub received: usize,
    /// Records the store refused
    pub rejected: usize,
    /// Gaps opened during the stream
    pub gaps_opened: usize,
    /// Bytes of an incomplete trailing record dropped at close
    pub discarded_bytes: usize,
}

/// Send the stream-all request over `stream` and feed every decoded packet
/// to `store` until the peer ends the stream.
///
/// Any transport error or read timeout ends the session with that error.
pub async fn run_initial_fetch<S>(
    stream: S,
    store: &mut SequenceStore,
    read_timeout: Option<Duration>,
) -> Result<FetchSummary>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut framed = Framed::new(stream, PacketCodec::new());
    let mut summary = FetchSummary::default();

    info!("Requesting full packet stream");
    framed.send(Request::StreamAll).await?;

    debug!("Streaming");
    while let Some(packet) = next_packet(&mut framed, read_timeout).await? {
        summary.received += 1;
        match store.record(packet) {
            RecordOutcome::Appended { opened } => summary.gaps_opened += opened.len(),
            RecordOutcome::Rejected => summary.rejected += 1,
            RecordOutcome::Patched | RecordOutcome::Unchanged => {}
        }
    }

    summary.discarded_bytes = framed.codec().discarded();
    info!(
        "Stream ended: {} packets received, {} stored, {} gaps outstanding",
        summary.received,
        store.len(),
        store.pending_gaps()
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::encode_packet;
    use crate::types::{Packet, Side};
    use bytes::BytesMut;
    use tokio_test::io::Builder;

    fn records(sequences: &[i32]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        for &seq in sequences {
            encode_packet(&Packet::new(*b"AAPL", Side::Buy, seq * 10, 100, seq), &mut buf);
        }
        buf.to_vec()
    }

    #[tokio::test]
    async fn test_gapless_stream() {
        let mock = Builder::new().write(&[0x01]).read(&records(&[1, 2, 3])).build();
        let mut store = SequenceStore::new();

        let summary = run_initial_fetch(mock, &mut store, None).await.unwrap();

        assert_eq!(summary.received, 3);
        assert_eq!(summary.gaps_opened, 0);
        assert_eq!(store.len(), 3);
        assert_eq!(store.pending_gaps(), 0);
        for (i, slot) in store.snapshot().iter().enumerate() {
            assert_eq!(slot.unwrap().sequence, i as i32 + 1);
        }
    }

    #[tokio::test]
    async fn test_gap_recorded() {
        let mock = Builder::new().write(&[0x01]).read(&records(&[1, 2, 4, 5])).build();
        let mut store = SequenceStore::new();

        let summary = run_initial_fetch(mock, &mut store, None).await.unwrap();

        assert_eq!(summary.gaps_opened, 1);
        assert_eq!(store.gaps().collect::<Vec<_>>(), vec![3]);
        assert_eq!(store.len(), 5);
        assert!(store.snapshot()[2].is_none());
    }

    #[tokio::test]
    async fn test_records_split_across_reads() {
        let bytes = records(&[1, 2, 3]);
        let mock = Builder::new()
            .write(&[0x01])
            .read(&bytes[..10])
            .read(&bytes[10..30])
            .read(&bytes[30..])
            .build();
        let mut store = SequenceStore::new();

        let summary = run_initial_fetch(mock, &mut store, None).await.unwrap();

        assert_eq!(summary.received, 3);
        assert_eq!(summary.discarded_bytes, 0);
        assert_eq!(store.len(), 3);
    }

    #[tokio::test]
    async fn test_unclean_end_drops_partial() {
        let mut bytes = records(&[1, 2]);
        bytes.extend_from_slice(&records(&[3])[..9]);
        let mock = Builder::new().write(&[0x01]).read(&bytes).build();
        let mut store = SequenceStore::new();

        let summary = run_initial_fetch(mock, &mut store, None).await.unwrap();

        assert_eq!(summary.received, 2);
        assert_eq!(summary.discarded_bytes, 9);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_stream() {
        let mock = Builder::new().write(&[0x01]).build();
        let mut store = SequenceStore::new();

        let summary = run_initial_fetch(mock, &mut store, None).await.unwrap();

        assert_eq!(summary, FetchSummary::default());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_read_error_propagates() {
        let mock = Builder::new()
            .write(&[0x01])
            .read(&records(&[1]))
            .read_error(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset"))
            .build();
        let mut store = SequenceStore::new();

        let err = run_initial_fetch(mock, &mut store, None).await.unwrap_err();

        assert!(matches!(err, crate::types::FetchError::Io(_)));
        assert_eq!(store.len(), 1);
    }
}
