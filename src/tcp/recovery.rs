//! Gap recovery: ask for each outstanding sequence in turn over one
//! connection and patch the store with the replies.
//!
//! Requests are strictly one at a time. The reply to a resend is read
//! before the next resend is written, and each gap gets a single attempt.

use futures::SinkExt;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

use super::next_packet;
use crate::codec::PacketCodec;
use crate::config::ReplyCorrelation;
use crate::store::{RecordOutcome, SequenceStore};
use crate::types::{FetchError, Request, Result, MAX_RESEND_SEQUENCE};

/// What the recovery session did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoverySummary {
    /// Resend requests written
    pub requested: usize,
    /// Replies stored in the sequence store
    pub recovered: usize,
    /// Replies identical to what the store already held
    pub duplicates: usize,
    /// Replies discarded as anomalous (incomplete, mismatched or rejected)
    pub anomalies: usize,
    /// Gaps that could not be requested (outside the resend range)
    pub skipped: Vec<u32>,
    /// Gaps still outstanding because the server closed early
    pub abandoned: Vec<u32>,
}

/// Drain the store's outstanding gaps over `stream`.
///
/// Returns once every gap has been requested or the server closes the
/// connection. Gaps that were not filled stay as placeholders in the store.
pub async fn run_gap_recovery<S>(
    stream: S,
    store: &mut SequenceStore,
    read_timeout: Option<Duration>,
    correlation: ReplyCorrelation,
) -> Result<RecoverySummary>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut framed = Framed::new(stream, PacketCodec::new());
    let mut summary = RecoverySummary::default();

    if store.pending_gaps() == 0 {
        info!("No missing packets to request");
        SinkExt::<Request>::close(&mut framed).await?;
        return Ok(summary);
    }
    info!("Recovering {} missing packets", store.pending_gaps());

    while let Some(sequence) = store.next_gap() {
        let request = match Request::resend(sequence) {
            Ok(request) => request,
            Err(_) => {
                debug!("Gap {} is outside the resend range", sequence);
                summary.skipped.push(sequence);
                continue;
            }
        };

        framed.send(request).await?;
        summary.requested += 1;
        debug!("Requested missing packet {}", sequence);

        let reply = match next_packet(&mut framed, read_timeout).await {
            Ok(reply) => reply,
            Err(FetchError::ReadTimeout { after }) if !framed.read_buffer().is_empty() => {
                warn!(
                    "Incomplete reply for packet {} ({} bytes) after {:?}; skipping",
                    sequence,
                    framed.read_buffer().len(),
                    after
                );
                framed.read_buffer_mut().clear();
                summary.anomalies += 1;
                continue;
            }
            Err(e) => return Err(e),
        };

        let Some(reply) = reply else {
            if framed.codec().discarded() > 0 {
                warn!("Incomplete reply for packet {} dropped", sequence);
            }
            summary.abandoned.push(sequence);
            summary.abandoned.extend(store.gaps());
            warn!(
                "Server closed during recovery; {} gaps left unfilled",
                summary.abandoned.len()
            );
            log_skipped(&summary.skipped);
            return Ok(summary);
        };

        if correlation == ReplyCorrelation::EchoedSequence && reply.sequence != sequence as i32 {
            warn!(
                "Requested packet {} but server sent {}; discarding reply",
                sequence, reply.sequence
            );
            summary.anomalies += 1;
            continue;
        }
        if reply.sequence != sequence as i32 {
            debug!("Reply to resend {} carries sequence {}", sequence, reply.sequence);
        }

        match store.record(reply) {
            RecordOutcome::Rejected => summary.anomalies += 1,
            RecordOutcome::Unchanged => summary.duplicates += 1,
            RecordOutcome::Patched | RecordOutcome::Appended { .. } => summary.recovered += 1,
        }
    }

    log_skipped(&summary.skipped);
    info!(
        "Recovery finished: {} of {} requested packets recovered",
        summary.recovered, summary.requested
    );
    SinkExt::<Request>::close(&mut framed).await?;
    Ok(summary)
}

/// One warning for every gap that could not be requested.
fn log_skipped(skipped: &[u32]) {
    if let (Some(first), Some(last)) = (skipped.iter().min(), skipped.iter().max()) {
        warn!(
            "Skipped {} gaps beyond resend limit {} (sequences {}..={})",
            skipped.len(),
            MAX_RESEND_SEQUENCE,
            first,
            last
        );
    }
}
