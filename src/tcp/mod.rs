//! TCP transport: the two client sessions, the client that sequences them,
//! and a replay server.

mod client;
mod fetch;
mod recovery;
mod server;

pub use client::PacketClient;
pub use fetch::{run_initial_fetch, FetchSummary};
pub use recovery::{run_gap_recovery, RecoverySummary};
pub use server::{PacketServer, ServerScript};

use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_stream::StreamExt;
use tokio_util::codec::Framed;

use crate::codec::PacketCodec;
use crate::types::{FetchError, Packet, Result};

/// Read the next packet, failing with `ReadTimeout` if the server is idle for too long.
async fn next_packet<S>(
    framed: &mut Framed<S, PacketCodec>,
    read_timeout: Option<Duration>,
) -> Result<Option<Packet>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    match read_timeout {
        Some(after) => tokio::time::timeout(after, framed.try_next())
            .await
            .map_err(|_| FetchError::ReadTimeout { after })?,
        None => framed.try_next().await,
    }
}
