use bytes::BytesMut;
use futures::SinkExt;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_stream::StreamExt;
use tokio_util::codec::Framed;
use tracing::{debug, error, info, warn};

use crate::codec::RequestCodec;
use crate::frame::encode_packet;
use crate::types::{FetchError, Packet, Request, Result};

/// What a [`PacketServer`] serves.
///
/// Packets are looked up by position: a resend for `n` answers with
/// `packets[n - 1]`.
#[derive(Debug, Clone, Default)]
pub struct ServerScript {
    packets: Vec<Packet>,
    dropped: HashSet<i32>,
    withheld: HashSet<i32>,
    chunk_size: Option<usize>,
}

impl ServerScript {
    pub fn new(packets: Vec<Packet>) -> Self {
        Self {
            packets,
            ..Self::default()
        }
    }

    /// Leave these sequences out of the full stream.
    pub fn drop_on_stream(mut self, sequences: impl IntoIterator<Item = i32>) -> Self {
        self.dropped.extend(sequences);
        self
    }

    /// Close the connection instead of answering a resend for these sequences.
    pub fn withhold(mut self, sequences: impl IntoIterator<Item = i32>) -> Self {
        self.withheld.extend(sequences);
        self
    }

    /// Write the full stream in chunks of at most `size` bytes.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = Some(size.max(1));
        self
    }

    pub fn packets(&self) -> &[Packet] {
        &self.packets
    }

    fn resend(&self, sequence: u8) -> Option<Packet> {
        let seq = i32::from(sequence);
        if self.withheld.contains(&seq) {
            return None;
        }
        self.packets.get(usize::from(sequence).checked_sub(1)?).copied()
    }
}

/// TCP server that replays a scripted packet set.
pub struct PacketServer {
    listener: TcpListener,
    script: Arc<ServerScript>,
    next_session_id: Arc<Mutex<u64>>,
}

impl PacketServer {
    /// Bind to the specified address
    pub async fn bind(addr: &str, script: ServerScript) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("Packet server bound to {}", addr);

        Ok(Self {
            listener,
            script: Arc::new(script),
            next_session_id: Arc::new(Mutex::new(0)),
        })
    }

    /// Get the local address this server is bound to
    pub fn local_addr(&self) -> Result<std::net::SocketAddr> {
        self.listener.local_addr().map_err(FetchError::Io)
    }

    /// Accept connections until the task is dropped.
    pub async fn run(self) -> Result<()> {
        info!("Packet server starting...");

        loop {
            match self.listener.accept().await {
                Ok((socket, addr)) => {
                    info!("New connection from {}", addr);

                    let script = self.script.clone();
                    let next_session_id = self.next_session_id.clone();

                    tokio::spawn(async move {
                        if let Err(e) = Self::handle_connection(socket, script, next_session_id).await {
                            error!("Connection handler error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                }
            }
        }
    }

    /// Handle a single client connection
    async fn handle_connection(
        socket: TcpStream,
        script: Arc<ServerScript>,
        next_session_id: Arc<Mutex<u64>>,
    ) -> Result<()> {
        let session_id = {
            let mut id_guard = next_session_id.lock().await;
            *id_guard += 1;
            *id_guard
        };

        info!("Starting session {}", session_id);
        let mut framed = Framed::new(socket, RequestCodec);

        while let Some(request) = framed.try_next().await? {
            match request {
                Request::StreamAll => {
                    Self::stream_all(framed.get_mut(), &script).await?;
                    info!("Session {} streamed all packets, closing", session_id);
                    break;
                }
                Request::Resend(seq) => match script.resend(seq) {
                    Some(packet) => {
                        debug!("Session {} resending packet {}", session_id, seq);
                        framed.send(packet).await?;
                    }
                    None => {
                        warn!("Session {} cannot resend packet {}, closing", session_id, seq);
                        break;
                    }
                },
            }
        }

        info!("Session {} ended", session_id);
        Ok(())
    }

    async fn stream_all(socket: &mut TcpStream, script: &ServerScript) -> Result<()> {
        let mut buf = BytesMut::new();
        for packet in script.packets.iter().filter(|p| !script.dropped.contains(&p.sequence)) {
            encode_packet(packet, &mut buf);
        }

        let chunk_size = script.chunk_size.unwrap_or(buf.len().max(1));
        for chunk in buf.chunks(chunk_size) {
            socket.write_all(chunk).await?;
            socket.flush().await?;
        }
        socket.shutdown().await?;
        Ok(())
    }
}
