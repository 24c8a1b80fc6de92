use tokio::net::TcpStream;
use tracing::{error, info};

use super::fetch::run_initial_fetch;
use super::recovery::run_gap_recovery;
use crate::config::FetchConfig;
use crate::store::SequenceStore;
use crate::types::{FetchError, Packet, Result};
use crate::validate::validate;

/// Client that fetches a complete, gapless packet set from the server.
///
/// Each call to [`PacketClient::fetch`] starts from an empty store, so
/// nothing carries over between invocations.
#[derive(Debug, Clone)]
pub struct PacketClient {
    config: FetchConfig,
}

impl PacketClient {
    pub fn new(config: FetchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Open a connection to the configured endpoint
    async fn connect(&self) -> Result<TcpStream> {
        let endpoint = self.config.endpoint.as_str();
        let stream = match self.config.connect_timeout {
            Some(after) => tokio::time::timeout(after, TcpStream::connect(endpoint))
                .await
                .map_err(|_| FetchError::ConnectTimeout {
                    endpoint: endpoint.to_string(),
                    after,
                })??,
            None => TcpStream::connect(endpoint).await?,
        };
        info!("Connected to {}", endpoint);
        Ok(stream)
    }

    /// Run the initial fetch and, if it left gaps, the recovery session.
    ///
    /// The returned store is not validated.
    pub async fn fetch_store(&self) -> Result<SequenceStore> {
        let mut store = SequenceStore::with_max_sequence(self.config.max_sequence);

        let stream = self.connect().await?;
        run_initial_fetch(stream, &mut store, self.config.read_timeout).await?;

        if store.pending_gaps() > 0 {
            let stream = self.connect().await?;
            run_gap_recovery(
                stream,
                &mut store,
                self.config.read_timeout,
                self.config.correlation,
            )
            .await?;
        }

        Ok(store)
    }

    /// Fetch and validate the full packet set.
    ///
    /// On a validation failure the error carries the report and whatever was
    /// reconstructed, so the caller can decide whether partial data is usable.
    pub async fn fetch(&self) -> Result<Vec<Packet>> {
        let store = self.fetch_store().await?;
        let report = validate(store.snapshot());

        if !report.is_valid() {
            error!("Invalid packets detected at positions {:?}", report.positions());
            return Err(FetchError::Invalid {
                report,
                packets: store.into_slots(),
            });
        }

        info!("All {} packets are valid", store.len());
        Ok(store.into_slots().into_iter().flatten().collect())
    }
}
