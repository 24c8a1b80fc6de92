//! Interactive fetch client
//!
//! Asks whether to fetch, runs a full fetch against `CLIENT_HOST:CLIENT_PORT`
//! (from the environment or a `.env` file) and saves each validated result
//! as JSON under `output/`.

use std::error::Error;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info};

use packet_feed::{FetchConfig, FetchError, Packet, PacketClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // `.env` is optional; real environment variables take precedence.
    dotenvy::dotenv().ok();
    let config = FetchConfig::from_env()?;
    info!("Using server at {}", config.endpoint);
    let client = PacketClient::new(config);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"Do you want to fetch packets (yes/no)? ").await?;
        stdout.flush().await?;

        let Some(answer) = lines.next_line().await? else {
            break;
        };
        let answer = answer.trim().to_lowercase();
        if answer != "yes" && answer != "y" {
            break;
        }

        match client.fetch().await {
            Ok(packets) => {
                let path = save_packets(&packets).await?;
                info!("Saved {} packets to {}", packets.len(), path.display());
            }
            Err(FetchError::Invalid { report, .. }) => {
                for violation in &report.violations {
                    error!("{}", violation);
                }
            }
            Err(e) => error!("Error fetching packets: {}", e),
        }
    }

    info!("Exiting...");
    Ok(())
}

/// Write `packets` to `output/data_<unix-seconds>.json`.
async fn save_packets(packets: &[Packet]) -> Result<PathBuf, Box<dyn Error>> {
    let dir = PathBuf::from("output");
    tokio::fs::create_dir_all(&dir).await?;

    let stamp = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
    let path = dir.join(format!("data_{}.json", stamp));
    tokio::fs::write(&path, serde_json::to_vec_pretty(packets)?).await?;
    Ok(path)
}
