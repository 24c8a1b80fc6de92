use std::error::Error;
use tracing::info;

use packet_feed::{Packet, PacketServer, ServerScript, Side};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let port = std::env::var("CLIENT_PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("127.0.0.1:{}", port);

    let symbols = [*b"AAPL", *b"MSFT", *b"AMZN", *b"META"];
    let packets: Vec<Packet> = (1..=14)
        .map(|seq| {
            let side = if seq % 3 == 0 { Side::Sell } else { Side::Buy };
            Packet::new(symbols[seq as usize % symbols.len()], side, 50 * seq, 100 + seq, seq)
        })
        .collect();

    // Lose a few packets on the first pass so clients exercise recovery.
    let script = ServerScript::new(packets).drop_on_stream([3, 7, 8]).chunk_size(40);

    info!("Starting replay server on {}...", addr);
    let server = PacketServer::bind(&addr, script).await?;
    server.run().await?;

    Ok(())
}
