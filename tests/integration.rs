//! End-to-end tests against a replay server on loopback.

use rand::Rng;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;

use packet_feed::{
    FetchConfig, FetchError, Packet, PacketClient, PacketServer, ReplyCorrelation, ServerScript,
    Side, ViolationKind,
};

fn feed(count: i32) -> Vec<Packet> {
    const SYMBOLS: [&[u8; 4]; 3] = [b"AAPL", b"MSFT", b"AMZN"];
    (1..=count)
        .map(|seq| {
            let side = if seq % 2 == 0 { Side::Sell } else { Side::Buy };
            Packet::new(*SYMBOLS[seq as usize % 3], side, seq * 10, 100 + seq, seq)
        })
        .collect()
}

async fn start_server(script: ServerScript) -> SocketAddr {
    let server = PacketServer::bind("127.0.0.1:0", script).await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.run());
    addr
}

fn client(addr: SocketAddr) -> PacketClient {
    PacketClient::new(
        FetchConfig::new(addr.to_string())
            .with_connect_timeout(Some(Duration::from_secs(2)))
            .with_read_timeout(Some(Duration::from_secs(2))),
    )
}

#[tokio::test]
async fn test_gapless_fetch() {
    let packets = feed(5);
    let addr = start_server(ServerScript::new(packets.clone())).await;

    let fetched = client(addr).fetch().await.unwrap();

    assert_eq!(fetched, packets);
}

#[tokio::test]
async fn test_single_gap_recovered() {
    let packets = vec![
        Packet::new(*b"AAPL", Side::Buy, 5, 99, 1),
        Packet::new(*b"AAPL", Side::Buy, 10, 100, 2),
        Packet::new(*b"MSFT", Side::Sell, 7, 250, 3),
    ];
    let addr = start_server(ServerScript::new(packets.clone()).drop_on_stream([2])).await;

    let store = client(addr).fetch_store().await.unwrap();
    assert_eq!(store.pending_gaps(), 0);

    let fetched = client(addr).fetch().await.unwrap();
    assert_eq!(fetched, packets);
    assert_eq!(fetched[1].symbol_str(), Some("AAPL"));
    assert_eq!(fetched[1].side(), Some(Side::Buy));
}

#[tokio::test]
async fn test_many_gaps_with_split_delivery() {
    let packets = feed(60);
    let chunk = rand::thread_rng().gen_range(1..=40);
    let script = ServerScript::new(packets.clone())
        .drop_on_stream([1, 7, 8, 9, 30, 59])
        .chunk_size(chunk);
    let addr = start_server(script).await;

    let fetched = client(addr).fetch().await.unwrap();

    assert_eq!(fetched.len(), 60, "chunk size {}", chunk);
    assert_eq!(fetched, packets);
}

#[tokio::test]
async fn test_echoed_sequence_correlation() {
    let packets = feed(10);
    let addr = start_server(ServerScript::new(packets.clone()).drop_on_stream([4, 6])).await;
    let client = PacketClient::new(
        FetchConfig::new(addr.to_string()).with_correlation(ReplyCorrelation::EchoedSequence),
    );

    assert_eq!(client.fetch().await.unwrap(), packets);
}

#[tokio::test]
async fn test_unrecoverable_gap_fails_validation() {
    let packets = feed(6);
    let script = ServerScript::new(packets.clone())
        .drop_on_stream([2, 4])
        .withhold([4]);
    let addr = start_server(script).await;

    let err = client(addr).fetch().await.unwrap_err();

    match err {
        FetchError::Invalid { report, packets: partial } => {
            assert_eq!(report.positions(), vec![4]);
            assert_eq!(report.violations[0].kind, ViolationKind::Missing);
            assert_eq!(partial.len(), 6);
            assert_eq!(partial[1], Some(packets[1]));
            assert_eq!(partial[3], None);
        }
        other => panic!("expected validation failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_each_fetch_starts_fresh() {
    let packets = feed(4);
    let addr = start_server(ServerScript::new(packets.clone()).drop_on_stream([3])).await;
    let client = client(addr);

    assert_eq!(client.fetch().await.unwrap(), packets);
    assert_eq!(client.fetch().await.unwrap(), packets);
}

#[tokio::test]
async fn test_connection_refused() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(addr).fetch().await.unwrap_err();

    assert!(matches!(err, FetchError::Io(_)), "got {err:?}");
}

#[tokio::test]
async fn test_idle_server_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        drop(socket);
    });

    let client = PacketClient::new(
        FetchConfig::new(addr.to_string()).with_read_timeout(Some(Duration::from_millis(200))),
    );
    let err = client.fetch().await.unwrap_err();

    assert!(matches!(err, FetchError::ReadTimeout { .. }), "got {err:?}");
}
