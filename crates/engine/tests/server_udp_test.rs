//! End-to-end exercises over real loopback UDP sockets.

mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::time::{sleep, timeout};

use cyclone_dns_domain::{
    Config, Destination, EngineError, ListenerConfig, NetworkFamily, ResponseCode, Transport,
};
use cyclone_dns_engine::wire::PacketView;
use cyclone_dns_engine::DnsServer;

use common::{build_query, build_reply, ForwardingHandler};

fn test_config(resend_delay_ms: u64) -> Config {
    let mut config = Config::default();
    config.server.bind_address = "127.0.0.1".to_string();
    config.server.listeners.push(ListenerConfig {
        family: NetworkFamily::Inet4,
        transport: Transport::Udp,
        address: "127.0.0.1".to_string(),
        port: 0,
    });
    config.engine.resend_delay_ms = resend_delay_ms;
    config.engine.max_resend_count = 2;
    config
}

/// Binds an upstream that answers every query with one A record.
async fn spawn_answering_upstream() -> Destination {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();
    tokio::spawn(async move {
        let mut buf = [0u8; 1024];
        while let Ok((n, from)) = socket.recv_from(&mut buf).await {
            let reply = build_reply(&buf[..n]);
            let _ = socket.send_to(&reply, from).await;
        }
    });
    Destination::udp(addr)
}

/// Binds an upstream that swallows every query.
async fn spawn_silent_upstream() -> Destination {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();
    tokio::spawn(async move {
        let mut buf = [0u8; 1024];
        while socket.recv_from(&mut buf).await.is_ok() {}
    });
    Destination::udp(addr)
}

async fn start_server_with(config: Config, upstream: Destination) -> DnsServer {
    let mut server = DnsServer::new(config).unwrap();
    server
        .set_handler(Arc::new(ForwardingHandler { upstream }))
        .unwrap();
    server.listen().await.unwrap();
    server
}

async fn start_server(resend_delay_ms: u64, upstream: Destination) -> DnsServer {
    start_server_with(test_config(resend_delay_ms), upstream).await
}

#[tokio::test]
async fn end_to_end_forward_over_udp() {
    let upstream = spawn_answering_upstream().await;
    let mut server = start_server(1000, upstream).await;
    let addr = server.listener_addrs()[0];

    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    client
        .send_to(&build_query(0x4242, "example.com"), addr)
        .await
        .unwrap();

    let mut buf = [0u8; 1024];
    let (n, _) = timeout(Duration::from_secs(5), client.recv_from(&mut buf))
        .await
        .expect("no response within timeout")
        .unwrap();

    let view = PacketView::parse(buf[..n].to_vec()).unwrap();
    assert_eq!(view.header().id, 0x4242);
    assert!(view.header().response);
    assert_eq!(view.header().ancount, 1);
    assert_eq!(view.record_data(), Some(&[192u8, 0, 2, 1][..]));

    server.pause().unwrap();
}

#[tokio::test]
async fn silent_upstream_ends_in_servfail() {
    let upstream = spawn_silent_upstream().await;
    let mut server = start_server(100, upstream).await;
    let addr = server.listener_addrs()[0];

    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    client
        .send_to(&build_query(0x1234, "never.answers.test"), addr)
        .await
        .unwrap();

    // Two resends at 100ms intervals, then exhaustion.
    let mut buf = [0u8; 1024];
    let (n, _) = timeout(Duration::from_secs(5), client.recv_from(&mut buf))
        .await
        .expect("no SERVFAIL within timeout")
        .unwrap();

    let view = PacketView::parse(buf[..n].to_vec()).unwrap();
    assert_eq!(view.header().id, 0x1234);
    assert_eq!(view.header().response_code(), Some(ResponseCode::ServFail));

    server.pause().unwrap();
}

#[tokio::test]
async fn pause_discards_in_flight_cycles() {
    let upstream = spawn_silent_upstream().await;
    let mut server = start_server(5000, upstream).await;
    let addr = server.listener_addrs()[0];
    let engine = server.engine().unwrap().clone();

    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    client
        .send_to(&build_query(7, "pending.test"), addr)
        .await
        .unwrap();

    sleep(Duration::from_millis(100)).await;
    assert_eq!(engine.active_cycles(), 1);
    assert_eq!(engine.tracked_outgoing(), 1);

    server.pause().unwrap();
    assert_eq!(engine.active_cycles(), 0);
    assert_eq!(engine.tracked_outgoing(), 0);
}

#[tokio::test]
async fn worker_count_follows_initial_threads() {
    let upstream = spawn_silent_upstream().await;

    let mut config = test_config(1000);
    config.engine.initial_threads = 1;
    config.engine.max_threads = 4;
    let mut one_worker = start_server_with(config, upstream).await;

    let mut config = test_config(1000);
    config.engine.initial_threads = 3;
    config.engine.max_threads = 4;
    let mut three_workers = start_server_with(config, upstream).await;

    // Same process, so the non-worker tasks (upstream readers, resend
    // clock) are identical; the difference is the extra workers alone.
    assert_eq!(
        three_workers.task_count(),
        one_worker.task_count() + 2,
        "worker tasks must scale with initial_threads, not max_threads"
    );

    one_worker.pause().unwrap();
    three_workers.pause().unwrap();
    assert_eq!(one_worker.task_count(), 0);
}

#[tokio::test]
async fn lifecycle_misuse_is_rejected() {
    let upstream: Destination = "udp://127.0.0.1:9".parse().unwrap();
    let mut server = DnsServer::new(test_config(1000)).unwrap();

    assert_eq!(server.listen().await.unwrap_err(), EngineError::NoHandler);
    assert_eq!(server.pause().unwrap_err(), EngineError::InvalidPause);

    server
        .set_handler(Arc::new(ForwardingHandler { upstream }))
        .unwrap();
    server.listen().await.unwrap();
    assert!(server.is_listening());

    assert_eq!(
        server.listen().await.unwrap_err(),
        EngineError::AlreadyListening
    );
    assert_eq!(
        server
            .set_handler(Arc::new(ForwardingHandler { upstream }))
            .unwrap_err(),
        EngineError::MutationWhileListening
    );

    server.pause().unwrap();
    assert!(!server.is_listening());
    assert_eq!(server.pause().unwrap_err(), EngineError::InvalidPause);
}

#[test]
fn unsupported_configurations_fail_fast() {
    let mut config = test_config(1000);
    config.server.tcp_port = 853;
    assert_eq!(
        DnsServer::new(config).err(),
        Some(EngineError::TcpUnsupported)
    );

    let mut config = test_config(1000);
    config.server.http_port = 443;
    assert_eq!(
        DnsServer::new(config).err(),
        Some(EngineError::HttpUnsupported)
    );

    let mut config = test_config(1000);
    config.server.listeners[0].transport = Transport::Tcp;
    assert_eq!(
        DnsServer::new(config).err(),
        Some(EngineError::TcpUnsupported)
    );

    let mut config = test_config(1000);
    config.engine.max_threads = 0;
    assert!(matches!(
        DnsServer::new(config).err(),
        Some(EngineError::InvalidThreads(_))
    ));

    let mut config = test_config(1000);
    config.engine.initial_threads = 4;
    config.engine.max_threads = 2;
    assert!(matches!(
        DnsServer::new(config).err(),
        Some(EngineError::InvalidThreads(_))
    ));
}
