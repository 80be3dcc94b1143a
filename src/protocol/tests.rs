// test-only module included via protocol/mod.rs
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::time::Instant;

use crate::core::address::Endpoint;
use crate::core::frame::{read_datagram, write_datagram};
use crate::error::ProtocolError;
use crate::protocol::packet_conn::UotPacketConn;

fn pair(capacity: usize) -> (UotPacketConn<DuplexStream>, DuplexStream) {
    let (local, remote) = duplex(capacity);
    (UotPacketConn::new(local), remote)
}

async fn push_frame(peer: &mut DuplexStream, destination: &str, payload: &[u8]) {
    let destination: Endpoint = destination.parse().unwrap();
    write_datagram(peer, &destination, payload).await.unwrap();
}

#[tokio::test]
async fn test_send_to_writes_one_frame() {
    let (conn, mut peer) = pair(1024);
    let target: Endpoint = "93.184.216.34:443".parse().unwrap();

    let written = conn.send_to(&[1, 2, 3], Some(&target)).await.unwrap();
    assert_eq!(written, 3, "payload length, not frame length");

    let mut wire = [0u8; 14];
    peer.read_exact(&mut wire).await.unwrap();
    assert_eq!(
        wire,
        [0x00, 0x07, 0x00, 0x03, 0x01, 0x5D, 0xB8, 0xD8, 0x22, 0x01, 0xBB, 0x01, 0x02, 0x03]
    );
}

#[tokio::test]
async fn test_send_to_without_address() {
    let (conn, _peer) = pair(1024);
    let err = conn.send_to(b"data", None).await.unwrap_err();
    assert!(matches!(err, ProtocolError::NilAddress));
    assert_eq!(conn.metrics().snapshot().datagrams_sent, 0);
}

#[tokio::test]
async fn test_send_to_addr_roundtrip() {
    let (conn, mut peer) = pair(1024);
    let target: SocketAddr = "[2001:db8::7]:5000".parse().unwrap();
    conn.send_to_addr(b"hello", target).await.unwrap();

    let datagram = read_datagram(&mut peer).await.unwrap();
    assert_eq!(datagram.destination.socket_addr(), Some(target));
    assert_eq!(datagram.payload.as_ref(), b"hello");
}

#[tokio::test]
async fn test_recv_from_returns_payload_and_source() {
    let (conn, mut peer) = pair(1024);
    push_frame(&mut peer, "192.0.2.10:5353", b"answer").await;

    let mut buf = [0u8; 64];
    let (len, source) = conn.recv_from(&mut buf).await.unwrap();
    assert_eq!(&buf[..len], b"answer");
    assert_eq!(source, "192.0.2.10:5353".parse::<SocketAddr>().unwrap());
}

#[tokio::test]
async fn test_recv_from_skips_unknown_address_type() {
    let (conn, mut peer) = pair(1024);
    // addr_len=3, payload_len=2, tag 0x09 is not a known address type
    peer.write_all(&[0x00, 0x03, 0x00, 0x02, 0x09, 0x00, 0x00, 0xDE, 0xAD])
        .await
        .unwrap();
    push_frame(&mut peer, "198.51.100.1:4000", b"good").await;

    let mut buf = [0u8; 64];
    let (len, source) = conn.recv_from(&mut buf).await.unwrap();
    assert_eq!(&buf[..len], b"good");
    assert_eq!(source, "198.51.100.1:4000".parse::<SocketAddr>().unwrap());
    assert_eq!(conn.metrics().snapshot().datagrams_discarded, 1);
}

#[tokio::test]
async fn test_recv_from_skips_unresolvable_domain() {
    let (conn, mut peer) = pair(1024);
    let empty = Endpoint::domain(Vec::new(), 53).unwrap();
    write_datagram(&mut peer, &empty, b"lost").await.unwrap();
    let binary = Endpoint::domain(vec![0xFF, 0x00, 0xFE], 53).unwrap();
    write_datagram(&mut peer, &binary, b"lost too").await.unwrap();
    push_frame(&mut peer, "203.0.113.5:53", b"kept").await;

    let mut buf = [0u8; 64];
    let (len, source) = conn.recv_from(&mut buf).await.unwrap();
    assert_eq!(&buf[..len], b"kept");
    assert_eq!(source.port(), 53);
    assert_eq!(conn.metrics().snapshot().datagrams_discarded, 2);
}

#[tokio::test]
async fn test_recv_from_short_buffer() {
    let (conn, mut peer) = pair(1024);
    push_frame(&mut peer, "10.0.0.1:9", &[0x55; 100]).await;
    push_frame(&mut peer, "10.0.0.1:9", &[0x66; 10]).await;

    let mut small = [0xAAu8; 50];
    let err = conn.recv_from(&mut small).await.unwrap_err();
    match err {
        ProtocolError::ShortBuffer { needed, available } => {
            assert_eq!(needed, 100);
            assert_eq!(available, 50);
        }
        other => panic!("unexpected: {other:?}"),
    }
    assert!(small.iter().all(|&b| b == 0xAA), "no partial copy");

    // The oversized frame was consumed; the next one is intact
    let (len, _) = conn.recv_from(&mut small).await.unwrap();
    assert_eq!(&small[..len], &[0x66; 10]);
    assert_eq!(conn.metrics().snapshot().datagrams_oversized, 1);
}

#[tokio::test]
async fn test_recv_from_empty_datagram() {
    let (conn, mut peer) = pair(1024);
    push_frame(&mut peer, "10.0.0.2:7", &[]).await;

    let mut buf = [0u8; 0];
    let (len, source) = conn.recv_from(&mut buf).await.unwrap();
    assert_eq!(len, 0);
    assert_eq!(source.port(), 7);
}

#[tokio::test]
async fn test_recv_from_invalid_frame_is_fatal() {
    let (conn, mut peer) = pair(1024);
    peer.write_all(&[0x00, 0x00, 0x00, 0x01, 0xFF]).await.unwrap();

    let mut buf = [0u8; 16];
    let err = conn.recv_from(&mut buf).await.unwrap_err();
    assert!(matches!(err, ProtocolError::InvalidFrame(_)));
}

#[tokio::test]
async fn test_recv_from_propagates_eof() {
    let (conn, peer) = pair(1024);
    drop(peer);

    let mut buf = [0u8; 16];
    let err = conn.recv_from(&mut buf).await.unwrap_err();
    assert!(err.is_eof(), "expected EOF, got {err:?}");
}

#[tokio::test(start_paused = true)]
async fn test_read_deadline() {
    let (conn, _peer) = pair(1024);
    conn.set_read_deadline(Some(Instant::now() + Duration::from_millis(100)));

    let mut buf = [0u8; 16];
    let err = conn.recv_from(&mut buf).await.unwrap_err();
    assert!(matches!(err, ProtocolError::Timeout));

    conn.set_read_deadline(None);
    assert!(conn.limits().max_payload_size() > 0);
}

#[tokio::test(start_paused = true)]
async fn test_write_deadline_on_stalled_peer() {
    // Peer never reads, so the 16-byte pipe fills up
    let (conn, _peer) = pair(16);
    let target: Endpoint = "10.0.0.3:1".parse().unwrap();
    conn.set_deadline(Some(Instant::now() + Duration::from_millis(100)));

    let err = conn.send_to(&[0u8; 256], Some(&target)).await.unwrap_err();
    assert!(matches!(err, ProtocolError::Timeout));
}

#[tokio::test]
async fn test_past_deadline_fails_fast() {
    let (conn, mut peer) = pair(1024);
    push_frame(&mut peer, "10.0.0.4:1", b"ready").await;
    conn.set_deadline(Some(Instant::now() - Duration::from_millis(1)));

    let mut buf = [0u8; 16];
    assert!(matches!(
        conn.recv_from(&mut buf).await,
        Err(ProtocolError::Timeout)
    ));
}

#[tokio::test]
async fn test_close_is_idempotent() {
    let (conn, mut peer) = pair(1024);
    conn.close().await.unwrap();
    conn.close().await.unwrap();
    assert!(conn.is_closed());

    let target: Endpoint = "10.0.0.5:1".parse().unwrap();
    assert!(matches!(
        conn.send_to(b"x", Some(&target)).await,
        Err(ProtocolError::ConnectionClosed)
    ));

    let mut rest = Vec::new();
    peer.read_to_end(&mut rest).await.unwrap();
    assert!(rest.is_empty());
}

#[tokio::test]
async fn test_close_wakes_pending_recv() {
    let (conn, _peer) = pair(1024);
    let conn = Arc::new(conn);

    let receiver = {
        let conn = conn.clone();
        tokio::spawn(async move {
            let mut buf = [0u8; 16];
            conn.recv_from(&mut buf).await
        })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    conn.close().await.unwrap();

    let result = tokio::time::timeout(Duration::from_secs(2), receiver)
        .await
        .expect("recv_from should return after close")
        .unwrap();
    assert!(matches!(result, Err(ProtocolError::ConnectionClosed)));
}

#[tokio::test]
async fn test_close_not_blocked_by_stalled_writer() {
    // Peer never reads, so the 16-byte pipe stalls the sender mid-frame
    let (conn, _peer) = pair(16);
    let conn = Arc::new(conn);

    let sender = {
        let conn = conn.clone();
        tokio::spawn(async move {
            let target: Endpoint = "10.0.0.6:1".parse().unwrap();
            conn.send_to(&[0u8; 256], Some(&target)).await
        })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    tokio::time::timeout(Duration::from_secs(2), conn.close())
        .await
        .expect("close should not wait for the stalled sender")
        .unwrap();

    let result = tokio::time::timeout(Duration::from_secs(2), sender)
        .await
        .expect("send_to should return after close")
        .unwrap();
    assert!(matches!(result, Err(ProtocolError::ConnectionClosed)));
    assert_eq!(conn.metrics().snapshot().datagrams_sent, 0);
}

#[tokio::test(start_paused = true)]
async fn test_read_deadline_set_while_pending() {
    let (conn, _peer) = pair(1024);
    let conn = Arc::new(conn);

    let receiver = {
        let conn = conn.clone();
        tokio::spawn(async move {
            let mut buf = [0u8; 16];
            conn.recv_from(&mut buf).await
        })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    conn.set_read_deadline(Some(Instant::now()));

    let result = tokio::time::timeout(Duration::from_secs(2), receiver)
        .await
        .expect("recv_from should honour a deadline set while it waits")
        .unwrap();
    assert!(matches!(result, Err(ProtocolError::Timeout)));

    // Clearing the deadline makes the adapter usable again
    conn.set_read_deadline(None);
    assert!(!conn.is_closed());
}

#[tokio::test(start_paused = true)]
async fn test_write_deadline_set_while_pending() {
    let (conn, _peer) = pair(16);
    let conn = Arc::new(conn);

    let sender = {
        let conn = conn.clone();
        tokio::spawn(async move {
            let target: Endpoint = "10.0.0.7:1".parse().unwrap();
            conn.send_to(&[0u8; 256], Some(&target)).await
        })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    conn.set_write_deadline(Some(Instant::now() + Duration::from_millis(10)));

    let result = tokio::time::timeout(Duration::from_secs(2), sender)
        .await
        .expect("send_to should honour a deadline set while it waits")
        .unwrap();
    assert!(matches!(result, Err(ProtocolError::Timeout)));
}

#[tokio::test]
async fn test_recv_from_ignores_trailing_address_bytes() {
    let (conn, mut peer) = pair(1024);
    // addr_len=8 covers an IPv4 address plus one stray byte
    peer.write_all(&[0x00, 0x08, 0x00, 0x02, 0x01, 192, 0, 2, 9, 0x00, 0x35, 0xEE, 0xCA, 0xFE])
        .await
        .unwrap();

    let mut buf = [0u8; 16];
    let (len, source) = conn.recv_from(&mut buf).await.unwrap();
    assert_eq!(&buf[..len], &[0xCA, 0xFE]);
    assert_eq!(source, "192.0.2.9:53".parse::<SocketAddr>().unwrap());
    assert_eq!(conn.metrics().snapshot().datagrams_discarded, 0);
}

#[tokio::test]
async fn test_local_addr_without_socket() {
    let (conn, _peer) = pair(64);
    assert!(matches!(conn.local_addr(), Err(ProtocolError::Io(_))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_senders_do_not_interleave() {
    const SENDERS: usize = 32;

    // A small pipe forces partial writes while other senders wait
    let (conn, mut peer) = pair(256);
    let conn = Arc::new(conn);

    let reader = tokio::spawn(async move {
        let mut seen = Vec::with_capacity(SENDERS);
        for _ in 0..SENDERS {
            let datagram = read_datagram(&mut peer).await.unwrap();
            seen.push(datagram);
        }
        seen
    });

    let mut senders = Vec::new();
    for i in 0..SENDERS {
        let conn = conn.clone();
        senders.push(tokio::spawn(async move {
            let target: Endpoint = format!("10.1.0.{i}:{}", 1000 + i).parse().unwrap();
            let payload = vec![i as u8; 100 + i];
            conn.send_to(&payload, Some(&target)).await.unwrap()
        }));
    }
    for sender in senders {
        sender.await.unwrap();
    }

    let mut seen = reader.await.unwrap();
    assert_eq!(seen.len(), SENDERS);
    seen.sort_by_key(|d| d.destination.port());
    for (i, datagram) in seen.iter().enumerate() {
        assert_eq!(datagram.destination.port() as usize, 1000 + i);
        assert_eq!(datagram.payload.len(), 100 + i);
        assert!(datagram.payload.iter().all(|&b| b == i as u8));
    }
    assert_eq!(conn.metrics().snapshot().datagrams_sent, SENDERS as u64);
}

#[tokio::test]
async fn test_into_inner_returns_stream() {
    let (conn, mut peer) = pair(64);
    let mut stream = conn.into_inner();
    stream.write_all(b"raw").await.unwrap();

    let mut buf = [0u8; 3];
    peer.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"raw");
}
