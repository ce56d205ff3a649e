//! Integration tests for the TCP transport.
//!
//! These tests spin up a real loopback listener so bytes actually cross
//! a socket. The listener binds to port 0 and the OS picks a free port.

use std::time::Duration;

use camchat_transport::{Connection, Connector, TcpConnector, TransportError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

async fn listen() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("should bind");
    let port = listener.local_addr().expect("local addr").port();
    (listener, port)
}

#[tokio::test]
async fn test_tcp_connect_send_and_receive() {
    let (listener, port) = listen().await;

    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");
        let mut buf = [0u8; 5];
        socket.read_exact(&mut buf).await.expect("read");
        socket.write_all(b"pong!").await.expect("write");
        buf
    });

    let conn = TcpConnector::default()
        .connect("127.0.0.1", port)
        .await
        .expect("should connect");

    conn.send(b"ping!").await.expect("send");

    let mut received = Vec::new();
    while received.len() < 5 {
        let chunk = conn.recv().await.expect("recv").expect("not closed");
        received.extend_from_slice(&chunk);
    }
    assert_eq!(received, b"pong!");
    assert_eq!(&server.await.expect("server task"), b"ping!");
}

#[tokio::test]
async fn test_tcp_recv_returns_none_on_remote_close() {
    let (listener, port) = listen().await;

    tokio::spawn(async move {
        let (socket, _) = listener.accept().await.expect("accept");
        drop(socket);
    });

    let conn = TcpConnector::default()
        .connect("127.0.0.1", port)
        .await
        .expect("should connect");

    let result = conn.recv().await.expect("clean close is not an error");
    assert!(result.is_none());
}

#[tokio::test]
async fn test_tcp_small_read_buffer_splits_chunks() {
    let (listener, port) = listen().await;

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");
        socket.write_all(b"abcdefgh").await.expect("write");
    });

    let conn = TcpConnector::new(Duration::from_secs(5), 3)
        .connect("127.0.0.1", port)
        .await
        .expect("should connect");

    let mut received = Vec::new();
    while let Some(chunk) = conn.recv().await.expect("recv") {
        assert!(chunk.len() <= 3, "chunk larger than read buffer");
        received.extend_from_slice(&chunk);
    }
    assert_eq!(received, b"abcdefgh");
}

#[tokio::test]
async fn test_tcp_connect_refused_returns_connect_failed() {
    // Grab a free port, then close the listener so nothing is there.
    let (listener, port) = listen().await;
    drop(listener);

    let result = TcpConnector::default().connect("127.0.0.1", port).await;
    assert!(matches!(result, Err(TransportError::ConnectFailed { .. })));
}

#[tokio::test]
async fn test_tcp_connections_get_distinct_ids() {
    let (listener, port) = listen().await;

    tokio::spawn(async move {
        let mut sockets = Vec::new();
        for _ in 0..2 {
            let (socket, _) = listener.accept().await.expect("accept");
            sockets.push(socket);
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    });

    let connector = TcpConnector::default();
    let a = connector.connect("127.0.0.1", port).await.expect("a");
    let b = connector.connect("127.0.0.1", port).await.expect("b");
    assert_ne!(a.id(), b.id());
}
