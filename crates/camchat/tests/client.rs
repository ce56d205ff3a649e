//! Integration tests for the client against a fake chat server on loopback.

use std::sync::Arc;
use std::time::Duration;

use camchat::prelude::*;
use camchat::protocol::{DecodeResult, HEADER_LEN, LOGIN_VERSION, decode, encode};
use camchat::EventReceiver;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;

const TIMEOUT: Duration = Duration::from_secs(5);

// =========================================================================
// Helpers
// =========================================================================

/// A server list that holds the first lookup until released, so a test
/// can subscribe before anything happens.
struct GatedServers {
    gate: Arc<Notify>,
    hosts: Vec<String>,
}

impl ServerList for GatedServers {
    async fn servers(&self) -> Result<Vec<String>, SessionError> {
        self.gate.notified().await;
        Ok(self.hosts.clone())
    }
}

async fn listen() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("should bind");
    let port = listener.local_addr().expect("should have addr").port();
    (listener, port)
}

fn test_config(port: u16) -> ClientConfig {
    ClientConfig {
        port,
        keepalive_interval: Duration::from_secs(60),
        reconnect_delay: Duration::from_millis(50),
        connect_timeout: Duration::from_secs(2),
        ..ClientConfig::default()
    }
}

fn start_client(config: ClientConfig) -> Client {
    Client::builder(StaticServerList::new(["127.0.0.1"]))
        .config(config)
        .start()
}

async fn accept(listener: &TcpListener) -> TcpStream {
    let (stream, _) = tokio::time::timeout(TIMEOUT, listener.accept())
        .await
        .expect("client should connect")
        .expect("accept should succeed");
    stream
}

async fn read_packet(stream: &mut TcpStream) -> Packet {
    let mut buf = vec![0u8; HEADER_LEN];
    tokio::time::timeout(TIMEOUT, stream.read_exact(&mut buf))
        .await
        .expect("header should arrive")
        .expect("read header");
    let len = i32::from_be_bytes([buf[24], buf[25], buf[26], buf[27]]) as usize;
    let mut payload = vec![0u8; len];
    stream.read_exact(&mut payload).await.expect("read payload");
    buf.extend_from_slice(&payload);

    match decode(&buf, 0) {
        DecodeResult::Complete { packet, .. } => packet,
        other => panic!("expected a complete packet, got {other:?}"),
    }
}

async fn write_packet(stream: &mut TcpStream, packet: &Packet) {
    let bytes = encode(packet).expect("encode");
    stream.write_all(&bytes).await.expect("write");
}

async fn expect_event(
    events: &mut EventReceiver,
    matches: impl Fn(&ClientEvent) -> bool,
) -> ClientEvent {
    tokio::time::timeout(TIMEOUT, async {
        loop {
            let event = events.recv().await.expect("event stream ended");
            if matches(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

async fn wait_for_state<T>(client: &Client<T>, want: ConnectionState) {
    tokio::time::timeout(TIMEOUT, async {
        loop {
            if client.state().await.expect("client alive") == want {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("timed out waiting for state");
}

fn login_response(status: i32, session_id: i32, uid: i32, name: &str) -> Packet {
    Packet {
        to: session_id,
        arg1: status,
        arg2: uid,
        payload: Payload::text(name),
        ..Packet::new(PacketType::Login)
    }
}

// =========================================================================
// Login
// =========================================================================

#[tokio::test]
async fn test_login_success_sets_session() {
    let (listener, port) = listen().await;
    let client = start_client(ClientConfig {
        credentials: Some(Credentials::new("alice", "c0ffee")),
        ..test_config(port)
    });
    let mut events = client.subscribe_events().await.unwrap();

    let mut server = accept(&listener).await;
    let login = read_packet(&mut server).await;
    assert_eq!(login.packet_type, PacketType::Login);
    assert_eq!(login.arg1, LOGIN_VERSION);
    assert_eq!(login.payload, Payload::text("alice:c0ffee"));

    write_packet(&mut server, &login_response(0, 4242, 99, "alice")).await;

    let event =
        expect_event(&mut events, |e| matches!(e, ClientEvent::Authenticated(_))).await;
    let expected = Session {
        session_id: 4242,
        uid: 99,
        username: "alice".into(),
    };
    assert_eq!(event, ClientEvent::Authenticated(expected.clone()));
    assert_eq!(client.session().await.unwrap(), expected);
    assert_eq!(client.state().await.unwrap(), ConnectionState::Authenticated);

    // Outbound packets now carry the session id.
    client.join_room(12345).await.unwrap();
    let join = read_packet(&mut server).await;
    assert_eq!(join.from, 4242);
}

#[tokio::test]
async fn test_login_failure_closes_client() {
    let (listener, port) = listen().await;
    let client = start_client(ClientConfig {
        credentials: Some(Credentials::new("alice", "wrong")),
        ..test_config(port)
    });
    let mut events = client.subscribe_events().await.unwrap();

    let mut server = accept(&listener).await;
    read_packet(&mut server).await;
    write_packet(&mut server, &login_response(7, 4242, 99, "alice")).await;

    expect_event(&mut events, |e| {
        *e == ClientEvent::AuthenticationFailed { status: 7 }
    })
    .await;
    expect_event(&mut events, |e| *e == ClientEvent::Closed).await;

    assert!(matches!(
        client.session().await,
        Err(CamchatError::ClientClosed)
    ));
}

#[tokio::test]
async fn test_login_failure_reconnects_when_configured() {
    let (listener, port) = listen().await;
    let client = start_client(ClientConfig {
        credentials: Some(Credentials::new("alice", "wrong")),
        reconnect_on_auth_failure: true,
        ..test_config(port)
    });
    let mut events = client.subscribe_events().await.unwrap();

    let mut first = accept(&listener).await;
    read_packet(&mut first).await;
    write_packet(&mut first, &login_response(7, 0, 0, "")).await;

    expect_event(&mut events, |e| {
        matches!(e, ClientEvent::ReconnectScheduled { .. })
    })
    .await;

    let mut second = accept(&listener).await;
    let login = read_packet(&mut second).await;
    assert_eq!(login.packet_type, PacketType::Login);
}

// =========================================================================
// Commands
// =========================================================================

#[tokio::test]
async fn test_send_chat_addresses_room_and_escapes_text() {
    let (listener, port) = listen().await;
    let client = start_client(test_config(port));

    let mut server = accept(&listener).await;
    wait_for_state(&client, ConnectionState::Connected).await;

    client.send_chat(12345, "hello world!").await.unwrap();

    let packet = read_packet(&mut server).await;
    assert_eq!(packet.packet_type, PacketType::Cmesg);
    assert_eq!(packet.to, 100_012_345);
    assert_eq!(packet.from, 0);
    assert_eq!(packet.payload, Payload::text("hello world%21"));
}

#[tokio::test]
async fn test_send_chat_applies_transform() {
    let (listener, port) = listen().await;
    let table: ReplacementTable = [(":wave:", "hi")].into_iter().collect();
    let client = Client::builder(StaticServerList::new(["127.0.0.1"]))
        .config(test_config(port))
        .transform(table)
        .start();

    let mut server = accept(&listener).await;
    wait_for_state(&client, ConnectionState::Connected).await;

    client.send_private_message(100_000_007, ":wave: there").await.unwrap();

    let packet = read_packet(&mut server).await;
    assert_eq!(packet.packet_type, PacketType::Pmesg);
    assert_eq!(packet.to, 7);
    assert_eq!(packet.payload, Payload::text("hi there"));
}

#[tokio::test]
async fn test_keepalive_sent_on_interval() {
    let (listener, port) = listen().await;
    let _client = start_client(ClientConfig {
        keepalive_interval: Duration::from_millis(50),
        ..test_config(port)
    });

    let mut server = accept(&listener).await;
    for _ in 0..2 {
        let packet = read_packet(&mut server).await;
        assert_eq!(packet.packet_type, PacketType::Null);
        assert!(packet.payload.is_none());
    }
}

#[tokio::test]
async fn test_send_while_not_connected_fails() {
    let gate = Arc::new(Notify::new());
    let client = Client::builder(GatedServers {
        gate: Arc::clone(&gate),
        hosts: vec!["127.0.0.1".into()],
    })
    .start();

    let result = client.send_chat(1, "hi").await;
    assert!(matches!(result, Err(CamchatError::NotConnected)));
    assert_eq!(
        client.state().await.unwrap(),
        ConnectionState::ResolvingServer
    );
}

// =========================================================================
// Inbound packets
// =========================================================================

#[tokio::test]
async fn test_packets_in_one_write_dispatched_in_order() {
    let (listener, port) = listen().await;
    let client = start_client(test_config(port));
    let mut all = client.subscribe_all().await.unwrap();

    let mut server = accept(&listener).await;
    let mut bytes = Vec::new();
    for n in 1..=2 {
        let packet = Packet {
            arg1: n,
            payload: Payload::Json(json!({"msg": "hi%20there"})),
            ..Packet::new(PacketType::Cmesg)
        };
        bytes.extend(encode(&packet).unwrap());
    }
    server.write_all(&bytes).await.unwrap();

    for n in 1..=2 {
        let packet = tokio::time::timeout(TIMEOUT, all.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(packet.arg1, n);
        assert_eq!(packet.chat_text().as_deref(), Some("hi there"));
    }
}

#[tokio::test]
async fn test_session_state_updates_model_before_publish() {
    let (listener, port) = listen().await;
    let client = start_client(test_config(port));
    let mut updates = client.subscribe(PacketType::SessionState).await.unwrap();

    let mut server = accept(&listener).await;
    let packet = Packet {
        arg2: 77,
        payload: Payload::Json(json!({"nm": "eve", "rc": 3})),
        ..Packet::new(PacketType::SessionState)
    };
    write_packet(&mut server, &packet).await;

    let received = tokio::time::timeout(TIMEOUT, updates.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(received.arg2, 77);

    let model = client.model(ModelId(77)).await.unwrap().unwrap();
    assert_eq!(model.name(), Some("eve"));
    assert_eq!(model.get("rc"), Some(&json!(3)));
    assert_eq!(client.model_count().await.unwrap(), 1);
}

// =========================================================================
// Disconnects
// =========================================================================

#[tokio::test]
async fn test_reconnect_after_server_close() {
    let (listener, port) = listen().await;
    let client = start_client(test_config(port));
    let mut events = client.subscribe_events().await.unwrap();

    let first = accept(&listener).await;
    drop(first);

    let event =
        expect_event(&mut events, |e| matches!(e, ClientEvent::Disconnected { .. })).await;
    assert!(matches!(
        &event,
        ClientEvent::Disconnected { reason } if reason.starts_with("connection closed")
    ));
    let scheduled = expect_event(&mut events, |e| {
        matches!(e, ClientEvent::ReconnectScheduled { .. })
    })
    .await;
    assert_eq!(
        scheduled,
        ClientEvent::ReconnectScheduled {
            delay: Duration::from_millis(50),
            attempt: 1,
        }
    );

    let _second = accept(&listener).await;
    wait_for_state(&client, ConnectionState::Connected).await;
}

#[tokio::test]
async fn test_keepalive_stops_after_end_of_stream() {
    let (listener, port) = listen().await;
    let client = start_client(ClientConfig {
        keepalive_interval: Duration::from_millis(20),
        reconnect_delay: Duration::from_secs(3600),
        ..test_config(port)
    });
    let mut events = client.subscribe_events().await.unwrap();

    let mut server = accept(&listener).await;
    assert_eq!(read_packet(&mut server).await.packet_type, PacketType::Null);
    drop(server);

    expect_event(&mut events, |e| matches!(e, ClientEvent::Disconnected { .. })).await;

    // Many keepalive intervals pass while the reconnect is pending.
    tokio::time::sleep(Duration::from_millis(300)).await;
    let mut disconnects = 1;
    while let Ok(event) = events.try_recv() {
        if matches!(event, ClientEvent::Disconnected { .. }) {
            disconnects += 1;
        }
    }
    assert_eq!(disconnects, 1);
    assert_eq!(client.state().await.unwrap(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_oversized_length_drops_connection() {
    let (listener, port) = listen().await;
    let client = start_client(ClientConfig {
        max_payload_len: 1024,
        ..test_config(port)
    });
    let mut events = client.subscribe_events().await.unwrap();
    let mut all = client.subscribe_all().await.unwrap();

    let mut server = accept(&listener).await;
    let mut bytes = encode(&Packet::new(PacketType::Null)).unwrap();
    bytes[24..28].copy_from_slice(&i32::MAX.to_be_bytes());
    bytes.extend(encode(&Packet::new(PacketType::Null)).unwrap());
    server.write_all(&bytes).await.unwrap();

    let event =
        expect_event(&mut events, |e| matches!(e, ClientEvent::ProtocolDesync(_))).await;
    assert_eq!(
        event,
        ClientEvent::ProtocolDesync(camchat::protocol::Desync::PayloadTooLong(i32::MAX))
    );
    assert!(all.try_recv().is_err());

    let _next = accept(&listener).await;
}

#[tokio::test]
async fn test_partial_bytes_discarded_across_reconnect() {
    let (listener, port) = listen().await;
    let client = start_client(test_config(port));
    let mut events = client.subscribe_events().await.unwrap();
    let mut all = client.subscribe_all().await.unwrap();

    let packet = Packet {
        from: 1,
        to: 2,
        payload: Payload::text("completed later"),
        ..Packet::new(PacketType::Cmesg)
    };
    let bytes = encode(&packet).unwrap();

    // Half a packet, then the server goes away.
    let mut first = accept(&listener).await;
    first.write_all(&bytes[..10]).await.unwrap();
    drop(first);

    // The rest arrives on the new connection and must not complete it.
    let mut second = accept(&listener).await;
    second.write_all(&bytes[10..]).await.unwrap();

    expect_event(&mut events, |e| matches!(e, ClientEvent::ProtocolDesync(_))).await;
    assert!(all.try_recv().is_err());

    // A clean packet on a fresh connection goes through.
    let mut third = accept(&listener).await;
    write_packet(&mut third, &packet).await;
    let received = tokio::time::timeout(TIMEOUT, all.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(*received, packet);
}

#[tokio::test]
async fn test_bad_magic_drops_connection() {
    let (listener, port) = listen().await;
    let client = start_client(test_config(port));
    let mut events = client.subscribe_events().await.unwrap();

    let mut server = accept(&listener).await;
    server.write_all(&[0u8; HEADER_LEN]).await.unwrap();

    let event =
        expect_event(&mut events, |e| matches!(e, ClientEvent::ProtocolDesync(_))).await;
    assert_eq!(
        event,
        ClientEvent::ProtocolDesync(camchat::protocol::Desync::BadMagic(0))
    );

    // The client hung up on its side.
    let mut buf = [0u8; 1];
    let n = tokio::time::timeout(TIMEOUT, server.read(&mut buf))
        .await
        .unwrap()
        .unwrap_or(0);
    assert_eq!(n, 0);

    let _next = accept(&listener).await;
}

// =========================================================================
// Shutdown and configuration
// =========================================================================

#[tokio::test]
async fn test_shutdown_closes_socket_and_rejects_calls() {
    let (listener, port) = listen().await;
    let client = start_client(test_config(port));
    let other = client.clone();

    let mut server = accept(&listener).await;
    wait_for_state(&client, ConnectionState::Connected).await;

    client.shutdown().await;

    let mut buf = [0u8; 1];
    let n = tokio::time::timeout(TIMEOUT, server.read(&mut buf))
        .await
        .unwrap()
        .unwrap_or(0);
    assert_eq!(n, 0);

    assert!(matches!(other.state().await, Err(CamchatError::ClientClosed)));
    assert!(matches!(
        other.send_chat(1, "hi").await,
        Err(CamchatError::ClientClosed)
    ));
    // A second shutdown is harmless.
    other.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_cancels_pending_reconnect() {
    let (listener, port) = listen().await;
    let client = start_client(ClientConfig {
        reconnect_delay: Duration::from_secs(3600),
        ..test_config(port)
    });
    let mut events = client.subscribe_events().await.unwrap();

    drop(accept(&listener).await);
    expect_event(&mut events, |e| {
        matches!(e, ClientEvent::ReconnectScheduled { .. })
    })
    .await;

    tokio::time::timeout(TIMEOUT, client.shutdown())
        .await
        .expect("shutdown should not wait out the reconnect delay");
    expect_event(&mut events, |e| *e == ClientEvent::Closed).await;
}

#[tokio::test]
async fn test_empty_server_list_is_configuration_error() {
    let gate = Arc::new(Notify::new());
    let client = Client::builder(GatedServers {
        gate: Arc::clone(&gate),
        hosts: Vec::new(),
    })
    .start();
    let mut events = client.subscribe_events().await.unwrap();

    gate.notify_one();

    expect_event(&mut events, |e| {
        matches!(e, ClientEvent::ConfigurationError(_))
    })
    .await;
    expect_event(&mut events, |e| *e == ClientEvent::Closed).await;
    assert!(matches!(client.state().await, Err(CamchatError::ClientClosed)));
}
