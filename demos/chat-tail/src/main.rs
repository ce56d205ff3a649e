//! Tails one room's chat to stdout.
//!
//!   cargo run -p chat-tail -- --server chat.example.com --room 12345
//!   cargo run -p chat-tail -- --server 127.0.0.1 --port 9000 --room 12345 \
//!       --user alice --credential <pre-hashed>
//!
//! `RUST_LOG=camchat=debug` shows the connection lifecycle.

use camchat::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("chat_tail=info".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let servers: Vec<String> = parse_arg(&args, "--server")
        .map(|s| s.split(',').map(str::to_owned).collect())
        .unwrap_or_default();
    let room: i32 = parse_arg(&args, "--room")
        .and_then(|r| r.parse().ok())
        .ok_or("--room <id> is required")?;

    let mut config = ClientConfig::default();
    if let Some(port) = parse_arg(&args, "--port").and_then(|p| p.parse().ok()) {
        config.port = port;
    }
    if let (Some(user), Some(credential)) =
        (parse_arg(&args, "--user"), parse_arg(&args, "--credential"))
    {
        config.credentials = Some(Credentials::new(user, credential));
    }

    // Join once the server will accept commands from us.
    let join_on = if config.credentials.is_some() {
        ConnectionState::Authenticated
    } else {
        ConnectionState::Connected
    };

    let client = Client::builder(StaticServerList::new(servers))
        .config(config)
        .start();

    let mut events = client.subscribe_events().await?;
    let mut chat = client.subscribe(PacketType::Cmesg).await?;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(ClientEvent::StateChanged { to, .. }) if to == join_on => {
                    tracing::info!(state = %to, room, "joining");
                    if let Err(e) = client.join_room(room).await {
                        tracing::warn!(error = %e, "join failed");
                    }
                }
                Some(ClientEvent::Closed) | None => break,
                Some(other) => tracing::debug!(?other, "event"),
            },
            packet = chat.recv() => match packet {
                Some(packet) => {
                    let text = packet.chat_text().unwrap_or_default();
                    println!("[{}] {text}", packet.from);
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                client.shutdown().await;
                break;
            }
        }
    }

    Ok(())
}

fn parse_arg(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}
