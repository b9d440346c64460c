use std::error::Error;
use std::net::IpAddr;

use clap::Parser;
use dotenvy::dotenv;
use tokio::io::{AsyncBufReadExt, BufReader};

use lanchat::{ChatClient, DEFAULT_PORT, EngineEvent, RoomKey, config};

#[derive(Parser)]
#[command(
    name = "lanchat",
    version,
    about = "Serverless LAN chat over UDP broadcast"
)]
struct Cli {
    /// Display name to announce
    #[arg(long)]
    name: Option<String>,
    /// UDP chat port
    #[arg(long)]
    port: Option<u16>,
    /// Explicit broadcast address (skips interface selection)
    #[arg(long)]
    broadcast: Option<String>,
    /// Path to JSON config file
    #[arg(long, default_value = config::DEFAULT_CONFIG_PATH, value_name = "FILE")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    let file = config::load_config(&cli.config);
    let name = cli.name.or(file.name);
    let port = cli.port.or(file.port).unwrap_or(DEFAULT_PORT);
    let broadcast = cli.broadcast.or(file.broadcast);

    let (mut client, mut events) = ChatClient::new(name.as_deref(), port)?;
    client.connect().await?;
    if let Some(addr) = broadcast {
        client.set_broadcast(addr.parse()?).await?;
    }

    log::info!(
        "Connected as {} on port {port}",
        client.self_node().await.display_name()
    );

    // Network -> terminal
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            print_event(event);
        }
    });

    println!("Type text to chat publicly; /help lists commands.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "/quit" {
            break;
        }
        if line.starts_with('/') {
            run_command(&client, &cli.config, line).await;
        } else if let Err(err) = client.send_text(RoomKey::Public, line).await {
            log::error!("Send failed: {err}");
        }
    }

    if let Err(err) = client.disconnect("bye").await {
        log::warn!("Disconnect failed: {err}");
    }
    Ok(())
}

async fn run_command(client: &ChatClient, config_path: &str, line: &str) {
    let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
    match command {
        "/help" => {
            println!("/name <name>        rename yourself");
            println!("/msg <ip> <text>    send a private message");
            println!("/who                list public-room participants");
            println!("/rooms              list open rooms");
            println!("/broadcast <ip>     override the broadcast address");
            println!("/quit               leave and exit");
        }
        "/name" => match client.rename_self(rest).await {
            Ok(()) => config::persist_user_name(config_path, rest.trim()),
            Err(err) => println!("! {err}"),
        },
        "/msg" => {
            let Some((addr, text)) = rest.split_once(' ') else {
                println!("! usage: /msg <ip> <text>");
                return;
            };
            match addr.parse::<IpAddr>() {
                Ok(addr) => {
                    if let Err(err) = client.send_text(RoomKey::Private(addr), text).await {
                        println!("! {err}");
                    }
                }
                Err(err) => println!("! bad address {addr:?}: {err}"),
            }
        }
        "/who" => match client.participants(RoomKey::Public).await {
            Ok(nodes) => {
                for node in nodes {
                    println!("  {}", node.unique_name());
                }
            }
            Err(err) => println!("! {err}"),
        },
        "/rooms" => {
            for room in client.rooms().await {
                println!(
                    "  {} ({} participants)",
                    room.name(),
                    room.participant_count()
                );
            }
        }
        "/broadcast" => match rest.trim().parse::<IpAddr>() {
            Ok(addr) => {
                if let Err(err) = client.set_broadcast(addr).await {
                    println!("! {err}");
                }
            }
            Err(err) => println!("! bad address: {err}"),
        },
        other => println!("! unknown command {other}; /help lists commands"),
    }
}

fn print_event(event: EngineEvent) {
    match event {
        EngineEvent::RoomOpened { name, .. } => println!("* room {name} opened"),
        EngineEvent::RoomRenamed { name, .. } => println!("* room is now {name}"),
        EngineEvent::NodeEntered { addr, name, .. } => {
            println!("* {name} ({addr}) entered the room");
        }
        EngineEvent::NodeRenamed { old_name, name, .. } => {
            println!("* {old_name} is now known as {name}");
        }
        EngineEvent::NodeLeft { name, farewell, .. } => {
            if farewell.is_empty() {
                println!("* {name} left");
            } else {
                println!("* {name} left: {farewell}");
            }
        }
        EngineEvent::MessageReceived { message, .. } => {
            let who = message
                .origin()
                .map(|addr| addr.to_string())
                .unwrap_or_else(|| "system".to_string());
            println!(
                "[{:02}:{:02}] {who}: {}",
                message.hour(),
                message.minute(),
                message.content()
            );
        }
        EngineEvent::ListenerFailed { reason } => {
            println!("! connection lost: {reason}");
        }
    }
}
