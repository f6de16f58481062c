//! Demo signaling server
//!
//! Run with: cargo run --example signaling_server [BIND_ADDR]
//!
//! Examples:
//!   cargo run --example signaling_server                  # binds to 0.0.0.0:8090
//!   cargo run --example signaling_server localhost        # binds to 127.0.0.1:8090
//!   cargo run --example signaling_server 127.0.0.1:9000   # binds to 127.0.0.1:9000
//!
//! ## Driving it by hand
//!
//! With wscat (or any WebSocket client), as a creator:
//!   wscat -c ws://localhost:8090
//!   > {"type":"connect","identity":{"user":"cora"},"role":"creator"}
//!   > {"type":"start-stream","streamId":"s1"}
//!
//! And as a viewer in a second terminal:
//!   wscat -c ws://localhost:8090
//!   > {"type":"connect","identity":{"guest":"g-1"},"role":"viewer"}
//!   > {"type":"join-stream","streamId":"s1"}
//!   > {"type":"chat-message","streamId":"s1","text":"hello"}
//!
//! The creator terminal receives `viewer-joined`, `viewer-count-update`
//! and the chat fan-out; offers/answers/ICE candidates are forwarded
//! verbatim between the two connection ids.

use std::net::SocketAddr;
use std::sync::Arc;

use signaling_rs::{HubConfig, ServerConfig, SignalingHub, SignalingServer};

/// Parse bind address from command line argument.
///
/// Accepts "localhost", an IP, or IP:PORT.
fn parse_bind_addr(arg: &str) -> Result<SocketAddr, String> {
    const DEFAULT_PORT: u16 = 8090;

    let normalized = arg.replace("localhost", "127.0.0.1");

    if let Ok(addr) = normalized.parse::<SocketAddr>() {
        return Ok(addr);
    }

    if let Ok(ip) = normalized.parse::<std::net::IpAddr>() {
        return Ok(SocketAddr::new(ip, DEFAULT_PORT));
    }

    Err(format!(
        "Invalid bind address: '{}'. Expected format: IP:PORT or IP or 'localhost'",
        arg
    ))
}

fn print_usage() {
    eprintln!("Usage: signaling_server [BIND_ADDR]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  BIND_ADDR    Address to bind to (default: 0.0.0.0:8090)");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let bind_addr = match args.get(1) {
        Some(addr_str) => match parse_bind_addr(addr_str) {
            Ok(addr) => addr,
            Err(e) => {
                eprintln!("Error: {}", e);
                eprintln!();
                print_usage();
                std::process::exit(1);
            }
        },
        None => "0.0.0.0:8090".parse().unwrap(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("signaling_rs=debug".parse()?)
                .add_directive("signaling_server=debug".parse()?),
        )
        .init();

    let config = ServerConfig {
        bind_addr,
        ..ServerConfig::default()
    };

    println!("Starting signaling server on {}", config.bind_addr);
    println!();
    println!("=== Go live ===");
    println!("{{\"type\":\"connect\",\"identity\":{{\"user\":\"cora\"}},\"role\":\"creator\"}}");
    println!("{{\"type\":\"start-stream\",\"streamId\":\"s1\"}}");
    println!();
    println!("=== Watch ===");
    println!("{{\"type\":\"connect\",\"identity\":{{\"guest\":\"g-1\"}},\"role\":\"viewer\"}}");
    println!("{{\"type\":\"join-stream\",\"streamId\":\"s1\"}}");
    println!();

    let hub = Arc::new(SignalingHub::new(HubConfig::default()));
    let server = SignalingServer::new(config, hub);

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                eprintln!("Server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            println!("\nShutting down...");
        }
    }

    Ok(())
}
