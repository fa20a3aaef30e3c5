//! Courier relay broker

mod args;
mod connection;
mod connection_tracker;
mod constants;
mod handlers;
mod registry;
mod transfers;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use args::Args;
use connection::ConnectionParams;
use connection_tracker::ConnectionTracker;
use constants::*;
use courier_common::protocol::ServerMessage;
use registry::PeerRegistry;
use transfers::TransferTable;

/// How often the sweeper looks for idle requests
const SWEEP_INTERVAL: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() {
    let args = Args::parse();

    println!("{}{}", MSG_BANNER, env!("CARGO_PKG_VERSION"));

    // Broker state: one registry of live connections, one table of
    // in-flight requests. Both are explicit values handed to every
    // connection task; nothing lives in globals.
    let registry = PeerRegistry::new();
    let table = Arc::new(TransferTable::new());

    // Connection tracking for DoS protection
    let connection_tracker = Arc::new(ConnectionTracker::new(args.max_connections_per_ip));

    let addr = SocketAddr::new(args.bind, args.port);
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("{}{}: {}", ERR_BIND_FAILED, addr, e);
            std::process::exit(1);
        }
    };
    println!("{}{}", MSG_LISTENING, addr);

    let shutdown_signal = setup_shutdown_signal();

    let debug = args.debug;
    let request_ttl = args.request_ttl;

    tokio::select! {
        _ = shutdown_signal => {
            println!("{}", MSG_SHUTDOWN_RECEIVED);
        }
        // Accept loop
        _ = async {
            loop {
                match listener.accept().await {
                    Ok((socket, peer_addr)) => {
                        // Check the per-IP limit before spawning anything
                        let connection_guard = match connection_tracker.try_acquire(peer_addr.ip()) {
                            Some(guard) => guard,
                            None => {
                                if debug {
                                    eprintln!("{}{}", ERR_CONNECTION_LIMIT, peer_addr.ip());
                                }
                                // Just drop the socket - client will see connection reset
                                continue;
                            }
                        };

                        let params = ConnectionParams {
                            peer_addr,
                            registry: registry.clone(),
                            table: table.clone(),
                            debug,
                        };

                        tokio::spawn(async move {
                            // Hold guard until the connection ends
                            let _guard = connection_guard;

                            if let Err(e) = connection::handle_connection(socket, params).await {
                                eprintln!("{}{}: {}", ERR_CONNECTION, peer_addr, e);
                            }
                        });
                    }
                    Err(e) => {
                        eprintln!("{}{}", ERR_ACCEPT, e);
                    }
                }
            }
        } => {}
        // Idle-request sweeper: requests that sit unanswered past the TTL
        // are retired and both parties are told
        _ = async {
            if request_ttl == 0 {
                // Expiry disabled, just wait forever
                std::future::pending::<()>().await;
                return;
            }
            let ttl = Duration::from_secs(request_ttl);
            loop {
                tokio::time::sleep(SWEEP_INTERVAL.min(ttl)).await;

                let expired = table.remove_expired(ttl);
                for request in expired {
                    if debug {
                        eprintln!("Expiring idle request {}", request.id);
                    }
                    let notice = ServerMessage::TransferCancelled { id: request.id };
                    registry.send_to(request.source, notice.clone(), None).await;
                    registry.send_to(request.dest, notice, None).await;
                }
            }
        } => {}
    }
}

/// Setup graceful shutdown signal handling (Ctrl+C / SIGTERM)
async fn setup_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = signal(SignalKind::terminate()).expect(ERR_SIGNAL_SIGTERM);
        let mut sigint = signal(SignalKind::interrupt()).expect(ERR_SIGNAL_SIGINT);

        tokio::select! {
            _ = sigterm.recv() => {},
            _ = sigint.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.expect(ERR_SIGNAL_CTRLC);
    }
}
