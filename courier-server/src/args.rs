//! Command-line argument parsing

use clap::Parser;
use courier_common::DEFAULT_PORT;
use std::net::IpAddr;

/// Courier relay broker
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// IP address to bind to (IPv4 or IPv6)
    #[arg(short, long, default_value = "0.0.0.0")]
    pub bind: IpAddr,

    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Enable debug logging (connects, disconnects, dropped events)
    #[arg(long, default_value = "false")]
    pub debug: bool,

    /// Maximum connections per IP address (0 = unlimited)
    #[arg(long, default_value_t = 16)]
    pub max_connections_per_ip: usize,

    /// Seconds before an unanswered transfer request expires (0 = never)
    #[arg(long, default_value_t = 300)]
    pub request_ttl: u64,
}
