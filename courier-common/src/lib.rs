//! Courier Common Library
//!
//! Shared wire protocol and framing for the Courier relay broker and its
//! clients.

pub mod framing;
pub mod io;
pub mod protocol;

/// Version information for the Courier protocol
pub const PROTOCOL_VERSION: &str = "0.3.4";

/// Default port for broker connections
pub const DEFAULT_PORT: u16 = 7600;

/// Chunk size senders use when slicing a byte stream into `StreamData`
/// frames (64KB)
pub const STREAM_CHUNK_SIZE: usize = 64 * 1024;
