//! Wire framing for the Courier protocol
//!
//! Every message travels as a single frame:
//!
//! ```text
//! CR|<type_len>|<type>|<message_id>|<payload_len>|<payload>\n
//! ```
//!
//! The payload is JSON for every message type except `StreamData`, whose
//! payload is a raw chunk of relayed bytes. Frames are self-delimiting, so
//! event messages and data chunks can share one connection without a
//! separate data channel.

mod error;
mod frame;
pub mod limits;
mod message_id;
mod reader;
mod writer;

pub use error::FrameError;
pub use frame::RawFrame;
pub use message_id::MessageId;
pub use reader::{DEFAULT_FRAME_TIMEOUT, FrameReader};
pub use writer::FrameWriter;

/// Magic bytes that start every frame
pub const MAGIC: &[u8; 3] = b"CR|";

/// Field delimiter within a frame header
pub const DELIMITER: u8 = b'|';

/// Frame terminator
pub const TERMINATOR: u8 = b'\n';

/// Length of a message ID in bytes (hex characters)
pub const MSG_ID_LENGTH: usize = 12;

/// Longest allowed message type name
pub const MAX_TYPE_LENGTH: usize = 24;

/// Maximum digits in the type length field
pub const MAX_TYPE_LENGTH_DIGITS: usize = 2;

/// Maximum digits in the payload length field
pub const MAX_PAYLOAD_LENGTH_DIGITS: usize = 20;
