//! Frame parsing errors

use std::fmt;
use std::io;

/// Errors produced while reading or writing frames
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Frame did not start with the `CR|` magic bytes
    InvalidMagic,
    /// Connection closed in the middle of a frame
    ConnectionClosed,
    /// No complete frame arrived within the frame timeout
    FrameTimeout,
    /// Type length field was empty, non-numeric, or unparseable
    InvalidTypeLength,
    /// Type length field had too many digits
    TypeLengthTooManyDigits,
    /// Type length was zero or exceeded the maximum type name length
    TypeLengthOutOfRange,
    /// Message type is not part of the protocol
    UnknownMessageType(String),
    /// Message ID was not 12 hex characters
    InvalidMessageId,
    /// Payload length field was empty, non-numeric, or unparseable
    InvalidPayloadLength,
    /// Payload length field had too many digits
    PayloadLengthTooManyDigits,
    /// Payload length exceeded the per-type maximum
    PayloadLengthExceedsTypeMax {
        message_type: String,
        length: u64,
        max: u64,
    },
    /// Expected delimiter byte was missing
    MissingDelimiter,
    /// Expected terminator byte was missing after the payload
    MissingTerminator,
    /// Payload was not valid JSON for its message type
    InvalidJson(String),
    /// Underlying I/O error
    Io(String),
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidMagic => write!(f, "invalid frame magic"),
            Self::ConnectionClosed => write!(f, "connection closed mid-frame"),
            Self::FrameTimeout => write!(f, "frame did not complete within timeout"),
            Self::InvalidTypeLength => write!(f, "invalid type length field"),
            Self::TypeLengthTooManyDigits => write!(f, "type length field has too many digits"),
            Self::TypeLengthOutOfRange => write!(f, "type length out of range"),
            Self::UnknownMessageType(t) => write!(f, "unknown message type: {t}"),
            Self::InvalidMessageId => write!(f, "invalid message id"),
            Self::InvalidPayloadLength => write!(f, "invalid payload length field"),
            Self::PayloadLengthTooManyDigits => {
                write!(f, "payload length field has too many digits")
            }
            Self::PayloadLengthExceedsTypeMax {
                message_type,
                length,
                max,
            } => write!(
                f,
                "payload length {length} exceeds maximum {max} for {message_type}"
            ),
            Self::MissingDelimiter => write!(f, "missing field delimiter"),
            Self::MissingTerminator => write!(f, "missing frame terminator"),
            Self::InvalidJson(e) => write!(f, "invalid JSON payload: {e}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for FrameError {}

impl From<io::Error> for FrameError {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Self::ConnectionClosed
        } else {
            Self::Io(err.to_string())
        }
    }
}
