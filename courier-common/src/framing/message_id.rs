//! Message IDs for request-response correlation
//!
//! Every frame carries a 12-character hex ID. Responses echo the ID of the
//! request they answer, so a client can match replies to requests even when
//! unrelated events (progress samples, transfer offers) arrive in between.

use std::fmt;

use super::MSG_ID_LENGTH;
use super::error::FrameError;

/// A 12-hex-character message identifier
///
/// Stored as the ASCII bytes that appear on the wire, so writing a frame
/// never needs to re-encode.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageId([u8; MSG_ID_LENGTH]);

impl MessageId {
    /// Generate a new random message ID
    pub fn new() -> Self {
        const HEX: &[u8; 16] = b"0123456789abcdef";
        let raw: [u8; MSG_ID_LENGTH / 2] = rand::random();
        let mut bytes = [0u8; MSG_ID_LENGTH];
        for (i, b) in raw.iter().enumerate() {
            bytes[i * 2] = HEX[(b >> 4) as usize];
            bytes[i * 2 + 1] = HEX[(b & 0x0f) as usize];
        }
        Self(bytes)
    }

    /// Parse a message ID from its wire bytes
    ///
    /// # Errors
    ///
    /// Returns `FrameError::InvalidMessageId` if the input is not exactly
    /// 12 hex characters.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() != MSG_ID_LENGTH {
            return Err(FrameError::InvalidMessageId);
        }
        if !bytes.iter().all(u8::is_ascii_hexdigit) {
            return Err(FrameError::InvalidMessageId);
        }
        let mut id = [0u8; MSG_ID_LENGTH];
        id.copy_from_slice(bytes);
        Ok(Self(id))
    }

    /// Get the wire representation of this ID
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Always valid ASCII by construction
        f.write_str(std::str::from_utf8(&self.0).expect("message id is ASCII"))
    }
}

impl fmt::Debug for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageId({self})")
    }
}
