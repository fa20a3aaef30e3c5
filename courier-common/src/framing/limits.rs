//! Per-type payload size limits
//!
//! Limits are enforced while parsing the frame header, before any payload
//! bytes are read, so an oversized frame costs nothing to reject. Each
//! message type gets a base budget derived from its largest legitimate
//! payload, padded by 20% for encoding slack. A limit of 0 means unlimited.

/// Maximum payload of a single `StreamData` chunk frame
///
/// Senders chunk relayed bytes at [`crate::STREAM_CHUNK_SIZE`]; the limit
/// sits above that so a maximal chunk always fits after padding.
const STREAM_DATA_LIMIT: u64 = 64 * 1024;

/// Base payload limits per message type, in bytes
///
/// Ordered client messages first, then server messages.
const BASE_LIMITS: &[(&str, u64)] = &[
    ("Register", 200),
    ("Command", 600),
    ("Accept", 300),
    ("Deny", 64),
    ("ReceiveDone", 64),
    ("StreamOpen", 64),
    ("StreamData", STREAM_DATA_LIMIT),
    ("StreamEnd", 64),
    ("Hello", 300),
    ("Ready", 300),
    ("CommandResponse", 0), // carries the peer name list, unbounded
    ("RequestFile", 300),
    ("SendFile", 300),
    ("ReceiveFile", 300),
    ("Progress", 64),
    ("TransferCancelled", 64),
    ("Error", 300),
];

/// Check whether a message type is part of the protocol
pub fn is_known_message_type(message_type: &str) -> bool {
    BASE_LIMITS.iter().any(|(name, _)| *name == message_type)
}

/// Get the padded maximum payload length for a message type
///
/// Returns 0 (unlimited) for types without a limit. Unknown types return 0
/// as well; the reader rejects them before consulting limits.
pub fn max_payload_for_type(message_type: &str) -> u64 {
    let base = BASE_LIMITS
        .iter()
        .find(|(name, _)| *name == message_type)
        .map(|(_, limit)| *limit)
        .unwrap_or(0);

    if base == 0 { 0 } else { base + base / 5 }
}
