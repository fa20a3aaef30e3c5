//! Protocol definitions for the Courier relay broker
//!
//! All messages are sent as JSON frames (see [`crate::framing`]), except
//! `StreamData`, whose frame payload is a raw chunk of relayed bytes.
//!
//! A transfer runs through the event surface like this: the sender issues a
//! `send` command, the broker delivers `RequestFile` to the target, the
//! target answers `Accept` or `Deny`, the broker tells the sender to start
//! with `SendFile`, the sender pushes `StreamOpen` + `StreamData` chunks +
//! `StreamEnd`, the broker mirrors them to the receiver behind a
//! `ReceiveFile` announcement while sampling `Progress` for both sides, and
//! the receiver closes the loop with `ReceiveDone`.

use serde::{Deserialize, Serialize};

/// Frame type name for raw data chunks
///
/// `StreamData` frames bypass JSON decoding; connection loops match on this
/// name before handing the payload to the relay.
pub const STREAM_DATA_TYPE: &str = "StreamData";

/// Client request messages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Claim a display name for this connection
    ///
    /// Re-registration silently overwrites the previous name. Names are not
    /// required to be unique.
    Register { name: String },
    /// A textual command with positional arguments
    ///
    /// Recognized commands: `register`, `ls`, `send`. Unrecognized commands
    /// get a `CommandResponse` with `"unknown cmd."`, never an error frame.
    Command {
        command: String,
        #[serde(default)]
        args: Vec<serde_json::Value>,
    },
    /// Accept a transfer offer, choosing the local file name to receive into
    Accept { id: u64, file: String },
    /// Refuse a transfer offer
    Deny { id: u64 },
    /// Receiver's signal that the relayed stream was fully consumed
    ReceiveDone { id: u64 },
    /// Announce an inbound byte stream for an accepted transfer
    StreamOpen { id: u64 },
    /// One raw chunk of stream bytes (payload handled at the frame layer)
    StreamData,
    /// End of the inbound byte stream
    StreamEnd { id: u64 },
}

/// Server messages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Greeting sent when a connection is accepted
    Hello { message: String },
    /// A plain notice: registration welcome, "transfer finished!",
    /// "request denied."
    Ready { message: String },
    /// The single reply to a `Command`, correlated via the request's
    /// message ID
    CommandResponse {
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        /// Peer name list for `ls`
        #[serde(default, skip_serializing_if = "Option::is_none")]
        names: Option<Vec<String>>,
    },
    /// A transfer offer, delivered to the target of a `send` command
    RequestFile { file: String, id: u64 },
    /// Go-ahead for the sender: start streaming `file` for request `id`
    SendFile { file: String, id: u64 },
    /// Outbound stream announcement to the receiver, carrying the file name
    /// the receiver chose at accept time
    ReceiveFile { file: String, id: u64 },
    /// One raw chunk of relayed bytes (payload handled at the frame layer)
    StreamData,
    /// End of the relayed stream
    StreamEnd { id: u64 },
    /// Progress sample, sent to both parties of an active transfer
    Progress { percentage: f64 },
    /// The peer of a transfer disconnected, or the request expired unused
    TransferCancelled { id: u64 },
    /// A recoverable per-event failure (unknown request id, wrong peer, ...)
    Error { message: String },
}
