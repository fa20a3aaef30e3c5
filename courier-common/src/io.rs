//! I/O utilities for sending and receiving protocol messages
//!
//! This module bridges the protocol message types (`ClientMessage`,
//! `ServerMessage`) and the wire format (framing). `StreamData` frames are
//! the one exception to JSON payloads; connection loops match on
//! [`STREAM_DATA_TYPE`](crate::protocol::STREAM_DATA_TYPE) and consume the
//! raw payload before message parsing.

use std::io;

use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::framing::{FrameError, FrameReader, FrameWriter, MessageId, RawFrame};
use crate::protocol::{ClientMessage, STREAM_DATA_TYPE, ServerMessage};

// =============================================================================
// Error Conversion
// =============================================================================

impl From<FrameError> for io::Error {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::Io(msg) => io::Error::other(msg),
            FrameError::ConnectionClosed => {
                io::Error::new(io::ErrorKind::ConnectionReset, "connection closed")
            }
            other => io::Error::other(other.to_string()),
        }
    }
}

// =============================================================================
// Message Sending
// =============================================================================

/// Send a `ClientMessage` to the broker
///
/// Generates a new message ID for request-response correlation and returns it.
pub async fn send_client_message<W>(
    writer: &mut FrameWriter<W>,
    message: &ClientMessage,
) -> io::Result<MessageId>
where
    W: AsyncWriteExt + Unpin,
{
    let message_id = MessageId::new();
    send_client_message_with_id(writer, message, message_id).await?;
    Ok(message_id)
}

/// Send a `ClientMessage` to the broker with a specific message ID
pub async fn send_client_message_with_id<W>(
    writer: &mut FrameWriter<W>,
    message: &ClientMessage,
    message_id: MessageId,
) -> io::Result<()>
where
    W: AsyncWriteExt + Unpin,
{
    let message_type = client_message_type(message);
    let payload =
        serde_json::to_vec(message).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    let frame = RawFrame::new(message_id, message_type.to_string(), payload);
    writer.write_frame(&frame).await.map_err(Into::into)
}

/// Send a `ServerMessage` to a client
///
/// Generates a new message ID. For responses, use
/// `send_server_message_with_id` to echo the request's message ID.
pub async fn send_server_message<W>(
    writer: &mut FrameWriter<W>,
    message: &ServerMessage,
) -> io::Result<MessageId>
where
    W: AsyncWriteExt + Unpin,
{
    let message_id = MessageId::new();
    send_server_message_with_id(writer, message, message_id).await?;
    Ok(message_id)
}

/// Send a `ServerMessage` to a client with a specific message ID
///
/// Use this to echo the request's message ID in responses.
pub async fn send_server_message_with_id<W>(
    writer: &mut FrameWriter<W>,
    message: &ServerMessage,
    message_id: MessageId,
) -> io::Result<()>
where
    W: AsyncWriteExt + Unpin,
{
    let message_type = server_message_type(message);
    let payload =
        serde_json::to_vec(message).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    let frame = RawFrame::new(message_id, message_type.to_string(), payload);
    writer.write_frame(&frame).await.map_err(Into::into)
}

/// Send one raw chunk of stream bytes as a `StreamData` frame
pub async fn send_stream_chunk<W>(writer: &mut FrameWriter<W>, chunk: &[u8]) -> io::Result<()>
where
    W: AsyncWriteExt + Unpin,
{
    writer
        .write(MessageId::new(), STREAM_DATA_TYPE, chunk)
        .await
        .map_err(Into::into)
}

// =============================================================================
// Message Receiving
// =============================================================================

/// Received client message with its message ID
#[derive(Debug)]
pub struct ReceivedClientMessage {
    /// The message ID from the frame (for response correlation)
    pub message_id: MessageId,
    /// The parsed client message
    pub message: ClientMessage,
}

/// Received server message with its message ID
#[derive(Debug)]
pub struct ReceivedServerMessage {
    /// The message ID from the frame (for request correlation)
    pub message_id: MessageId,
    /// The parsed server message
    pub message: ServerMessage,
}

/// Read a `ClientMessage` from the stream
///
/// Returns `Ok(None)` if the connection was cleanly closed. `StreamData`
/// frames parse to the unit variant with their payload dropped; callers that
/// relay chunks must work at the frame level instead.
pub async fn read_client_message<R>(
    reader: &mut FrameReader<R>,
) -> io::Result<Option<ReceivedClientMessage>>
where
    R: AsyncReadExt + Unpin,
{
    let Some(frame) = reader.read_frame().await? else {
        return Ok(None);
    };

    parse_client_frame(frame).map(Some).map_err(Into::into)
}

/// Read a `ServerMessage` from the stream
///
/// Returns `Ok(None)` if the connection was cleanly closed.
pub async fn read_server_message<R>(
    reader: &mut FrameReader<R>,
) -> io::Result<Option<ReceivedServerMessage>>
where
    R: AsyncReadExt + Unpin,
{
    let Some(frame) = reader.read_frame().await? else {
        return Ok(None);
    };

    parse_server_frame(frame).map(Some).map_err(Into::into)
}

/// Parse a raw frame into a `ReceivedClientMessage`
pub fn parse_client_frame(frame: RawFrame) -> Result<ReceivedClientMessage, FrameError> {
    // StreamData payloads are raw bytes, not JSON
    if frame.message_type == STREAM_DATA_TYPE {
        return Ok(ReceivedClientMessage {
            message_id: frame.message_id,
            message: ClientMessage::StreamData,
        });
    }

    let message: ClientMessage = serde_json::from_slice(&frame.payload)
        .map_err(|e| FrameError::InvalidJson(e.to_string()))?;

    // The frame header type and the JSON "type" tag must agree
    let expected_type = client_message_type(&message);
    if frame.message_type != expected_type {
        return Err(FrameError::InvalidJson(format!(
            "frame type mismatch: frame says '{}' but JSON is '{}'",
            frame.message_type, expected_type
        )));
    }

    Ok(ReceivedClientMessage {
        message_id: frame.message_id,
        message,
    })
}

/// Parse a raw frame into a `ReceivedServerMessage`
pub fn parse_server_frame(frame: RawFrame) -> Result<ReceivedServerMessage, FrameError> {
    if frame.message_type == STREAM_DATA_TYPE {
        return Ok(ReceivedServerMessage {
            message_id: frame.message_id,
            message: ServerMessage::StreamData,
        });
    }

    let message: ServerMessage = serde_json::from_slice(&frame.payload)
        .map_err(|e| FrameError::InvalidJson(e.to_string()))?;

    let expected_type = server_message_type(&message);
    if frame.message_type != expected_type {
        return Err(FrameError::InvalidJson(format!(
            "frame type mismatch: frame says '{}' but JSON is '{}'",
            frame.message_type, expected_type
        )));
    }

    Ok(ReceivedServerMessage {
        message_id: frame.message_id,
        message,
    })
}

// =============================================================================
// Message Type Helpers
// =============================================================================

/// Get the type name for a client message (matches enum variant name)
#[must_use]
pub fn client_message_type(message: &ClientMessage) -> &'static str {
    match message {
        ClientMessage::Register { .. } => "Register",
        ClientMessage::Command { .. } => "Command",
        ClientMessage::Accept { .. } => "Accept",
        ClientMessage::Deny { .. } => "Deny",
        ClientMessage::ReceiveDone { .. } => "ReceiveDone",
        ClientMessage::StreamOpen { .. } => "StreamOpen",
        ClientMessage::StreamData => STREAM_DATA_TYPE,
        ClientMessage::StreamEnd { .. } => "StreamEnd",
    }
}

/// Get the type name for a server message (matches enum variant name)
#[must_use]
pub fn server_message_type(message: &ServerMessage) -> &'static str {
    match message {
        ServerMessage::Hello { .. } => "Hello",
        ServerMessage::Ready { .. } => "Ready",
        ServerMessage::CommandResponse { .. } => "CommandResponse",
        ServerMessage::RequestFile { .. } => "RequestFile",
        ServerMessage::SendFile { .. } => "SendFile",
        ServerMessage::ReceiveFile { .. } => "ReceiveFile",
        ServerMessage::StreamData => STREAM_DATA_TYPE,
        ServerMessage::StreamEnd { .. } => "StreamEnd",
        ServerMessage::Progress { .. } => "Progress",
        ServerMessage::TransferCancelled { .. } => "TransferCancelled",
        ServerMessage::Error { .. } => "Error",
    }
}

// =============================================================================
// Tests
// =============================================================================
