//! Inbound stream routing
//!
//! A connection carries at most one inbound byte stream at a time:
//! `StreamOpen {id}` followed by `StreamData` chunks and `StreamEnd {id}`.
//! If the id pairs with a request awaiting its stream, a relay task is
//! spawned and chunks flow to it through a bounded channel. Otherwise the
//! connection enters discard mode: the chunks are consumed and dropped
//! without forwarding, and no destination is ever guessed.

use std::io;

use tokio::sync::mpsc;

use courier_common::protocol::ServerMessage;

use super::HandlerContext;
use crate::constants::ERR_REQUEST_WRONG_STATE;
use crate::transfers::{RELAY_CHANNEL_CAPACITY, RelayParams, StreamEvent, spawn_relay};

/// Routing state for a connection's current inbound stream
#[derive(Debug)]
pub enum InboundStream {
    /// Chunks flow to a live relay task
    Relay { id: u64, tx: mpsc::Sender<StreamEvent> },
    /// Chunks are consumed and dropped until `StreamEnd`
    Discard { id: u64 },
}

/// Handle `StreamOpen {id}`
pub async fn handle_stream_open(
    id: u64,
    stream: &mut Option<InboundStream>,
    ctx: &HandlerContext<'_>,
) -> io::Result<()> {
    if stream.is_some() {
        // One stream at a time per connection; the open one keeps flowing
        return ctx.reply_error(ERR_REQUEST_WRONG_STATE);
    }

    let request = match ctx.table.begin_stream(id, ctx.conn_id) {
        Ok(request) => request,
        Err(e) => {
            // Unknown or mismatched id: the stream is dropped at the relay
            // boundary without forwarding and without a notice
            if ctx.debug {
                eprintln!(
                    "Dropping stream for request {id} from {}: {e:?}",
                    ctx.peer_addr
                );
            }
            *stream = Some(InboundStream::Discard { id });
            return Ok(());
        }
    };

    let Some(dest) = ctx.registry.get(request.dest).await else {
        // The receiver vanished after accepting; retire the request and
        // swallow the stream
        ctx.table.remove(id);
        *stream = Some(InboundStream::Discard { id });
        return ctx.notify(ServerMessage::TransferCancelled { id });
    };

    // Receiver's chosen name; the request cannot reach AwaitingStream
    // without one
    let dest_file = request
        .dest_file
        .clone()
        .unwrap_or_else(|| request.source_file.clone());

    let (chunk_tx, chunk_rx) = mpsc::channel(RELAY_CHANNEL_CAPACITY);
    spawn_relay(RelayParams {
        id,
        dest_file,
        expected_len: request.expected_len,
        source_tx: ctx.tx.clone(),
        dest_tx: dest.tx,
        events: chunk_rx,
    });

    if ctx.debug {
        eprintln!("Relaying stream for request {id}");
    }

    *stream = Some(InboundStream::Relay { id, tx: chunk_tx });
    Ok(())
}

/// Handle one `StreamData` chunk
///
/// Chunks outside any open stream are dropped silently. The bounded send
/// applies backpressure to this connection's reader while the relay drains.
pub async fn handle_stream_chunk(payload: Vec<u8>, stream: &mut Option<InboundStream>) {
    if let Some(InboundStream::Relay { id, tx }) = stream {
        if tx.send(StreamEvent::Chunk(payload)).await.is_err() {
            // Relay ended early (receiver gone); swallow the rest
            let id = *id;
            *stream = Some(InboundStream::Discard { id });
        }
    }
}

/// Handle `StreamEnd {id}`
pub async fn handle_stream_end(id: u64, stream: &mut Option<InboundStream>) {
    match stream.take() {
        Some(InboundStream::Relay { id: open_id, tx }) => {
            if open_id == id {
                let _ = tx.send(StreamEvent::End).await;
            } else {
                // End for some other id; the open stream keeps flowing
                *stream = Some(InboundStream::Relay { id: open_id, tx });
            }
        }
        Some(InboundStream::Discard { id: open_id }) => {
            if open_id != id {
                *stream = Some(InboundStream::Discard { id: open_id });
            }
        }
        None => {}
    }
}
