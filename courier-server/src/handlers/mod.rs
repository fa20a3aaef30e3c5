//! Event handlers for client messages

mod accept;
mod command;
mod deny;
mod receive_done;
mod register;
mod stream;

pub use accept::handle_accept;
pub use command::{Command, CommandParseError, handle_command};
pub use deny::handle_deny;
pub use receive_done::handle_receive_done;
pub use register::handle_register;
pub use stream::{InboundStream, handle_stream_chunk, handle_stream_end, handle_stream_open};

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::mpsc;

use courier_common::framing::MessageId;
use courier_common::protocol::ServerMessage;

use crate::constants::{
    ERR_CHANNEL_CLOSED, ERR_NOT_YOUR_REQUEST, ERR_REQUEST_WRONG_STATE, ERR_UNKNOWN_REQUEST,
};
use crate::registry::{ConnId, Outbound, PeerRegistry};
use crate::transfers::{TransferError, TransferTable};

/// Context passed to all handlers with shared resources
pub struct HandlerContext<'a> {
    /// The connection this event arrived on
    pub conn_id: ConnId,
    pub peer_addr: SocketAddr,
    pub registry: &'a PeerRegistry,
    pub table: &'a Arc<TransferTable>,
    /// This connection's own outbound queue
    pub tx: &'a mpsc::UnboundedSender<Outbound>,
    pub debug: bool,
    /// Message ID from the incoming request (for response correlation)
    pub message_id: MessageId,
}

impl HandlerContext<'_> {
    /// Queue a reply to this connection, echoing the request's message ID
    pub fn reply(&self, message: ServerMessage) -> io::Result<()> {
        self.tx
            .send(Outbound::Message(message, Some(self.message_id)))
            .map_err(|_| io::Error::other(ERR_CHANNEL_CLOSED))
    }

    /// Queue an uncorrelated event to this connection
    pub fn notify(&self, message: ServerMessage) -> io::Result<()> {
        self.tx
            .send(Outbound::Message(message, None))
            .map_err(|_| io::Error::other(ERR_CHANNEL_CLOSED))
    }

    /// Queue an `Error` reply without disconnecting
    pub fn reply_error(&self, message: &str) -> io::Result<()> {
        self.reply(ServerMessage::Error {
            message: message.to_string(),
        })
    }
}

/// Reply text for a refused transfer-table transition
pub fn transfer_error_reply(err: TransferError) -> &'static str {
    match err {
        TransferError::NotFound => ERR_UNKNOWN_REQUEST,
        TransferError::WrongState => ERR_REQUEST_WRONG_STATE,
        TransferError::WrongPeer => ERR_NOT_YOUR_REQUEST,
    }
}
