//! The command dispatcher
//!
//! The wire carries the legacy `Command { command, args }` shape with a
//! free-form command name and positional JSON arguments. Parsing maps it
//! onto the typed [`Command`] enum so dispatch is a single exhaustive match
//! and adding a command is a compile-time-checked change. Unknown names and
//! unusable arguments become replies, never faults.
//!
//! Every dispatch queues exactly one `CommandResponse` correlated with the
//! request's message ID.

use std::io;

use courier_common::protocol::ServerMessage;

use super::HandlerContext;
use crate::constants::{
    MSG_INVALID_ARGS, MSG_NO_SUCH_USER, MSG_REQUEST_SENT, MSG_UNKNOWN_CMD, MSG_WELCOME,
};

/// A recognized, fully-typed command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `register <name>` - same operation as the `Register` event
    Register { name: String },
    /// `ls` - list registered peer names
    Ls,
    /// `send <target> <file> <byte_length>` - offer a file to a peer
    Send {
        target: String,
        file: String,
        len: u64,
    },
}

/// Why a command line could not be turned into a [`Command`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandParseError {
    /// The command name is not recognized
    Unknown,
    /// The command is recognized but its arguments are missing or mistyped
    InvalidArgs,
}

impl Command {
    /// Parse a command name plus positional arguments
    pub fn parse(command: &str, args: &[serde_json::Value]) -> Result<Self, CommandParseError> {
        match command {
            "register" => {
                let name = args
                    .first()
                    .and_then(|v| v.as_str())
                    .ok_or(CommandParseError::InvalidArgs)?;
                Ok(Self::Register {
                    name: name.to_string(),
                })
            }
            "ls" => Ok(Self::Ls),
            "send" => {
                let target = args
                    .first()
                    .and_then(|v| v.as_str())
                    .ok_or(CommandParseError::InvalidArgs)?;
                let file = args
                    .get(1)
                    .and_then(|v| v.as_str())
                    .ok_or(CommandParseError::InvalidArgs)?;
                let len = args
                    .get(2)
                    .and_then(parse_len)
                    .ok_or(CommandParseError::InvalidArgs)?;
                Ok(Self::Send {
                    target: target.to_string(),
                    file: file.to_string(),
                    len,
                })
            }
            _ => Err(CommandParseError::Unknown),
        }
    }
}

/// Accept a byte length as a JSON number or a numeric string
///
/// Interactive clients pass whatever the user typed, so "1000" and 1000 are
/// both honored.
fn parse_len(value: &serde_json::Value) -> Option<u64> {
    if let Some(n) = value.as_u64() {
        return Some(n);
    }
    value.as_str().and_then(|s| s.parse().ok())
}

/// Dispatch a `Command` event
pub async fn handle_command(
    command: String,
    args: Vec<serde_json::Value>,
    ctx: &HandlerContext<'_>,
) -> io::Result<()> {
    if ctx.debug {
        eprintln!(
            "Connection {} command '{}' with {} arg(s)",
            ctx.conn_id,
            command,
            args.len()
        );
    }

    match Command::parse(&command, &args) {
        Ok(Command::Register { name }) => {
            ctx.registry.set_name(ctx.conn_id, name).await;
            ctx.reply(ok_message(MSG_WELCOME))
        }
        Ok(Command::Ls) => {
            let names = ctx.registry.names().await;
            ctx.reply(ServerMessage::CommandResponse {
                success: true,
                error: None,
                message: None,
                names: Some(names),
            })
        }
        Ok(Command::Send { target, file, len }) => handle_send(target, file, len, ctx).await,
        Err(CommandParseError::Unknown) => ctx.reply(fail(MSG_UNKNOWN_CMD)),
        Err(CommandParseError::InvalidArgs) => ctx.reply(fail(MSG_INVALID_ARGS)),
    }
}

/// The `send` command: create a pending request and deliver the offer
async fn handle_send(
    target: String,
    file: String,
    len: u64,
    ctx: &HandlerContext<'_>,
) -> io::Result<()> {
    let Some(peer) = ctx.registry.find_by_name(&target).await else {
        return ctx.reply(fail(MSG_NO_SUCH_USER));
    };

    let request = ctx.table.create(ctx.conn_id, peer.conn_id, file.clone(), len);

    let delivered = ctx
        .registry
        .send_to(
            peer.conn_id,
            ServerMessage::RequestFile {
                file,
                id: request.id,
            },
            None,
        )
        .await;

    if !delivered {
        // Target vanished between lookup and delivery; no request survives
        // an undeliverable offer
        ctx.table.remove(request.id);
        return ctx.reply(fail(MSG_NO_SUCH_USER));
    }

    ctx.reply(ok_message(MSG_REQUEST_SENT))
}

fn ok_message(text: &str) -> ServerMessage {
    ServerMessage::CommandResponse {
        success: true,
        error: None,
        message: Some(text.to_string()),
        names: None,
    }
}

fn fail(text: &str) -> ServerMessage {
    ServerMessage::CommandResponse {
        success: false,
        error: Some(text.to_string()),
        message: None,
        names: None,
    }
}
