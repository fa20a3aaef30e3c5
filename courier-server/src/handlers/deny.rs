//! Handler for the `Deny` event

use std::io;

use courier_common::protocol::ServerMessage;

use super::{HandlerContext, transfer_error_reply};
use crate::constants::MSG_REQUEST_DENIED;

/// Refuse a pending transfer offer
///
/// Retires the request and notifies both the denier and the original
/// sender. A second deny (or an accept) of the same id afterwards is an
/// error reply, never a crash.
pub async fn handle_deny(id: u64, ctx: &HandlerContext<'_>) -> io::Result<()> {
    let request = match ctx.table.deny(id, ctx.conn_id) {
        Ok(request) => request,
        Err(e) => return ctx.reply_error(transfer_error_reply(e)),
    };

    if ctx.debug {
        eprintln!("Request {id} denied");
    }

    ctx.reply(ServerMessage::Ready {
        message: MSG_REQUEST_DENIED.to_string(),
    })?;

    ctx.registry
        .send_to(
            request.source,
            ServerMessage::Ready {
                message: MSG_REQUEST_DENIED.to_string(),
            },
            None,
        )
        .await;

    Ok(())
}
