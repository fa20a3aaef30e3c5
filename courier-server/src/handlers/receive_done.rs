//! Handler for the `ReceiveDone` event

use std::io;

use courier_common::protocol::ServerMessage;

use super::{HandlerContext, transfer_error_reply};
use crate::constants::MSG_TRANSFER_FINISHED;

/// The receiver confirms the relayed stream was fully consumed
///
/// Only meaningful from `Active` and only from the request's destination.
/// Sends the finished notice to both parties and retires the request;
/// retirement is exactly-once, so a duplicate signal is an error reply.
pub async fn handle_receive_done(id: u64, ctx: &HandlerContext<'_>) -> io::Result<()> {
    let request = match ctx.table.finish(id, ctx.conn_id) {
        Ok(request) => request,
        Err(e) => return ctx.reply_error(transfer_error_reply(e)),
    };

    if ctx.debug {
        eprintln!("Transfer {id} finished");
    }

    ctx.reply(ServerMessage::Ready {
        message: MSG_TRANSFER_FINISHED.to_string(),
    })?;

    ctx.registry
        .send_to(
            request.source,
            ServerMessage::Ready {
                message: MSG_TRANSFER_FINISHED.to_string(),
            },
            None,
        )
        .await;

    Ok(())
}
