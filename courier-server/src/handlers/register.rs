//! Handler for the `Register` event

use std::io;

use courier_common::protocol::ServerMessage;

use super::HandlerContext;
use crate::constants::MSG_WELCOME;

/// Claim a display name for this connection
///
/// Re-registration silently overwrites the previous name; the acknowledgement
/// is identical either way.
pub async fn handle_register(name: String, ctx: &HandlerContext<'_>) -> io::Result<()> {
    if ctx.debug {
        eprintln!("Connection {} registered as '{}'", ctx.conn_id, name);
    }

    ctx.registry.set_name(ctx.conn_id, name).await;

    ctx.reply(ServerMessage::Ready {
        message: MSG_WELCOME.to_string(),
    })
}
