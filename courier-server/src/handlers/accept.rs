//! Handler for the `Accept` event

use std::io;

use courier_common::protocol::ServerMessage;

use super::{HandlerContext, transfer_error_reply};
use crate::constants::ERR_PEER_GONE;

/// Accept a pending transfer offer
///
/// Records the receiver's chosen file name, moves the request to
/// `AwaitingStream`, and tells the source to start streaming under the
/// original file name. Invalid ids, repeated accepts, and accepts from the
/// wrong connection are replies, never faults.
pub async fn handle_accept(id: u64, file: String, ctx: &HandlerContext<'_>) -> io::Result<()> {
    let request = match ctx.table.accept(id, ctx.conn_id, file) {
        Ok(request) => request,
        Err(e) => return ctx.reply_error(transfer_error_reply(e)),
    };

    if ctx.debug {
        eprintln!(
            "Request {} accepted, saving to '{}'",
            id,
            request.dest_file.as_deref().unwrap_or("?")
        );
    }

    let delivered = ctx
        .registry
        .send_to(
            request.source,
            ServerMessage::SendFile {
                file: request.source_file.clone(),
                id,
            },
            None,
        )
        .await;

    if !delivered {
        // The sender disconnected before the go-ahead could be delivered;
        // the request cannot progress without it
        ctx.table.remove(id);
        return ctx.reply_error(ERR_PEER_GONE);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::ERR_UNKNOWN_REQUEST;
    use crate::handlers::testing::{assert_no_message, connect, ctx, next_message};
    use crate::registry::PeerRegistry;
    use crate::transfers::{RequestState, TransferTable};
    use courier_common::framing::MessageId;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_accept_notifies_source() {
        let registry = PeerRegistry::new();
        let table = Arc::new(TransferTable::new());
        let mut alice = connect(&registry).await;
        let mut bob = connect(&registry).await;
        let request = table.create(alice.conn_id, bob.conn_id, "a.txt".to_string(), 1000);

        handle_accept(
            request.id,
            "b.txt".to_string(),
            &ctx(&bob, &registry, &table, MessageId::new()),
        )
        .await
        .unwrap();

        // Alice is told to start streaming under her original file name
        let (msg, _) = next_message(&mut alice);
        match msg {
            ServerMessage::SendFile { file, id } => {
                assert_eq!(file, "a.txt");
                assert_eq!(id, request.id);
            }
            other => panic!("expected SendFile, got {other:?}"),
        }

        // Bob gets no reply on the success path
        assert_no_message(&mut bob);

        let stored = table.get(request.id).unwrap();
        assert_eq!(stored.state, RequestState::AwaitingStream);
        assert_eq!(stored.dest_file.as_deref(), Some("b.txt"));
    }

    #[tokio::test]
    async fn test_accept_unknown_id_is_error_reply() {
        let registry = PeerRegistry::new();
        let table = Arc::new(TransferTable::new());
        let mut bob = connect(&registry).await;
        let message_id = MessageId::new();

        handle_accept(
            42,
            "b.txt".to_string(),
            &ctx(&bob, &registry, &table, message_id),
        )
        .await
        .unwrap();

        let (msg, id) = next_message(&mut bob);
        assert_eq!(id, Some(message_id));
        match msg {
            ServerMessage::Error { message } => assert_eq!(message, ERR_UNKNOWN_REQUEST),
            other => panic!("expected Error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_accept_when_source_gone_retires_request() {
        let registry = PeerRegistry::new();
        let table = Arc::new(TransferTable::new());
        let alice = connect(&registry).await;
        let mut bob = connect(&registry).await;
        let request = table.create(alice.conn_id, bob.conn_id, "a.txt".to_string(), 1000);

        // Alice's record is gone before Bob accepts
        registry.remove(alice.conn_id).await;

        handle_accept(
            request.id,
            "b.txt".to_string(),
            &ctx(&bob, &registry, &table, MessageId::new()),
        )
        .await
        .unwrap();

        assert!(table.get(request.id).is_none());
        let (msg, _) = next_message(&mut bob);
        match msg {
            ServerMessage::Error { message } => assert_eq!(message, ERR_PEER_GONE),
            other => panic!("expected Error, got {other:?}"),
        }
    }
}
