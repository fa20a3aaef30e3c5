//! Client connection handling

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use courier_common::framing::{DEFAULT_FRAME_TIMEOUT, FrameError, FrameReader, FrameWriter, MessageId};
use courier_common::io::{parse_client_frame, send_server_message, send_server_message_with_id, send_stream_chunk};
use courier_common::protocol::{ClientMessage, STREAM_DATA_TYPE, ServerMessage};

use crate::constants::*;
use crate::handlers::{self, HandlerContext, InboundStream};
use crate::registry::{Outbound, PeerRegistry};
use crate::transfers::TransferTable;

/// Parameters for handling a connection
#[derive(Clone)]
pub struct ConnectionParams {
    pub peer_addr: SocketAddr,
    pub registry: PeerRegistry,
    pub table: Arc<TransferTable>,
    pub debug: bool,
}

/// Handle a client connection over TCP
pub async fn handle_connection(socket: TcpStream, params: ConnectionParams) -> io::Result<()> {
    handle_connection_inner(socket, params).await
}

/// Inner connection handler that works with any AsyncRead + AsyncWrite stream
///
/// Generic over the stream so integration tests can drive it with in-memory
/// duplex links.
pub async fn handle_connection_inner<S>(socket: S, params: ConnectionParams) -> io::Result<()>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + 'static,
{
    let ConnectionParams {
        peer_addr,
        registry,
        table,
        debug,
    } = params;

    let (reader, writer) = tokio::io::split(socket);
    let mut frame_reader = FrameReader::new(BufReader::new(reader));
    let mut frame_writer = FrameWriter::new(writer);

    // Queue for everything headed to this client; the loop below is the
    // only writer task, so frames never interleave
    let (tx, mut rx) = mpsc::unbounded_channel::<Outbound>();

    // Arena record exists for exactly the life of this task
    let conn_id = registry.add(peer_addr, tx.clone()).await;

    if debug {
        eprintln!("Connection {conn_id} from {peer_addr}");
    }

    let greeting = ServerMessage::Hello {
        message: MSG_GREETING.to_string(),
    };
    let mut alive = send_server_message(&mut frame_writer, &greeting).await.is_ok();

    // The connection's current inbound stream, if any
    let mut stream: Option<InboundStream> = None;

    while alive {
        tokio::select! {
            // Incoming frames from the client
            result = frame_reader.read_frame_with_timeout(DEFAULT_FRAME_TIMEOUT) => {
                match result {
                    Ok(Some(frame)) => {
                        // Raw chunks bypass JSON parsing entirely
                        if frame.message_type == STREAM_DATA_TYPE {
                            handlers::handle_stream_chunk(frame.payload, &mut stream).await;
                            continue;
                        }

                        let received = match parse_client_frame(frame) {
                            Ok(received) => received,
                            Err(e) => {
                                // A well-framed but undecodable payload is a
                                // defect of that single event; the frame
                                // boundary is intact, so keep the connection
                                if debug {
                                    eprintln!("{ERR_PARSE_MESSAGE}{peer_addr}: {e}");
                                }
                                continue;
                            }
                        };

                        let ctx = HandlerContext {
                            conn_id,
                            peer_addr,
                            registry: &registry,
                            table: &table,
                            tx: &tx,
                            debug,
                            message_id: received.message_id,
                        };

                        if let Err(e) =
                            handle_client_message(received.message, &mut stream, &ctx).await
                        {
                            eprintln!("{ERR_HANDLING_MESSAGE}{e}");
                            alive = false;
                        }
                    }
                    Ok(None) => {
                        // Connection closed cleanly
                        alive = false;
                    }
                    Err(e) => {
                        // Framing-level corruption desynchronizes the
                        // stream; drop this one client. Timeouts and bad
                        // magic are common (scanners), log them only in
                        // debug mode.
                        let is_common_error =
                            matches!(e, FrameError::InvalidMagic | FrameError::FrameTimeout);
                        if !is_common_error || debug {
                            eprintln!("{ERR_PARSE_MESSAGE}{peer_addr}: {e}");
                        }

                        let error_msg = ServerMessage::Error {
                            message: ERR_INVALID_MESSAGE.to_string(),
                        };
                        let _ = send_server_message_with_id(
                            &mut frame_writer,
                            &error_msg,
                            MessageId::new(),
                        )
                        .await;
                        alive = false;
                    }
                }
            }

            // Outgoing messages and relayed chunks
            item = rx.recv() => {
                match item {
                    Some(Outbound::Message(msg, msg_id)) => {
                        let id = msg_id.unwrap_or_else(MessageId::new);
                        if send_server_message_with_id(&mut frame_writer, &msg, id)
                            .await
                            .is_err()
                        {
                            alive = false;
                        }
                    }
                    Some(Outbound::Chunk(bytes)) => {
                        if send_stream_chunk(&mut frame_writer, &bytes).await.is_err() {
                            alive = false;
                        }
                    }
                    None => {
                        // Queue closed - nothing can reach this client anymore
                        alive = false;
                    }
                }
            }
        }
    }

    // Shutdown the writer gracefully
    let _ = frame_writer.get_mut().shutdown().await;

    // Dropping the stream state closes any relay's chunk channel; the relay
    // task winds down on its own
    drop(stream);

    // Arena cleanup: the record, then every request this connection was
    // party to, notifying each surviving peer
    registry.remove(conn_id).await;
    for request in table.remove_for_conn(conn_id) {
        if let Some(peer) = request.peer_of(conn_id) {
            registry
                .send_to(peer, ServerMessage::TransferCancelled { id: request.id }, None)
                .await;
        }
    }

    if debug {
        eprintln!("Connection {conn_id} disconnected");
    }

    Ok(())
}

/// Handle a parsed message from the client
async fn handle_client_message(
    msg: ClientMessage,
    stream: &mut Option<InboundStream>,
    ctx: &HandlerContext<'_>,
) -> io::Result<()> {
    match msg {
        ClientMessage::Register { name } => {
            handlers::handle_register(name, ctx).await?;
        }
        ClientMessage::Command { command, args } => {
            handlers::handle_command(command, args, ctx).await?;
        }
        ClientMessage::Accept { id, file } => {
            handlers::handle_accept(id, file, ctx).await?;
        }
        ClientMessage::Deny { id } => {
            handlers::handle_deny(id, ctx).await?;
        }
        ClientMessage::ReceiveDone { id } => {
            handlers::handle_receive_done(id, ctx).await?;
        }
        ClientMessage::StreamOpen { id } => {
            handlers::handle_stream_open(id, stream, ctx).await?;
        }
        ClientMessage::StreamEnd { id } => {
            handlers::handle_stream_end(id, stream).await;
        }
        // Chunks are routed at the frame layer before parsing
        ClientMessage::StreamData => {}
    }

    Ok(())
}
