//! Stream relay: one task per active transfer
//!
//! When an accepted transfer's byte stream arrives, the broker spawns a
//! relay task. The source connection feeds chunks into a bounded channel
//! (backpressure on the reader); the relay announces the stream to the
//! destination, forwards each chunk into the destination's outbound queue,
//! and samples progress on a one-second timer, reporting the percentage to
//! both parties.
//!
//! The task ends deterministically: on `StreamEnd`, when the source drops
//! its channel (disconnect mid-stream), or when the destination's queue
//! closes. Disconnect notices to survivors are the connection cleanup
//! path's job, not the relay's.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use courier_common::protocol::ServerMessage;

use crate::registry::Outbound;

/// Capacity of the chunk channel between a source connection and its relay
pub const RELAY_CHANNEL_CAPACITY: usize = 32;

/// Wall-clock interval between progress samples
pub const PROGRESS_INTERVAL: Duration = Duration::from_secs(1);

/// One event on the source-to-relay channel
#[derive(Debug)]
pub enum StreamEvent {
    /// A chunk of stream bytes to forward
    Chunk(Vec<u8>),
    /// The source finished the stream
    End,
}

/// Everything a relay task needs, captured at spawn time
pub struct RelayParams {
    /// Transfer request id
    pub id: u64,
    /// File name the receiver chose at accept time
    pub dest_file: String,
    /// Declared stream length; 0 disables percentage reporting
    pub expected_len: u64,
    /// Source connection's outbound queue (progress samples)
    pub source_tx: mpsc::UnboundedSender<Outbound>,
    /// Destination connection's outbound queue (announcement, chunks,
    /// progress)
    pub dest_tx: mpsc::UnboundedSender<Outbound>,
    /// Chunk channel fed by the source connection's reader
    pub events: mpsc::Receiver<StreamEvent>,
}

/// Compute a clamped progress percentage
///
/// Returns None when the declared length is zero: percentage reporting is
/// skipped rather than dividing by zero.
pub fn percentage(bytes: u64, expected_len: u64) -> Option<f64> {
    if expected_len == 0 {
        return None;
    }
    Some(((bytes as f64 / expected_len as f64) * 100.0).min(100.0))
}

/// Spawn the relay task for one active transfer
pub fn spawn_relay(params: RelayParams) -> JoinHandle<()> {
    tokio::spawn(run_relay(params))
}

async fn run_relay(mut params: RelayParams) {
    // Announce the stream to the receiver before any bytes flow
    let announce = ServerMessage::ReceiveFile {
        file: params.dest_file.clone(),
        id: params.id,
    };
    if params
        .dest_tx
        .send(Outbound::Message(announce, None))
        .is_err()
    {
        return; // receiver already gone
    }

    let mut relayed: u64 = 0;
    let mut ticker = tokio::time::interval(PROGRESS_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // An interval's first tick completes immediately; consume it so the
    // first sample lands a full period into the transfer.
    ticker.tick().await;

    loop {
        tokio::select! {
            event = params.events.recv() => match event {
                Some(StreamEvent::Chunk(bytes)) => {
                    relayed += bytes.len() as u64;
                    if params.dest_tx.send(Outbound::Chunk(bytes)).is_err() {
                        // Receiver disconnected mid-transfer; cleanup and
                        // cancellation notices happen on its connection's
                        // teardown path.
                        return;
                    }
                }
                Some(StreamEvent::End) => {
                    let _ = params
                        .dest_tx
                        .send(Outbound::Message(ServerMessage::StreamEnd { id: params.id }, None));
                    // Final sample so both sides see the landing percentage
                    send_progress(&params, relayed);
                    return;
                }
                // Source disconnected mid-stream
                None => return,
            },
            _ = ticker.tick() => {
                send_progress(&params, relayed);
            }
        }
    }
}

/// Emit a progress sample to both parties
fn send_progress(params: &RelayParams, relayed: u64) {
    let Some(pct) = percentage(relayed, params.expected_len) else {
        return;
    };
    let msg = ServerMessage::Progress { percentage: pct };
    let _ = params
        .source_tx
        .send(Outbound::Message(msg.clone(), None));
    let _ = params.dest_tx.send(Outbound::Message(msg, None));
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RelayHarness {
        chunks: mpsc::Sender<StreamEvent>,
        source_rx: mpsc::UnboundedReceiver<Outbound>,
        dest_rx: mpsc::UnboundedReceiver<Outbound>,
        handle: JoinHandle<()>,
    }

    fn start_relay(id: u64, dest_file: &str, expected_len: u64) -> RelayHarness {
        let (chunk_tx, chunk_rx) = mpsc::channel(RELAY_CHANNEL_CAPACITY);
        let (source_tx, source_rx) = mpsc::unbounded_channel();
        let (dest_tx, dest_rx) = mpsc::unbounded_channel();

        let handle = spawn_relay(RelayParams {
            id,
            dest_file: dest_file.to_string(),
            expected_len,
            source_tx,
            dest_tx,
            events: chunk_rx,
        });

        RelayHarness {
            chunks: chunk_tx,
            source_rx,
            dest_rx,
            handle,
        }
    }

    // =========================================================================
    // percentage() tests
    // =========================================================================

    #[test]
    fn test_percentage_basic() {
        assert_eq!(percentage(0, 1000), Some(0.0));
        assert_eq!(percentage(500, 1000), Some(50.0));
        assert_eq!(percentage(1000, 1000), Some(100.0));
    }

    #[test]
    fn test_percentage_clamps_at_100() {
        // More bytes than declared: clamp, don't overflow past 100
        assert_eq!(percentage(1500, 1000), Some(100.0));
    }

    #[test]
    fn test_percentage_zero_expected_skips() {
        assert_eq!(percentage(0, 0), None);
        assert_eq!(percentage(12345, 0), None);
    }

    #[test]
    fn test_percentage_monotonic_in_bytes() {
        let mut last = -1.0;
        for bytes in [0u64, 100, 250, 900, 1000, 2000] {
            let p = percentage(bytes, 1000).unwrap();
            assert!(p >= last, "percentage went backwards at {bytes}");
            assert!(p <= 100.0);
            last = p;
        }
    }

    // =========================================================================
    // Relay task tests
    // =========================================================================

    #[tokio::test]
    async fn test_relay_announces_then_forwards_then_ends() {
        let mut harness = start_relay(0, "b.txt", 1000);

        harness
            .chunks
            .send(StreamEvent::Chunk(vec![7u8; 600]))
            .await
            .unwrap();
        harness
            .chunks
            .send(StreamEvent::Chunk(vec![8u8; 400]))
            .await
            .unwrap();
        harness.chunks.send(StreamEvent::End).await.unwrap();

        // Announcement first
        match harness.dest_rx.recv().await.unwrap() {
            Outbound::Message(ServerMessage::ReceiveFile { file, id }, None) => {
                assert_eq!(file, "b.txt");
                assert_eq!(id, 0);
            }
            other => panic!("expected ReceiveFile, got {other:?}"),
        }

        // Chunks in order
        match harness.dest_rx.recv().await.unwrap() {
            Outbound::Chunk(bytes) => assert_eq!(bytes, vec![7u8; 600]),
            other => panic!("expected chunk, got {other:?}"),
        }
        match harness.dest_rx.recv().await.unwrap() {
            Outbound::Chunk(bytes) => assert_eq!(bytes, vec![8u8; 400]),
            other => panic!("expected chunk, got {other:?}"),
        }

        // StreamEnd, then the final progress sample
        match harness.dest_rx.recv().await.unwrap() {
            Outbound::Message(ServerMessage::StreamEnd { id }, None) => assert_eq!(id, 0),
            other => panic!("expected StreamEnd, got {other:?}"),
        }
        match harness.dest_rx.recv().await.unwrap() {
            Outbound::Message(ServerMessage::Progress { percentage }, None) => {
                assert_eq!(percentage, 100.0);
            }
            other => panic!("expected Progress, got {other:?}"),
        }

        // The source side gets the same final sample
        match harness.source_rx.recv().await.unwrap() {
            Outbound::Message(ServerMessage::Progress { percentage }, None) => {
                assert_eq!(percentage, 100.0);
            }
            other => panic!("expected Progress, got {other:?}"),
        }

        harness.handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_relay_zero_expected_len_emits_no_progress() {
        let mut harness = start_relay(3, "b.txt", 0);

        harness
            .chunks
            .send(StreamEvent::Chunk(vec![1u8; 100]))
            .await
            .unwrap();
        harness.chunks.send(StreamEvent::End).await.unwrap();
        harness.handle.await.unwrap();

        // Dest: announcement, chunk, StreamEnd - and nothing else
        assert!(matches!(
            harness.dest_rx.recv().await.unwrap(),
            Outbound::Message(ServerMessage::ReceiveFile { .. }, None)
        ));
        assert!(matches!(
            harness.dest_rx.recv().await.unwrap(),
            Outbound::Chunk(_)
        ));
        assert!(matches!(
            harness.dest_rx.recv().await.unwrap(),
            Outbound::Message(ServerMessage::StreamEnd { .. }, None)
        ));
        assert!(harness.dest_rx.recv().await.is_none());

        // Source: nothing at all
        assert!(harness.source_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_relay_stops_when_source_drops() {
        let mut harness = start_relay(1, "b.txt", 1000);

        harness
            .chunks
            .send(StreamEvent::Chunk(vec![1u8; 100]))
            .await
            .unwrap();
        drop(harness.chunks);

        harness.handle.await.unwrap();

        // Announcement and the chunk made it; no StreamEnd was forged
        assert!(matches!(
            harness.dest_rx.recv().await.unwrap(),
            Outbound::Message(ServerMessage::ReceiveFile { .. }, None)
        ));
        assert!(matches!(
            harness.dest_rx.recv().await.unwrap(),
            Outbound::Chunk(_)
        ));
        loop {
            match harness.dest_rx.recv().await {
                None => break,
                // Ticks may have landed before the drop was observed
                Some(Outbound::Message(ServerMessage::Progress { .. }, None)) => continue,
                Some(other) => panic!("unexpected outbound item: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_relay_stops_when_dest_gone() {
        let harness = start_relay(2, "b.txt", 1000);
        drop(harness.dest_rx);

        // The relay exits on its own; the source channel staying open must
        // not keep it alive.
        harness.handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_relay_ticks_report_cumulative_progress() {
        let mut harness = start_relay(5, "b.txt", 1000);

        harness
            .chunks
            .send(StreamEvent::Chunk(vec![0u8; 500]))
            .await
            .unwrap();

        // The sampler ticks once per second. Samples are cumulative and
        // non-decreasing; wait for the 50% sample.
        let mut last = -1.0;
        let deadline = tokio::time::Duration::from_secs(5);
        tokio::time::timeout(deadline, async {
            loop {
                match harness.source_rx.recv().await.unwrap() {
                    Outbound::Message(ServerMessage::Progress { percentage }, None) => {
                        assert!(percentage >= last);
                        last = percentage;
                        if percentage == 50.0 {
                            break;
                        }
                    }
                    other => panic!("expected Progress, got {other:?}"),
                }
            }
        })
        .await
        .expect("no 50% sample within the deadline");

        harness.chunks.send(StreamEvent::End).await.unwrap();
        harness.handle.await.unwrap();
    }
}
