//! Snapshot serving - handles incoming chunk and manifest requests
//!
//! When a peer asks for a chunk, the request first passes the rate
//! limiter; only then is the chunk read from disk and returned. Rejected
//! requests get no reply at all - the fetching side times out and retries
//! against another peer.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task;
use tracing::{debug, info, warn};
use zephyr_snapshot::{
    metrics, ChunkStore, IncomingSnapshotEvent, OutgoingSnapshotMessage, PeerId, RateLimiter,
    SnapshotMessage,
};

use crate::util::unix_time;

/// How often the limiter's idle-peer sweep runs
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Serving side of the snapshot protocol.
///
/// Holds the chunk store and the rate limiter; both are shared with the
/// rest of the node (the store also feeds the service-flag gate).
pub struct SnapshotServer {
    store: Arc<ChunkStore>,
    limiter: Arc<RateLimiter>,
}

impl SnapshotServer {
    /// Create a server over the given store and limiter
    pub fn new(store: Arc<ChunkStore>, limiter: Arc<RateLimiter>) -> Self {
        Self { store, limiter }
    }

    /// Handle one incoming message and produce the reply, if any.
    ///
    /// `now` is the current unix time; passed in so tests can pin it.
    pub async fn handle_request(
        &self,
        peer: PeerId,
        message: SnapshotMessage,
        now: u64,
    ) -> Option<SnapshotMessage> {
        match message {
            SnapshotMessage::GetManifest => {
                debug!(target: "snapshot", %peer, "serving manifest");
                Some(SnapshotMessage::Manifest(self.store.manifest().clone()))
            }
            SnapshotMessage::GetChunk { number } => {
                self.handle_get_chunk(peer, number, now).await
            }
            // response-shaped messages are not for the serving side
            SnapshotMessage::Manifest(_) | SnapshotMessage::Chunk { .. } => None,
        }
    }

    async fn handle_get_chunk(
        &self,
        peer: PeerId,
        number: u32,
        now: u64,
    ) -> Option<SnapshotMessage> {
        if let Err(reason) = self.limiter.admit(peer, number, now) {
            metrics::record_rejection(reason.label());
            debug!(target: "snapshot", %peer, chunk = number, %reason, "chunk request rejected");
            return None;
        }

        // slot held from here; disk I/O happens off the limiter lock
        let store = Arc::clone(&self.store);
        let loaded = task::spawn_blocking(move || store.load_chunk(number)).await;

        let data = match loaded {
            Ok(Ok(data)) => data,
            Ok(Err(err)) => {
                warn!(%peer, chunk = number, %err, "failed to load chunk for peer");
                self.limiter.release_slot();
                return None;
            }
            Err(err) => {
                warn!(%peer, chunk = number, %err, "chunk load task failed");
                self.limiter.release_slot();
                return None;
            }
        };

        self.limiter
            .record_served(peer, number, data.len() as u64, now);
        self.limiter.release_slot();
        metrics::record_chunk_served(data.len() as u64);
        metrics::set_active_transfers(self.limiter.active_transfers());

        Some(SnapshotMessage::Chunk { number, data })
    }

    /// Serve requests from `incoming` until the channel closes, replying
    /// on `outgoing` and running the limiter sweep periodically
    pub async fn run(
        &self,
        mut incoming: mpsc::Receiver<IncomingSnapshotEvent>,
        outgoing: mpsc::Sender<OutgoingSnapshotMessage>,
    ) {
        info!(
            chunks = self.store.manifest().chunk_count(),
            "snapshot server running"
        );
        let mut cleanup = tokio::time::interval(CLEANUP_INTERVAL);

        loop {
            tokio::select! {
                event = incoming.recv() => {
                    let Some(event) = event else {
                        info!("snapshot server shutting down, channel closed");
                        return;
                    };
                    if let IncomingSnapshotEvent::Message { peer, message } = event {
                        if let Some(reply) = self.handle_request(peer, message, unix_time()).await {
                            if outgoing
                                .send(OutgoingSnapshotMessage { target: peer, message: reply })
                                .await
                                .is_err()
                            {
                                info!("snapshot server shutting down, outgoing channel closed");
                                return;
                            }
                        }
                    }
                }
                _ = cleanup.tick() => {
                    self.limiter.cleanup(unix_time());
                    metrics::set_active_transfers(self.limiter.active_transfers());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zephyr_snapshot::{ChunkInfo, Manifest, RateLimiterConfig};
    use tempfile::TempDir;
    use zephyr_types::Hash256;

    fn server_with_chunks() -> (TempDir, SnapshotServer, Vec<Vec<u8>>) {
        let dir = TempDir::new().expect("tempdir");
        let data: Vec<Vec<u8>> = vec![vec![7u8; 128], vec![9u8; 64]];
        let manifest = Manifest {
            height: 77,
            timestamp: 1,
            total_size: 192,
            chunks: data
                .iter()
                .enumerate()
                .map(|(i, d)| {
                    ChunkInfo::new(i as u32, Hash256::compute_reversed(d), d.len() as u64)
                })
                .collect(),
        };
        let store = Arc::new(ChunkStore::open(dir.path(), manifest).expect("open"));
        for (i, d) in data.iter().enumerate() {
            store.save_chunk(i as u32, d).expect("save");
        }
        let limiter = Arc::new(RateLimiter::new(RateLimiterConfig::default(), 0));
        (dir, SnapshotServer::new(store, limiter), data)
    }

    #[tokio::test]
    async fn test_serves_manifest() {
        let (_dir, server, _) = server_with_chunks();
        let reply = server
            .handle_request(PeerId(1), SnapshotMessage::GetManifest, 100)
            .await
            .expect("reply");
        match reply {
            SnapshotMessage::Manifest(m) => assert_eq!(m.height, 77),
            other => panic!("unexpected reply: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_serves_chunk_and_releases_slot() {
        let (_dir, server, data) = server_with_chunks();
        let reply = server
            .handle_request(PeerId(1), SnapshotMessage::GetChunk { number: 0 }, 100)
            .await
            .expect("reply");
        match reply {
            SnapshotMessage::Chunk { number, data: bytes } => {
                assert_eq!(number, 0);
                assert_eq!(bytes, data[0]);
            }
            other => panic!("unexpected reply: {:?}", other),
        }
        assert_eq!(server.limiter.active_transfers(), 0);
        assert_eq!(server.limiter.bytes_served(), 128);
    }

    #[tokio::test]
    async fn test_rejected_request_gets_no_reply() {
        let (_dir, server, _) = server_with_chunks();
        // second request inside the 2-second spacing window
        server
            .handle_request(PeerId(1), SnapshotMessage::GetChunk { number: 0 }, 100)
            .await
            .expect("first served");
        let reply = server
            .handle_request(PeerId(1), SnapshotMessage::GetChunk { number: 1 }, 101)
            .await;
        assert!(reply.is_none());
        assert_eq!(server.limiter.active_transfers(), 0);
    }

    #[tokio::test]
    async fn test_missing_chunk_releases_slot() {
        let (_dir, server, _) = server_with_chunks();
        // delete the chunk file behind the store's back
        std::fs::remove_file(server.store.dir().join("chunk-001.dat")).expect("remove");

        let reply = server
            .handle_request(PeerId(1), SnapshotMessage::GetChunk { number: 1 }, 100)
            .await;
        assert!(reply.is_none());
        assert_eq!(server.limiter.active_transfers(), 0);
    }

    #[tokio::test]
    async fn test_ignores_response_shapes() {
        let (_dir, server, _) = server_with_chunks();
        let reply = server
            .handle_request(
                PeerId(1),
                SnapshotMessage::Chunk {
                    number: 0,
                    data: vec![],
                },
                100,
            )
            .await;
        assert!(reply.is_none());
    }
}
