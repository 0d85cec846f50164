//! Snapshot fetch runner for node startup
//!
//! Entry point for bootstrapping a fresh node from the P2P snapshot. The
//! runner decides whether a fetch applies at all (subsystem enabled, chain
//! tip still at genesis), then drives the download loop: assigning chunks
//! to capable peers through the coordinator, reaping timed-out requests,
//! admitting verified chunks into the store, and finally handing the
//! completed store to the assembler for extraction and checkpoint
//! verification.
//!
//! Only three things can end the snapshot path: a verified install (the
//! node restarts into the bootstrapped chainstate), a skip (nothing to
//! do), or a fallback (staged data discarded, full sync from genesis).

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::task;
use tracing::{debug, error, info, warn};
use zephyr_snapshot::{
    install_snapshot, metrics, ChainstateValidator, Checkpoint, ChunkStore, DownloadCoordinator,
    DownloadState, IncomingSnapshotEvent, PeerId, SnapshotConfig, SnapshotMessage,
    SnapshotNetwork,
};
use zephyr_types::{ServiceFlags, NODE_SNAPSHOT};

use crate::util::unix_time;

/// Cadence of the assignment/timeout tick
const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// The chain tip height of a fresh install, before any block is connected
const GENESIS_HEIGHT: u32 = 0;

/// Result of a snapshot fetch attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Snapshot verified and installed; the node must restart to load it
    RestartRequired {
        /// Height of the installed snapshot
        height: u32,
    },
    /// No fetch was attempted
    Skipped {
        /// Why the fetch did not apply
        reason: String,
    },
    /// The snapshot path failed; the node proceeds with full sync
    Fallback {
        /// Error that ended the snapshot path
        error: String,
    },
}

/// Run the snapshot fetch to completion.
///
/// Listens on `network` for peer events and chunk responses, requests
/// chunks from peers advertising `NODE_SNAPSHOT`, and installs the
/// snapshot once complete. Returns when the snapshot is installed, skipped,
/// or abandoned.
pub async fn run_snapshot_fetch(
    store: Arc<ChunkStore>,
    network: &mut SnapshotNetwork,
    validator: &dyn ChainstateValidator,
    checkpoint: &Checkpoint,
    config: &SnapshotConfig,
    datadir: &Path,
    local_tip_height: u32,
) -> FetchOutcome {
    if !config.enabled {
        info!("snapshot bootstrap disabled by configuration, full sync from genesis");
        return FetchOutcome::Skipped {
            reason: "snapshot subsystem disabled".into(),
        };
    }
    if local_tip_height != GENESIS_HEIGHT {
        debug!(
            local_tip_height,
            "chainstate already populated, snapshot bootstrap not applicable"
        );
        return FetchOutcome::Skipped {
            reason: format!("chain tip already at height {}", local_tip_height),
        };
    }

    let manifest = store.manifest().clone();
    let chunk_size = manifest.chunks.first().map(|c| c.size).unwrap_or(0);
    let mut download = DownloadState::new(manifest.chunk_count(), chunk_size);

    // resume: chunks already on disk from an interrupted run count as done
    for number in 0..manifest.chunk_count() {
        if store.has_chunk(number) {
            download.note_existing(number);
        }
    }
    if download.received_count() > 0 {
        info!(
            have = download.received_count(),
            total = manifest.chunk_count(),
            "resuming snapshot download"
        );
    }

    let coordinator = DownloadCoordinator::new(config.coordinator_config());
    let mut peers: HashMap<PeerId, ServiceFlags> = HashMap::new();
    let mut tick = tokio::time::interval(TICK_INTERVAL);

    while !download.is_complete() {
        let mut assignments: Vec<(PeerId, u32)> = Vec::new();

        tokio::select! {
            event = network.recv() => {
                let Some(event) = event else {
                    warn!("snapshot network channel closed mid-download");
                    return FetchOutcome::Fallback {
                        error: "network channel closed".into(),
                    };
                };
                handle_event(event, &store, &coordinator, &mut download, &mut peers).await;
            }
            _ = tick.tick() => {
                let now = unix_time();

                for (peer, chunk) in coordinator.reap_timeouts(now) {
                    metrics::record_timeout();
                    coordinator.record_failure(peer, chunk, now);
                }

                let eligible: Vec<PeerId> = peers
                    .iter()
                    .filter(|(_, services)| services.has(NODE_SNAPSHOT))
                    .map(|(peer, _)| *peer)
                    .collect();

                while let Some((peer, chunk)) = coordinator.select_peer(&download, &eligible, now) {
                    coordinator.record_request(peer, chunk, now);
                    download.record_request(chunk, now);
                    assignments.push((peer, chunk));
                }
            }
        }

        for (peer, chunk) in assignments {
            network
                .send(peer, SnapshotMessage::GetChunk { number: chunk })
                .await;
        }
    }

    metrics::set_download_progress(100.0, download.received_count());

    match install_snapshot(&store, datadir, validator, checkpoint).await {
        Ok(()) => {
            info!(
                height = checkpoint.height,
                "snapshot bootstrap complete - restart zephyrd to load the new chainstate"
            );
            FetchOutcome::RestartRequired {
                height: checkpoint.height,
            }
        }
        Err(err) => {
            error!(%err, "snapshot verification failed, falling back to full sync");
            FetchOutcome::Fallback {
                error: err.to_string(),
            }
        }
    }
}

/// Apply one network event to the download state
async fn handle_event(
    event: IncomingSnapshotEvent,
    store: &Arc<ChunkStore>,
    coordinator: &DownloadCoordinator,
    download: &mut DownloadState,
    peers: &mut HashMap<PeerId, ServiceFlags>,
) {
    match event {
        IncomingSnapshotEvent::PeerConnected { peer, services } => {
            if services.has(NODE_SNAPSHOT) {
                debug!(%peer, "snapshot-capable peer connected");
            }
            peers.insert(peer, services);
        }
        IncomingSnapshotEvent::PeerDisconnected { peer } => {
            peers.remove(&peer);
            let freed = coordinator.remove_peer(peer);
            if !freed.is_empty() {
                debug!(%peer, chunks = ?freed, "peer disconnected, chunks requeued");
            }
        }
        IncomingSnapshotEvent::Message { peer, message } => {
            handle_message(peer, message, store, coordinator, download).await;
        }
    }
}

async fn handle_message(
    peer: PeerId,
    message: SnapshotMessage,
    store: &Arc<ChunkStore>,
    coordinator: &DownloadCoordinator,
    download: &mut DownloadState,
) {
    match message {
        SnapshotMessage::Chunk { number, data } => {
            let now = unix_time();

            // only accept bytes we asked this peer for
            if coordinator.in_flight_peer(number) != Some(peer) {
                debug!(%peer, chunk = number, "dropping unsolicited chunk");
                return;
            }

            let save_store = Arc::clone(store);
            let saved =
                task::spawn_blocking(move || save_store.save_chunk(number, &data)).await;

            match saved {
                Ok(Ok(())) => {
                    download.mark_received(number, now);
                    coordinator.record_success(peer, number);
                    metrics::set_download_progress(
                        download.progress_percent(),
                        download.received_count(),
                    );
                }
                Ok(Err(err)) => {
                    warn!(%peer, chunk = number, %err, "chunk failed verification");
                    coordinator.record_failure(peer, number, now);
                }
                Err(err) => {
                    warn!(%peer, chunk = number, %err, "chunk save task failed");
                    coordinator.record_failure(peer, number, now);
                }
            }
        }
        SnapshotMessage::Manifest(_) => {
            // the manifest is compiled in; the exchange is vestigial
            debug!(%peer, "ignoring manifest message");
        }
        SnapshotMessage::GetManifest | SnapshotMessage::GetChunk { .. } => {
            // requests are the serving side's business
            debug!(%peer, message = message.message_type(), "ignoring request-shaped message");
        }
    }
}
