//! Client-side download coordination
//!
//! Decides which peer to ask for which chunk: one peer per chunk at a time,
//! a global in-flight cap, per-peer request spacing, exponential backoff on
//! failures, and a periodic reaper that frees chunks whose requests timed
//! out so another peer can be tried.

use crate::download::DownloadState;
use crate::protocol::PeerId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, warn};

/// Client-side limits. Deliberately more conservative than the serving
/// side's defaults so a fetching node never trips a server's limiter.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Chunks that may be in flight at once
    pub max_concurrent_peer_requests: usize,
    /// Minimum spacing between requests to the same peer (server allows 2)
    pub min_request_interval_secs: u64,
    /// A request older than this is reaped and retried elsewhere
    pub request_timeout_secs: u64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_peer_requests: 12,
            min_request_interval_secs: 3,
            request_timeout_secs: 60,
        }
    }
}

/// Per-peer download accounting
#[derive(Default)]
struct PeerDownloadState {
    last_request_time: u64,
    chunks_requested: u32,
    chunks_failed: u32,
    consecutive_failures: u32,
    backoff_until: u64,
}

/// An outstanding chunk request
struct InFlightChunk {
    peer: PeerId,
    requested_at: u64,
}

struct CoordinatorInner {
    peers: HashMap<PeerId, PeerDownloadState>,
    in_flight: HashMap<u32, InFlightChunk>,
    config: CoordinatorConfig,
}

/// Thread-safe chunk-to-peer assignment.
///
/// One mutex covers all state; every public method runs to completion
/// without suspension while holding it, so a chunk has at most one peer in
/// flight at any instant. Timestamps are unix seconds supplied by the
/// caller.
pub struct DownloadCoordinator {
    inner: Mutex<CoordinatorInner>,
}

impl DownloadCoordinator {
    /// Create a coordinator with the given limits
    pub fn new(config: CoordinatorConfig) -> Self {
        Self {
            inner: Mutex::new(CoordinatorInner {
                peers: HashMap::new(),
                in_flight: HashMap::new(),
                config,
            }),
        }
    }

    /// Pick the next (peer, chunk) pair to request, or `None` when nothing
    /// can be assigned right now.
    ///
    /// The chunk is always `download.next_needed()`; among the peers not in
    /// backoff and not asked too recently, the one idle the longest wins
    /// (simple fair share).
    pub fn select_peer(
        &self,
        download: &DownloadState,
        available: &[PeerId],
        now: u64,
    ) -> Option<(PeerId, u32)> {
        let mut inner = self.inner.lock().expect("coordinator mutex poisoned");
        let config = inner.config;

        if download.is_complete() {
            return None;
        }

        let chunk = download.next_needed();
        if inner.in_flight.contains_key(&chunk) {
            return None;
        }
        if inner.in_flight.len() >= config.max_concurrent_peer_requests {
            return None;
        }

        let mut best: Option<(PeerId, u64)> = None;
        for peer in available {
            let state = inner.peers.entry(*peer).or_default();
            if state.backoff_until > now {
                continue;
            }
            if now.saturating_sub(state.last_request_time) < config.min_request_interval_secs {
                continue;
            }
            if best.is_none_or(|(_, oldest)| state.last_request_time < oldest) {
                best = Some((*peer, state.last_request_time));
            }
        }

        best.map(|(peer, _)| (peer, chunk))
    }

    /// Record that a chunk request was sent to a peer
    pub fn record_request(&self, peer: PeerId, chunk: u32, now: u64) {
        let mut inner = self.inner.lock().expect("coordinator mutex poisoned");
        let state = inner.peers.entry(peer).or_default();
        state.last_request_time = now;
        state.chunks_requested += 1;
        inner.in_flight.insert(
            chunk,
            InFlightChunk {
                peer,
                requested_at: now,
            },
        );
        debug!(target: "snapshot", %peer, chunk, "requested chunk");
    }

    /// Record a verified chunk receipt; clears the peer's failure streak
    pub fn record_success(&self, peer: PeerId, chunk: u32) {
        let mut inner = self.inner.lock().expect("coordinator mutex poisoned");
        inner.in_flight.remove(&chunk);
        let state = inner.peers.entry(peer).or_default();
        state.consecutive_failures = 0;
        state.backoff_until = 0;
        debug!(target: "snapshot", %peer, chunk, "received chunk");
    }

    /// Record a failed request (timeout or bad data); the chunk becomes
    /// assignable again and the peer backs off 10/30/60/300 seconds by
    /// consecutive failure count
    pub fn record_failure(&self, peer: PeerId, chunk: u32, now: u64) {
        let mut inner = self.inner.lock().expect("coordinator mutex poisoned");
        inner.in_flight.remove(&chunk);
        let state = inner.peers.entry(peer).or_default();
        state.chunks_failed += 1;
        state.consecutive_failures += 1;
        let backoff = backoff_secs(state.consecutive_failures);
        state.backoff_until = now + backoff;
        warn!(
            %peer,
            chunk,
            failures = state.consecutive_failures,
            backoff_secs = backoff,
            "chunk request failed"
        );
    }

    /// Remove and return requests in flight longer than the timeout. The
    /// caller treats each as a failure for that peer.
    pub fn reap_timeouts(&self, now: u64) -> Vec<(PeerId, u32)> {
        let mut inner = self.inner.lock().expect("coordinator mutex poisoned");
        let timeout = inner.config.request_timeout_secs;
        let expired: Vec<(PeerId, u32)> = inner
            .in_flight
            .iter()
            .filter(|(_, entry)| now.saturating_sub(entry.requested_at) > timeout)
            .map(|(chunk, entry)| (entry.peer, *chunk))
            .collect();
        for (peer, chunk) in &expired {
            inner.in_flight.remove(chunk);
            warn!(peer = %peer, chunk, "chunk request timed out");
        }
        expired
    }

    /// Drop a disconnected peer: its state and every chunk in flight to it.
    /// Returns the freed chunks.
    pub fn remove_peer(&self, peer: PeerId) -> Vec<u32> {
        let mut inner = self.inner.lock().expect("coordinator mutex poisoned");
        inner.peers.remove(&peer);
        let freed: Vec<u32> = inner
            .in_flight
            .iter()
            .filter(|(_, entry)| entry.peer == peer)
            .map(|(chunk, _)| *chunk)
            .collect();
        for chunk in &freed {
            inner.in_flight.remove(chunk);
            debug!(%peer, chunk, "peer disconnected with chunk in flight");
        }
        freed
    }

    /// Which peer a chunk is currently in flight to, if any
    pub fn in_flight_peer(&self, chunk: u32) -> Option<PeerId> {
        let inner = self.inner.lock().expect("coordinator mutex poisoned");
        inner.in_flight.get(&chunk).map(|entry| entry.peer)
    }

    /// Number of chunks currently in flight
    pub fn in_flight_count(&self) -> usize {
        self.inner
            .lock()
            .expect("coordinator mutex poisoned")
            .in_flight
            .len()
    }

    /// Seconds until the peer's backoff expires (0 = ready)
    pub fn peer_backoff_remaining(&self, peer: PeerId, now: u64) -> u64 {
        let inner = self.inner.lock().expect("coordinator mutex poisoned");
        inner
            .peers
            .get(&peer)
            .map(|state| state.backoff_until.saturating_sub(now))
            .unwrap_or(0)
    }
}

/// Backoff ladder: 10 s, 30 s, 60 s, then 300 s from the fourth
/// consecutive failure on
fn backoff_secs(consecutive_failures: u32) -> u64 {
    match consecutive_failures {
        0 | 1 => 10,
        2 => 30,
        3 => 60,
        _ => 300,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coordinator() -> DownloadCoordinator {
        DownloadCoordinator::new(CoordinatorConfig::default())
    }

    fn download(total: u32) -> DownloadState {
        DownloadState::new(total, 100)
    }

    #[test]
    fn test_select_assigns_next_needed() {
        let coord = coordinator();
        let mut state = download(5);
        state.mark_received(0, 1000);

        let (peer, chunk) = coord
            .select_peer(&state, &[PeerId(1)], 1000)
            .expect("assignable");
        assert_eq!(peer, PeerId(1));
        assert_eq!(chunk, 1);
    }

    #[test]
    fn test_select_none_when_complete() {
        let coord = coordinator();
        let mut state = download(1);
        state.mark_received(0, 1000);
        assert!(coord.select_peer(&state, &[PeerId(1)], 1000).is_none());
    }

    #[test]
    fn test_no_two_peers_for_one_chunk() {
        let coord = coordinator();
        let state = download(5);

        let (peer, chunk) = coord
            .select_peer(&state, &[PeerId(1), PeerId(2)], 1000)
            .expect("assignable");
        coord.record_request(peer, chunk, 1000);

        // chunk 0 is still next_needed but already in flight
        assert!(coord.select_peer(&state, &[PeerId(2)], 1000).is_none());
        assert_eq!(coord.in_flight_peer(0), Some(peer));
    }

    #[test]
    fn test_in_flight_cap() {
        let config = CoordinatorConfig {
            max_concurrent_peer_requests: 2,
            ..Default::default()
        };
        let coord = DownloadCoordinator::new(config);
        let state = download(10);

        // two requests in flight, neither for the next needed chunk
        coord.record_request(PeerId(1), 5, 1000);
        coord.record_request(PeerId(2), 6, 1000);
        assert!(coord.select_peer(&state, &[PeerId(3)], 1000).is_none());
    }

    #[test]
    fn test_fair_share_prefers_idle_peer() {
        let coord = coordinator();
        let state = download(10);

        coord.record_request(PeerId(1), 5, 900);
        coord.record_request(PeerId(2), 6, 950);

        // both peers are past the 3 s spacing; the longer-idle one wins
        let (peer, chunk) = coord
            .select_peer(&state, &[PeerId(1), PeerId(2)], 2000)
            .expect("assignable");
        assert_eq!(peer, PeerId(1));
        assert_eq!(chunk, 0);
    }

    #[test]
    fn test_request_spacing_filters_peer() {
        let coord = coordinator();
        let state = download(10);

        coord.record_request(PeerId(1), 5, 1000);
        // 2 s later: too soon for the same peer
        assert!(coord.select_peer(&state, &[PeerId(1)], 1002).is_none());
        // an untouched peer is eligible immediately
        let (peer, _) = coord
            .select_peer(&state, &[PeerId(1), PeerId(2)], 1002)
            .expect("assignable");
        assert_eq!(peer, PeerId(2));
        // and the original peer after the interval
        assert!(coord.select_peer(&state, &[PeerId(1)], 1003).is_some());
    }

    #[test]
    fn test_backoff_ladder() {
        assert_eq!(backoff_secs(1), 10);
        assert_eq!(backoff_secs(2), 30);
        assert_eq!(backoff_secs(3), 60);
        assert_eq!(backoff_secs(4), 300);
        assert_eq!(backoff_secs(9), 300);
    }

    #[test]
    fn test_failure_backoff_excludes_peer() {
        let coord = coordinator();
        let state = download(10);

        coord.record_request(PeerId(1), 0, 1000);
        coord.record_failure(PeerId(1), 0, 1010);

        assert_eq!(coord.peer_backoff_remaining(PeerId(1), 1010), 10);
        assert!(coord.select_peer(&state, &[PeerId(1)], 1015).is_none());
        // backoff expired
        assert!(coord.select_peer(&state, &[PeerId(1)], 1020).is_some());
    }

    #[test]
    fn test_success_resets_failure_streak() {
        let coord = coordinator();

        coord.record_request(PeerId(1), 0, 1000);
        coord.record_failure(PeerId(1), 0, 1010);
        coord.record_request(PeerId(1), 0, 1100);
        coord.record_failure(PeerId(1), 0, 1110);
        // second consecutive failure: 30 s
        assert_eq!(coord.peer_backoff_remaining(PeerId(1), 1110), 30);

        coord.record_request(PeerId(1), 0, 1200);
        coord.record_success(PeerId(1), 0);
        assert_eq!(coord.peer_backoff_remaining(PeerId(1), 1200), 0);

        // next failure starts the ladder over
        coord.record_request(PeerId(1), 1, 1300);
        coord.record_failure(PeerId(1), 1, 1310);
        assert_eq!(coord.peer_backoff_remaining(PeerId(1), 1310), 10);
    }

    #[test]
    fn test_reap_timeouts_uses_request_age() {
        let coord = coordinator();

        coord.record_request(PeerId(1), 0, 1000);
        coord.record_request(PeerId(2), 1, 1030);

        // at 1061 only the first request is over the 60 s timeout
        let reaped = coord.reap_timeouts(1061);
        assert_eq!(reaped, vec![(PeerId(1), 0)]);
        assert_eq!(coord.in_flight_count(), 1);

        // exactly at the boundary is not yet timed out
        assert!(coord.reap_timeouts(1090).is_empty());
        let reaped = coord.reap_timeouts(1091);
        assert_eq!(reaped, vec![(PeerId(2), 1)]);
    }

    #[test]
    fn test_remove_peer_frees_chunks() {
        let coord = coordinator();
        let state = download(10);

        coord.record_request(PeerId(1), 0, 1000);
        coord.record_request(PeerId(2), 1, 1000);

        let freed = coord.remove_peer(PeerId(1));
        assert_eq!(freed, vec![0]);
        assert_eq!(coord.in_flight_count(), 1);

        // chunk 0 is assignable again, and the reaper won't double-count it
        let (peer, chunk) = coord
            .select_peer(&state, &[PeerId(3)], 1001)
            .expect("assignable");
        assert_eq!((peer, chunk), (PeerId(3), 0));
        assert!(coord.reap_timeouts(2000).iter().all(|(p, _)| *p != PeerId(1)));
    }
}
