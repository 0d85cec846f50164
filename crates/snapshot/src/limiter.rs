//! Server-side rate limiting for chunk serving
//!
//! Protects a serving node from abusive bootstrappers without starving
//! honest ones: per-peer sliding request windows, a minimum spacing between
//! requests, duplicate-chunk suppression, a global concurrency cap, and a
//! ban escalation for peers hammering far past the rate limit.

use crate::protocol::PeerId;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// Length of the per-peer request window
const REQUEST_WINDOW_SECS: u64 = 60;

/// Per-peer state is dropped after this much inactivity (unless banned)
const PEER_IDLE_GC_SECS: u64 = 600;

/// The served-bytes counter is reported and reset on this cadence
const BYTES_REPORT_INTERVAL_SECS: u64 = 3600;

/// Tunable limits, with generous defaults sized for bootstrap traffic
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct RateLimiterConfig {
    /// Chunks one peer may be served within any 60-second window
    pub max_chunks_per_peer_per_minute: u32,
    /// Simultaneous chunk transfers across all peers
    pub max_concurrent_transfers: u32,
    /// Minimum spacing between admitted requests from one peer
    pub min_seconds_between_requests: u64,
    /// Re-serving the same chunk to the same peer is refused within this
    /// window
    pub duplicate_chunk_window_secs: u64,
    /// Request attempts within the window that trigger a ban
    pub ban_threshold: u32,
    /// How long a ban lasts
    pub ban_duration_secs: u64,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_chunks_per_peer_per_minute: 30,
            max_concurrent_transfers: 25,
            min_seconds_between_requests: 2,
            duplicate_chunk_window_secs: 300,
            ban_threshold: 100,
            ban_duration_secs: 300,
        }
    }
}

/// Why a chunk request was refused
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejectReason {
    /// Peer is banned until the given unix time
    Banned {
        /// When the ban lifts
        until: u64,
    },
    /// The global concurrency cap is reached
    AtCapacity {
        /// Transfers currently active
        active: u32,
    },
    /// Request arrived too soon after the peer's last admitted request
    TooFast {
        /// Seconds the peer must still wait
        wait: u64,
    },
    /// The same chunk was served to this peer recently
    DuplicateChunk {
        /// Chunk number
        number: u32,
        /// Seconds since it was served
        served_ago: u64,
    },
    /// The peer's 60-second window is full
    RateLimited {
        /// The per-minute limit in force
        max_per_minute: u32,
    },
}

impl RejectReason {
    /// Short label for metrics and logs
    pub fn label(&self) -> &'static str {
        match self {
            Self::Banned { .. } => "banned",
            Self::AtCapacity { .. } => "capacity",
            Self::TooFast { .. } => "too_fast",
            Self::DuplicateChunk { .. } => "duplicate",
            Self::RateLimited { .. } => "rate_limit",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Banned { until } => write!(f, "peer banned until {}", until),
            Self::AtCapacity { active } => {
                write!(f, "server at capacity ({} concurrent transfers)", active)
            }
            Self::TooFast { wait } => {
                write!(f, "too fast, wait {} seconds between requests", wait)
            }
            Self::DuplicateChunk { number, served_ago } => {
                write!(f, "chunk {} already served {} seconds ago", number, served_ago)
            }
            Self::RateLimited { max_per_minute } => {
                write!(f, "rate limit: max {} chunks per minute", max_per_minute)
            }
        }
    }
}

/// Per-peer request accounting
#[derive(Default)]
struct PeerRequestInfo {
    /// Timestamps of request attempts inside the sliding window
    request_times: VecDeque<u64>,
    /// chunk number -> last time it was served to this peer
    served_chunks: HashMap<u32, u64>,
    /// Last admitted request time
    last_request_time: u64,
    /// Lifetime admitted requests
    total_requests: u64,
    /// Ban expiry, if banned
    banned_until: Option<u64>,
}

struct LimiterInner {
    peers: HashMap<PeerId, PeerRequestInfo>,
    active_transfers: u32,
    bytes_served: u64,
    last_reset_time: u64,
    config: RateLimiterConfig,
}

/// Thread-safe admission gate for chunk serving.
///
/// One mutex covers all state, so admission is linearizable: two concurrent
/// requests for the same (peer, chunk) cannot both pass the duplicate
/// window, and the concurrency cap is never overshot. Critical sections do
/// no I/O. Timestamps are unix seconds supplied by the caller.
pub struct RateLimiter {
    inner: Mutex<LimiterInner>,
}

impl RateLimiter {
    /// Create a limiter with the given limits
    pub fn new(config: RateLimiterConfig, now: u64) -> Self {
        Self {
            inner: Mutex::new(LimiterInner {
                peers: HashMap::new(),
                active_transfers: 0,
                bytes_served: 0,
                last_reset_time: now,
                config,
            }),
        }
    }

    /// Decide whether to serve `chunk` to `peer`. On admission a transfer
    /// slot is held until [`RateLimiter::release_slot`].
    pub fn admit(&self, peer: PeerId, chunk: u32, now: u64) -> Result<(), RejectReason> {
        let mut inner = self.inner.lock().expect("limiter mutex poisoned");
        let config = inner.config;

        // capacity is global; read it before borrowing the peer entry
        let active = inner.active_transfers;
        let info = inner.peers.entry(peer).or_default();

        if let Some(until) = info.banned_until {
            if now < until {
                return Err(RejectReason::Banned { until });
            }
            // ban expired: lift it and start from a clean window
            info.banned_until = None;
            info.request_times.clear();
        }

        if active >= config.max_concurrent_transfers {
            return Err(RejectReason::AtCapacity { active });
        }

        if info.last_request_time > 0 {
            let since_last = now.saturating_sub(info.last_request_time);
            if since_last < config.min_seconds_between_requests {
                return Err(RejectReason::TooFast {
                    wait: config.min_seconds_between_requests - since_last,
                });
            }
        }

        if let Some(served_at) = info.served_chunks.get(&chunk) {
            let served_ago = now.saturating_sub(*served_at);
            if served_ago < config.duplicate_chunk_window_secs {
                return Err(RejectReason::DuplicateChunk {
                    number: chunk,
                    served_ago,
                });
            }
        }

        // slide the window forward
        while info
            .request_times
            .front()
            .is_some_and(|t| now.saturating_sub(*t) > REQUEST_WINDOW_SECS)
        {
            info.request_times.pop_front();
        }

        if info.request_times.len() >= config.max_chunks_per_peer_per_minute as usize {
            // over-limit attempts still count toward the window so that a
            // peer hammering through rejections escalates to a ban
            info.request_times.push_back(now);
            if info.request_times.len() >= config.ban_threshold as usize {
                info.banned_until = Some(now + config.ban_duration_secs);
                warn!(
                    %peer,
                    duration_secs = config.ban_duration_secs,
                    "banned peer for excessive snapshot requests"
                );
            }
            return Err(RejectReason::RateLimited {
                max_per_minute: config.max_chunks_per_peer_per_minute,
            });
        }

        info.request_times.push_back(now);
        info.last_request_time = now;
        info.total_requests += 1;
        inner.active_transfers += 1;

        Ok(())
    }

    /// Record that a chunk finished being served to a peer
    pub fn record_served(&self, peer: PeerId, chunk: u32, bytes: u64, now: u64) {
        let mut inner = self.inner.lock().expect("limiter mutex poisoned");
        inner
            .peers
            .entry(peer)
            .or_default()
            .served_chunks
            .insert(chunk, now);
        inner.bytes_served += bytes;
        debug!(target: "snapshot", %peer, chunk, bytes, "served chunk");
    }

    /// Release a transfer slot taken by a successful [`RateLimiter::admit`].
    /// Called on completion or failure of the transfer; never drops the
    /// counter below zero.
    pub fn release_slot(&self) {
        let mut inner = self.inner.lock().expect("limiter mutex poisoned");
        inner.active_transfers = inner.active_transfers.saturating_sub(1);
    }

    /// True if the peer is currently banned
    pub fn is_banned(&self, peer: PeerId, now: u64) -> bool {
        let inner = self.inner.lock().expect("limiter mutex poisoned");
        inner
            .peers
            .get(&peer)
            .and_then(|info| info.banned_until)
            .is_some_and(|until| now < until)
    }

    /// Periodic sweep: drop idle unbanned peers, report and reset the
    /// hourly bytes counter
    pub fn cleanup(&self, now: u64) {
        let mut inner = self.inner.lock().expect("limiter mutex poisoned");

        inner.peers.retain(|_, info| {
            info.banned_until.is_some()
                || now.saturating_sub(info.last_request_time) <= PEER_IDLE_GC_SECS
        });

        if now.saturating_sub(inner.last_reset_time) > BYTES_REPORT_INTERVAL_SECS {
            info!(
                mb_served = inner.bytes_served / (1024 * 1024),
                "snapshot bytes served in the last hour"
            );
            inner.bytes_served = 0;
            inner.last_reset_time = now;
        }
    }

    /// Apply operator overrides for the three externally tunable limits
    pub fn set_limits(&self, max_chunks_per_minute: u32, max_concurrent: u32, min_secs_between: u64) {
        let mut inner = self.inner.lock().expect("limiter mutex poisoned");
        inner.config.max_chunks_per_peer_per_minute = max_chunks_per_minute;
        inner.config.max_concurrent_transfers = max_concurrent;
        inner.config.min_seconds_between_requests = min_secs_between;
        info!(
            max_chunks_per_minute,
            max_concurrent, min_secs_between, "snapshot rate limits updated"
        );
    }

    /// Transfers currently holding a slot
    pub fn active_transfers(&self) -> u32 {
        self.inner
            .lock()
            .expect("limiter mutex poisoned")
            .active_transfers
    }

    /// Bytes served since the last hourly reset
    pub fn bytes_served(&self) -> u64 {
        self.inner
            .lock()
            .expect("limiter mutex poisoned")
            .bytes_served
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter() -> RateLimiter {
        RateLimiter::new(RateLimiterConfig::default(), 0)
    }

    #[test]
    fn test_admit_and_release() {
        let limiter = limiter();
        limiter.admit(PeerId(1), 0, 100).expect("admitted");
        assert_eq!(limiter.active_transfers(), 1);
        limiter.release_slot();
        assert_eq!(limiter.active_transfers(), 0);
        // releasing an empty slot floors at zero
        limiter.release_slot();
        assert_eq!(limiter.active_transfers(), 0);
    }

    #[test]
    fn test_min_spacing_enforced() {
        let limiter = limiter();
        limiter.admit(PeerId(1), 0, 100).expect("admitted");
        let err = limiter.admit(PeerId(1), 1, 101).expect_err("too fast");
        assert!(matches!(err, RejectReason::TooFast { wait: 1 }));
        limiter.admit(PeerId(1), 1, 102).expect("spaced out");
    }

    #[test]
    fn test_concurrency_cap() {
        let config = RateLimiterConfig {
            max_concurrent_transfers: 2,
            ..Default::default()
        };
        let limiter = RateLimiter::new(config, 0);

        limiter.admit(PeerId(1), 0, 100).expect("first");
        limiter.admit(PeerId(2), 1, 100).expect("second");
        let err = limiter.admit(PeerId(3), 2, 100).expect_err("at cap");
        assert!(matches!(err, RejectReason::AtCapacity { active: 2 }));

        limiter.release_slot();
        limiter.admit(PeerId(3), 2, 101).expect("slot freed");
    }

    #[test]
    fn test_duplicate_chunk_window() {
        let limiter = limiter();
        limiter.admit(PeerId(1), 5, 100).expect("admitted");
        limiter.record_served(PeerId(1), 5, 1024, 101);
        limiter.release_slot();

        let err = limiter.admit(PeerId(1), 5, 110).expect_err("duplicate");
        assert!(matches!(err, RejectReason::DuplicateChunk { number: 5, .. }));

        // a different chunk is fine
        limiter.admit(PeerId(1), 6, 110).expect("other chunk");
        limiter.release_slot();

        // and the same chunk is served again once the window passes
        limiter.admit(PeerId(1), 5, 101 + 300).expect("window passed");
    }

    #[test]
    fn test_per_minute_window() {
        let config = RateLimiterConfig {
            max_chunks_per_peer_per_minute: 3,
            min_seconds_between_requests: 0,
            duplicate_chunk_window_secs: 0,
            ..Default::default()
        };
        let limiter = RateLimiter::new(config, 0);
        let peer = PeerId(9);

        for (i, t) in [100, 102, 104].iter().enumerate() {
            limiter.admit(peer, i as u32, *t).expect("within window");
            limiter.release_slot();
        }
        let err = limiter.admit(peer, 3, 106).expect_err("window full");
        assert!(matches!(err, RejectReason::RateLimited { max_per_minute: 3 }));

        // entries age out of the 60-second window
        limiter.admit(peer, 4, 170).expect("window slid");
    }

    #[test]
    fn test_ban_escalation_and_expiry() {
        // shrunk limits: window of 3, ban after 6 attempts
        let config = RateLimiterConfig {
            max_chunks_per_peer_per_minute: 3,
            ban_threshold: 6,
            min_seconds_between_requests: 0,
            duplicate_chunk_window_secs: 0,
            ban_duration_secs: 300,
            ..Default::default()
        };
        let limiter = RateLimiter::new(config, 0);
        let peer = PeerId(66);

        // 3 admitted
        for n in 0..3u32 {
            limiter.admit(peer, n, 100).expect("admitted");
            limiter.release_slot();
        }
        // attempts 4 and 5 rejected with rate limit, window grows to 5
        for n in 3..5u32 {
            let err = limiter.admit(peer, n, 100).expect_err("rate limited");
            assert!(matches!(err, RejectReason::RateLimited { .. }));
            assert!(!limiter.is_banned(peer, 100));
        }
        // attempt 6 reaches the ban threshold
        let err = limiter.admit(peer, 5, 100).expect_err("rate limited");
        assert!(matches!(err, RejectReason::RateLimited { .. }));
        assert!(limiter.is_banned(peer, 100));

        // banned rejections until expiry
        let err = limiter.admit(peer, 0, 200).expect_err("banned");
        assert!(matches!(err, RejectReason::Banned { until: 400 }));

        // ban lifts and the window restarts clean
        assert!(!limiter.is_banned(peer, 400));
        limiter.admit(peer, 0, 400).expect("unbanned");
    }

    #[test]
    fn test_other_peers_unaffected_by_ban() {
        let config = RateLimiterConfig {
            max_chunks_per_peer_per_minute: 1,
            ban_threshold: 2,
            min_seconds_between_requests: 0,
            ..Default::default()
        };
        let limiter = RateLimiter::new(config, 0);

        limiter.admit(PeerId(1), 0, 100).expect("admitted");
        limiter.release_slot();
        let _ = limiter.admit(PeerId(1), 1, 100);
        assert!(limiter.is_banned(PeerId(1), 100));

        limiter.admit(PeerId(2), 0, 100).expect("other peer fine");
    }

    #[test]
    fn test_cleanup_drops_idle_unbanned() {
        let limiter = limiter();
        limiter.admit(PeerId(1), 0, 100).expect("admitted");
        limiter.release_slot();

        // idle for over 10 minutes
        limiter.cleanup(800);
        // peer state was dropped, so the duplicate window is gone too
        limiter.record_served(PeerId(2), 0, 1, 800);
        assert!(!limiter.is_banned(PeerId(1), 800));
        // re-admission works from scratch
        limiter.admit(PeerId(1), 0, 800).expect("fresh state");
    }

    #[test]
    fn test_cleanup_keeps_banned_peers() {
        let config = RateLimiterConfig {
            max_chunks_per_peer_per_minute: 1,
            ban_threshold: 2,
            min_seconds_between_requests: 0,
            ban_duration_secs: 10_000,
            ..Default::default()
        };
        let limiter = RateLimiter::new(config, 0);
        limiter.admit(PeerId(1), 0, 100).expect("admitted");
        limiter.release_slot();
        let _ = limiter.admit(PeerId(1), 1, 100);
        assert!(limiter.is_banned(PeerId(1), 100));

        limiter.cleanup(5000);
        assert!(limiter.is_banned(PeerId(1), 5000));
    }

    #[test]
    fn test_bytes_counter_resets_hourly() {
        let limiter = limiter();
        limiter.record_served(PeerId(1), 0, 4096, 100);
        assert_eq!(limiter.bytes_served(), 4096);

        limiter.cleanup(100 + 3601);
        assert_eq!(limiter.bytes_served(), 0);
    }

    #[test]
    fn test_set_limits() {
        let limiter = limiter();
        limiter.set_limits(5, 1, 0);

        limiter.admit(PeerId(1), 0, 100).expect("admitted");
        let err = limiter.admit(PeerId(2), 0, 100).expect_err("cap now 1");
        assert!(matches!(err, RejectReason::AtCapacity { .. }));
    }
}
