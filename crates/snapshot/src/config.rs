//! Runtime configuration for the snapshot subsystem

use crate::coordinator::CoordinatorConfig;
use crate::limiter::RateLimiterConfig;
use serde::{Deserialize, Serialize};

/// Operator-facing snapshot settings.
///
/// Everything here has a sensible default; a config file only needs the
/// keys it wants to change. Chunk size, snapshot height, the manifest, and
/// the checkpoint are compile-time constants and deliberately not
/// configurable.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// Master toggle. When off the node never attempts a snapshot fetch
    /// and starts a full sync from genesis.
    pub enabled: bool,

    /// Serving-side: chunks one peer may be served per minute
    pub max_chunks_per_peer_per_minute: u32,
    /// Serving-side: simultaneous transfers across all peers
    pub max_concurrent_transfers: u32,
    /// Serving-side: minimum spacing between requests from one peer
    pub min_seconds_between_requests: u64,
    /// Serving-side: window during which a chunk is not re-served to the
    /// same peer
    pub duplicate_chunk_window_secs: u64,
    /// Serving-side: attempts per minute that trigger a ban
    pub ban_threshold: u32,
    /// Serving-side: ban duration
    pub ban_duration_secs: u64,

    /// Fetching-side: chunks in flight at once
    pub max_concurrent_peer_requests: usize,
    /// Fetching-side: minimum spacing between requests to one peer
    pub min_request_interval_secs: u64,
    /// Fetching-side: per-request timeout before retrying elsewhere
    pub request_timeout_secs: u64,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        let limiter = RateLimiterConfig::default();
        let coordinator = CoordinatorConfig::default();
        Self {
            enabled: true,
            max_chunks_per_peer_per_minute: limiter.max_chunks_per_peer_per_minute,
            max_concurrent_transfers: limiter.max_concurrent_transfers,
            min_seconds_between_requests: limiter.min_seconds_between_requests,
            duplicate_chunk_window_secs: limiter.duplicate_chunk_window_secs,
            ban_threshold: limiter.ban_threshold,
            ban_duration_secs: limiter.ban_duration_secs,
            max_concurrent_peer_requests: coordinator.max_concurrent_peer_requests,
            min_request_interval_secs: coordinator.min_request_interval_secs,
            request_timeout_secs: coordinator.request_timeout_secs,
        }
    }
}

impl SnapshotConfig {
    /// Serving-side limiter configuration
    pub fn limiter_config(&self) -> RateLimiterConfig {
        RateLimiterConfig {
            max_chunks_per_peer_per_minute: self.max_chunks_per_peer_per_minute,
            max_concurrent_transfers: self.max_concurrent_transfers,
            min_seconds_between_requests: self.min_seconds_between_requests,
            duplicate_chunk_window_secs: self.duplicate_chunk_window_secs,
            ban_threshold: self.ban_threshold,
            ban_duration_secs: self.ban_duration_secs,
        }
    }

    /// Fetching-side coordinator configuration
    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            max_concurrent_peer_requests: self.max_concurrent_peer_requests,
            min_request_interval_secs: self.min_request_interval_secs,
            request_timeout_secs: self.request_timeout_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let config = SnapshotConfig::default();
        assert!(config.enabled);
        assert_eq!(config.max_chunks_per_peer_per_minute, 30);
        assert_eq!(config.max_concurrent_transfers, 25);
        assert_eq!(config.min_seconds_between_requests, 2);
        assert_eq!(config.duplicate_chunk_window_secs, 300);
        assert_eq!(config.ban_threshold, 100);
        assert_eq!(config.ban_duration_secs, 300);
        assert_eq!(config.max_concurrent_peer_requests, 12);
        assert_eq!(config.min_request_interval_secs, 3);
        assert_eq!(config.request_timeout_secs, 60);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: SnapshotConfig =
            toml::from_str("enabled = false\nmax_concurrent_transfers = 5\n")
                .expect("parse");
        assert!(!config.enabled);
        assert_eq!(config.max_concurrent_transfers, 5);
        assert_eq!(config.max_chunks_per_peer_per_minute, 30);
    }
}
