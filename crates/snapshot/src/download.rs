//! Download completeness tracking and progress reporting

use std::collections::HashMap;
use tracing::info;

/// A chunk request is "recent" if it was made strictly less than this many
/// seconds ago
const RECENT_REQUEST_HORIZON_SECS: u64 = 60;

/// Log progress at least every this many received chunks
const PROGRESS_LOG_CHUNK_INTERVAL: u32 = 10;

/// ... or every this many seconds, whichever fires first
const PROGRESS_LOG_INTERVAL_SECS: u64 = 30;

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Tracks which chunks of the snapshot have been received, when each was
/// last requested, and emits throttled progress lines with an ETA.
///
/// Owned by the fetch workflow; all timestamps are unix seconds supplied by
/// the caller so the 60-second recency boundary is exact and testable.
pub struct DownloadState {
    received: Vec<bool>,
    received_count: u32,
    requests: HashMap<u32, u64>,
    chunk_size: u64,
    download_start: Option<u64>,
    last_progress_time: u64,
    last_progress_count: u32,
}

impl DownloadState {
    /// Create tracking state for `total_chunks` chunks of nominal size
    /// `chunk_size` (used only for byte-progress math)
    pub fn new(total_chunks: u32, chunk_size: u64) -> Self {
        Self {
            received: vec![false; total_chunks as usize],
            received_count: 0,
            requests: HashMap::new(),
            chunk_size,
            download_start: None,
            last_progress_time: 0,
            last_progress_count: 0,
        }
    }

    /// Total number of chunks being tracked
    pub fn total_chunks(&self) -> u32 {
        self.received.len() as u32
    }

    /// Number of chunks received so far
    pub fn received_count(&self) -> u32 {
        self.received_count
    }

    /// Mark a chunk found on disk before the download started, without
    /// starting the wall clock or logging
    pub fn note_existing(&mut self, chunk: u32) {
        if let Some(slot) = self.received.get_mut(chunk as usize) {
            if !*slot {
                *slot = true;
                self.received_count += 1;
            }
        }
    }

    /// Record receipt of a chunk. Idempotent. Starts the download clock on
    /// the first receipt and logs progress every 10 chunks or 30 seconds.
    pub fn mark_received(&mut self, chunk: u32, now: u64) {
        let Some(slot) = self.received.get_mut(chunk as usize) else {
            return;
        };
        if !*slot {
            *slot = true;
            self.received_count += 1;
        }

        if self.download_start.is_none() {
            self.download_start = Some(now);
            self.last_progress_time = now;
            info!(
                chunks = self.total_chunks(),
                size_gb = format!("{:.2}", self.total_bytes() as f64 / GIB),
                "snapshot download starting"
            );
        }

        let should_log = self.received_count % PROGRESS_LOG_CHUNK_INTERVAL == 0
            || now.saturating_sub(self.last_progress_time) >= PROGRESS_LOG_INTERVAL_SECS;
        if should_log && self.received_count > self.last_progress_count {
            self.log_progress(now);
            self.last_progress_time = now;
            self.last_progress_count = self.received_count;
        }

        if self.is_complete() {
            let elapsed = now.saturating_sub(self.download_start.unwrap_or(now));
            info!(
                chunks = self.total_chunks(),
                size_gb = format!("{:.2}", self.total_bytes() as f64 / GIB),
                elapsed_secs = elapsed,
                "snapshot download complete, extracting next"
            );
        }
    }

    /// True if the chunk has been received
    pub fn is_received(&self, chunk: u32) -> bool {
        self.received.get(chunk as usize).copied().unwrap_or(false)
    }

    /// True if every chunk has been received
    pub fn is_complete(&self) -> bool {
        self.received_count == self.total_chunks()
    }

    /// Smallest chunk number not yet received, or the total count when the
    /// download is complete
    pub fn next_needed(&self) -> u32 {
        self.received
            .iter()
            .position(|r| !*r)
            .map(|i| i as u32)
            .unwrap_or(self.total_chunks())
    }

    /// Remember when a chunk was last requested
    pub fn record_request(&mut self, chunk: u32, now: u64) {
        self.requests.insert(chunk, now);
    }

    /// True if the chunk was requested strictly less than 60 seconds ago
    pub fn has_recent_request(&self, chunk: u32, now: u64) -> bool {
        self.requests
            .get(&chunk)
            .is_some_and(|t| now.saturating_sub(*t) < RECENT_REQUEST_HORIZON_SECS)
    }

    /// Percent of chunks received
    pub fn progress_percent(&self) -> f64 {
        if self.total_chunks() == 0 {
            return 100.0;
        }
        (self.received_count as f64 * 100.0) / self.total_chunks() as f64
    }

    fn total_bytes(&self) -> u64 {
        self.total_chunks() as u64 * self.chunk_size
    }

    /// Emit one progress line: chunk counts, bytes, and an ETA computed
    /// from the observed rate since the first received chunk
    pub fn log_progress(&self, now: u64) {
        if self.received_count == 0 || self.total_chunks() == 0 {
            return;
        }

        let downloaded_gb = (self.received_count as u64 * self.chunk_size) as f64 / GIB;
        let total_gb = self.total_bytes() as f64 / GIB;

        let eta = self
            .download_start
            .map(|start| now.saturating_sub(start))
            .filter(|elapsed| *elapsed > 0)
            .map(|elapsed| {
                let chunks_per_sec = self.received_count as f64 / elapsed as f64;
                let remaining = self.total_chunks() - self.received_count;
                let eta_secs = (remaining as f64 / chunks_per_sec) as u64;
                format_eta(eta_secs)
            })
            .unwrap_or_else(|| "calculating...".into());

        info!(
            received = self.received_count,
            total = self.total_chunks(),
            percent = format!("{:.1}", self.progress_percent()),
            downloaded_gb = format!("{:.2}", downloaded_gb),
            total_gb = format!("{:.2}", total_gb),
            eta = %eta,
            "snapshot download progress"
        );
    }
}

fn format_eta(secs: u64) -> String {
    if secs < 60 {
        format!("{} seconds", secs)
    } else if secs < 3600 {
        format!("{} minutes", secs / 60)
    } else {
        format!("{} hours {} minutes", secs / 3600, (secs % 3600) / 60)
    }
}
