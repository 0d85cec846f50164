//! Snapshot subsystem metrics

use once_cell::sync::Lazy;
use prometheus::{
    register_counter, register_counter_vec, register_gauge, Counter, CounterVec, Gauge,
};

/// Snapshot download progress percentage (0-100)
pub static SNAPSHOT_DOWNLOAD_PERCENT: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "snapshot_download_percent",
        "Snapshot download progress percentage"
    )
    .expect("Failed to register snapshot_download_percent metric")
});

/// Chunks received and verified so far
pub static SNAPSHOT_CHUNKS_RECEIVED: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "snapshot_chunks_received",
        "Snapshot chunks received and verified"
    )
    .expect("Failed to register snapshot_chunks_received metric")
});

/// Currently active outbound chunk transfers (serving side)
pub static SNAPSHOT_ACTIVE_TRANSFERS: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "snapshot_active_transfers",
        "Active outbound snapshot chunk transfers"
    )
    .expect("Failed to register snapshot_active_transfers metric")
});

/// Total chunks served to peers
pub static SNAPSHOT_CHUNKS_SERVED: Lazy<Counter> = Lazy::new(|| {
    register_counter!("snapshot_chunks_served_total", "Snapshot chunks served")
        .expect("Failed to register snapshot_chunks_served metric")
});

/// Total bytes served to peers
pub static SNAPSHOT_BYTES_SERVED: Lazy<Counter> = Lazy::new(|| {
    register_counter!("snapshot_bytes_served_total", "Snapshot bytes served")
        .expect("Failed to register snapshot_bytes_served metric")
});

/// Chunk requests rejected by the rate limiter, by reason
pub static SNAPSHOT_LIMITER_REJECTIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "snapshot_limiter_rejections_total",
        "Snapshot chunk requests rejected by the rate limiter",
        &["reason"]
    )
    .expect("Failed to register snapshot_limiter_rejections metric")
});

/// Chunk requests that timed out and were retried
pub static SNAPSHOT_REQUEST_TIMEOUTS: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "snapshot_request_timeouts_total",
        "Snapshot chunk requests that timed out"
    )
    .expect("Failed to register snapshot_request_timeouts metric")
});

/// Update download progress gauges
pub fn set_download_progress(percent: f64, chunks_received: u32) {
    SNAPSHOT_DOWNLOAD_PERCENT.set(percent);
    SNAPSHOT_CHUNKS_RECEIVED.set(chunks_received as f64);
}

/// Update the active transfer gauge
pub fn set_active_transfers(active: u32) {
    SNAPSHOT_ACTIVE_TRANSFERS.set(active as f64);
}

/// Record a chunk served to a peer
pub fn record_chunk_served(bytes: u64) {
    SNAPSHOT_CHUNKS_SERVED.inc();
    SNAPSHOT_BYTES_SERVED.inc_by(bytes as f64);
}

/// Record a limiter rejection
pub fn record_rejection(reason: &str) {
    SNAPSHOT_LIMITER_REJECTIONS
        .with_label_values(&[reason])
        .inc();
}

/// Record a request timeout
pub fn record_timeout() {
    SNAPSHOT_REQUEST_TIMEOUTS.inc();
}
