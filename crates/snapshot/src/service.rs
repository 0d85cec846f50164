//! Service advertisement gate

use crate::store::ChunkStore;
use zephyr_types::{ServiceFlags, NODE_SNAPSHOT};

/// Whether this node should advertise the `NODE_SNAPSHOT` service bit.
///
/// A node serves snapshots iff it holds every chunk of the built-in
/// manifest locally and accepts inbound connections. Pure function of local
/// state; re-evaluate after the chunk store changes.
pub fn can_serve_snapshots(store: &ChunkStore, listen_enabled: bool) -> bool {
    listen_enabled && store.is_complete()
}

/// The service flags a node should advertise, given its base services and
/// snapshot availability
pub fn advertised_services(base: ServiceFlags, store: &ChunkStore, listen_enabled: bool) -> ServiceFlags {
    let mut services = base;
    if can_serve_snapshots(store, listen_enabled) {
        services |= NODE_SNAPSHOT;
    }
    services
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{ChunkInfo, Manifest};
    use tempfile::TempDir;
    use zephyr_types::{Hash256, NODE_NETWORK};

    fn store_with_chunks(save: &[u32]) -> (TempDir, ChunkStore) {
        let dir = TempDir::new().expect("tempdir");
        let data: Vec<Vec<u8>> = vec![vec![1u8; 16], vec![2u8; 16]];
        let manifest = Manifest {
            height: 42,
            timestamp: 1,
            total_size: 32,
            chunks: data
                .iter()
                .enumerate()
                .map(|(i, d)| {
                    ChunkInfo::new(i as u32, Hash256::compute_reversed(d), d.len() as u64)
                })
                .collect(),
        };
        let store = ChunkStore::open(dir.path(), manifest).expect("open");
        for n in save {
            store.save_chunk(*n, &data[*n as usize]).expect("save");
        }
        (dir, store)
    }

    #[test]
    fn test_gate_requires_all_chunks() {
        let (_dir, store) = store_with_chunks(&[0]);
        assert!(!can_serve_snapshots(&store, true));

        let (_dir, store) = store_with_chunks(&[0, 1]);
        assert!(can_serve_snapshots(&store, true));
    }

    #[test]
    fn test_gate_requires_listening() {
        let (_dir, store) = store_with_chunks(&[0, 1]);
        assert!(!can_serve_snapshots(&store, false));
    }

    #[test]
    fn test_advertised_services() {
        let (_dir, store) = store_with_chunks(&[0, 1]);
        let services = advertised_services(NODE_NETWORK, &store, true);
        assert!(services.has(NODE_NETWORK));
        assert!(services.has(NODE_SNAPSHOT));

        let services = advertised_services(NODE_NETWORK, &store, false);
        assert!(!services.has(NODE_SNAPSHOT));
    }
}
