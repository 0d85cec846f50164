//! Per-connection service flags.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// The peer relays the full block chain.
pub const NODE_NETWORK: ServiceFlags = ServiceFlags(1 << 0);

/// The peer can serve bootstrap snapshot chunks (bit 10, 0x400).
pub const NODE_SNAPSHOT: ServiceFlags = ServiceFlags(1 << 10);

/// Bitset of capabilities advertised in the connection handshake.
#[derive(Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ServiceFlags(pub u64);

impl ServiceFlags {
    /// No services.
    pub const NONE: Self = Self(0);

    /// True if every bit in `flag` is set.
    pub fn has(&self, flag: ServiceFlags) -> bool {
        self.0 & flag.0 == flag.0
    }

    /// Raw bit value.
    pub fn bits(&self) -> u64 {
        self.0
    }
}

impl BitOr for ServiceFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ServiceFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for ServiceFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServiceFlags({:#x})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_bit_value() {
        assert_eq!(NODE_SNAPSHOT.bits(), 0x400);
    }

    #[test]
    fn test_has() {
        let flags = NODE_NETWORK | NODE_SNAPSHOT;
        assert!(flags.has(NODE_NETWORK));
        assert!(flags.has(NODE_SNAPSHOT));
        assert!(!ServiceFlags::NONE.has(NODE_SNAPSHOT));
        assert!(!NODE_NETWORK.has(NODE_SNAPSHOT));
    }

    #[test]
    fn test_or_assign() {
        let mut flags = ServiceFlags::NONE;
        flags |= NODE_SNAPSHOT;
        assert!(flags.has(NODE_SNAPSHOT));
        assert!(!flags.has(NODE_NETWORK));
    }
}
