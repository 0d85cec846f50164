//! Network adapter for the snapshot protocol
//!
//! Provides a channel-based interface between the connection layer and the
//! snapshot engine. The engine never touches sockets; it sees peer life
//! cycle events and decoded messages on one channel and pushes replies and
//! requests out on another.

use crate::protocol::{PeerId, SnapshotMessage};
use tokio::sync::mpsc;
use tracing::warn;
use zephyr_types::ServiceFlags;

/// Channel capacity for snapshot messages
pub const SNAPSHOT_CHANNEL_CAPACITY: usize = 256;

/// Events delivered from the connection layer to the snapshot engine
#[derive(Debug, Clone)]
pub enum IncomingSnapshotEvent {
    /// A peer completed the handshake
    PeerConnected {
        /// The new peer
        peer: PeerId,
        /// Services the peer advertised
        services: ServiceFlags,
    },
    /// A peer went away
    PeerDisconnected {
        /// The departed peer
        peer: PeerId,
    },
    /// A decoded snapshot message arrived from a peer
    Message {
        /// Sending peer
        peer: PeerId,
        /// The message
        message: SnapshotMessage,
    },
}

/// A message for the connection layer to deliver to one peer
#[derive(Debug, Clone)]
pub struct OutgoingSnapshotMessage {
    /// Target peer
    pub target: PeerId,
    /// The message to send
    pub message: SnapshotMessage,
}

/// Adapter connecting the snapshot engine to the connection layer.
///
/// The engine receives events through this adapter and sends messages out
/// through it without knowing anything about the transport.
pub struct SnapshotNetwork {
    incoming_rx: mpsc::Receiver<IncomingSnapshotEvent>,
    outgoing_tx: mpsc::Sender<OutgoingSnapshotMessage>,
}

impl SnapshotNetwork {
    /// Create a new adapter with connected channel ends.
    ///
    /// Returns the adapter plus the ends the connection layer keeps: a
    /// sender for incoming events and a receiver for outgoing messages.
    #[allow(clippy::type_complexity)]
    pub fn new() -> (
        Self,
        mpsc::Sender<IncomingSnapshotEvent>,
        mpsc::Receiver<OutgoingSnapshotMessage>,
    ) {
        let (incoming_tx, incoming_rx) = mpsc::channel(SNAPSHOT_CHANNEL_CAPACITY);
        let (outgoing_tx, outgoing_rx) = mpsc::channel(SNAPSHOT_CHANNEL_CAPACITY);

        let adapter = Self {
            incoming_rx,
            outgoing_tx,
        };

        (adapter, incoming_tx, outgoing_rx)
    }

    /// Receive the next incoming event (async)
    pub async fn recv(&mut self) -> Option<IncomingSnapshotEvent> {
        self.incoming_rx.recv().await
    }

    /// Receive an event without blocking
    pub fn try_recv(&mut self) -> Option<IncomingSnapshotEvent> {
        self.incoming_rx.try_recv().ok()
    }

    /// Send a message to a specific peer
    pub async fn send(&self, target: PeerId, message: SnapshotMessage) {
        let outgoing = OutgoingSnapshotMessage { target, message };
        if self.outgoing_tx.send(outgoing).await.is_err() {
            warn!("failed to send snapshot message, channel closed");
        }
    }
}

/// Handle for the connection layer to push events into the engine
#[derive(Clone)]
pub struct SnapshotNetworkSender {
    tx: mpsc::Sender<IncomingSnapshotEvent>,
}

impl SnapshotNetworkSender {
    /// Create from the sender channel end
    pub fn new(tx: mpsc::Sender<IncomingSnapshotEvent>) -> Self {
        Self { tx }
    }

    /// Announce a newly connected peer and its services
    pub async fn peer_connected(&self, peer: PeerId, services: ServiceFlags) {
        self.forward(IncomingSnapshotEvent::PeerConnected { peer, services })
            .await;
    }

    /// Announce a disconnected peer
    pub async fn peer_disconnected(&self, peer: PeerId) {
        self.forward(IncomingSnapshotEvent::PeerDisconnected { peer })
            .await;
    }

    /// Forward a decoded snapshot message from a peer
    pub async fn message(&self, peer: PeerId, message: SnapshotMessage) {
        self.forward(IncomingSnapshotEvent::Message { peer, message })
            .await;
    }

    async fn forward(&self, event: IncomingSnapshotEvent) {
        if self.tx.send(event).await.is_err() {
            warn!("failed to forward snapshot event, receiver dropped");
        }
    }
}
