//! Messaging transport port.

use async_trait::async_trait;
use protocol::Event;
use thiserror::Error;

/// Errors that can occur when publishing an event.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The channel is gone (broker shut down, connection lost).
    #[error("Channel '{0}' is closed")]
    ChannelClosed(String),

    /// The event could not be encoded to its wire form.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Publish side of the messaging channel abstraction.
///
/// Delivery semantics assumed from the broker: at-least-once, no ordering
/// guarantee across channels and none between duplicate redeliveries.
/// Concrete channel names and the routing table are orchestrator
/// configuration; participants only know the one channel they emit to.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    /// Publishes an event to a channel.
    async fn publish(&self, channel: &str, event: &Event) -> Result<(), TransportError>;
}
