//! In-memory transport implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use protocol::Event;
use tokio::sync::RwLock;
use tokio::sync::mpsc;

use crate::transport::{MessageTransport, TransportError};

#[derive(Default)]
struct ChannelState {
    /// Wire-encoded events in publish order.
    log: Vec<String>,
    subscribers: Vec<mpsc::UnboundedSender<Event>>,
}

/// In-memory pub/sub transport for tests and the demo runner.
///
/// Events cross the "wire" as their JSON form, so everything a subscriber
/// sees has been through a real encode/decode round trip, the same way it
/// would through a broker.
#[derive(Clone, Default)]
pub struct InMemoryTransport {
    channels: Arc<RwLock<HashMap<String, ChannelState>>>,
}

impl InMemoryTransport {
    /// Creates a new transport with no channels.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to a channel, receiving every event published after this
    /// call.
    pub async fn subscribe(&self, channel: &str) -> mpsc::UnboundedReceiver<Event> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut channels = self.channels.write().await;
        channels.entry(channel.to_string()).or_default().subscribers.push(tx);
        rx
    }

    /// Returns every event published to a channel so far, decoded.
    pub async fn published(&self, channel: &str) -> Vec<Event> {
        let channels = self.channels.read().await;
        channels
            .get(channel)
            .map(|state| {
                state
                    .log
                    .iter()
                    .map(|wire| Event::from_wire(wire).expect("log holds valid wire events"))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns the number of events published to a channel.
    pub async fn published_count(&self, channel: &str) -> usize {
        let channels = self.channels.read().await;
        channels.get(channel).map(|state| state.log.len()).unwrap_or(0)
    }
}

#[async_trait]
impl MessageTransport for InMemoryTransport {
    async fn publish(&self, channel: &str, event: &Event) -> Result<(), TransportError> {
        let wire = event.to_wire()?;
        let delivered = Event::from_wire(&wire)?;

        let mut channels = self.channels.write().await;
        let state = channels.entry(channel.to_string()).or_default();
        state.log.push(wire);
        state.subscribers.retain(|tx| tx.send(delivered.clone()).is_ok());
        Ok(())
    }
}
