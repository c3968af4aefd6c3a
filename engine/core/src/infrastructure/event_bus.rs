// Event Bus - Pub/Sub for Marketplace Lifecycle Events
//
// In-memory event streaming using tokio broadcast channels. The
// notification, referral and reward subsystems subscribe here; the engine
// publishes and moves on. Publishing never blocks and never fails the
// state transition that produced the event.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::domain::events::MarketplaceEvent;
use crate::domain::SellerId;

#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<MarketplaceEvent>>,
}

impl EventBus {
    /// Create a new event bus. Capacity bounds how many events are buffered
    /// per subscriber before old ones are dropped.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(1000)
    }

    /// Publish an event to all subscribers. Fire-and-forget: an event with
    /// no listeners is simply dropped.
    pub fn publish(&self, event: MarketplaceEvent) {
        debug!("publishing event: {:?}", event);

        let receiver_count = self.sender.send(event).unwrap_or(0);
        if receiver_count == 0 {
            debug!("no subscribers listening to event");
        }
    }

    /// Subscribe to all lifecycle events.
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    /// Subscribe to events targeting one seller, for per-user notification
    /// feeds.
    pub fn subscribe_seller(&self, seller: SellerId) -> SellerEventReceiver {
        SellerEventReceiver {
            receiver: self.sender.subscribe(),
            seller,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

pub struct EventReceiver {
    receiver: broadcast::Receiver<MarketplaceEvent>,
}

impl EventReceiver {
    pub async fn recv(&mut self) -> Result<MarketplaceEvent, EventBusError> {
        self.receiver.recv().await.map_err(|e| match e {
            broadcast::error::RecvError::Closed => EventBusError::Closed,
            broadcast::error::RecvError::Lagged(n) => {
                warn!("event receiver lagged by {} events", n);
                EventBusError::Lagged(n)
            }
        })
    }

    pub fn try_recv(&mut self) -> Result<MarketplaceEvent, EventBusError> {
        self.receiver.try_recv().map_err(|e| match e {
            broadcast::error::TryRecvError::Empty => EventBusError::Empty,
            broadcast::error::TryRecvError::Closed => EventBusError::Closed,
            broadcast::error::TryRecvError::Lagged(n) => {
                warn!("event receiver lagged by {} events", n);
                EventBusError::Lagged(n)
            }
        })
    }

    /// Unwrap the raw broadcast receiver, for stream adapters (SSE).
    pub fn into_inner(self) -> broadcast::Receiver<MarketplaceEvent> {
        self.receiver
    }
}

/// Receiver filtered to events that target one seller.
pub struct SellerEventReceiver {
    receiver: broadcast::Receiver<MarketplaceEvent>,
    seller: SellerId,
}

impl SellerEventReceiver {
    pub async fn recv(&mut self) -> Result<MarketplaceEvent, EventBusError> {
        loop {
            let event = self.receiver.recv().await.map_err(|e| match e {
                broadcast::error::RecvError::Closed => EventBusError::Closed,
                broadcast::error::RecvError::Lagged(n) => {
                    warn!("event receiver lagged by {} events", n);
                    EventBusError::Lagged(n)
                }
            })?;

            if event.target_seller() == Some(self.seller) {
                return Ok(event);
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("event bus is closed")]
    Closed,

    #[error("no events available")]
    Empty,

    #[error("receiver lagged by {0} events (events were dropped)")]
    Lagged(u64),
}
