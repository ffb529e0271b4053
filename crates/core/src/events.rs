//! Event System
//!
//! Provides a pub/sub event bus so tools can watch resolutions progress
//! through their states without touching the resolver itself.

use parking_lot::RwLock;
use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::debug;
use uuid::Uuid;

use crate::context::ResolutionState;
use crate::warning::Warning;

/// Events emitted while resolving a build plan
#[derive(Debug, Clone, PartialEq)]
pub enum ResolutionEvent {
    /// Resolution of a variant started
    Started { context_id: Uuid, variant: String },
    /// State machine transition
    StateChanged {
        context_id: Uuid,
        from: ResolutionState,
        to: ResolutionState,
    },
    /// A soft warning was recorded
    WarningRaised { context_id: Uuid, warning: Warning },
    /// Resolution finished with a descriptor
    Completed { context_id: Uuid, variant: String },
    /// Resolution aborted with a hard error
    Failed { context_id: Uuid, error_kind: String },
}

/// Subscriber handle for receiving events
#[derive(Clone)]
pub struct EventSubscription {
    receiver: Receiver<ResolutionEvent>,
}

impl EventSubscription {
    /// Try to receive an event (non-blocking)
    pub fn try_recv(&self) -> Result<ResolutionEvent, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Drain every event that is already queued
    pub fn drain(&self) -> Vec<ResolutionEvent> {
        self.receiver.try_iter().collect()
    }
}

/// Event bus for publish/subscribe pattern
pub struct EventBus {
    subscribers: RwLock<Vec<Sender<ResolutionEvent>>>,
}

impl EventBus {
    /// Create a new event bus
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
        }
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> EventSubscription {
        let (sender, receiver) = unbounded();
        self.subscribers.write().push(sender);
        EventSubscription { receiver }
    }

    /// Emit an event to all subscribers.
    ///
    /// Subscribers whose receiving side has been dropped are removed.
    pub fn emit(&self, event: ResolutionEvent) -> usize {
        let mut subscribers = self.subscribers.write();
        subscribers.retain(|sender| sender.send(event.clone()).is_ok());
        let delivered = subscribers.len();

        debug!("Event {:?} delivered to {} subscribers", event, delivered);
        delivered
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dropped_subscriber_is_removed() {
        let bus = EventBus::new();
        let kept = bus.subscribe();
        drop(bus.subscribe());

        let delivered = bus.emit(ResolutionEvent::Started {
            context_id: Uuid::nil(),
            variant: "debug".into(),
        });
        assert_eq!(delivered, 1);
        assert_eq!(bus.subscriber_count(), 1);
        assert!(kept.try_recv().is_ok());
    }

    #[test]
    fn test_event_bus() {
        let bus = EventBus::new();
        let sub1 = bus.subscribe();
        let sub2 = bus.subscribe();

        assert_eq!(bus.subscriber_count(), 2);

        let event = ResolutionEvent::Completed {
            context_id: Uuid::nil(),
            variant: "release".into(),
        };
        let delivered = bus.emit(event.clone());
        assert_eq!(delivered, 2);

        assert_eq!(sub1.try_recv().unwrap(), event);
        assert_eq!(sub2.drain(), vec![event]);
    }
}
