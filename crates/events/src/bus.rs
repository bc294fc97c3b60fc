//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`PromptEventBus`] fans out [`PromptEvent`]s to any number of listeners
//! (persistence, undo history, preview renderers). It is designed to be
//! shared via `Arc<PromptEventBus>`. [`BusOwner`] lets a
//! [`Reconciler`](promptline_core::Reconciler) publish onto it directly.

use std::sync::Arc;

use promptline_core::{CommitMessage, PromptOwner};
use serde::Serialize;
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// PromptEvent
// ---------------------------------------------------------------------------

/// A notification emitted by an editing session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PromptEvent {
    /// A completed operation produced a new prompt set.
    Committed { message: CommitMessage },
    /// The staged set started or stopped differing from the committed one.
    DirtyChanged { dirty: bool },
}

// ---------------------------------------------------------------------------
// PromptEventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 256;

/// In-process fan-out bus for [`PromptEvent`]s.
///
/// ```rust
/// use promptline_events::bus::{PromptEvent, PromptEventBus};
///
/// let bus = PromptEventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(PromptEvent::DirtyChanged { dirty: true });
/// ```
pub struct PromptEventBus {
    sender: broadcast::Sender<PromptEvent>,
}

impl PromptEventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full the oldest unread events are dropped and slow
    /// receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// Events published with no subscribers are dropped.
    pub fn publish(&self, event: PromptEvent) {
        // A send error only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PromptEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for PromptEventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// BusOwner
// ---------------------------------------------------------------------------

/// Reconciler owner that forwards every notification onto a shared bus.
#[derive(Clone)]
pub struct BusOwner {
    bus: Arc<PromptEventBus>,
}

impl BusOwner {
    pub fn new(bus: Arc<PromptEventBus>) -> Self {
        Self { bus }
    }

    pub fn bus(&self) -> &Arc<PromptEventBus> {
        &self.bus
    }
}

impl PromptOwner for BusOwner {
    fn commit(&mut self, message: CommitMessage) {
        tracing::debug!(
            origin = ?message.origin,
            prompts = message.prompts.prompt_list.len(),
            "Publishing prompt commit"
        );
        self.bus.publish(PromptEvent::Committed { message });
    }

    fn mark_dirty(&mut self, dirty: bool) {
        self.bus.publish(PromptEvent::DirtyChanged { dirty });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use promptline_core::{Origin, PromptSet};

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = PromptEventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(PromptEvent::DirtyChanged { dirty: true });

        let e1 = rx1.recv().await.expect("subscriber 1 should receive");
        let e2 = rx2.recv().await.expect("subscriber 2 should receive");
        assert_eq!(e1, PromptEvent::DirtyChanged { dirty: true });
        assert_eq!(e1, e2);
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = PromptEventBus::default();
        bus.publish(PromptEvent::DirtyChanged { dirty: false });
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn owner_publishes_commits() {
        let bus = Arc::new(PromptEventBus::default());
        let mut rx = bus.subscribe();
        let mut owner = BusOwner::new(Arc::clone(&bus));

        owner.commit(CommitMessage::internal(PromptSet::default_for(10)));

        let event = rx.recv().await.expect("should receive the commit");
        assert_matches!(
            event,
            PromptEvent::Committed { message } if message.origin == Origin::Internal
        );
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let json = serde_json::to_value(PromptEvent::DirtyChanged { dirty: true }).unwrap();
        assert_eq!(json["type"], "dirty_changed");
        assert_eq!(json["dirty"], true);
    }
}
