//! Event sink
//!
//! Broadcast channel carrying stamped game events to front-end subscribers.
//! Fire-and-forget: a send with no receivers (or a lagging receiver) never
//! stalls the engine.

use chrono::Utc;
use tokio::sync::broadcast;

use delver_domain::{EventStamp, GameEvent, StampedEvent, SystemLevel};

const CHANNEL_CAPACITY: usize = 256;

/// Emits stamped events to any number of subscribers
pub struct EventBus {
    sender: broadcast::Sender<StampedEvent>,
    seq: u64,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender, seq: 0 }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StampedEvent> {
        self.sender.subscribe()
    }

    /// Emit an event. Returns the stamp it was sent with.
    pub fn emit(&mut self, event: GameEvent) -> EventStamp {
        self.seq += 1;
        let stamp = EventStamp {
            seq: self.seq,
            at: Utc::now(),
        };
        // No receivers is fine; subscribers are best-effort
        let _ = self.sender.send(StampedEvent {
            stamp,
            event,
        });
        stamp
    }

    pub fn narrative(&mut self, text: impl Into<String>) {
        self.emit(GameEvent::narrative(text));
    }

    pub fn system(&mut self, level: SystemLevel, message: impl Into<String>) {
        self.emit(GameEvent::system(level, message));
    }

    pub fn combat(&mut self, text: impl Into<String>) {
        self.emit(GameEvent::combat(text));
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

    #[tokio::test]
    async fn test_events_arrive_in_order_with_monotonic_stamps() {
        let mut bus = EventBus::new();
        let mut rx = bus.subscribe();
        bus.narrative("first");
        bus.narrative("second");

        let a = rx.recv().await.expect("event");
        let b = rx.recv().await.expect("event");
        assert!(a.stamp.seq < b.stamp.seq);
        assert_eq!(a.event, GameEvent::narrative("first"));
    }

    #[test]
    fn test_emit_without_subscribers_does_not_block() {
        let mut bus = EventBus::new();
        for _ in 0..1000 {
            bus.narrative("shouting into the void");
        }
        assert!(bus.seq >= 1000);
    }
}
