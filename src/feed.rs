use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::model::Event;

const CHANNEL_CAPACITY: usize = 256;

/// Channel a schedule change is published on, by entry kind.
fn channel_for(event: &Event) -> &'static str {
    match event {
        Event::BookingCreated { .. } | Event::BookingCancelled { .. } => "bookings",
        Event::MaintenanceScheduled { .. } | Event::MaintenanceCancelled { .. } => "maintenance",
    }
}

/// Broadcast hub for LISTEN channels on one aircraft schedule. Every
/// committed event is published to its kind channel and to the catch-all
/// `schedule` channel.
pub struct ChangeFeed {
    channels: DashMap<String, broadcast::Sender<Event>>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeFeed {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    pub fn is_known_channel(name: &str) -> bool {
        matches!(name, "schedule" | "bookings" | "maintenance")
    }

    /// Subscribe to a channel. Creates the channel if needed.
    pub fn subscribe(&self, channel: &str) -> broadcast::Receiver<Event> {
        let sender = self
            .channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        sender.subscribe()
    }

    /// Publish a committed event. No-op if nobody is listening.
    pub fn publish(&self, event: &Event) {
        for name in [channel_for(event), "schedule"] {
            if let Some(sender) = self.channels.get(name) {
                let _ = sender.send(event.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Interval;
    use ulid::Ulid;

    fn cancelled() -> Event {
        Event::BookingCancelled { id: Ulid::new() }
    }

    #[tokio::test]
    async fn subscribe_and_receive() {
        let feed = ChangeFeed::new();
        let mut rx = feed.subscribe("bookings");

        let event = cancelled();
        feed.publish(&event);

        assert_eq!(rx.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn catch_all_channel_sees_everything() {
        let feed = ChangeFeed::new();
        let mut rx = feed.subscribe("schedule");

        feed.publish(&cancelled());
        feed.publish(&Event::MaintenanceScheduled {
            id: Ulid::new(),
            range: Interval::new(0, 1000),
            description: "annual".into(),
        });

        assert!(rx.recv().await.is_ok());
        assert!(rx.recv().await.is_ok());
    }

    #[tokio::test]
    async fn kind_channels_are_disjoint() {
        let feed = ChangeFeed::new();
        let mut rx = feed.subscribe("maintenance");

        feed.publish(&cancelled());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_noop() {
        let feed = ChangeFeed::new();
        feed.publish(&cancelled());
    }
}
