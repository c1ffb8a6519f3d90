//! Session Events
//!
//! Event feed for UI synchronization. Events are delivered to every
//! subscriber in the order the session produced them:
//! - Status changes (loading, playing, paused, ...)
//! - Track changes (a new load began)
//! - Progress samples (once per tick while playing, and after seeks)
//! - Buffering changes, load retries and faults

use crate::error::PlaybackFault;
use crate::types::SessionStatus;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Events emitted by a playback session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionEvent {
    /// Status changed
    #[serde(rename_all = "camelCase")]
    StatusChanged {
        status: SessionStatus,
        /// Track the status refers to, if any
        track_id: Option<String>,
    },

    /// A new track began loading
    #[serde(rename_all = "camelCase")]
    TrackChanged {
        track_id: String,
        previous_track_id: Option<String>,
    },

    /// Position sample
    #[serde(rename_all = "camelCase")]
    Progress {
        position_ms: u64,
        duration_ms: u64,
        progress: f64,
    },

    /// Buffering started or ended; independent of `status`
    #[serde(rename_all = "camelCase")]
    Buffering { is_buffering: bool },

    /// A load attempt failed and another one is scheduled
    #[serde(rename_all = "camelCase")]
    LoadRetry {
        track_id: String,
        /// Failed attempts so far
        attempt: u32,
        max_attempts: u32,
        message: String,
    },

    /// Position set by the user
    #[serde(rename_all = "camelCase")]
    Seeked { position_ms: u64 },

    /// Something failed; see [`PlaybackFault::is_fatal_for_track`]
    Fault { fault: PlaybackFault },

    /// The installed playlist changed
    #[serde(rename_all = "camelCase")]
    PlaylistChanged { length: usize, current_index: usize },
}

/// Broadcast fan-out of session events
///
/// Publishing never blocks; a subscriber that falls more than the configured
/// capacity behind receives `RecvError::Lagged` and continues from there.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish to current subscribers
    pub fn publish(&self, event: SessionEvent) {
        // No subscribers is not an error
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_arrive_in_publish_order() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();

        bus.publish(SessionEvent::StatusChanged {
            status: SessionStatus::Loading,
            track_id: Some("t1".into()),
        });
        bus.publish(SessionEvent::Seeked { position_ms: 10 });

        assert!(matches!(
            rx.try_recv().unwrap(),
            SessionEvent::StatusChanged {
                status: SessionStatus::Loading,
                ..
            }
        ));
        assert_eq!(rx.try_recv().unwrap(), SessionEvent::Seeked { position_ms: 10 });
    }

    #[test]
    fn publish_without_subscribers_is_silent() {
        let bus = EventBus::new(4);
        bus.publish(SessionEvent::Buffering { is_buffering: true });
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn event_wire_format() {
        let json = serde_json::to_value(SessionEvent::Progress {
            position_ms: 500,
            duration_ms: 1000,
            progress: 0.5,
        })
        .unwrap();

        assert_eq!(json["type"], "progress");
        assert_eq!(json["positionMs"], 500);
        assert_eq!(json["progress"], 0.5);
    }
}
