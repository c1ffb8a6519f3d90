//! Platform media primitive traits
//!
//! Abstracts the component that actually fetches and renders audio, so the
//! session works unchanged against a native player, a browser element or the
//! [`SimulatedBackend`](crate::simulated::SimulatedBackend).

use crate::error::MediaError;
use async_trait::async_trait;
use sama_core::TrackRef;
use std::time::Duration;
use tokio::sync::mpsc;

/// Factory for playable resources
///
/// `allocate` creates the platform object; it is cheap and synchronous. The
/// expensive part (network, buffering, probing) happens in
/// [`MediaResource::prepare`]. A resource that failed to prepare still exists
/// and must be released by its owner.
pub trait MediaBackend: Send + Sync + 'static {
    type Resource: MediaResource;

    /// Bring up the audio subsystem
    ///
    /// Called once per session. An error disables playback for the lifetime
    /// of that session.
    fn initialize(&self) -> Result<(), MediaError> {
        Ok(())
    }

    /// Create a resource for `track`
    ///
    /// `notifier` is how the resource reports completion or breakage back to
    /// the session that owns it.
    fn allocate(
        &self,
        track: &TrackRef,
        notifier: ResourceNotifier,
    ) -> Result<Self::Resource, MediaError>;
}

/// A single loaded (or loading) audio resource
///
/// Control calls are synchronous and fire-and-forget: they return as soon as
/// the primitive accepted the request.
#[async_trait]
pub trait MediaResource: Send + 'static {
    /// Fetch enough of the stream to start playback
    ///
    /// Returns the duration when the primitive knows it.
    async fn prepare(&mut self) -> Result<Option<Duration>, MediaError>;

    /// Start or resume output
    fn play(&mut self) -> Result<(), MediaError>;

    /// Stop output, keeping position
    fn pause(&mut self) -> Result<(), MediaError>;

    /// Move the playhead
    fn seek(&mut self, position: Duration) -> Result<(), MediaError>;

    /// Current playhead
    fn position(&self) -> Duration;

    /// Total duration, when known
    fn duration(&self) -> Option<Duration>;

    /// Whether output is stalled waiting for data
    fn is_buffering(&self) -> bool {
        false
    }

    /// Free the platform object
    fn release(self);
}

/// Signals flowing back into the session from resources and timers
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Signal {
    /// Progress timer fired
    Tick { epoch: u64 },

    /// Resource reached its end
    Finished { generation: u64 },

    /// Resource broke and must be torn down
    Unusable { generation: u64, message: String },

    /// A load attempt failed and another is scheduled
    Retrying {
        generation: u64,
        attempt: u32,
        message: String,
    },
}

/// Callback handle given to each resource
///
/// Tagged with the load generation the resource belongs to; the session
/// ignores notifications from superseded generations.
#[derive(Debug, Clone)]
pub struct ResourceNotifier {
    generation: u64,
    tx: mpsc::UnboundedSender<Signal>,
}

impl ResourceNotifier {
    pub(crate) fn new(generation: u64, tx: mpsc::UnboundedSender<Signal>) -> Self {
        Self { generation, tx }
    }

    /// A notifier connected to nothing, for exercising backends in isolation
    pub fn detached() -> Self {
        let (tx, _rx) = mpsc::unbounded_channel();
        Self { generation: 0, tx }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Report natural end of playback
    pub fn finished(&self) {
        let _ = self.tx.send(Signal::Finished {
            generation: self.generation,
        });
    }

    /// Report that the resource can no longer play
    pub fn unusable(&self, message: impl Into<String>) {
        let _ = self.tx.send(Signal::Unusable {
            generation: self.generation,
            message: message.into(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notifier_tags_generation() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let notifier = ResourceNotifier::new(7, tx);

        notifier.finished();
        notifier.unusable("gone");

        assert_eq!(rx.try_recv().unwrap(), Signal::Finished { generation: 7 });
        assert_eq!(
            rx.try_recv().unwrap(),
            Signal::Unusable {
                generation: 7,
                message: "gone".into()
            }
        );
    }

    #[test]
    fn detached_notifier_does_not_panic() {
        let notifier = ResourceNotifier::detached();
        notifier.finished();
        assert_eq!(notifier.generation(), 0);
    }
}
