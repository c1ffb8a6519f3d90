//! Load-with-retry
//!
//! Turns a [`TrackRef`] into a prepared resource, retrying transient failures
//! a bounded number of times. Every attempt releases the resource left by the
//! previous failed attempt before allocating a new one, and every result is
//! checked against the session's live generation before it is surfaced.

use crate::backend::{MediaBackend, MediaResource, ResourceNotifier, Signal};
use crate::error::MediaError;
use crate::types::RetryConfig;
use sama_core::TrackRef;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Ties one load to the generation that started it
///
/// The session bumps `live` and cancels `token` whenever a newer load
/// supersedes this one.
#[derive(Debug, Clone)]
pub struct LoadGate {
    generation: u64,
    live: Arc<AtomicU64>,
    token: CancellationToken,
}

impl LoadGate {
    pub fn new(generation: u64, live: Arc<AtomicU64>, token: CancellationToken) -> Self {
        Self {
            generation,
            live,
            token,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Still the load the session is waiting for
    pub fn is_current(&self) -> bool {
        !self.token.is_cancelled() && self.live.load(Ordering::Acquire) == self.generation
    }

    async fn superseded(&self) {
        self.token.cancelled().await;
    }
}

/// Result of a load sequence
#[derive(Debug)]
pub enum LoadOutcome<R> {
    /// Resource prepared and still wanted
    Loaded {
        resource: R,
        duration: Option<Duration>,
        /// Failed attempts before the successful one
        retries: u32,
    },

    /// Every attempt failed
    Failed { attempts: u32, error: MediaError },

    /// A newer load took over; nothing to surface
    Cancelled,
}

/// Bounded retry around [`MediaBackend::allocate`] + [`MediaResource::prepare`]
#[derive(Debug, Clone)]
pub struct LoadRetryPolicy {
    config: RetryConfig,
}

impl LoadRetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }

    /// Run the attempt sequence for `track`
    ///
    /// `signals` receives a `Retrying` notice after each failed attempt that
    /// will be retried, and is the channel handed to every allocated
    /// resource's notifier.
    pub(crate) async fn attempt_load<B: MediaBackend>(
        &self,
        backend: &B,
        track: &TrackRef,
        gate: &LoadGate,
        signals: &mpsc::UnboundedSender<Signal>,
    ) -> LoadOutcome<B::Resource> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut leftover: Option<B::Resource> = None;
        let mut last_error = MediaError::Load("no attempt made".to_string());

        for attempt in 1..=max_attempts {
            if let Some(failed) = leftover.take() {
                failed.release();
            }
            if !gate.is_current() {
                return LoadOutcome::Cancelled;
            }

            let notifier = ResourceNotifier::new(gate.generation(), signals.clone());
            match backend.allocate(track, notifier) {
                Ok(mut resource) => {
                    let prepared = tokio::select! {
                        biased;
                        () = gate.superseded() => None,
                        result = self.prepare(&mut resource) => Some(result),
                    };

                    let Some(prepared) = prepared else {
                        debug!(track_id = %track.id(), generation = gate.generation(), "Load superseded mid-attempt");
                        resource.release();
                        return LoadOutcome::Cancelled;
                    };
                    if !gate.is_current() {
                        resource.release();
                        return LoadOutcome::Cancelled;
                    }

                    match prepared {
                        Ok(duration) => {
                            return LoadOutcome::Loaded {
                                resource,
                                duration,
                                retries: attempt - 1,
                            };
                        }
                        Err(e) => {
                            leftover = Some(resource);
                            last_error = e;
                        }
                    }
                }
                Err(e) => last_error = e,
            }

            warn!(
                track_id = %track.id(),
                generation = gate.generation(),
                attempt,
                max_attempts,
                error = %last_error,
                "Load attempt failed"
            );

            if attempt < max_attempts {
                let _ = signals.send(Signal::Retrying {
                    generation: gate.generation(),
                    attempt,
                    message: last_error.to_string(),
                });

                let wait = self.config.backoff_for(attempt);
                let superseded = tokio::select! {
                    biased;
                    () = gate.superseded() => true,
                    () = tokio::time::sleep(wait) => false,
                };
                if superseded {
                    if let Some(failed) = leftover.take() {
                        failed.release();
                    }
                    return LoadOutcome::Cancelled;
                }
            }
        }

        if let Some(failed) = leftover.take() {
            failed.release();
        }
        if !gate.is_current() {
            return LoadOutcome::Cancelled;
        }

        LoadOutcome::Failed {
            attempts: max_attempts,
            error: last_error,
        }
    }

    async fn prepare<R: MediaResource>(
        &self,
        resource: &mut R,
    ) -> Result<Option<Duration>, MediaError> {
        match self.config.attempt_timeout() {
            Some(limit) => match tokio::time::timeout(limit, resource.prepare()).await {
                Ok(result) => result,
                Err(_) => Err(MediaError::TimedOut(limit)),
            },
            None => resource.prepare().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulated::{LoadScript, SimulatedBackend};

    fn track() -> TrackRef {
        TrackRef::new("t1", "sim://t1").with_known_duration_ms(60_000)
    }

    fn gate(generation: u64) -> (LoadGate, Arc<AtomicU64>, CancellationToken) {
        let live = Arc::new(AtomicU64::new(generation));
        let token = CancellationToken::new();
        (
            LoadGate::new(generation, live.clone(), token.clone()),
            live,
            token,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_one_failure() {
        let backend = SimulatedBackend::new();
        backend.script("sim://t1", LoadScript::FailTimes(1));
        let policy = LoadRetryPolicy::new(RetryConfig::default());
        let (gate, _live, _token) = gate(1);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let outcome = policy.attempt_load(&backend, &track(), &gate, &tx).await;

        match outcome {
            LoadOutcome::Loaded { retries, .. } => assert_eq!(retries, 1),
            other => panic!("Expected Loaded, got {:?}", other),
        }
        assert!(matches!(
            rx.try_recv().unwrap(),
            Signal::Retrying { attempt: 1, .. }
        ));
        // The failed attempt's resource was released, the winner is still held
        assert_eq!(backend.allocated(), 2);
        assert_eq!(backend.released(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_failure_stops_at_max_attempts() {
        let backend = SimulatedBackend::new();
        backend.script("sim://t1", LoadScript::FailAlways);
        let policy = LoadRetryPolicy::new(RetryConfig::default());
        let (gate, _live, _token) = gate(1);
        let (tx, _rx) = mpsc::unbounded_channel();

        let outcome = policy.attempt_load(&backend, &track(), &gate, &tx).await;

        match outcome {
            LoadOutcome::Failed { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("Expected Failed, got {:?}", other),
        }
        assert_eq!(backend.attempts("sim://t1"), 3);
        assert_eq!(backend.live_resources(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_attempt_times_out() {
        let backend = SimulatedBackend::new();
        backend.script("sim://t1", LoadScript::Hang);
        let policy = LoadRetryPolicy::new(RetryConfig {
            max_attempts: 1,
            attempt_timeout_ms: Some(2_000),
            ..RetryConfig::default()
        });
        let (gate, _live, _token) = gate(1);
        let (tx, _rx) = mpsc::unbounded_channel();

        let outcome = policy.attempt_load(&backend, &track(), &gate, &tx).await;

        match outcome {
            LoadOutcome::Failed { error, .. } => {
                assert_eq!(error, MediaError::TimedOut(Duration::from_secs(2)));
            }
            other => panic!("Expected Failed, got {:?}", other),
        }
        assert_eq!(backend.live_resources(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_gate_discards_success() {
        let backend = SimulatedBackend::new();
        let policy = LoadRetryPolicy::new(RetryConfig::default());
        let (gate, live, _token) = gate(1);
        let (tx, _rx) = mpsc::unbounded_channel();

        // A newer load bumped the generation before this one started
        live.store(2, Ordering::Release);
        let outcome = policy.attempt_load(&backend, &track(), &gate, &tx).await;

        assert!(matches!(outcome, LoadOutcome::Cancelled));
        assert_eq!(backend.live_resources(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_during_prepare_releases_resource() {
        let backend = SimulatedBackend::new();
        backend.script("sim://t1", LoadScript::Hang);
        let policy = LoadRetryPolicy::new(RetryConfig::default());
        let (gate, _live, token) = gate(1);
        let (tx, _rx) = mpsc::unbounded_channel();

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            token.cancel();
        });
        let outcome = policy.attempt_load(&backend, &track(), &gate, &tx).await;
        canceller.await.unwrap();

        assert!(matches!(outcome, LoadOutcome::Cancelled));
        assert_eq!(backend.allocated(), 1);
        assert_eq!(backend.released(), 1);
    }
}
