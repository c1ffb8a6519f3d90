//! Playback session - the controller state machine
//!
//! Owns at most one live media resource, composes [`LoadRetryPolicy`] and
//! [`ProgressTicker`], and exposes the command surface.
//!
//! Commands are synchronous with respect to state: they update `status` and
//! friends before returning and hand long-running work (loading) to a
//! spawned task. Results of that work come back as reports and signals which
//! are applied by [`PlaybackSession::pump`] (or by the task behind a
//! [`SessionHandle`](crate::handle::SessionHandle)). Every report is tagged
//! with the load generation that produced it and is discarded when a newer
//! load has started since.
//!
//! Commands must be called from within a tokio runtime.

use crate::backend::{MediaBackend, MediaResource, Signal};
use crate::error::{MediaError, PlaybackFault, Result, SessionError};
use crate::events::{EventBus, SessionEvent};
use crate::retry::{LoadGate, LoadOutcome, LoadRetryPolicy};
use crate::ticker::{ProgressSample, ProgressTicker};
use crate::types::{SessionConfig, SessionSnapshot, SessionStatus};
use sama_core::{Playlist, TrackRef};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Result of one load task, tagged with the generation that started it
pub(crate) struct LoadReport<R> {
    generation: u64,
    outcome: LoadOutcome<R>,
}

/// Clamp a requested seek target into `[0, duration_ms]`
///
/// With an unknown (zero) duration every target clamps to 0.
pub fn clamp_seek(target_ms: i64, duration_ms: u64) -> u64 {
    u64::try_from(target_ms).unwrap_or(0).min(duration_ms)
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Stateful controller owning the single active audio resource
pub struct PlaybackSession<B: MediaBackend> {
    backend: Arc<B>,
    config: SessionConfig,
    policy: LoadRetryPolicy,

    status: SessionStatus,
    active_track: Option<TrackRef>,
    position_ms: u64,
    duration_ms: u64,
    retry_count: u32,
    last_error: Option<PlaybackFault>,
    is_buffering: bool,

    /// Exclusively owned; never handed out
    resource: Option<B::Resource>,

    generation: u64,
    live_generation: Arc<AtomicU64>,
    load_cancel: Option<CancellationToken>,

    playlist: Option<Playlist>,
    ticker: ProgressTicker,

    signal_tx: mpsc::UnboundedSender<Signal>,
    signal_rx: mpsc::UnboundedReceiver<Signal>,
    load_tx: mpsc::UnboundedSender<LoadReport<B::Resource>>,
    load_rx: mpsc::UnboundedReceiver<LoadReport<B::Resource>>,

    events: EventBus,
    state_tx: watch::Sender<SessionSnapshot>,

    /// Set when backend initialisation failed
    unavailable: Option<String>,
}

impl<B: MediaBackend> PlaybackSession<B> {
    /// Create a session over `backend`
    ///
    /// Initialises the backend once. If that fails the session is still
    /// returned, but it is permanently disabled: every command returns
    /// [`SessionError::PlaybackUnavailable`].
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `config` does not validate.
    pub fn new(backend: B, config: SessionConfig) -> Result<Self> {
        config.validate()?;

        let unavailable = match backend.initialize() {
            Ok(()) => None,
            Err(e) => {
                error!(error = %e, "Audio subsystem failed to initialise; playback disabled");
                Some(e.to_string())
            }
        };

        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let (load_tx, load_rx) = mpsc::unbounded_channel();
        let (state_tx, _) = watch::channel(SessionSnapshot {
            unavailable: unavailable.clone(),
            ..SessionSnapshot::default()
        });

        Ok(Self {
            backend: Arc::new(backend),
            policy: LoadRetryPolicy::new(config.retry.clone()),
            ticker: ProgressTicker::new(config.tick_interval()),
            events: EventBus::new(config.event_capacity),
            config,
            status: SessionStatus::Idle,
            active_track: None,
            position_ms: 0,
            duration_ms: 0,
            retry_count: 0,
            last_error: None,
            is_buffering: false,
            resource: None,
            generation: 0,
            live_generation: Arc::new(AtomicU64::new(0)),
            load_cancel: None,
            playlist: None,
            signal_tx,
            signal_rx,
            load_tx,
            load_rx,
            state_tx,
            unavailable,
        })
    }

    // ===== Accessors =====

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn active_track(&self) -> Option<&TrackRef> {
        self.active_track.as_ref()
    }

    pub fn position_ms(&self) -> u64 {
        self.position_ms
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn last_error(&self) -> Option<&PlaybackFault> {
        self.last_error.as_ref()
    }

    pub fn is_buffering(&self) -> bool {
        self.is_buffering
    }

    pub fn playlist(&self) -> Option<&Playlist> {
        self.playlist.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Whether playback is disabled for this session's lifetime
    pub fn is_unavailable(&self) -> bool {
        self.unavailable.is_some()
    }

    pub fn has_next(&self) -> bool {
        self.playlist.as_ref().is_some_and(Playlist::has_next)
    }

    pub fn has_previous(&self) -> bool {
        self.playlist.as_ref().is_some_and(Playlist::has_previous)
    }

    /// Current state as one value
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            status: self.status,
            active_track: self.active_track.clone(),
            position_ms: self.position_ms,
            duration_ms: self.duration_ms,
            progress: ProgressSample::new(self.position_ms, self.duration_ms).progress,
            retry_count: self.retry_count,
            last_error: self.last_error.clone(),
            is_buffering: self.is_buffering,
            generation: self.generation,
            unavailable: self.unavailable.clone(),
        }
    }

    /// Subscribe to the event feed
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Watch the latest snapshot
    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.state_tx.subscribe()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    // ===== Commands =====

    /// Load and auto-play a single track
    ///
    /// Valid from any status. Installs a one-item playlist and supersedes
    /// whatever was loading or playing.
    pub fn load_track(&mut self, track: TrackRef) -> Result<()> {
        self.ensure_available()?;
        self.playlist = Some(Playlist::single(track.clone()));
        self.publish_playlist();
        self.begin_load(track);
        Ok(())
    }

    /// Install `playlist` and load its current item
    pub fn play_playlist(&mut self, playlist: Playlist) -> Result<()> {
        self.ensure_available()?;
        let track = playlist.current().clone();
        self.playlist = Some(playlist);
        self.publish_playlist();
        self.begin_load(track);
        Ok(())
    }

    /// Jump to `index` in the installed playlist and load it
    pub fn select(&mut self, index: usize) -> Result<TrackRef> {
        self.ensure_available()?;
        let playlist = self.playlist.as_mut().ok_or(SessionError::NoActiveTrack)?;
        let track = playlist.select(index)?.clone();
        self.publish_playlist();
        self.begin_load(track.clone());
        Ok(track)
    }

    /// Start or resume playback
    ///
    /// Valid from Ready and Paused; a no-op while Playing.
    pub fn play(&mut self) -> Result<()> {
        self.ensure_available()?;
        match self.status {
            SessionStatus::Playing => Ok(()),
            SessionStatus::Ready | SessionStatus::Paused => {
                self.control("play", MediaResource::play)?;
                self.set_status(SessionStatus::Playing);
                self.ticker.start(&self.signal_tx);
                Ok(())
            }
            status => Err(self.reject("play", status)),
        }
    }

    /// Pause playback, keeping the resource and its position
    pub fn pause(&mut self) -> Result<()> {
        self.ensure_available()?;
        match self.status {
            SessionStatus::Playing => {
                self.control("pause", MediaResource::pause)?;
                self.ticker.stop();
                self.refresh_position();
                self.set_status(SessionStatus::Paused);
                Ok(())
            }
            status => Err(self.reject("pause", status)),
        }
    }

    /// Pause if playing, otherwise play
    pub fn toggle_playback(&mut self) -> Result<()> {
        if self.status == SessionStatus::Playing {
            self.pause()
        } else {
            self.play()
        }
    }

    /// Move the playhead; returns the clamped position
    ///
    /// Valid from Ready, Playing and Paused. Does not change `status`.
    pub fn seek(&mut self, target_ms: i64) -> Result<u64> {
        self.ensure_available()?;
        if !self.status.has_resource() {
            return Err(self.reject("seek", self.status));
        }

        let position_ms = clamp_seek(target_ms, self.duration_ms);
        self.control("seek", |resource| {
            resource.seek(Duration::from_millis(position_ms))
        })?;

        self.position_ms = position_ms;
        debug!(position_ms, "Seeked");
        self.events.publish(SessionEvent::Seeked { position_ms });
        self.publish_progress();
        Ok(position_ms)
    }

    /// Seek relative to the current position
    pub fn skip_by(&mut self, delta_ms: i64) -> Result<u64> {
        self.ensure_available()?;
        if !self.status.has_resource() {
            return Err(self.reject("skip_by", self.status));
        }
        self.refresh_position();
        let current = i64::try_from(self.position_ms).unwrap_or(i64::MAX);
        self.seek(current.saturating_add(delta_ms))
    }

    /// Load the next playlist item
    ///
    /// Returns `Ok(None)` and changes nothing at the end of the playlist.
    pub fn next(&mut self) -> Result<Option<TrackRef>> {
        self.ensure_available()?;
        let playlist = self.playlist.as_mut().ok_or(SessionError::NoActiveTrack)?;
        let Some(track) = playlist.next().cloned() else {
            debug!("No next track");
            return Ok(None);
        };
        self.publish_playlist();
        self.begin_load(track.clone());
        Ok(Some(track))
    }

    /// Load the previous playlist item
    ///
    /// Returns `Ok(None)` and changes nothing at the start of the playlist.
    pub fn previous(&mut self) -> Result<Option<TrackRef>> {
        self.ensure_available()?;
        let playlist = self.playlist.as_mut().ok_or(SessionError::NoActiveTrack)?;
        let Some(track) = playlist.previous().cloned() else {
            debug!("No previous track");
            return Ok(None);
        };
        self.publish_playlist();
        self.begin_load(track.clone());
        Ok(Some(track))
    }

    /// Reload the active track after a failure
    pub fn retry(&mut self) -> Result<()> {
        self.ensure_available()?;
        if self.status != SessionStatus::Error {
            return Err(self.reject("retry", self.status));
        }
        let track = self.active_track.clone().ok_or(SessionError::NoActiveTrack)?;
        info!(track_id = %track.id(), "Retrying load");
        self.begin_load(track);
        Ok(())
    }

    /// Release everything and return to Idle
    ///
    /// Valid from every state. A disabled session is already Idle with
    /// nothing to release, so this is a no-op there.
    pub fn stop(&mut self) -> Result<()> {
        if self.is_unavailable() {
            return Ok(());
        }
        self.reset();
        Ok(())
    }

    // ===== Completion processing =====

    /// Wait for the next load report or resource signal and apply it
    ///
    /// Cancel-safe: nothing is lost if the future is dropped before it
    /// completes.
    pub async fn pump(&mut self) {
        tokio::select! {
            biased;
            Some(signal) = self.signal_rx.recv() => self.apply_signal(signal),
            Some(report) = self.load_rx.recv() => self.apply_load(report),
            else => {}
        }
    }

    /// Pump until `done` holds for the current snapshot
    pub async fn pump_until(&mut self, done: impl Fn(&SessionSnapshot) -> bool) {
        while !done(&self.snapshot()) {
            self.pump().await;
        }
    }

    /// Apply everything already queued without waiting; returns the count
    pub fn process_pending(&mut self) -> usize {
        let mut applied = 0;
        loop {
            if let Ok(signal) = self.signal_rx.try_recv() {
                self.apply_signal(signal);
            } else if let Ok(report) = self.load_rx.try_recv() {
                self.apply_load(report);
            } else {
                return applied;
            }
            applied += 1;
        }
    }

    fn apply_load(&mut self, report: LoadReport<B::Resource>) {
        if report.generation != self.generation || self.status != SessionStatus::Loading {
            debug!(
                generation = report.generation,
                live = self.generation,
                "Discarding stale load result"
            );
            if let LoadOutcome::Loaded { resource, .. } = report.outcome {
                resource.release();
            }
            return;
        }

        let Some(track) = self.active_track.clone() else {
            if let LoadOutcome::Loaded { resource, .. } = report.outcome {
                resource.release();
            }
            return;
        };

        match report.outcome {
            LoadOutcome::Loaded {
                resource,
                duration,
                retries,
            } => {
                self.load_cancel = None;
                self.retry_count = retries;
                self.duration_ms = duration
                    .map(millis)
                    .filter(|ms| *ms > 0)
                    .or_else(|| track.known_duration_ms())
                    .unwrap_or(0);
                self.position_ms = 0;
                self.resource = Some(resource);
                info!(
                    track_id = %track.id(),
                    duration_ms = self.duration_ms,
                    retries,
                    "Track loaded"
                );
                self.set_status(SessionStatus::Ready);

                if let Err(e) = self.play() {
                    warn!(track_id = %track.id(), error = %e, "Auto-play failed");
                }
            }
            LoadOutcome::Failed { attempts, error } => {
                self.load_cancel = None;
                self.retry_count = attempts.saturating_sub(1);
                error!(
                    track_id = %track.id(),
                    attempts,
                    error = %error,
                    "Load failed, retries exhausted"
                );
                self.record_fault(PlaybackFault::LoadFailure {
                    track_id: track.id().to_string(),
                    attempts,
                    message: error.to_string(),
                });
                self.set_status(SessionStatus::Error);
            }
            LoadOutcome::Cancelled => {}
        }
    }

    fn apply_signal(&mut self, signal: Signal) {
        match signal {
            Signal::Tick { epoch } => {
                if self.ticker.accepts(epoch) && self.status == SessionStatus::Playing {
                    self.sample_progress();
                }
            }
            Signal::Finished { generation } => {
                if generation == self.generation && self.status.has_resource() {
                    self.on_finished();
                }
            }
            Signal::Unusable {
                generation,
                message,
            } => {
                if generation == self.generation && self.resource.is_some() {
                    self.fail_resource(&message);
                }
            }
            Signal::Retrying {
                generation,
                attempt,
                message,
            } => {
                if generation != self.generation || self.status != SessionStatus::Loading {
                    return;
                }
                self.retry_count = attempt;
                if let Some(track) = &self.active_track {
                    self.events.publish(SessionEvent::LoadRetry {
                        track_id: track.id().to_string(),
                        attempt,
                        max_attempts: self.policy.max_attempts(),
                        message,
                    });
                }
                self.publish_snapshot();
            }
        }
    }

    fn on_finished(&mut self) {
        self.ticker.stop();
        if let Some(resource) = self.resource.take() {
            resource.release();
        }
        self.position_ms = self.duration_ms;
        if let Some(track) = &self.active_track {
            info!(track_id = %track.id(), "Track finished");
        }
        self.set_status(SessionStatus::Finished);

        let next = self.playlist.as_mut().and_then(|p| p.next().cloned());
        match next {
            Some(track) => {
                self.publish_playlist();
                self.begin_load(track);
            }
            None => {
                debug!("End of playlist");
                self.reset();
            }
        }
    }

    // ===== Internals =====

    fn ensure_available(&self) -> Result<()> {
        match &self.unavailable {
            Some(reason) => Err(SessionError::PlaybackUnavailable(reason.clone())),
            None => Ok(()),
        }
    }

    fn reject(&self, command: &'static str, status: SessionStatus) -> SessionError {
        warn!(command, %status, "Command rejected in current state");
        SessionError::InvalidState { command, status }
    }

    /// Tear down the current resource and start loading `track`
    fn begin_load(&mut self, track: TrackRef) {
        self.teardown();

        self.generation += 1;
        let generation = self.generation;
        self.live_generation.store(generation, Ordering::Release);
        let token = CancellationToken::new();
        self.load_cancel = Some(token.clone());

        let previous = self.active_track.replace(track.clone());
        self.position_ms = 0;
        self.duration_ms = 0;
        self.retry_count = 0;
        self.last_error = None;
        self.set_buffering(false);

        info!(track_id = %track.id(), generation, "Loading track");
        self.events.publish(SessionEvent::TrackChanged {
            track_id: track.id().to_string(),
            previous_track_id: previous.map(|t| t.id().to_string()),
        });
        self.set_status(SessionStatus::Loading);
        self.publish_snapshot();

        let gate = LoadGate::new(generation, self.live_generation.clone(), token);
        let backend = self.backend.clone();
        let policy = self.policy.clone();
        let signals = self.signal_tx.clone();
        let reports = self.load_tx.clone();

        tokio::spawn(async move {
            let outcome = policy
                .attempt_load(backend.as_ref(), &track, &gate, &signals)
                .await;
            if let Err(returned) = reports.send(LoadReport {
                generation,
                outcome,
            }) {
                // Session is gone; nobody will release it otherwise
                if let LoadOutcome::Loaded { resource, .. } = returned.0.outcome {
                    resource.release();
                }
            }
        });
    }

    /// Stop the ticker, cancel any load in flight and release the resource
    fn teardown(&mut self) {
        self.ticker.stop();
        if let Some(token) = self.load_cancel.take() {
            token.cancel();
        }
        if let Some(resource) = self.resource.take() {
            resource.release();
        }
    }

    pub(crate) fn reset(&mut self) {
        self.teardown();
        self.playlist = None;
        self.active_track = None;
        self.position_ms = 0;
        self.duration_ms = 0;
        self.retry_count = 0;
        self.last_error = None;
        self.set_buffering(false);
        info!("Playback stopped");
        self.set_status(SessionStatus::Idle);
        self.publish_snapshot();
    }

    /// Run a control call against the resource, normalising failures
    fn control(
        &mut self,
        operation: &'static str,
        call: impl FnOnce(&mut B::Resource) -> std::result::Result<(), MediaError>,
    ) -> Result<()> {
        let resource = self.resource.as_mut().ok_or(SessionError::NoActiveTrack)?;
        let Err(error) = call(resource) else {
            return Ok(());
        };

        warn!(operation, error = %error, "Playback control failed");
        if error.is_unusable() {
            self.fail_resource(&error.to_string());
        } else {
            self.record_fault(PlaybackFault::PlaybackControlFailure {
                operation: operation.to_string(),
                message: error.to_string(),
            });
        }
        Err(SessionError::PlaybackControl {
            operation,
            source: error,
        })
    }

    /// The resource broke; drop it and enter Error, keeping the track
    fn fail_resource(&mut self, message: &str) {
        let track_id = self
            .active_track
            .as_ref()
            .map(|t| t.id().to_string())
            .unwrap_or_default();
        error!(track_id = %track_id, reason = message, "Resource unusable");

        self.teardown();
        self.set_buffering(false);
        self.record_fault(PlaybackFault::ResourceUnusable {
            track_id,
            message: message.to_string(),
        });
        self.set_status(SessionStatus::Error);
    }

    fn record_fault(&mut self, fault: PlaybackFault) {
        self.last_error = Some(fault.clone());
        self.events.publish(SessionEvent::Fault { fault });
        self.publish_snapshot();
    }

    fn refresh_position(&mut self) {
        if let Some(resource) = &self.resource {
            self.position_ms = ProgressSample::new(millis(resource.position()), self.duration_ms)
                .position_ms;
        }
    }

    fn sample_progress(&mut self) {
        let Some(resource) = &self.resource else {
            return;
        };
        let position = millis(resource.position());
        if let Some(duration) = resource.duration().map(millis).filter(|ms| *ms > 0) {
            self.duration_ms = duration;
        }
        let buffering = resource.is_buffering();

        self.position_ms = ProgressSample::new(position, self.duration_ms).position_ms;
        self.set_buffering(buffering);
        self.publish_progress();
    }

    fn set_buffering(&mut self, buffering: bool) {
        if self.is_buffering != buffering {
            self.is_buffering = buffering;
            self.events.publish(SessionEvent::Buffering {
                is_buffering: buffering,
            });
        }
    }

    fn set_status(&mut self, status: SessionStatus) {
        if self.status == status {
            return;
        }
        debug!(from = %self.status, to = %status, "Status change");
        self.status = status;
        self.events.publish(SessionEvent::StatusChanged {
            status,
            track_id: self.active_track.as_ref().map(|t| t.id().to_string()),
        });
        self.publish_snapshot();
    }

    fn publish_progress(&mut self) {
        let sample = ProgressSample::new(self.position_ms, self.duration_ms);
        self.events.publish(SessionEvent::Progress {
            position_ms: sample.position_ms,
            duration_ms: sample.duration_ms,
            progress: sample.progress,
        });
        self.publish_snapshot();
    }

    fn publish_playlist(&self) {
        if let Some(playlist) = &self.playlist {
            self.events.publish(SessionEvent::PlaylistChanged {
                length: playlist.len(),
                current_index: playlist.current_index(),
            });
        }
    }

    fn publish_snapshot(&self) {
        self.state_tx.send_replace(self.snapshot());
    }
}

impl<B: MediaBackend> Drop for PlaybackSession<B> {
    fn drop(&mut self) {
        self.teardown();
    }
}
