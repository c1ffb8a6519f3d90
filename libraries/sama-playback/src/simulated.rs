//! Simulated media backend
//!
//! A virtual media primitive driven by the tokio clock. Resources "play" by
//! letting time pass, report their end through the notifier when the
//! playhead reaches the duration, and can be scripted per audio URL to fail,
//! hang or succeed. Counters expose allocation and release so tests can
//! assert that nothing leaks.
//!
//! Used by the test suites and by the CLI for dry runs.

use crate::backend::{MediaBackend, MediaResource, ResourceNotifier};
use crate::error::MediaError;
use async_trait::async_trait;
use sama_core::TrackRef;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};

/// Scripted behaviour of `prepare` for one audio URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadScript {
    /// Every attempt succeeds
    Succeed,

    /// The first `n` attempts fail, later ones succeed
    FailTimes(u32),

    /// Every attempt fails
    FailAlways,

    /// `prepare` never resolves
    Hang,
}

#[derive(Debug)]
struct UrlState {
    script: LoadScript,
    attempts: u32,
    duration: Option<Duration>,
}

impl Default for UrlState {
    fn default() -> Self {
        Self {
            script: LoadScript::Succeed,
            attempts: 0,
            duration: None,
        }
    }
}

#[derive(Debug)]
struct LiveEntry {
    url: String,
    notifier: ResourceNotifier,
    prepared: bool,
    playing: bool,
}

#[derive(Debug, Default)]
struct SimState {
    init_failure: Option<String>,
    prepare_delay: Duration,
    urls: HashMap<String, UrlState>,
    buffering: HashSet<String>,
    control_failure: Option<MediaError>,
    next_id: u64,
    allocated: u64,
    released: u64,
    live: HashMap<u64, LiveEntry>,
}

/// Clock-driven stand-in for a platform media primitive
#[derive(Debug, Clone, Default)]
pub struct SimulatedBackend {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend whose initialisation fails
    pub fn unavailable(reason: impl Into<String>) -> Self {
        let backend = Self::new();
        backend.lock().init_failure = Some(reason.into());
        backend
    }

    /// Make every `prepare` take `delay` before resolving
    #[must_use]
    pub fn with_prepare_delay(self, delay: Duration) -> Self {
        self.lock().prepare_delay = delay;
        self
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn script(&self, url: &str, script: LoadScript) {
        self.lock().urls.entry(url.to_string()).or_default().script = script;
    }

    /// Duration `prepare` reports for `url`; unset means "unknown"
    pub fn set_duration(&self, url: &str, duration: Duration) {
        self.lock().urls.entry(url.to_string()).or_default().duration = Some(duration);
    }

    pub fn set_buffering(&self, url: &str, buffering: bool) {
        let mut state = self.lock();
        if buffering {
            state.buffering.insert(url.to_string());
        } else {
            state.buffering.remove(url);
        }
    }

    /// Make play/pause/seek fail with `error` until cleared with `None`
    pub fn fail_controls(&self, error: Option<MediaError>) {
        self.lock().control_failure = error;
    }

    /// Load attempts made for `url`
    pub fn attempts(&self, url: &str) -> u32 {
        self.lock().urls.get(url).map_or(0, |u| u.attempts)
    }

    pub fn allocated(&self) -> u64 {
        self.lock().allocated
    }

    pub fn released(&self) -> u64 {
        self.lock().released
    }

    /// Resources allocated and not yet released
    pub fn live_resources(&self) -> usize {
        self.lock().live.len()
    }

    /// Resources currently producing sound
    pub fn playing_resources(&self) -> usize {
        self.lock().live.values().filter(|e| e.playing).count()
    }

    /// URLs of resources that are producing sound
    pub fn playing_urls(&self) -> Vec<String> {
        self.lock()
            .live
            .values()
            .filter(|e| e.playing)
            .map(|e| e.url.clone())
            .collect()
    }

    /// Report natural completion for every prepared resource
    pub fn finish_active(&self) -> bool {
        let state = self.lock();
        let mut any = false;
        for entry in state.live.values().filter(|e| e.prepared) {
            entry.notifier.finished();
            any = true;
        }
        any
    }

    /// Report every prepared resource as broken
    pub fn break_active(&self, message: &str) -> bool {
        let state = self.lock();
        let mut any = false;
        for entry in state.live.values().filter(|e| e.prepared) {
            entry.notifier.unusable(message);
            any = true;
        }
        any
    }
}

impl MediaBackend for SimulatedBackend {
    type Resource = SimulatedResource;

    fn initialize(&self) -> Result<(), MediaError> {
        match &self.lock().init_failure {
            Some(reason) => Err(MediaError::Unavailable(reason.clone())),
            None => Ok(()),
        }
    }

    fn allocate(
        &self,
        track: &TrackRef,
        notifier: ResourceNotifier,
    ) -> Result<SimulatedResource, MediaError> {
        let url = track.audio_url().to_string();
        let mut state = self.lock();

        state.next_id += 1;
        state.allocated += 1;
        let id = state.next_id;

        let url_state = state.urls.entry(url.clone()).or_default();
        url_state.attempts += 1;
        let attempt = url_state.attempts;
        let script = url_state.script;
        let reported = url_state.duration;
        let prepare_delay = state.prepare_delay;

        state.live.insert(
            id,
            LiveEntry {
                url: url.clone(),
                notifier: notifier.clone(),
                prepared: false,
                playing: false,
            },
        );

        Ok(SimulatedResource {
            id,
            url,
            state: self.state.clone(),
            notifier,
            attempt,
            script,
            prepare_delay,
            reported,
            known: track.known_duration(),
            prepared: false,
            offset: Duration::ZERO,
            started_at: None,
            finish_timer: None,
        })
    }
}

/// Resource handed out by [`SimulatedBackend`]
pub struct SimulatedResource {
    id: u64,
    url: String,
    state: Arc<Mutex<SimState>>,
    notifier: ResourceNotifier,
    attempt: u32,
    script: LoadScript,
    prepare_delay: Duration,
    reported: Option<Duration>,
    known: Option<Duration>,
    prepared: bool,
    offset: Duration,
    started_at: Option<Instant>,
    finish_timer: Option<DropGuard>,
}

impl fmt::Debug for SimulatedResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulatedResource")
            .field("id", &self.id)
            .field("url", &self.url)
            .field("attempt", &self.attempt)
            .field("prepared", &self.prepared)
            .field("playing", &self.started_at.is_some())
            .finish_non_exhaustive()
    }
}

impl SimulatedResource {
    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn effective_duration(&self) -> Option<Duration> {
        self.reported.or(self.known)
    }

    fn check_controls(&self) -> Result<(), MediaError> {
        if let Some(error) = &self.lock().control_failure {
            return Err(error.clone());
        }
        if !self.prepared {
            return Err(MediaError::Control("resource not prepared".to_string()));
        }
        Ok(())
    }

    fn set_playing(&self, playing: bool) {
        if let Some(entry) = self.lock().live.get_mut(&self.id) {
            entry.playing = playing;
        }
    }

    fn arm_finish_timer(&mut self) {
        self.finish_timer = None;
        let Some(duration) = self.effective_duration() else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };

        let remaining = duration.saturating_sub(self.position());
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let notifier = self.notifier.clone();
        runtime.spawn(async move {
            tokio::select! {
                biased;
                () = cancelled.cancelled() => {}
                () = tokio::time::sleep(remaining) => notifier.finished(),
            }
        });
        self.finish_timer = Some(token.drop_guard());
    }
}

#[async_trait]
impl MediaResource for SimulatedResource {
    async fn prepare(&mut self) -> Result<Option<Duration>, MediaError> {
        if !self.prepare_delay.is_zero() {
            tokio::time::sleep(self.prepare_delay).await;
        }

        let succeeds = match self.script {
            LoadScript::Succeed => true,
            LoadScript::FailTimes(n) => self.attempt > n,
            LoadScript::FailAlways => false,
            LoadScript::Hang => std::future::pending::<bool>().await,
        };
        if !succeeds {
            return Err(MediaError::Load(format!(
                "{} (attempt {}): simulated network failure",
                self.url, self.attempt
            )));
        }

        self.prepared = true;
        if let Some(entry) = self.lock().live.get_mut(&self.id) {
            entry.prepared = true;
        }
        Ok(self.reported)
    }

    fn play(&mut self) -> Result<(), MediaError> {
        self.check_controls()?;
        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
            self.set_playing(true);
            self.arm_finish_timer();
        }
        Ok(())
    }

    fn pause(&mut self) -> Result<(), MediaError> {
        self.check_controls()?;
        if self.started_at.is_some() {
            self.offset = self.position();
            self.started_at = None;
            self.finish_timer = None;
            self.set_playing(false);
        }
        Ok(())
    }

    fn seek(&mut self, position: Duration) -> Result<(), MediaError> {
        self.check_controls()?;
        self.offset = match self.effective_duration() {
            Some(duration) => position.min(duration),
            None => position,
        };
        if self.started_at.is_some() {
            self.started_at = Some(Instant::now());
            self.arm_finish_timer();
        }
        Ok(())
    }

    fn position(&self) -> Duration {
        let elapsed = self.started_at.map_or(Duration::ZERO, |t| t.elapsed());
        let position = self.offset + elapsed;
        match self.effective_duration() {
            Some(duration) => position.min(duration),
            None => position,
        }
    }

    fn duration(&self) -> Option<Duration> {
        self.reported
    }

    fn is_buffering(&self) -> bool {
        self.lock().buffering.contains(&self.url)
    }

    fn release(mut self) {
        self.finish_timer = None;
        let mut state = self.lock();
        state.live.remove(&self.id);
        state.released += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track() -> TrackRef {
        TrackRef::new("t1", "sim://t1").with_known_duration_ms(10_000)
    }

    #[tokio::test(start_paused = true)]
    async fn playhead_follows_clock() {
        let backend = SimulatedBackend::new();
        let mut resource = backend.allocate(&track(), ResourceNotifier::detached()).unwrap();
        resource.prepare().await.unwrap();

        resource.play().unwrap();
        tokio::time::advance(Duration::from_secs(3)).await;
        assert_eq!(resource.position(), Duration::from_secs(3));

        resource.pause().unwrap();
        tokio::time::advance(Duration::from_secs(3)).await;
        assert_eq!(resource.position(), Duration::from_secs(3));

        resource.seek(Duration::from_secs(60)).unwrap();
        assert_eq!(resource.position(), Duration::from_secs(10));

        resource.release();
        assert_eq!(backend.live_resources(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn scripted_failures_then_success() {
        let backend = SimulatedBackend::new();
        backend.script("sim://t1", LoadScript::FailTimes(2));

        for expected_ok in [false, false, true] {
            let mut resource = backend.allocate(&track(), ResourceNotifier::detached()).unwrap();
            assert_eq!(resource.prepare().await.is_ok(), expected_ok);
            resource.release();
        }
        assert_eq!(backend.attempts("sim://t1"), 3);
        assert_eq!(backend.allocated(), backend.released());
    }

    #[tokio::test]
    async fn controls_require_prepare() {
        let backend = SimulatedBackend::new();
        let mut resource = backend.allocate(&track(), ResourceNotifier::detached()).unwrap();
        assert!(matches!(resource.play(), Err(MediaError::Control(_))));
        resource.release();
    }

    #[test]
    fn unavailable_backend_fails_initialize() {
        let backend = SimulatedBackend::unavailable("no output device");
        assert_eq!(
            backend.initialize(),
            Err(MediaError::Unavailable("no output device".to_string()))
        );
    }
}
