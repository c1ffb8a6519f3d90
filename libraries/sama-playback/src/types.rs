//! Core types for playback management

use crate::error::{PlaybackFault, Result, SessionError};
use sama_core::TrackRef;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Maximum number of load attempts per `load_track` call
pub const MAX_RETRIES: u32 = 3;

/// Default progress sampling period
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1000;

/// Session status
///
/// ```text
/// Idle -> Loading -> Ready -> Playing <-> Paused
///            |                  |
///            v                  v
///          Error            Finished -> Loading (next) | Idle
/// ```
/// Every status can return to `Idle` through `stop()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Nothing loaded
    Idle,

    /// Materialising a resource, possibly retrying
    Loading,

    /// Resource loaded, not yet started
    Ready,

    /// Currently playing
    Playing,

    /// Paused mid-track
    Paused,

    /// Load retries exhausted or resource unusable
    Error,

    /// Track completed; transient until the next load or stop
    Finished,
}

impl SessionStatus {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Error => "error",
            Self::Finished => "finished",
        }
    }

    /// A resource is loaded and accepts play/pause/seek
    pub fn has_resource(&self) -> bool {
        matches!(self, Self::Ready | Self::Playing | Self::Paused)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Point-in-time view of a session, for UI rendering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub active_track: Option<TrackRef>,
    pub position_ms: u64,
    pub duration_ms: u64,

    /// `position_ms / duration_ms`, 0.0 while the duration is unknown
    pub progress: f64,

    pub retry_count: u32,
    pub last_error: Option<PlaybackFault>,
    pub is_buffering: bool,

    /// Load generation the snapshot belongs to
    pub generation: u64,

    /// Set when the audio subsystem failed to initialise
    pub unavailable: Option<String>,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            status: SessionStatus::Idle,
            active_track: None,
            position_ms: 0,
            duration_ms: 0,
            progress: 0.0,
            retry_count: 0,
            last_error: None,
            is_buffering: false,
            generation: 0,
            unavailable: None,
        }
    }
}

/// How the wait between load attempts grows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffGrowth {
    /// Same wait every time
    Fixed,

    /// `backoff * failed_attempts`
    Linear,
}

/// Load retry configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts before giving up (default: 3)
    pub max_attempts: u32,

    /// Base wait between attempts (default: 500ms)
    pub backoff_ms: u64,

    /// Growth of the wait (default: Linear)
    pub growth: BackoffGrowth,

    /// Upper bound on a single wait (default: 5s)
    pub max_backoff_ms: u64,

    /// Bound on a single attempt; `None` waits forever (default: 15s)
    pub attempt_timeout_ms: Option<u64>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: MAX_RETRIES,
            backoff_ms: 500,
            growth: BackoffGrowth::Linear,
            max_backoff_ms: 5_000,
            attempt_timeout_ms: Some(15_000),
        }
    }
}

impl RetryConfig {
    /// Wait after the `failed_attempts`-th failure
    pub fn backoff_for(&self, failed_attempts: u32) -> Duration {
        let base = self.backoff_ms.max(1);
        let wait = match self.growth {
            BackoffGrowth::Fixed => base,
            BackoffGrowth::Linear => base.saturating_mul(u64::from(failed_attempts.max(1))),
        };
        Duration::from_millis(wait.min(self.max_backoff_ms.max(base)))
    }

    pub fn attempt_timeout(&self) -> Option<Duration> {
        self.attempt_timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(SessionError::InvalidConfig(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.backoff_ms == 0 {
            return Err(SessionError::InvalidConfig(
                "retry.backoff_ms must be non-zero".to_string(),
            ));
        }
        if self.attempt_timeout_ms == Some(0) {
            return Err(SessionError::InvalidConfig(
                "retry.attempt_timeout_ms must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration for a playback session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Progress sampling period (default: 1000ms)
    pub tick_interval_ms: u64,

    /// Load retry policy
    pub retry: RetryConfig,

    /// Buffered events per subscriber before the slowest lags (default: 256)
    pub event_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            retry: RetryConfig::default(),
            event_capacity: 256,
        }
    }
}

impl SessionConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tick_interval_ms == 0 {
            return Err(SessionError::InvalidConfig(
                "tick_interval_ms must be non-zero".to_string(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(SessionError::InvalidConfig(
                "event_capacity must be non-zero".to_string(),
            ));
        }
        self.retry.validate()
    }
}
