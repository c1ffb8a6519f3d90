//! Sama - Playback Session Controller
//!
//! Platform-agnostic playback control for Sama.
//!
//! This crate provides:
//! - An explicit session state machine (Idle, Loading, Ready, Playing, Paused, Error, Finished)
//! - Load-with-retry bounded to [`MAX_RETRIES`] attempts, with backoff and per-attempt timeout
//! - Generation-tagged loads, so rapid track switching never leaks or plays a stale resource
//! - A cancellable, idempotent progress ticker
//! - Playlist navigation with auto-advance on track completion
//! - An ordered event feed and a watchable state snapshot
//!
//! # Architecture
//!
//! `sama-playback` never touches audio itself. The component that fetches
//! and renders audio is provided through the [`MediaBackend`] and
//! [`MediaResource`] traits; [`SimulatedBackend`] is a clock-driven
//! implementation for tests and dry runs.
//!
//! # Example
//!
//! ```rust
//! use sama_playback::{PlaybackSession, SessionConfig, SessionStatus, SimulatedBackend};
//! use sama_core::TrackRef;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> sama_playback::Result<()> {
//! let backend = SimulatedBackend::new();
//! let mut session = PlaybackSession::new(backend, SessionConfig::default())?;
//!
//! let track = TrackRef::new("t1", "sim://t1").with_known_duration_ms(180_000);
//! session.load_track(track)?;
//! assert_eq!(session.status(), SessionStatus::Loading);
//!
//! session.pump_until(|s| s.status == SessionStatus::Playing).await;
//! session.seek(-500)?;
//! assert_eq!(session.position_ms(), 0);
//!
//! session.stop()?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod error;
pub mod events;
pub mod handle;
pub mod retry;
pub mod session;
pub mod simulated;
pub mod ticker;
pub mod types;

pub use backend::{MediaBackend, MediaResource, ResourceNotifier};
pub use error::{MediaError, PlaybackFault, Result, SessionError};
pub use events::{EventBus, SessionEvent};
pub use handle::SessionHandle;
pub use retry::{LoadGate, LoadOutcome, LoadRetryPolicy};
pub use session::{clamp_seek, PlaybackSession};
pub use simulated::{LoadScript, SimulatedBackend, SimulatedResource};
pub use ticker::{ProgressSample, ProgressTicker};
pub use types::{
    BackoffGrowth, RetryConfig, SessionConfig, SessionSnapshot, SessionStatus, MAX_RETRIES,
    DEFAULT_TICK_INTERVAL_MS,
};
