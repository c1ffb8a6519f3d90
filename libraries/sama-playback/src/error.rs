//! Error types for playback management
//!
//! Two layers:
//! - [`MediaError`]: what a platform media primitive reports
//! - [`SessionError`]: what a session command returns to its caller
//!
//! [`PlaybackFault`] is the observable record of a failure, stored in the
//! session snapshot and published on the event feed.

use crate::types::SessionStatus;
use sama_core::CoreError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors reported by a media backend or one of its resources
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MediaError {
    /// Audio subsystem could not be brought up
    #[error("Audio subsystem unavailable: {0}")]
    Unavailable(String),

    /// Resource could not be created or prepared
    #[error("Load failed: {0}")]
    Load(String),

    /// Load attempt did not resolve in time
    #[error("Load timed out after {0:?}")]
    TimedOut(Duration),

    /// A play/pause/seek call was rejected
    #[error("Control rejected: {0}")]
    Control(String),

    /// The resource can no longer be used
    #[error("Resource unusable: {0}")]
    Unusable(String),
}

impl MediaError {
    /// Whether the resource must be torn down after this error
    pub fn is_unusable(&self) -> bool {
        matches!(self, Self::Unusable(_))
    }
}

/// Errors returned by session commands
#[derive(Debug, Error)]
pub enum SessionError {
    /// Command not valid in the current status
    #[error("{command} is not valid while {status}")]
    InvalidState {
        command: &'static str,
        status: SessionStatus,
    },

    /// Backend failed to initialise; playback is disabled
    #[error("Playback unavailable: {0}")]
    PlaybackUnavailable(String),

    /// Loaded resource rejected a control call
    #[error("{operation} failed: {source}")]
    PlaybackControl {
        operation: &'static str,
        #[source]
        source: MediaError,
    },

    /// Command needs a track or playlist and there is none
    #[error("No active track")]
    NoActiveTrack,

    /// Configuration rejected by validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The session task has shut down
    #[error("Session closed")]
    Closed,

    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type for session commands
pub type Result<T> = std::result::Result<T, SessionError>;

/// Failure recorded in `last_error`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PlaybackFault {
    /// Retries exhausted while loading a track
    #[serde(rename_all = "camelCase")]
    LoadFailure {
        track_id: String,
        attempts: u32,
        message: String,
    },

    /// A loaded resource rejected play/pause/seek; playback continues
    #[serde(rename_all = "camelCase")]
    PlaybackControlFailure { operation: String, message: String },

    /// The resource reported itself unusable and was torn down
    #[serde(rename_all = "camelCase")]
    ResourceUnusable { track_id: String, message: String },
}

impl PlaybackFault {
    /// Whether this fault ended playback of the track
    pub fn is_fatal_for_track(&self) -> bool {
        !matches!(self, Self::PlaybackControlFailure { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unusable_classification() {
        assert!(MediaError::Unusable("device lost".into()).is_unusable());
        assert!(!MediaError::Control("busy".into()).is_unusable());
    }

    #[test]
    fn invalid_state_message() {
        let err = SessionError::InvalidState {
            command: "seek",
            status: SessionStatus::Idle,
        };
        assert_eq!(err.to_string(), "seek is not valid while idle");
    }

    #[test]
    fn fault_serializes_tagged() {
        let fault = PlaybackFault::LoadFailure {
            track_id: "t1".into(),
            attempts: 3,
            message: "404".into(),
        };
        let json = serde_json::to_value(&fault).unwrap();
        assert_eq!(json["kind"], "loadFailure");
        assert_eq!(json["trackId"], "t1");
        assert_eq!(json["attempts"], 3);
    }
}
