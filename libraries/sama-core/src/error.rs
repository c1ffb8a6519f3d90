//! Core error types for Sama

use thiserror::Error;

/// Result type alias using `CoreError`
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core error type for Sama
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A playlist needs at least one track
    #[error("Playlist is empty")]
    EmptyPlaylist,

    /// Index outside the playlist
    #[error("Index {index} out of bounds for playlist of {len} tracks")]
    IndexOutOfBounds {
        /// Requested index
        index: usize,
        /// Number of tracks in the playlist
        len: usize,
    },

    /// Catalog record could not be turned into a playable track
    #[error("Invalid track record {id:?}: {reason}")]
    InvalidTrack {
        /// Catalog id of the rejected record
        id: String,
        /// What was wrong with it
        reason: String,
    },

    /// Entity not found in the catalog
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of entity, e.g. "Album"
        entity: String,
        /// Requested id
        id: String,
    },

    /// The catalog could not be reached or answered with an error
    #[error("Catalog error: {0}")]
    Catalog(String),
}

impl CoreError {
    /// Create an invalid track error
    pub fn invalid_track(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTrack {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Create a catalog error
    pub fn catalog(msg: impl Into<String>) -> Self {
        Self::Catalog(msg.into())
    }
}
