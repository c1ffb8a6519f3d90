//! Catalog record types
//!
//! Shapes served by the remote catalog. They are mapped into [`TrackRef`]s
//! before anything in the playback path sees them.

use crate::error::{CoreError, Result};
use crate::types::{Playlist, TrackRef};
use serde::{Deserialize, Serialize};
use url::Url;

/// Track record as returned by the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogTrack {
    /// Catalog identifier
    pub id: String,
    /// Display title
    pub title: String,
    /// Display artist; empty when the album's applies
    #[serde(default)]
    pub artist: String,
    /// Cover image location; empty when the album's applies
    #[serde(default)]
    pub cover_image_url: String,
    /// Location of the audio file
    pub audio_file_url: String,

    /// Duration in milliseconds, when the catalog knows it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_hint: Option<u64>,
}

/// Album metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumInfo {
    /// Catalog identifier
    pub id: String,
    /// Album title
    pub title: String,
    /// Album artist
    #[serde(default)]
    pub artist: String,
    /// Cover image location
    #[serde(default)]
    pub cover_image_url: String,
}

/// Album metadata plus its ordered tracks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumListing {
    /// Album metadata
    pub album: AlbumInfo,
    /// Tracks in album order
    pub tracks: Vec<CatalogTrack>,
}

impl TryFrom<CatalogTrack> for TrackRef {
    type Error = CoreError;

    fn try_from(record: CatalogTrack) -> Result<Self> {
        if record.id.trim().is_empty() {
            return Err(CoreError::invalid_track(record.id, "empty id"));
        }
        if let Err(e) = Url::parse(&record.audio_file_url) {
            return Err(CoreError::invalid_track(
                record.id,
                format!("bad audio URL {:?}: {}", record.audio_file_url, e),
            ));
        }

        let mut track = TrackRef::new(record.id.as_str(), record.audio_file_url)
            .with_title(record.title)
            .with_artist(record.artist)
            .with_artwork_url(record.cover_image_url);
        if let Some(duration_ms) = record.duration_hint.filter(|d| *d > 0) {
            track = track.with_known_duration_ms(duration_ms);
        }
        Ok(track)
    }
}

impl AlbumListing {
    /// Map every record into a [`TrackRef`]
    ///
    /// Tracks without artwork or artist inherit the album's.
    pub fn track_refs(&self) -> Result<Vec<TrackRef>> {
        self.tracks
            .iter()
            .cloned()
            .map(|mut record| {
                if record.cover_image_url.is_empty() {
                    record.cover_image_url.clone_from(&self.album.cover_image_url);
                }
                if record.artist.is_empty() {
                    record.artist.clone_from(&self.album.artist);
                }
                TrackRef::try_from(record)
            })
            .collect()
    }

    /// Build a playlist positioned on `start_index`
    pub fn into_playlist(self, start_index: usize) -> Result<Playlist> {
        Playlist::starting_at(self.track_refs()?, start_index)
    }
}
