//! Playable track descriptor

use crate::types::TrackId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Immutable description of a playable item
///
/// Built once when catalog data is mapped into playback-ready form and never
/// mutated afterwards. Fields are only reachable through accessors; the
/// `with_*` builders consume the value and are meant for construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackRef {
    id: TrackId,
    title: String,
    artist: String,
    artwork_url: String,
    audio_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    known_duration_ms: Option<u64>,
}

impl TrackRef {
    /// Create a track with only an id and an audio URL
    pub fn new(id: impl Into<TrackId>, audio_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            artist: String::new(),
            artwork_url: String::new(),
            audio_url: audio_url.into(),
            known_duration_ms: None,
        }
    }

    /// Set the display title
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the display artist
    #[must_use]
    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = artist.into();
        self
    }

    /// Set the cover image location
    #[must_use]
    pub fn with_artwork_url(mut self, artwork_url: impl Into<String>) -> Self {
        self.artwork_url = artwork_url.into();
        self
    }

    /// Record the duration the catalog reports
    #[must_use]
    pub fn with_known_duration_ms(mut self, duration_ms: u64) -> Self {
        self.known_duration_ms = Some(duration_ms);
        self
    }

    /// Catalog identifier
    pub fn id(&self) -> &TrackId {
        &self.id
    }

    /// Display title, possibly empty
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Display artist, possibly empty
    pub fn artist(&self) -> &str {
        &self.artist
    }

    /// Cover image location, possibly empty
    pub fn artwork_url(&self) -> &str {
        &self.artwork_url
    }

    /// Location of the audio file
    pub fn audio_url(&self) -> &str {
        &self.audio_url
    }

    /// Duration reported by the catalog, if any
    pub fn known_duration_ms(&self) -> Option<u64> {
        self.known_duration_ms
    }

    /// Get the known duration as a Duration
    pub fn known_duration(&self) -> Option<Duration> {
        self.known_duration_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_creation() {
        let track = TrackRef::new("t1", "https://cdn.example.com/t1.mp3")
            .with_title("Test Song")
            .with_artist("Test Artist");

        assert_eq!(track.id().as_str(), "t1");
        assert_eq!(track.title(), "Test Song");
        assert_eq!(track.artist(), "Test Artist");
        assert!(track.artwork_url().is_empty());
        assert!(track.known_duration_ms().is_none());
    }

    #[test]
    fn track_known_duration_conversion() {
        let track = TrackRef::new("t1", "https://cdn.example.com/t1.mp3").with_known_duration_ms(180_000);

        assert_eq!(track.known_duration_ms(), Some(180_000));
        assert_eq!(track.known_duration(), Some(Duration::from_secs(180)));
    }

    #[test]
    fn track_serializes_camel_case() {
        let track = TrackRef::new("t1", "https://cdn.example.com/t1.mp3").with_known_duration_ms(1000);
        let json = serde_json::to_value(&track).unwrap();

        assert_eq!(json["audioUrl"], "https://cdn.example.com/t1.mp3");
        assert_eq!(json["knownDurationMs"], 1000);
    }
}
