//! Playlist navigation
//!
//! An ordered, finite sequence of tracks with a cursor. The sequence is fixed
//! once built; only the cursor moves, and only through explicit navigation.

use crate::error::{CoreError, Result};
use crate::types::{TrackId, TrackRef};
use serde::{Deserialize, Serialize};

/// Ordered, navigable sequence of tracks
///
/// Invariant: `current_index` is always a valid index into `items`, which is
/// never empty. A standalone track is a playlist of length 1.
///
/// ```text
/// items:  [ t0 ][ t1 ][ t2 ]
///                 ^
///           current_index
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PlaylistRepr", into = "PlaylistRepr")]
pub struct Playlist {
    items: Vec<TrackRef>,
    current_index: usize,
}

impl Playlist {
    /// Create a playlist positioned on its first track
    pub fn new(items: Vec<TrackRef>) -> Result<Self> {
        Self::starting_at(items, 0)
    }

    /// Create a playlist positioned on `index`
    pub fn starting_at(items: Vec<TrackRef>, index: usize) -> Result<Self> {
        if items.is_empty() {
            return Err(CoreError::EmptyPlaylist);
        }
        if index >= items.len() {
            return Err(CoreError::IndexOutOfBounds {
                index,
                len: items.len(),
            });
        }

        Ok(Self {
            items,
            current_index: index,
        })
    }

    /// Wrap a standalone track
    pub fn single(track: TrackRef) -> Self {
        Self {
            items: vec![track],
            current_index: 0,
        }
    }

    /// Track under the cursor
    pub fn current(&self) -> &TrackRef {
        &self.items[self.current_index]
    }

    /// Index of the track under the cursor
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// All tracks in order
    pub fn items(&self) -> &[TrackRef] {
        &self.items
    }

    /// Number of tracks
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Always false: a playlist holds at least one track
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether a track follows the cursor
    pub fn has_next(&self) -> bool {
        self.current_index + 1 < self.items.len()
    }

    /// Whether a track precedes the cursor
    pub fn has_previous(&self) -> bool {
        self.current_index > 0
    }

    /// Advance the cursor
    ///
    /// Returns `None` at the last track. Does not wrap.
    pub fn next(&mut self) -> Option<&TrackRef> {
        if !self.has_next() {
            return None;
        }
        self.current_index += 1;
        Some(&self.items[self.current_index])
    }

    /// Move the cursor back
    ///
    /// Returns `None` at the first track. Does not wrap.
    pub fn previous(&mut self) -> Option<&TrackRef> {
        if !self.has_previous() {
            return None;
        }
        self.current_index -= 1;
        Some(&self.items[self.current_index])
    }

    /// Move the cursor directly to `index`
    pub fn select(&mut self, index: usize) -> Result<&TrackRef> {
        if index >= self.items.len() {
            return Err(CoreError::IndexOutOfBounds {
                index,
                len: self.items.len(),
            });
        }
        self.current_index = index;
        Ok(&self.items[index])
    }

    /// Position of a track in the sequence
    pub fn position_of(&self, id: &TrackId) -> Option<usize> {
        self.items.iter().position(|t| t.id() == id)
    }
}

/// Wire form, validated on the way in
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistRepr {
    items: Vec<TrackRef>,
    #[serde(default)]
    current_index: usize,
}

impl TryFrom<PlaylistRepr> for Playlist {
    type Error = CoreError;

    fn try_from(repr: PlaylistRepr) -> Result<Self> {
        Self::starting_at(repr.items, repr.current_index)
    }
}

impl From<Playlist> for PlaylistRepr {
    fn from(playlist: Playlist) -> Self {
        Self {
            items: playlist.items,
            current_index: playlist.current_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(id: &str) -> TrackRef {
        TrackRef::new(id, format!("https://cdn.example.com/{}.mp3", id))
    }

    fn three() -> Playlist {
        Playlist::new(vec![track("a"), track("b"), track("c")]).unwrap()
    }

    #[test]
    fn empty_playlist_rejected() {
        assert_eq!(Playlist::new(vec![]), Err(CoreError::EmptyPlaylist));
    }

    #[test]
    fn start_index_must_be_in_range() {
        let result = Playlist::starting_at(vec![track("a")], 1);
        assert_eq!(result, Err(CoreError::IndexOutOfBounds { index: 1, len: 1 }));
    }

    #[test]
    fn next_advances_until_last() {
        let mut playlist = three();

        assert_eq!(playlist.next().map(|t| t.id().as_str()), Some("b"));
        assert_eq!(playlist.next().map(|t| t.id().as_str()), Some("c"));
        assert!(playlist.next().is_none());
        assert_eq!(playlist.current_index(), 2);
    }

    #[test]
    fn previous_stops_at_first() {
        let mut playlist = three();

        assert!(playlist.previous().is_none());
        assert_eq!(playlist.current_index(), 0);
        assert_eq!(playlist.current().id().as_str(), "a");
    }

    #[test]
    fn select_moves_cursor() {
        let mut playlist = three();

        assert_eq!(playlist.select(2).unwrap().id().as_str(), "c");
        assert!(!playlist.has_next());
        assert!(playlist.has_previous());

        assert!(playlist.select(3).is_err());
        assert_eq!(playlist.current_index(), 2);
    }

    #[test]
    fn single_track_has_no_neighbours() {
        let playlist = Playlist::single(track("solo"));

        assert_eq!(playlist.len(), 1);
        assert!(!playlist.has_next());
        assert!(!playlist.has_previous());
    }

    #[test]
    fn position_of_finds_track() {
        let playlist = three();
        assert_eq!(playlist.position_of(&TrackId::new("c")), Some(2));
        assert_eq!(playlist.position_of(&TrackId::new("z")), None);
    }

    #[test]
    fn deserialize_rejects_bad_index() {
        let json = r#"{"items":[{"id":"a","title":"","artist":"","artworkUrl":"","audioUrl":"u"}],"currentIndex":4}"#;
        assert!(serde_json::from_str::<Playlist>(json).is_err());
    }
}
