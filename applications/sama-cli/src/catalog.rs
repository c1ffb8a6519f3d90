/// Catalog backed by a JSON fixture file
use crate::error::{CliError, Result};
use async_trait::async_trait;
use sama_core::{AlbumListing, CatalogSource, CatalogTrack, CoreError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Catalog file layout
///
/// ```json
/// {
///   "tracks": [{ "id": "t1", "title": "...", "audioFileUrl": "https://..." }],
///   "albums": [{ "album": { "id": "a1", "title": "..." }, "tracks": [ ... ] }]
/// }
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FileCatalog {
    #[serde(default)]
    pub tracks: Vec<CatalogTrack>,

    #[serde(default)]
    pub albums: Vec<AlbumListing>,
}

impl FileCatalog {
    pub async fn from_path(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            CliError::CatalogFile(format!("{}: {}", path.display(), e))
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Find a standalone or album track by id
    pub fn find_track(&self, id: &str) -> Option<&CatalogTrack> {
        self.tracks
            .iter()
            .chain(self.albums.iter().flat_map(|a| a.tracks.iter()))
            .find(|t| t.id == id)
    }

    /// Every audio URL in the file
    pub fn audio_urls(&self) -> impl Iterator<Item = &str> {
        self.tracks
            .iter()
            .chain(self.albums.iter().flat_map(|a| a.tracks.iter()))
            .map(|t| t.audio_file_url.as_str())
    }
}

#[async_trait]
impl CatalogSource for FileCatalog {
    async fn list_tracks(&self) -> sama_core::Result<Vec<CatalogTrack>> {
        Ok(self.tracks.clone())
    }

    async fn album(&self, album_id: &str) -> sama_core::Result<AlbumListing> {
        self.albums
            .iter()
            .find(|a| a.album.id == album_id)
            .cloned()
            .ok_or_else(|| CoreError::not_found("album", album_id))
    }
}
