//! Catalog boundary for Sama

use crate::error::{CoreError, Result};
use crate::types::{AlbumListing, CatalogTrack, Playlist};
use async_trait::async_trait;

/// Source of track records
///
/// Implemented outside the playback path (REST client, fixture file, cache).
/// How records are fetched, paginated or authenticated is not visible here.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// List standalone tracks
    async fn list_tracks(&self) -> Result<Vec<CatalogTrack>>;

    /// Fetch an album with its ordered tracks
    async fn album(&self, album_id: &str) -> Result<AlbumListing>;
}

/// Open an album as a playlist positioned on `start_index`
///
/// # Errors
/// Fails if the catalog fails, the album has no tracks, a record cannot be
/// mapped, or `start_index` is out of range.
pub async fn open_album<C>(catalog: &C, album_id: &str, start_index: usize) -> Result<Playlist>
where
    C: CatalogSource + ?Sized,
{
    let listing = catalog.album(album_id).await?;
    if listing.tracks.is_empty() {
        return Err(CoreError::EmptyPlaylist);
    }
    listing.into_playlist(start_index)
}
