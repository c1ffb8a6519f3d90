//! Domain types

mod catalog;
mod ids;
mod playlist;
mod track;

pub use catalog::{AlbumInfo, AlbumListing, CatalogTrack};
pub use ids::TrackId;
pub use playlist::Playlist;
pub use track::TrackRef;
