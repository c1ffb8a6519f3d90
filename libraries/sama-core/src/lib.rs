//! Sama Core
//!
//! Platform-agnostic domain types, playlist navigation and the catalog
//! boundary for Sama.
//!
//! This crate provides the building blocks the playback controller and the
//! applications share:
//! - **Domain Types**: `TrackRef`, `TrackId`, `Playlist`
//! - **Catalog Records**: `CatalogTrack`, `AlbumListing` as served by the remote catalog
//! - **Catalog Boundary**: the `CatalogSource` trait and `open_album`
//! - **Error Handling**: `CoreError` and `Result`
//!
//! # Example
//!
//! ```rust
//! use sama_core::{Playlist, TrackRef};
//!
//! let first = TrackRef::new("t1", "https://cdn.example.com/t1.mp3").with_title("Opening");
//! let second = TrackRef::new("t2", "https://cdn.example.com/t2.mp3").with_title("Closing");
//!
//! let mut playlist = Playlist::new(vec![first, second]).unwrap();
//! assert_eq!(playlist.current().id().as_str(), "t1");
//!
//! let next = playlist.next().cloned();
//! assert_eq!(next.map(|t| t.id().to_string()), Some("t2".to_string()));
//! assert!(playlist.next().is_none());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod traits;
pub mod types;

pub use error::{CoreError, Result};
pub use traits::{open_album, CatalogSource};
pub use types::{AlbumInfo, AlbumListing, CatalogTrack, Playlist, TrackId, TrackRef};
