//! Client-side photo caching and favorites management.
//!
//! This crate sits between a paginated remote photo source and a
//! presentation layer. It materializes image bytes into a
//! quota-enforcing disk blob store, keeps a persisted per-size photo
//! index with pagination and substring search, and exposes two
//! service facades on top:
//!
//! - [`service::CachingPhotoService`] — network-backed: every page
//!   fetched from the remote repository is written to disk before
//!   photos are handed out, so later byte reads never touch the
//!   network.
//! - [`service::FavoritesPhotoService`] — locally owned: reads come
//!   straight from the persisted index, and store/delete mutate it
//!   with change notifications for reactive consumers.
//!
//! Storage namespaces (for example `"search-temp"` and
//! `"favorites"`) are independent blob-store roots, each with its
//! own capacity ceiling. Space is never reclaimed automatically:
//! once a namespace is full, stores fail with
//! [`CacheError::QuotaExceeded`] until the consumer deletes entries.

pub mod blob_store;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod index;
pub mod repository;
pub mod service;

pub use blob_store::{BlobKey, BlobRoot, BlobStore, photo_blob_key_for};
pub use error::{CacheError, Result};
pub use fetcher::{HttpDownloader, PhotoFetcher, RawDataDownloader};
pub use index::PhotoIndex;
pub use repository::PhotoRepository;
pub use service::{
    CachingPhotoService, FavoritesPhotoService, PhotoService,
    PhotoServiceModifiable,
};
