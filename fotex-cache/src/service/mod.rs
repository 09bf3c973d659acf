//! Service facades consumed by the presentation layer.

mod caching;
mod favorites;

pub use caching::CachingPhotoService;
pub use favorites::FavoritesPhotoService;

use async_trait::async_trait;
use tokio::sync::broadcast;

use fotex_model::{Photo, PhotoEvent, PhotoSize};

use crate::error::Result;

/// Read side of a photo collection.
///
/// Returned photos carry a stable data accessor key, so their bytes
/// can be read back later without re-fetching.
#[async_trait]
pub trait PhotoService: Send + Sync {
    /// One page of photos in the given size. `page` is 1-indexed; an
    /// empty page is a normal result, not an error.
    async fn fetch_page(&self, size: PhotoSize, page: usize) -> Result<Vec<Photo>>;

    /// A single photo by id.
    async fn fetch_details(&self, id: &str, size: PhotoSize) -> Result<Photo>;

    /// One page of photos matching `query`.
    async fn search(&self, query: &str, size: PhotoSize, page: usize) -> Result<Vec<Photo>>;

    /// Raw bytes for a locally materialized photo.
    async fn read_bytes(&self, photo: &Photo) -> Result<Vec<u8>>;
}

/// A photo collection the caller owns and may modify.
///
/// Per photo id and size the collection is a two-state machine:
/// absent → (store) → present → (delete) → absent. Storing while
/// present overwrites; deleting while absent is a no-op, never an
/// error.
#[async_trait]
pub trait PhotoServiceModifiable: PhotoService {
    /// Add `photo` to the collection in the given size, importing
    /// its bytes from wherever this service sources them.
    async fn store(&self, photo: &Photo, size: PhotoSize) -> Result<()>;

    /// Remove `photo` from the collection in the given size.
    async fn delete(&self, photo: &Photo, size: PhotoSize) -> Result<()>;

    /// Whether the collection currently holds `photo` in this size.
    async fn contains(&self, photo: &Photo, size: PhotoSize) -> Result<bool>;

    /// Subscribe to change notifications. Events are emitted only
    /// after the underlying persistence step has succeeded.
    fn subscribe(&self) -> broadcast::Receiver<PhotoEvent>;
}
