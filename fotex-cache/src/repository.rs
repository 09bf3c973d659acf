use async_trait::async_trait;

use fotex_model::{PhotoSize, RawPhotoRecord};

use crate::error::Result;

/// Upstream photo source: a remote, paginated gallery API.
///
/// Implementations live outside this crate (the HTTP gallery client,
/// test doubles); the caching layer consumes them purely through
/// this interface and maps their failures into
/// [`CacheError::Repository`](crate::CacheError::Repository).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PhotoRepository: Send + Sync {
    /// One page of raw records in the given size.
    async fn fetch(&self, size: PhotoSize, page: usize) -> Result<Vec<RawPhotoRecord>>;

    /// The full record for a single photo id.
    async fn fetch_details(&self, id: &str, size: PhotoSize) -> Result<RawPhotoRecord>;

    /// One page of raw records matching `query`.
    async fn search(
        &self,
        query: &str,
        size: PhotoSize,
        page: usize,
    ) -> Result<Vec<RawPhotoRecord>>;
}
