use std::sync::Arc;

use async_trait::async_trait;

use fotex_model::{Photo, PhotoSize, RawPhotoRecord};

use crate::blob_store::{BlobKey, BlobStore, photo_blob_key_for};
use crate::error::Result;
use crate::fetcher::PhotoFetcher;
use crate::repository::PhotoRepository;
use crate::service::PhotoService;

/// Caching-mode service over a network-backed repository.
///
/// Every batch fetched from the remote repository is materialized
/// into the blob store before photos are handed to the caller, so
/// later byte reads hit the store directly. Items that fail to
/// materialize are dropped from the page rather than failing it.
#[derive(Debug)]
pub struct CachingPhotoService<R> {
    repository: R,
    fetcher: PhotoFetcher,
    blob_store: Arc<BlobStore>,
}

impl<R: PhotoRepository> CachingPhotoService<R> {
    pub fn new(repository: R, fetcher: PhotoFetcher, blob_store: Arc<BlobStore>) -> Self {
        Self {
            repository,
            fetcher,
            blob_store,
        }
    }

    async fn materialize(
        &self,
        size: PhotoSize,
        records: Vec<RawPhotoRecord>,
    ) -> Result<Vec<Photo>> {
        let items = records
            .into_iter()
            .map(|r| (photo_blob_key_for(&r.id, size), r))
            .collect();
        self.fetcher.fetch_and_store(items).await
    }
}

#[async_trait]
impl<R: PhotoRepository> PhotoService for CachingPhotoService<R> {
    async fn fetch_page(&self, size: PhotoSize, page: usize) -> Result<Vec<Photo>> {
        let records = self.repository.fetch(size, page).await?;
        self.materialize(size, records).await
    }

    async fn fetch_details(&self, id: &str, size: PhotoSize) -> Result<Photo> {
        let record = self.repository.fetch_details(id, size).await?;
        let key = photo_blob_key_for(&record.id, size);
        self.fetcher.fetch_and_store_one(key, record).await
    }

    async fn search(&self, query: &str, size: PhotoSize, page: usize) -> Result<Vec<Photo>> {
        let records = self.repository.search(query, size, page).await?;
        self.materialize(size, records).await
    }

    async fn read_bytes(&self, photo: &Photo) -> Result<Vec<u8>> {
        self.blob_store
            .read(&BlobKey::new(photo.data_accessor_key().to_owned()))
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tempfile::tempdir;
    use url::Url;

    use fotex_model::{PhotoSize, RawPhotoRecord};

    use super::CachingPhotoService;
    use crate::blob_store::{BlobRoot, BlobStore};
    use crate::fetcher::{MockRawDataDownloader, PhotoFetcher};
    use crate::repository::MockPhotoRepository;
    use crate::service::PhotoService;

    fn record(id: &str) -> RawPhotoRecord {
        RawPhotoRecord {
            id: id.to_owned(),
            title: Some(id.to_owned()),
            description: None,
            download_url: Url::parse(&format!("https://example.com/{id}.jpg")).unwrap(),
            tags: vec![],
            view_count: 1,
        }
    }

    fn service(
        repository: MockPhotoRepository,
        dir: &std::path::Path,
    ) -> CachingPhotoService<MockPhotoRepository> {
        let store =
            Arc::new(BlobStore::try_new(BlobRoot::new(dir.join("blobs")), 1 << 20).unwrap());
        let mut downloader = MockRawDataDownloader::new();
        downloader
            .expect_download()
            .returning(|url| Ok(url.path().as_bytes().to_vec()));
        let fetcher = PhotoFetcher::new(Arc::new(downloader), store.clone());
        CachingPhotoService::new(repository, fetcher, store)
    }

    #[tokio::test]
    async fn fetch_page_materializes_bytes_before_returning() {
        let dir = tempdir().unwrap();
        let mut repository = MockPhotoRepository::new();
        repository
            .expect_fetch()
            .returning(|_, _| Ok(vec![record("a"), record("b")]));

        let service = service(repository, dir.path());
        let photos = service.fetch_page(PhotoSize::Thumbnail, 1).await.unwrap();
        assert_eq!(photos.len(), 2);

        // Bytes are now served from disk, no further downloads.
        let bytes = service.read_bytes(&photos[0]).await.unwrap();
        assert_eq!(bytes, b"/a.jpg");
    }

    #[tokio::test]
    async fn fetch_details_returns_an_addressable_photo() {
        let dir = tempdir().unwrap();
        let mut repository = MockPhotoRepository::new();
        repository
            .expect_fetch_details()
            .returning(|id, _| Ok(record(id)));

        let service = service(repository, dir.path());
        let photo = service
            .fetch_details("a", PhotoSize::Original)
            .await
            .unwrap();
        assert_eq!(photo.data_accessor_key(), "photos/v1/a/original");
    }

    #[tokio::test]
    async fn empty_remote_page_is_not_an_error() {
        let dir = tempdir().unwrap();
        let mut repository = MockPhotoRepository::new();
        repository.expect_search().returning(|_, _, _| Ok(vec![]));

        let service = service(repository, dir.path());
        let photos = service
            .search("nothing", PhotoSize::Thumbnail, 1)
            .await
            .unwrap();
        assert!(photos.is_empty());
    }
}
