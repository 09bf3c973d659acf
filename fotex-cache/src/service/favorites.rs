use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use fotex_model::{Photo, PhotoEvent, PhotoEventKind, PhotoSize, RawPhotoRecord};

use crate::blob_store::{BlobKey, BlobStore, photo_blob_key_for};
use crate::error::Result;
use crate::index::PhotoIndex;
use crate::service::{PhotoService, PhotoServiceModifiable};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Index-mode service over a locally owned collection (favorites).
///
/// Reads come straight from the persisted photo index, without any
/// network call. `store` imports a photo's bytes from the *source*
/// service it was originally fetched through, then records it in the
/// index; `delete` removes bytes and record together.
pub struct FavoritesPhotoService<S> {
    source: S,
    index: Arc<PhotoIndex>,
    blob_store: Arc<BlobStore>,
    page_size: usize,
    events: broadcast::Sender<PhotoEvent>,
}

impl<S> std::fmt::Debug for FavoritesPhotoService<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FavoritesPhotoService")
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

impl<S: PhotoService> FavoritesPhotoService<S> {
    pub fn new(
        source: S,
        index: Arc<PhotoIndex>,
        blob_store: Arc<BlobStore>,
        page_size: usize,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            source,
            index,
            blob_store,
            page_size,
            events,
        }
    }

    /// Change notifications as a stream, for reactive consumers.
    pub fn event_stream(&self) -> BroadcastStream<PhotoEvent> {
        BroadcastStream::new(self.events.subscribe())
    }

    fn emit(&self, photo: &Photo, size: PhotoSize, kind: PhotoEventKind) {
        // No subscribers is fine.
        let _ = self.events.send(PhotoEvent {
            photo: photo.clone(),
            size,
            kind,
        });
    }
}

fn photo_for(record: &RawPhotoRecord, size: PhotoSize) -> Photo {
    Photo::new(record, photo_blob_key_for(&record.id, size).as_str())
}

#[async_trait]
impl<S: PhotoService> PhotoService for FavoritesPhotoService<S> {
    async fn fetch_page(&self, size: PhotoSize, page: usize) -> Result<Vec<Photo>> {
        let records = self.index.page(size, page, self.page_size).await?;
        Ok(records.iter().map(|r| photo_for(r, size)).collect())
    }

    async fn fetch_details(&self, id: &str, size: PhotoSize) -> Result<Photo> {
        let record = self.index.get_by_id(size, id).await?;
        Ok(photo_for(&record, size))
    }

    async fn search(&self, query: &str, size: PhotoSize, page: usize) -> Result<Vec<Photo>> {
        let records = self
            .index
            .search(size, query, page, self.page_size)
            .await?;
        Ok(records.iter().map(|r| photo_for(r, size)).collect())
    }

    async fn read_bytes(&self, photo: &Photo) -> Result<Vec<u8>> {
        self.blob_store
            .read(&BlobKey::new(photo.data_accessor_key().to_owned()))
            .await
    }
}

#[async_trait]
impl<S: PhotoService> PhotoServiceModifiable for FavoritesPhotoService<S> {
    async fn store(&self, photo: &Photo, size: PhotoSize) -> Result<()> {
        let record = RawPhotoRecord {
            id: photo.id.clone(),
            title: photo.title.clone(),
            description: photo.description.clone(),
            download_url: photo.url.clone(),
            tags: photo.tags.clone(),
            view_count: photo.view_count,
        };
        let key = photo_blob_key_for(&photo.id, size);

        let bytes = self.source.read_bytes(photo).await?;
        self.blob_store.store(&key, &bytes).await?;

        if let Err(e) = self.index.upsert(size, record).await {
            // The blob written above stays in place; a retried store
            // overwrites it under the same key.
            log::warn!("favorites index persist failed after blob write; key={key}, err={e}");
            return Err(e);
        }

        self.emit(photo, size, PhotoEventKind::Stored);
        Ok(())
    }

    async fn delete(&self, photo: &Photo, size: PhotoSize) -> Result<()> {
        let key = photo_blob_key_for(&photo.id, size);
        let removed = self.index.remove(size, &photo.id, &key).await?;
        if removed {
            self.emit(photo, size, PhotoEventKind::Deleted);
        }
        Ok(())
    }

    async fn contains(&self, photo: &Photo, size: PhotoSize) -> Result<bool> {
        self.index.contains(size, &photo.id).await
    }

    fn subscribe(&self) -> broadcast::Receiver<PhotoEvent> {
        self.events.subscribe()
    }
}
