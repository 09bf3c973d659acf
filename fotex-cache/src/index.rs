//! Per-size persisted photo index with pagination and search.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use fotex_model::{PhotoSize, RawPhotoRecord};

use crate::blob_store::{BlobKey, BlobStore};
use crate::error::{CacheError, Result};

/// Persistence key for the original-size index blob.
pub const ORIGINAL_SIZE_RECORDS_KEY: &str = "originalSizeRecords.json";
/// Persistence key for the thumbnail-size index blob.
pub const THUMBNAIL_SIZE_RECORDS_KEY: &str = "thumbnailSizeRecords.json";

/// Blob key under which one size's index persists.
pub fn record_blob_key_for(size: PhotoSize) -> BlobKey {
    BlobKey::new(
        match size {
            PhotoSize::Thumbnail => THUMBNAIL_SIZE_RECORDS_KEY,
            PhotoSize::Original => ORIGINAL_SIZE_RECORDS_KEY,
        }
        .to_owned(),
    )
}

/// In-memory form of one size's persisted mapping.
pub type RecordMap = HashMap<String, RawPhotoRecord>;

/// Persisted, paginated, searchable mapping from photo id to raw
/// record, kept independently per size variant.
///
/// Each size persists as one UTF-8 JSON object inside the blob store
/// and is rewritten in full on every mutation. The per-size mutex
/// covers the whole load→mutate→persist sequence, so concurrent
/// mutations of the same size cannot lose updates.
#[derive(Debug)]
pub struct PhotoIndex {
    blob_store: Arc<BlobStore>,
    thumbnail: Mutex<RecordMap>,
    original: Mutex<RecordMap>,
}

impl PhotoIndex {
    pub fn new(blob_store: Arc<BlobStore>) -> Self {
        Self {
            blob_store,
            thumbnail: Mutex::new(RecordMap::new()),
            original: Mutex::new(RecordMap::new()),
        }
    }

    fn cache_for(&self, size: PhotoSize) -> &Mutex<RecordMap> {
        match size {
            PhotoSize::Thumbnail => &self.thumbnail,
            PhotoSize::Original => &self.original,
        }
    }

    /// Fill `cache` from the persisted blob if it is empty.
    ///
    /// A missing index blob means a fresh collection, not an error.
    async fn load_locked(&self, size: PhotoSize, cache: &mut RecordMap) -> Result<()> {
        if !cache.is_empty() {
            return Ok(());
        }
        match self.blob_store.read(&record_blob_key_for(size)).await {
            Ok(bytes) => {
                *cache = serde_json::from_slice(&bytes)?;
                Ok(())
            }
            Err(CacheError::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn persist_locked(&self, size: PhotoSize, records: &RecordMap) -> Result<()> {
        let bytes = serde_json::to_vec(records)?;
        self.blob_store
            .store(&record_blob_key_for(size), &bytes)
            .await
    }

    /// Current mapping for `size`, loading from disk on first use.
    pub async fn load(&self, size: PhotoSize) -> Result<RecordMap> {
        let mut cache = self.cache_for(size).lock().await;
        self.load_locked(size, &mut cache).await?;
        Ok(cache.clone())
    }

    /// One page of records, ordered by id. `page` is 1-indexed; a
    /// page past the end is empty, never an error.
    pub async fn page(
        &self,
        size: PhotoSize,
        page: usize,
        page_size: usize,
    ) -> Result<Vec<RawPhotoRecord>> {
        let records = self.load(size).await?;
        Ok(paginate(sorted_values(records), page, page_size))
    }

    /// Records whose title or description contains `query`
    /// case-insensitively, paginated like [`PhotoIndex::page`].
    pub async fn search(
        &self,
        size: PhotoSize,
        query: &str,
        page: usize,
        page_size: usize,
    ) -> Result<Vec<RawPhotoRecord>> {
        let records = self.load(size).await?;
        let needle = query.to_lowercase();
        let matches = sorted_values(records)
            .into_iter()
            .filter(|r| {
                r.title
                    .as_deref()
                    .is_some_and(|t| t.to_lowercase().contains(&needle))
                    || r.description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&needle))
            })
            .collect();
        Ok(paginate(matches, page, page_size))
    }

    pub async fn get_by_id(&self, size: PhotoSize, id: &str) -> Result<RawPhotoRecord> {
        let records = self.load(size).await?;
        records
            .get(id)
            .cloned()
            .ok_or_else(|| CacheError::NotFound(format!("no {size} record for photo {id}")))
    }

    pub async fn contains(&self, size: PhotoSize, id: &str) -> Result<bool> {
        let mut cache = self.cache_for(size).lock().await;
        self.load_locked(size, &mut cache).await?;
        Ok(cache.contains_key(id))
    }

    /// Insert or overwrite `record`, rewriting the persisted blob.
    pub async fn upsert(&self, size: PhotoSize, record: RawPhotoRecord) -> Result<()> {
        let mut cache = self.cache_for(size).lock().await;
        self.load_locked(size, &mut cache).await?;
        cache.insert(record.id.clone(), record);
        self.persist_locked(size, &cache).await
    }

    /// Remove `id` from the index, deleting its bytes under
    /// `blob_key` first.
    ///
    /// An absent id succeeds as a no-op (`Ok(false)`). If the blob
    /// delete fails the index is left untouched and the error is
    /// surfaced. Returns whether an entry was actually removed.
    pub async fn remove(
        &self,
        size: PhotoSize,
        id: &str,
        blob_key: &BlobKey,
    ) -> Result<bool> {
        let mut cache = self.cache_for(size).lock().await;
        self.load_locked(size, &mut cache).await?;
        if !cache.contains_key(id) {
            return Ok(false);
        }
        self.blob_store.delete(blob_key).await?;
        cache.remove(id);
        self.persist_locked(size, &cache).await?;
        Ok(true)
    }
}

fn sorted_values(records: RecordMap) -> Vec<RawPhotoRecord> {
    let mut values: Vec<_> = records.into_values().collect();
    // Mapping iteration order is arbitrary; sort by id so pages stay
    // deterministic.
    values.sort_by(|a, b| a.id.cmp(&b.id));
    values
}

fn paginate(values: Vec<RawPhotoRecord>, page: usize, page_size: usize) -> Vec<RawPhotoRecord> {
    if page == 0 || page_size == 0 {
        return Vec::new();
    }
    // A page number too large to even compute an offset for is past
    // the end, which is an empty page rather than an error.
    let Some(offset) = (page - 1).checked_mul(page_size) else {
        return Vec::new();
    };
    values.into_iter().skip(offset).take(page_size).collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tempfile::tempdir;
    use url::Url;

    use fotex_model::{PhotoSize, RawPhotoRecord};

    use super::PhotoIndex;
    use crate::blob_store::{BlobRoot, BlobStore, photo_blob_key_for};

    fn record(id: &str, title: &str, description: Option<&str>) -> RawPhotoRecord {
        RawPhotoRecord {
            id: id.to_owned(),
            title: Some(title.to_owned()),
            description: description.map(str::to_owned),
            download_url: Url::parse("https://example.com/img.jpg").unwrap(),
            tags: vec!["landscape".to_owned()],
            view_count: 7,
        }
    }

    fn store_in(dir: &std::path::Path) -> Arc<BlobStore> {
        Arc::new(BlobStore::try_new(BlobRoot::new(dir.join("blobs")), 1 << 20).unwrap())
    }

    #[tokio::test]
    async fn pagination_is_deterministic_and_chunked() {
        let dir = tempdir().unwrap();
        let index = PhotoIndex::new(store_in(dir.path()));

        for i in 0..7 {
            index
                .upsert(PhotoSize::Original, record(&format!("p{i}"), "t", None))
                .await
                .unwrap();
        }

        let first = index.page(PhotoSize::Original, 1, 3).await.unwrap();
        let second = index.page(PhotoSize::Original, 2, 3).await.unwrap();
        let third = index.page(PhotoSize::Original, 3, 3).await.unwrap();
        let beyond = index.page(PhotoSize::Original, 4, 3).await.unwrap();

        let ids: Vec<_> = first.iter().chain(&second).chain(&third).map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["p0", "p1", "p2", "p3", "p4", "p5", "p6"]);
        assert_eq!(third.len(), 1);
        assert!(beyond.is_empty());
    }

    #[tokio::test]
    async fn page_far_beyond_the_end_is_empty() {
        let dir = tempdir().unwrap();
        let index = PhotoIndex::new(store_in(dir.path()));

        index
            .upsert(PhotoSize::Original, record("p1", "t", None))
            .await
            .unwrap();

        let page = index
            .page(PhotoSize::Original, usize::MAX, 3)
            .await
            .unwrap();
        assert!(page.is_empty());

        let hits = index
            .search(PhotoSize::Original, "t", usize::MAX, 3)
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn search_matches_title_or_description_case_insensitively() {
        let dir = tempdir().unwrap();
        let index = PhotoIndex::new(store_in(dir.path()));

        index
            .upsert(PhotoSize::Original, record("a", "Sunset Beach", None))
            .await
            .unwrap();
        index
            .upsert(PhotoSize::Original, record("b", "Mountain View", None))
            .await
            .unwrap();
        index
            .upsert(PhotoSize::Original, record("c", "Beach Sunrise", None))
            .await
            .unwrap();
        index
            .upsert(
                PhotoSize::Original,
                record("d", "Pier", Some("taken at the BEACH")),
            )
            .await
            .unwrap();

        let hits = index
            .search(PhotoSize::Original, "beach", 1, 10)
            .await
            .unwrap();
        let ids: Vec<_> = hits.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["a", "c", "d"]);
    }

    #[tokio::test]
    async fn upsert_overwrites_existing_entry() {
        let dir = tempdir().unwrap();
        let index = PhotoIndex::new(store_in(dir.path()));

        index
            .upsert(PhotoSize::Thumbnail, record("p1", "old title", None))
            .await
            .unwrap();
        index
            .upsert(PhotoSize::Thumbnail, record("p1", "new title", None))
            .await
            .unwrap();

        let all = index.page(PhotoSize::Thumbnail, 1, 10).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title.as_deref(), Some("new title"));
    }

    #[tokio::test]
    async fn remove_of_absent_id_is_a_no_op() {
        let dir = tempdir().unwrap();
        let index = PhotoIndex::new(store_in(dir.path()));

        index
            .upsert(PhotoSize::Original, record("p1", "t", None))
            .await
            .unwrap();

        let removed = index
            .remove(
                PhotoSize::Original,
                "ghost",
                &photo_blob_key_for("ghost", PhotoSize::Original),
            )
            .await
            .unwrap();
        assert!(!removed);
        assert!(index.contains(PhotoSize::Original, "p1").await.unwrap());
    }

    #[tokio::test]
    async fn remove_deletes_blob_and_entry() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        let index = PhotoIndex::new(store.clone());

        let key = photo_blob_key_for("p1", PhotoSize::Original);
        store.store(&key, b"pixels").await.unwrap();
        index
            .upsert(PhotoSize::Original, record("p1", "t", None))
            .await
            .unwrap();

        let removed = index.remove(PhotoSize::Original, "p1", &key).await.unwrap();
        assert!(removed);
        assert!(!index.contains(PhotoSize::Original, "p1").await.unwrap());
        assert!(store.read(&key).await.is_err());
    }

    #[tokio::test]
    async fn records_round_trip_across_restart() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        let index = PhotoIndex::new(store.clone());
        let original = record("p1", "Sunset Beach", Some("golden hour"));
        index
            .upsert(PhotoSize::Original, original.clone())
            .await
            .unwrap();
        drop(index);

        // Fresh index over the same store simulates a process restart
        // with an empty in-memory cache.
        let reopened = PhotoIndex::new(store);
        let loaded = reopened
            .get_by_id(PhotoSize::Original, "p1")
            .await
            .unwrap();
        assert_eq!(loaded, original);

        // The other size variant stays independent.
        assert!(!reopened.contains(PhotoSize::Thumbnail, "p1").await.unwrap());
    }

    #[tokio::test]
    async fn missing_details_are_not_found() {
        let dir = tempdir().unwrap();
        let index = PhotoIndex::new(store_in(dir.path()));

        let err = index
            .get_by_id(PhotoSize::Original, "nope")
            .await
            .unwrap_err();
        assert!(matches!(err, crate::CacheError::NotFound(_)));
    }
}
