//! Concurrent download-and-persist pipeline.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Client;
use url::Url;

use fotex_model::{Photo, RawPhotoRecord};

use crate::blob_store::{BlobKey, BlobStore};
use crate::error::{CacheError, Result};

/// Source of raw image bytes for a download locator.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RawDataDownloader: Send + Sync {
    async fn download(&self, url: &Url) -> Result<Vec<u8>>;
}

/// HTTP downloader with connection pooling and bounded
/// exponential-backoff retries.
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: Client,
    max_retries: u32,
}

impl HttpDownloader {
    pub fn new() -> Self {
        Self::with_config(3, Duration::from_secs(30))
    }

    pub fn with_config(max_retries: u32, timeout: Duration) -> Self {
        let client = Client::builder()
            .pool_max_idle_per_host(10)
            .timeout(timeout)
            .build()
            .expect("failed to create HTTP client");

        Self {
            client,
            max_retries,
        }
    }

    async fn download_once(&self, url: &Url) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| CacheError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(CacheError::Network(format!(
                "HTTP {}: {}",
                response.status(),
                url
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| CacheError::Network(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

impl Default for HttpDownloader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RawDataDownloader for HttpDownloader {
    async fn download(&self, url: &Url) -> Result<Vec<u8>> {
        let mut last_error = None;

        for attempt in 0..self.max_retries {
            if attempt > 0 {
                // Exponential backoff
                let delay = Duration::from_millis(100 * 2u64.pow(attempt));
                tokio::time::sleep(delay).await;
            }

            match self.download_once(url).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) => {
                    log::warn!(
                        "download attempt {} failed; url={}, err={}",
                        attempt + 1,
                        url,
                        e
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| CacheError::Network("unknown download error".to_owned())))
    }
}

/// Fans a batch of raw records out into concurrent download+store
/// operations, tolerating partial failure.
pub struct PhotoFetcher {
    downloader: Arc<dyn RawDataDownloader>,
    blob_store: Arc<BlobStore>,
}

impl fmt::Debug for PhotoFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhotoFetcher")
            .field("blob_store", &self.blob_store)
            .finish_non_exhaustive()
    }
}

impl PhotoFetcher {
    pub fn new(downloader: Arc<dyn RawDataDownloader>, blob_store: Arc<BlobStore>) -> Self {
        Self {
            downloader,
            blob_store,
        }
    }

    /// Download and persist every item concurrently, waiting for the
    /// whole batch to settle.
    ///
    /// Item failures are logged and dropped; only the successful
    /// subset is returned. A non-empty batch with zero successes
    /// fails with [`CacheError::AllSavesFailed`]; an empty batch
    /// succeeds with an empty result.
    pub async fn fetch_and_store(
        &self,
        items: Vec<(BlobKey, RawPhotoRecord)>,
    ) -> Result<Vec<Photo>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let attempted = items.len();
        let results = join_all(items.into_iter().map(|(key, record)| async move {
            let id = record.id.clone();
            (id, self.fetch_and_store_one(key, record).await)
        }))
        .await;

        let mut photos = Vec::with_capacity(results.len());
        for (id, result) in results {
            match result {
                Ok(photo) => photos.push(photo),
                Err(e) => log::warn!("batch save failed for photo {id}: {e}"),
            }
        }

        if photos.is_empty() {
            return Err(CacheError::AllSavesFailed { attempted });
        }
        Ok(photos)
    }

    /// Download one record's bytes and persist them under `key`.
    /// Fails if either the download or the blob write fails.
    pub async fn fetch_and_store_one(
        &self,
        key: BlobKey,
        record: RawPhotoRecord,
    ) -> Result<Photo> {
        let bytes = self.downloader.download(&record.download_url).await?;
        self.blob_store.store(&key, &bytes).await?;
        Ok(Photo::new(&record, key.as_str()))
    }
}
