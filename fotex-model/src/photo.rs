use std::fmt;
use std::hash::{Hash, Hasher};

use url::Url;

use crate::RawPhotoRecord;

/// Logical size variant of a photo.
///
/// Each size owns an independent index and storage namespace; the
/// same photo id may exist in one size, both, or neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum PhotoSize {
    Thumbnail,
    Original,
}

impl PhotoSize {
    /// Both size variants, thumbnail first.
    pub const ALL: [PhotoSize; 2] = [PhotoSize::Thumbnail, PhotoSize::Original];

    pub fn as_str(&self) -> &'static str {
        match self {
            PhotoSize::Thumbnail => "thumbnail",
            PhotoSize::Original => "original",
        }
    }
}

impl fmt::Display for PhotoSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A locally materialized photo, addressable through its data
/// accessor key for byte retrieval.
///
/// Identity is the source-assigned id: two photos compare equal iff
/// their ids match, regardless of metadata content.
#[derive(Debug, Clone)]
pub struct Photo {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub view_count: u64,
    /// Remote locator the photo was (or can be) downloaded from.
    pub url: Url,
    data_accessor_key: String,
}

impl Photo {
    pub fn new(record: &RawPhotoRecord, data_accessor_key: impl Into<String>) -> Self {
        Self {
            id: record.id.clone(),
            title: record.title.clone(),
            description: record.description.clone(),
            tags: record.tags.clone(),
            view_count: record.view_count,
            url: record.download_url.clone(),
            data_accessor_key: data_accessor_key.into(),
        }
    }

    /// Key under which this photo's bytes live in the blob store.
    pub fn data_accessor_key(&self) -> &str {
        &self.data_accessor_key
    }
}

impl PartialEq for Photo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Photo {}

impl Hash for Photo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, title: &str) -> RawPhotoRecord {
        RawPhotoRecord {
            id: id.to_owned(),
            title: Some(title.to_owned()),
            description: None,
            download_url: Url::parse("https://example.com/a.jpg").unwrap(),
            tags: vec![],
            view_count: 0,
        }
    }

    #[test]
    fn photo_identity_is_by_id_only() {
        let a = Photo::new(&record("p1", "first"), "photos/v1/p1/original");
        let b = Photo::new(&record("p1", "renamed"), "photos/v1/p1/thumbnail");
        let c = Photo::new(&record("p2", "first"), "photos/v1/p2/original");

        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
