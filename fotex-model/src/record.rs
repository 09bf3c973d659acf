use url::Url;

/// Unmaterialized photo metadata plus the locator for its bytes.
///
/// Produced by the remote gallery source or reconstructed from a
/// persisted index blob. This is the fixed persisted schema: each
/// per-size index blob is a JSON object mapping photo id to exactly
/// these fields.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawPhotoRecord {
    /// Stable, source-assigned identifier.
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    /// Where the image bytes can be downloaded from.
    pub download_url: Url,
    pub tags: Vec<String>,
    pub view_count: u64,
}
