use crate::{Photo, PhotoSize};

/// What happened to a photo in a modifiable collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoEventKind {
    Stored,
    Deleted,
}

/// Change notification emitted after a favorites mutation has been
/// persisted successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoEvent {
    pub photo: Photo,
    pub size: PhotoSize,
    pub kind: PhotoEventKind,
}
