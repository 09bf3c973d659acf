//! Shared data models for the fotex photo cache.
//!
//! Everything here is plain data: photo records as the remote source
//! hands them out, locally materialized photos, size variants, and
//! the change-notification events the service layer broadcasts.

mod events;
mod photo;
mod record;

pub use events::{PhotoEvent, PhotoEventKind};
pub use photo::{Photo, PhotoSize};
pub use record::RawPhotoRecord;
