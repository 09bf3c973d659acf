//! Namespace roots, capacity limits, and disk-space probing.

use std::path::Path;

use directories::ProjectDirs;
use sysinfo::Disks;

use crate::blob_store::BlobRoot;

/// Default per-namespace capacity ceiling: 1 GiB.
pub const DEFAULT_CAPACITY_BYTES: u64 = 1024 * 1024 * 1024;

/// Limits for one blob-store namespace.
#[derive(Debug, Clone)]
pub struct StoreLimits {
    pub capacity_bytes: u64,
}

impl StoreLimits {
    pub const fn defaults() -> Self {
        Self {
            capacity_bytes: DEFAULT_CAPACITY_BYTES,
        }
    }
}

impl Default for StoreLimits {
    fn default() -> Self {
        Self::defaults()
    }
}

/// Resolve the app-private cache root for one logical namespace
/// (for example `"search-temp"` or `"favorites"`).
pub fn blob_root_for_namespace(namespace: &str) -> anyhow::Result<BlobRoot> {
    let proj_dirs = ProjectDirs::from("", "fotex", "fotex")
        .ok_or_else(|| anyhow::anyhow!("failed to resolve project directories"))?;
    Ok(BlobRoot::new(
        proj_dirs.cache_dir().join("photos").join(namespace),
    ))
}

/// Space currently available on the disk backing `path`.
///
/// Picks the mounted disk with the longest mount-point prefix of
/// `path`. When no mount matches (stripped-down containers, network
/// filesystems) the probe reports unconstrained space instead of
/// refusing every write.
pub fn available_disk_space(path: &Path) -> u64 {
    let disks = Disks::new_with_refreshed_list();
    let mut best: Option<(usize, u64)> = None;
    for disk in disks.list() {
        let mount = disk.mount_point();
        if path.starts_with(mount) {
            let len = mount.as_os_str().len();
            if best.is_none_or(|(best_len, _)| len >= best_len) {
                best = Some((len, disk.available_space()));
            }
        }
    }
    match best {
        Some((_, space)) => space,
        None => u64::MAX,
    }
}
