//! Well-known image-relative paths.
//!
//! Image paths are always `/`-separated and absolute within the image,
//! independent of the host platform.

pub const OVERVIEW: &str = "/data/overview.json";
pub const PACKAGES: &str = "/packages/packages.json";
pub const SHARED_TREE_FLAGS: &str = "/data/houdini_shfs_files.json";

/// Directory holding product archives and per-product file indexes.
pub const DATA_DIR: &str = "/data";
/// Directory holding package zips.
pub const PACKAGES_DIR: &str = "/packages";
/// Root of the shared Houdini file system tree.
pub const SHARED_TREE_ROOT: &str = "/data/shfs";

/// Join an image directory and a file name with exactly one `/`.
pub fn join(dir: &str, name: &str) -> String {
    format!(
        "{}/{}",
        dir.trim_end_matches('/'),
        name.trim_start_matches('/')
    )
}
