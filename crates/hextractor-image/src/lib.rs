//! Read access to an offline image and traversal-safe archive extraction.
//!
//! The installer never decodes the image format itself. It talks to an
//! [`Image`]: something that can open an entry as a byte stream, list a
//! directory tree, and copy a single entry out to the host filesystem.
//! [`DirImage`] serves an image that has been mounted or unpacked to a host
//! directory; [`IsoImage`] reads an ISO 9660 image file in place;
//! [`MemoryImage`] keeps everything in memory for tests and
//! tooling. The `archive` module stream-extracts tar and zip archives read
//! from an image while refusing entries that would escape the destination.

pub mod archive;
pub mod dir;
#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;
pub mod iso;
pub mod memory;

pub use archive::{unpack_tar, unpack_zip, ArchiveFormat};
pub use dir::DirImage;
pub use iso::IsoImage;
pub use memory::MemoryImage;

use std::fs;
use std::io::{self, Read, Seek};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("image entry not found: {0}")]
    NotFound(String),
    #[error("invalid image path: {0}")]
    InvalidPath(String),
    #[error("image I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("ISO 9660 error: {0}")]
    Iso(String),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("archive entry escapes the destination directory: {0}")]
    UnsafeEntry(String),
}

impl ImageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// A readable, seekable stream over one image entry.
pub trait ReadSeek: Read + Seek {}

impl<T: Read + Seek> ReadSeek for T {}

/// One directory visited by [`Image::walk`].
///
/// `path` is the image path of the directory; `dirs` and `files` are the bare
/// names of its immediate children, sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirListing {
    pub path: String,
    pub dirs: Vec<String>,
    pub files: Vec<String>,
}

/// Capabilities the installer needs from an image.
///
/// Image paths are `/`-separated and rooted at the image root
/// (`/data/overview.json`). Implementations must report a missing entry as
/// [`ImageError::NotFound`]; that is how an unsupported image layout is told
/// apart from an I/O failure.
pub trait Image {
    /// Short human-readable description used in diagnostics.
    fn describe(&self) -> String;

    fn open(&self, path: &str) -> Result<Box<dyn ReadSeek + '_>, ImageError>;

    /// Depth-first, pre-order listing of `root` and every directory below it.
    fn walk(&self, root: &str) -> Result<Vec<DirListing>, ImageError>;

    fn read(&self, path: &str) -> Result<Vec<u8>, ImageError> {
        let mut buf = Vec::new();
        self.open(path)?.read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// Copy one entry byte-for-byte to `dest`, replacing any existing file.
    /// Returns the number of bytes written.
    fn copy_to(&self, path: &str, dest: &Path) -> Result<u64, ImageError> {
        let mut src = self.open(path)?;
        let mut out = fs::File::create(dest)?;
        Ok(io::copy(&mut src, &mut out)?)
    }
}

/// Split an image path into its components, rejecting `..`.
pub(crate) fn components(path: &str) -> Result<Vec<&str>, ImageError> {
    let mut parts = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => return Err(ImageError::InvalidPath(path.to_owned())),
            p => parts.push(p),
        }
    }
    Ok(parts)
}

/// Canonical `/a/b/c` form of an image path.
pub(crate) fn normalize(path: &str) -> Result<String, ImageError> {
    Ok(format!("/{}", components(path)?.join("/")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_separators() {
        assert_eq!(normalize("data//shfs/./a").unwrap(), "/data/shfs/a");
        assert_eq!(normalize("/").unwrap(), "/");
    }

    #[test]
    fn normalize_rejects_parent_components() {
        assert!(matches!(
            normalize("/data/../etc/passwd"),
            Err(ImageError::InvalidPath(_))
        ));
    }

    #[test]
    fn not_found_is_distinguishable() {
        assert!(ImageError::NotFound("/x".to_owned()).is_not_found());
        assert!(!ImageError::InvalidPath("/x".to_owned()).is_not_found());
    }
}
