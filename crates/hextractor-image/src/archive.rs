use crate::ImageError;
use flate2::read::GzDecoder;
use std::fmt;
use std::fs;
use std::io::{self, BufRead, BufReader, Read, Seek};
use std::path::{Component, Path};
use tracing::debug;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// Plain or gzip-compressed tar, detected from the stream.
    Tar,
    Zip,
}

impl ArchiveFormat {
    pub fn unpack<R: Read + Seek>(self, reader: R, dest: &Path) -> Result<usize, ImageError> {
        match self {
            Self::Tar => unpack_tar(reader, dest),
            Self::Zip => unpack_zip(reader, dest),
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tar => f.write_str("tar"),
            Self::Zip => f.write_str("zip"),
        }
    }
}

/// Reject absolute paths and `..` components.
fn ensure_enclosed(path: &Path) -> Result<(), ImageError> {
    let escapes = path.components().any(|c| {
        matches!(
            c,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    if escapes {
        return Err(ImageError::UnsafeEntry(path.display().to_string()));
    }
    Ok(())
}

/// Extract a tar stream into `dest`, returning the number of entries written.
///
/// Gzip compression is detected from the first bytes. Entries that would land
/// outside `dest` fail the whole extraction. Permission bits are applied
/// without setuid/setgid/sticky and extended attributes are not restored.
pub fn unpack_tar<R: Read>(reader: R, dest: &Path) -> Result<usize, ImageError> {
    fs::create_dir_all(dest)?;
    let mut buffered = BufReader::new(reader);
    let gzip = buffered.fill_buf()?.starts_with(&GZIP_MAGIC);
    if gzip {
        debug!("gzip-compressed tar stream");
        unpack_tar_archive(tar::Archive::new(GzDecoder::new(buffered)), dest)
    } else {
        unpack_tar_archive(tar::Archive::new(buffered), dest)
    }
}

fn unpack_tar_archive<R: Read>(mut ar: tar::Archive<R>, dest: &Path) -> Result<usize, ImageError> {
    ar.set_preserve_permissions(false);
    ar.set_unpack_xattrs(false);
    ar.set_overwrite(true);

    let mut count = 0;
    for entry in ar.entries()? {
        let mut entry = entry?;
        let path = entry.path()?.into_owned();
        ensure_enclosed(&path)?;
        if !entry.unpack_in(dest)? {
            return Err(ImageError::UnsafeEntry(path.display().to_string()));
        }
        count += 1;
    }
    Ok(count)
}

/// Extract a zip stream into `dest`, returning the number of files written.
///
/// Entries whose names are not enclosed in `dest` fail the whole extraction.
pub fn unpack_zip<R: Read + Seek>(reader: R, dest: &Path) -> Result<usize, ImageError> {
    fs::create_dir_all(dest)?;
    let mut archive = zip::ZipArchive::new(reader)?;

    let mut count = 0;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(rel) = entry.enclosed_name() else {
            return Err(ImageError::UnsafeEntry(entry.name().to_owned()));
        };
        let out_path = dest.join(rel);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = fs::File::create(&out_path)?;
        io::copy(&mut entry, &mut out)?;
        if let Some(mode) = entry.unix_mode() {
            apply_mode(&out_path, mode)?;
        }
        count += 1;
    }
    Ok(count)
}

#[cfg(unix)]
fn apply_mode(path: &Path, mode: u32) -> Result<(), ImageError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o777))?;
    Ok(())
}

#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
fn apply_mode(_path: &Path, _mode: u32) -> Result<(), ImageError> {
    Ok(())
}
