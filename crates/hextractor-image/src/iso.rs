use crate::{components, normalize, DirListing, Image, ImageError, ReadSeek};
use cdfs::{DirectoryEntry, ISO9660};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

type Entry = DirectoryEntry<fs::File>;

/// An ISO 9660 image file read in place, without mounting it.
///
/// Rock Ridge names are used when the image carries them; plain ISO 9660
/// names have their `;1` version suffix removed.
pub struct IsoImage {
    path: PathBuf,
    iso: ISO9660<fs::File>,
}

impl IsoImage {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ImageError> {
        let path: PathBuf = path.into();
        let file = fs::File::open(&path)?;
        let iso = ISO9660::new(file).map_err(|e| iso_error(&path, &e))?;
        debug!("opened ISO 9660 image {}", path.display());
        Ok(Self { path, iso })
    }

    fn lookup(&self, path: &str) -> Result<Option<Entry>, ImageError> {
        let parts = components(path)?;
        let Some(mut entry) = self.iso.open("/").map_err(|e| iso_error(&self.path, &e))? else {
            return Ok(None);
        };
        for part in parts {
            let DirectoryEntry::Directory(dir) = entry else {
                return Ok(None);
            };
            let mut found = None;
            for child in dir.contents() {
                let child = child.map_err(|e| iso_error(&self.path, &e))?;
                if entry_name(&child).as_deref() == Some(part) {
                    found = Some(child);
                    break;
                }
            }
            match found {
                Some(child) => entry = child,
                None => return Ok(None),
            }
        }
        Ok(Some(entry))
    }

    fn visit(&self, image_path: &str, entry: Entry, out: &mut Vec<DirListing>) -> Result<(), ImageError> {
        let DirectoryEntry::Directory(dir) = entry else {
            return Ok(());
        };
        let mut listing = DirListing {
            path: image_path.to_owned(),
            ..DirListing::default()
        };
        let mut subdirs = Vec::new();
        for child in dir.contents() {
            let child = child.map_err(|e| iso_error(&self.path, &e))?;
            let Some(name) = entry_name(&child) else {
                continue;
            };
            if matches!(child, DirectoryEntry::Directory(_)) {
                listing.dirs.push(name.clone());
                subdirs.push((name, child));
            } else {
                listing.files.push(name);
            }
        }
        listing.dirs.sort();
        listing.files.sort();
        subdirs.sort_by(|a, b| a.0.cmp(&b.0));
        out.push(listing);

        for (name, child) in subdirs {
            let child_path = if image_path == "/" {
                format!("/{name}")
            } else {
                format!("{image_path}/{name}")
            };
            self.visit(&child_path, child, out)?;
        }
        Ok(())
    }
}

fn iso_error(path: &Path, err: &impl std::fmt::Display) -> ImageError {
    ImageError::Iso(format!("{}: {err}", path.display()))
}

/// Host-facing name of a directory record, or `None` for the `.` and `..`
/// records.
fn entry_name(entry: &Entry) -> Option<String> {
    let raw = entry.identifier();
    if matches!(raw, "" | "." | ".." | "\0" | "\u{1}") {
        return None;
    }
    Some(strip_version(raw).to_owned())
}

/// `NAME.EXT;1` -> `NAME.EXT`, `NAME.;1` -> `NAME`.
fn strip_version(identifier: &str) -> &str {
    let name = match identifier.rsplit_once(';') {
        Some((name, version)) if version.chars().all(|c| c.is_ascii_digit()) => name,
        _ => identifier,
    };
    match name.strip_suffix('.') {
        Some(stem) if !stem.is_empty() => stem,
        _ => name,
    }
}

impl Image for IsoImage {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn open(&self, path: &str) -> Result<Box<dyn ReadSeek + '_>, ImageError> {
        match self.lookup(path)? {
            Some(DirectoryEntry::File(file)) => Ok(Box::new(file.read())),
            Some(_) => Err(ImageError::InvalidPath(format!(
                "{} is not a regular file",
                normalize(path)?
            ))),
            None => Err(ImageError::NotFound(normalize(path)?)),
        }
    }

    fn walk(&self, root: &str) -> Result<Vec<DirListing>, ImageError> {
        let root = normalize(root)?;
        match self.lookup(&root)? {
            Some(entry @ DirectoryEntry::Directory(_)) => {
                let mut out = Vec::new();
                self.visit(&root, entry, &mut out)?;
                Ok(out)
            }
            _ => Err(ImageError::NotFound(root)),
        }
    }
}
