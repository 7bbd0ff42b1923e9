use crate::{components, normalize, DirListing, Image, ImageError, ReadSeek};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// An image mounted (`mount -o loop,ro`) or unpacked to a host directory.
#[derive(Debug, Clone)]
pub struct DirImage {
    root: PathBuf,
}

impl DirImage {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, ImageError> {
        let root: PathBuf = root.into();
        if !root.is_dir() {
            return Err(ImageError::NotFound(format!(
                "{} is not a directory (mount the image and pass its mount point)",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    fn host_path(&self, path: &str) -> Result<PathBuf, ImageError> {
        let mut host = self.root.clone();
        host.extend(components(path)?);
        Ok(host)
    }
}

fn image_path(root: &Path, host: &Path) -> String {
    let rel = host.strip_prefix(root).unwrap_or(host);
    let parts: Vec<_> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    format!("/{}", parts.join("/"))
}

impl Image for DirImage {
    fn describe(&self) -> String {
        self.root.display().to_string()
    }

    fn open(&self, path: &str) -> Result<Box<dyn ReadSeek + '_>, ImageError> {
        let host = self.host_path(path)?;
        match fs::File::open(&host) {
            Ok(f) => Ok(Box::new(f)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(ImageError::NotFound(normalize(path)?))
            }
            Err(e) => Err(ImageError::Io(e)),
        }
    }

    fn walk(&self, root: &str) -> Result<Vec<DirListing>, ImageError> {
        let host_root = self.host_path(root)?;
        if !host_root.is_dir() {
            return Err(ImageError::NotFound(normalize(root)?));
        }

        let mut listings: Vec<DirListing> = Vec::new();
        let mut index: HashMap<PathBuf, usize> = HashMap::new();

        for entry in WalkDir::new(&host_root).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                ImageError::Io(e.into_io_error().unwrap_or_else(|| {
                    io::Error::other(format!("walk failed below {}", host_root.display()))
                }))
            })?;
            let ft = entry.file_type();
            let name = entry.file_name().to_string_lossy().into_owned();

            if entry.depth() > 0 {
                let parent = entry.path().parent().map(Path::to_path_buf);
                let slot = parent.and_then(|p| index.get(&p).copied());
                if let Some(slot) = slot {
                    if ft.is_dir() {
                        listings[slot].dirs.push(name);
                    } else {
                        // Symlinks and special files count as files.
                        if !ft.is_file() {
                            debug!("non-regular entry: {}", entry.path().display());
                        }
                        listings[slot].files.push(name);
                    }
                }
            }

            if ft.is_dir() {
                index.insert(entry.path().to_path_buf(), listings.len());
                listings.push(DirListing {
                    path: image_path(&self.root, entry.path()),
                    ..DirListing::default()
                });
            }
        }
        Ok(listings)
    }
}
