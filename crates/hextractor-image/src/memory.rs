use crate::{normalize, DirListing, Image, ImageError, ReadSeek};
use std::collections::{BTreeMap, BTreeSet};
use std::io::Cursor;

/// In-memory image. Directories exist implicitly for every stored file and
/// can be added explicitly to model empty ones.
#[derive(Debug, Clone, Default)]
pub struct MemoryImage {
    files: BTreeMap<String, Vec<u8>>,
    dirs: BTreeSet<String>,
}

fn parent_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(i) => &path[..i],
    }
}

fn name_of(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

impl MemoryImage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a file, creating its parent directories.
    ///
    /// Panics if `path` contains a `..` component.
    pub fn add_file(&mut self, path: &str, contents: impl Into<Vec<u8>>) -> &mut Self {
        let path = normalize(path).unwrap_or_else(|e| panic!("{e}"));
        let mut dir = parent_of(&path).to_owned();
        while dir != "/" {
            let next = parent_of(&dir).to_owned();
            self.dirs.insert(dir);
            dir = next;
        }
        self.files.insert(path, contents.into());
        self
    }

    pub fn add_dir(&mut self, path: &str) -> &mut Self {
        let path = normalize(path).unwrap_or_else(|e| panic!("{e}"));
        let mut dir = path;
        while dir != "/" {
            let next = parent_of(&dir).to_owned();
            self.dirs.insert(dir);
            dir = next;
        }
        self
    }

    #[must_use]
    pub fn with_file(mut self, path: &str, contents: impl Into<Vec<u8>>) -> Self {
        self.add_file(path, contents);
        self
    }

    fn is_dir(&self, path: &str) -> bool {
        path == "/" || self.dirs.contains(path)
    }

    fn visit(&self, dir: &str, out: &mut Vec<DirListing>) {
        let dirs: Vec<&String> = self.dirs.iter().filter(|d| parent_of(d) == dir).collect();
        let files: Vec<String> = self
            .files
            .keys()
            .filter(|f| parent_of(f) == dir)
            .map(|f| name_of(f).to_owned())
            .collect();
        out.push(DirListing {
            path: dir.to_owned(),
            dirs: dirs.iter().map(|d| name_of(d).to_owned()).collect(),
            files,
        });
        for d in dirs {
            self.visit(d, out);
        }
    }
}

impl Image for MemoryImage {
    fn describe(&self) -> String {
        "<memory>".to_owned()
    }

    fn open(&self, path: &str) -> Result<Box<dyn ReadSeek + '_>, ImageError> {
        let path = normalize(path)?;
        match self.files.get(&path) {
            Some(data) => Ok(Box::new(Cursor::new(data.as_slice()))),
            None => Err(ImageError::NotFound(path)),
        }
    }

    fn walk(&self, root: &str) -> Result<Vec<DirListing>, ImageError> {
        let root = normalize(root)?;
        if !self.is_dir(&root) {
            return Err(ImageError::NotFound(root));
        }
        let mut out = Vec::new();
        self.visit(&root, &mut out);
        Ok(out)
    }
}
