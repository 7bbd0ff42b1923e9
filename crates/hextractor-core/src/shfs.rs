//! Selective extraction of the shared Houdini file system tree.
//!
//! Every file under `/data/shfs` must be listed in
//! `/data/houdini_shfs_files.json` with a `required` flag. Optional files are
//! only copied when optional inclusion is enabled. Source directory
//! permissions are not imported: directories are created 0755 and files get
//! the process default.

use crate::CoreError;
use hextractor_image::Image;
use hextractor_schema::{paths, SharedTreeFlags};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SharedFile {
    /// Image path of the file.
    pub source: String,
    /// Path relative to the shared tree root, as keyed in the manifest.
    pub relative: String,
    pub destination: PathBuf,
    pub required: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SharedTreePlan {
    pub root: PathBuf,
    /// Destination directories, parents before children.
    pub dirs: Vec<PathBuf>,
    pub files: Vec<SharedFile>,
    /// Relative paths of optional files left out.
    pub skipped: Vec<String>,
}

/// Walk the shared tree and decide, file by file, what to copy.
///
/// Nothing is written. A file the flags manifest does not list fails the
/// whole plan.
pub fn plan_shared_tree(
    image: &dyn Image,
    flags: &SharedTreeFlags,
    destination: &Path,
    include_optional: bool,
) -> Result<SharedTreePlan, CoreError> {
    let mut plan = SharedTreePlan {
        root: destination.to_path_buf(),
        ..SharedTreePlan::default()
    };

    for listing in image.walk(paths::SHARED_TREE_ROOT)? {
        let rel_dir = listing
            .path
            .strip_prefix(paths::SHARED_TREE_ROOT)
            .unwrap_or(listing.path.as_str())
            .trim_matches('/');

        let mut dest_dir = destination.to_path_buf();
        dest_dir.extend(rel_dir.split('/').filter(|p| !p.is_empty()));
        plan.dirs.push(dest_dir.clone());

        for name in &listing.files {
            let relative = if rel_dir.is_empty() {
                name.clone()
            } else {
                format!("{rel_dir}/{name}")
            };
            let Some(required) = flags.required(&relative) else {
                return Err(CoreError::UnknownSharedFile { path: relative });
            };
            if !required && !include_optional {
                debug!("skipping optional {relative}");
                plan.skipped.push(relative);
                continue;
            }
            plan.files.push(SharedFile {
                source: paths::join(&listing.path, name),
                destination: dest_dir.join(name),
                relative,
                required,
            });
        }
    }

    info!(
        "shared tree: {} files to copy, {} optional skipped",
        plan.files.len(),
        plan.skipped.len()
    );
    Ok(plan)
}

fn create_dir(path: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        fs::DirBuilder::new().recursive(true).mode(0o755).create(path)
    }
    #[cfg(not(unix))]
    {
        fs::create_dir_all(path)
    }
}

/// Materialize a plan: create its directories (existing ones are left as they
/// are) and copy each file. Returns the number of bytes copied.
pub fn extract_shared_tree(image: &dyn Image, plan: &SharedTreePlan) -> Result<u64, CoreError> {
    for dir in &plan.dirs {
        create_dir(dir).map_err(|source| CoreError::SharedTreeDir {
            path: dir.clone(),
            source,
        })?;
    }
    let mut bytes = 0;
    for file in &plan.files {
        debug!("copying {} -> {}", file.source, file.destination.display());
        bytes += image
            .copy_to(&file.source, &file.destination)
            .map_err(|source| CoreError::SharedTreeCopy {
                path: file.relative.clone(),
                source,
            })?;
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hextractor_image::MemoryImage;
    use hextractor_schema::parse_shared_tree_flags;

    fn image() -> MemoryImage {
        let mut image = MemoryImage::new();
        image
            .add_file("/data/shfs/houdini.env", "required")
            .add_file("/data/shfs/otls/core.hda", "required")
            .add_file("/data/shfs/docs/guide.pdf", "optional")
            .add_dir("/data/shfs/empty");
        image
    }

    fn flags(json: &str) -> SharedTreeFlags {
        parse_shared_tree_flags(json.as_bytes()).unwrap()
    }

    const ALL_FLAGS: &str = r#"{"files": {
        "houdini.env": {"required": true},
        "otls/core.hda": {"required": true},
        "docs/guide.pdf": {"required": false}
    }}"#;

    #[test]
    fn optional_files_skipped_when_disabled() {
        let dest = tempfile::tempdir().unwrap();
        let plan = plan_shared_tree(&image(), &flags(ALL_FLAGS), dest.path(), false).unwrap();
        let rel: Vec<_> = plan.files.iter().map(|f| f.relative.as_str()).collect();
        assert_eq!(rel, vec!["houdini.env", "otls/core.hda"]);
        assert_eq!(plan.skipped, vec!["docs/guide.pdf"]);

        extract_shared_tree(&image(), &plan).unwrap();
        assert!(dest.path().join("otls/core.hda").is_file());
        assert!(!dest.path().join("docs/guide.pdf").exists());
        // Directory structure is recreated even where nothing is copied.
        assert!(dest.path().join("docs").is_dir());
        assert!(dest.path().join("empty").is_dir());
    }

    #[test]
    fn optional_files_copied_when_enabled() {
        let dest = tempfile::tempdir().unwrap();
        let plan = plan_shared_tree(&image(), &flags(ALL_FLAGS), dest.path(), true).unwrap();
        assert!(plan.skipped.is_empty());
        extract_shared_tree(&image(), &plan).unwrap();
        assert_eq!(
            fs::read_to_string(dest.path().join("docs/guide.pdf")).unwrap(),
            "optional"
        );
    }

    #[test]
    fn unlisted_file_fails_before_anything_is_copied() {
        let dest = tempfile::tempdir().unwrap();
        let partial = r#"{"files": {"houdini.env": {"required": true}}}"#;
        let err = plan_shared_tree(&image(), &flags(partial), dest.path(), true).unwrap_err();
        match err {
            CoreError::UnknownSharedFile { path } => assert_eq!(path, "docs/guide.pdf"),
            other => panic!("expected UnknownSharedFile, got {other:?}"),
        }
        assert!(!dest.path().join("docs/guide.pdf").exists());
        assert!(!dest.path().join("houdini.env").exists());
    }

    #[test]
    fn existing_directories_are_left_alone() {
        let dest = tempfile::tempdir().unwrap();
        fs::create_dir_all(dest.path().join("otls")).unwrap();
        fs::write(dest.path().join("otls/local.hda"), "mine").unwrap();
        let plan = plan_shared_tree(&image(), &flags(ALL_FLAGS), dest.path(), false).unwrap();
        extract_shared_tree(&image(), &plan).unwrap();
        assert_eq!(
            fs::read_to_string(dest.path().join("otls/local.hda")).unwrap(),
            "mine"
        );
    }

    #[test]
    fn missing_tree_is_an_image_error() {
        let dest = tempfile::tempdir().unwrap();
        let image = MemoryImage::new().with_file("/data/overview.json", "{}");
        let err = plan_shared_tree(&image, &flags(ALL_FLAGS), dest.path(), true).unwrap_err();
        assert!(matches!(err, CoreError::Image(_)));
    }

    #[test]
    fn blocked_directory_is_an_extraction_error() {
        let dest = tempfile::tempdir().unwrap();
        let plan = plan_shared_tree(&image(), &flags(ALL_FLAGS), dest.path(), false).unwrap();
        // A regular file where the tree root should go.
        fs::remove_dir(dest.path()).unwrap();
        fs::write(dest.path(), "in the way").unwrap();

        let err = extract_shared_tree(&image(), &plan).unwrap_err();
        match &err {
            CoreError::SharedTreeDir { path, .. } => assert!(path.starts_with(dest.path())),
            other => panic!("expected SharedTreeDir, got {other:?}"),
        }
        assert!(err.to_string().starts_with("extraction failed"));
        fs::remove_file(dest.path()).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn new_directories_are_0755() {
        use std::os::unix::fs::PermissionsExt;
        let dest = tempfile::tempdir().unwrap();
        let plan = plan_shared_tree(&image(), &flags(ALL_FLAGS), dest.path(), false).unwrap();
        extract_shared_tree(&image(), &plan).unwrap();
        let mode = fs::metadata(dest.path().join("otls"))
            .unwrap()
            .permissions()
            .mode();
        // umask can only clear bits.
        assert_eq!(mode & 0o700, 0o700);
        assert_eq!(mode & 0o777 & !0o755, 0);
    }
}
