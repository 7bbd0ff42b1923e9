//! Install planning and selective extraction for hextractor.
//!
//! This crate turns an [`InstallSelection`] and an offline image into an
//! [`InstallPlan`]: which products and packages to install, where each one
//! goes once its destination template is expanded, which archives each one
//! needs, and which shared-tree files to copy. The [`Installer`] then executes
//! the plan sequentially and produces an [`InstallReport`].

pub mod catalog;
pub mod engine;
pub mod executor;
pub mod manifests;
pub mod report;
pub mod resolve;
pub mod selection;
pub mod shfs;

pub use catalog::{PackageKind, PackageRule, ProductKind, PACKAGE_RULES};
pub use engine::{InstallEvent, InstallPlan, Installer};
pub use executor::extract_target;
pub use report::{ArchiveReport, InstallReport, SharedTreeReport, TargetReport};
pub use resolve::{resolve_packages, resolve_products, ProductResolution, ResolvedTarget, TargetKind};
pub use selection::{InstallSelection, SharedTreeSelection, TargetSelection, INSTALL_ROOT, ISO_VERSION};
pub use shfs::{extract_shared_tree, plan_shared_tree, SharedFile, SharedTreePlan};

use hextractor_image::ImageError;
use hextractor_schema::{ManifestError, TemplateError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("manifest error: {0}")]
    Manifest(#[from] ManifestError),
    #[error("template error for {label}: {source}")]
    Template {
        label: String,
        #[source]
        source: TemplateError,
    },
    #[error("template error for {label}: destination expands to an empty path")]
    EmptyDestination { label: String },
    #[error("shared tree file '{path}' is not listed in the shared tree manifest")]
    UnknownSharedFile { path: String },
    #[error("extraction failed for {label} ({archive}): {source}")]
    Extraction {
        label: String,
        archive: String,
        #[source]
        source: ImageError,
    },
    #[error("extraction failed for shared tree file '{path}': {source}")]
    SharedTreeCopy {
        path: String,
        #[source]
        source: ImageError,
    },
    #[error("extraction failed for shared tree directory '{}': {source}", path.display())]
    SharedTreeDir {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("image error: {0}")]
    Image(#[from] ImageError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
