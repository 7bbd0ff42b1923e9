//! Manifest model, well-known image paths, and template expansion for hextractor.
//!
//! This crate defines the schema layer: typed views over the JSON manifests an
//! offline image carries (`Overview`, `PackageList`, `FileIndex`,
//! `SharedTreeFlags`), the fixed image-relative paths they live at, and the
//! fixed-point `{placeholder}` expander used for destination paths.

pub mod manifest;
pub mod paths;
pub mod template;
pub mod types;

pub use manifest::{
    parse_file_index, parse_overview, parse_packages, parse_shared_tree_flags, FileIndex,
    FileRecord, ManifestError, Overview, Package, PackageList, Product, SharedTreeEntry,
    SharedTreeFlags,
};
pub use template::{expand, placeholders, TemplateError, Vars};
pub use types::{ArchiveName, ProductVersion};
