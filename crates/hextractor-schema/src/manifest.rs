use crate::paths;
use crate::types::{ArchiveName, ProductVersion};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("not a recognized offline image: missing '{path}'")]
    Missing { path: String },
    #[error("malformed manifest '{path}': {source}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to read manifest '{path}': {message}")]
    Image { path: String, message: String },
}

/// `/data/overview.json`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Overview {
    pub products: Vec<Product>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Product {
    pub name: String,
    pub version: ProductVersion,
    /// File name of this product's [`FileIndex`] under `/data/`.
    pub files: String,
}

/// `/packages/packages.json`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct PackageList {
    pub packages: Vec<Package>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Package {
    pub name: String,
    pub display_name: String,
}

impl Package {
    /// Name of the zip holding this package under `/packages/`.
    pub fn archive_name(&self) -> ArchiveName {
        ArchiveName::new(format!("{}.zip", self.display_name))
    }
}

/// One value of a [`FileIndex`]: `[archive_name, ...extra]`.
///
/// Only the archive name is interpreted; the trailing elements are kept as-is.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(try_from = "Vec<Value>", into = "Vec<Value>")]
pub struct FileRecord {
    pub archive: ArchiveName,
    pub extra: Vec<Value>,
}

impl TryFrom<Vec<Value>> for FileRecord {
    type Error = String;

    fn try_from(mut values: Vec<Value>) -> Result<Self, Self::Error> {
        if values.is_empty() {
            return Err("file record must not be empty".to_owned());
        }
        let extra = values.split_off(1);
        match values.pop() {
            Some(Value::String(archive)) if !archive.is_empty() => Ok(Self {
                archive: ArchiveName::new(archive),
                extra,
            }),
            Some(other) => Err(format!(
                "file record must start with an archive name, found {other}"
            )),
            None => Err("file record must not be empty".to_owned()),
        }
    }
}

impl From<FileRecord> for Vec<Value> {
    fn from(record: FileRecord) -> Self {
        let mut values = Vec::with_capacity(record.extra.len() + 1);
        values.push(Value::String(record.archive.into_inner()));
        values.extend(record.extra);
        values
    }
}

/// Per-product `/data/<files>`: relative file path → archive holding it.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(transparent)]
pub struct FileIndex {
    pub files: BTreeMap<String, FileRecord>,
}

impl FileIndex {
    /// Distinct archives referenced by this index. Each appears once no matter
    /// how many files it holds.
    pub fn archives(&self) -> BTreeSet<ArchiveName> {
        self.files.values().map(|r| r.archive.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct SharedTreeEntry {
    pub required: bool,
}

/// `/data/houdini_shfs_files.json`, keyed by path relative to the shared tree root.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct SharedTreeFlags {
    pub files: BTreeMap<String, SharedTreeEntry>,
}

impl SharedTreeFlags {
    /// `Some(required)` for a known file, `None` when the manifest does not list it.
    pub fn required(&self, relative: &str) -> Option<bool> {
        self.files.get(relative).map(|e| e.required)
    }
}

fn from_json<T: serde::de::DeserializeOwned>(path: &str, bytes: &[u8]) -> Result<T, ManifestError> {
    serde_json::from_slice(bytes).map_err(|source| ManifestError::Malformed {
        path: path.to_owned(),
        source,
    })
}

pub fn parse_overview(bytes: &[u8]) -> Result<Overview, ManifestError> {
    from_json(paths::OVERVIEW, bytes)
}

pub fn parse_packages(bytes: &[u8]) -> Result<PackageList, ManifestError> {
    from_json(paths::PACKAGES, bytes)
}

pub fn parse_file_index(path: &str, bytes: &[u8]) -> Result<FileIndex, ManifestError> {
    from_json(path, bytes)
}

pub fn parse_shared_tree_flags(bytes: &[u8]) -> Result<SharedTreeFlags, ManifestError> {
    from_json(paths::SHARED_TREE_FLAGS, bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_overview_and_ignores_extra_fields() {
        let input = br#"{
            "release": "production",
            "products": [
                {"name": "Houdini", "version": "20.5.278", "files": "houdini.json", "size": 1},
                {"name": "Engine Maya", "version": "20.5.278", "files": "engine_maya.json"}
            ]
        }"#;
        let overview = parse_overview(input).unwrap();
        assert_eq!(overview.products.len(), 2);
        assert_eq!(overview.products[0].name, "Houdini");
        assert_eq!(overview.products[0].version, "20.5.278");
        assert_eq!(overview.products[1].files, "engine_maya.json");
    }

    #[test]
    fn overview_without_products_is_malformed() {
        let err = parse_overview(br#"{"items": []}"#).unwrap_err();
        match err {
            ManifestError::Malformed { path, .. } => assert_eq!(path, paths::OVERVIEW),
            other => panic!("expected Malformed, got {other:?}"),
        }
    }

    #[test]
    fn package_archive_name_uses_display_name() {
        let list = parse_packages(
            br#"{"packages": [{"name": "SideFXLabs_20.5", "display_name": "SideFXLabs 20.5.1"}]}"#,
        )
        .unwrap();
        assert_eq!(list.packages[0].archive_name(), "SideFXLabs 20.5.1.zip");
    }

    #[test]
    fn file_index_deduplicates_archives() {
        let index = parse_file_index(
            "/data/houdini.json",
            br#"{
                "bin/houdini": ["core.tar", 1234, "abc"],
                "bin/hython": ["core.tar"],
                "toolkit/include/UT.h": ["hdk.tar", 99]
            }"#,
        )
        .unwrap();
        assert_eq!(index.len(), 3);
        let archives: Vec<_> = index.archives().into_iter().collect();
        assert_eq!(archives, vec![ArchiveName::from("core.tar"), "hdk.tar".into()]);
        assert_eq!(index.files["bin/houdini"].extra.len(), 2);
    }

    #[test]
    fn file_record_requires_leading_archive_name() {
        assert!(parse_file_index("/data/x.json", br#"{"a": []}"#).is_err());
        assert!(parse_file_index("/data/x.json", br#"{"a": [12, "core.tar"]}"#).is_err());
        assert!(parse_file_index("/data/x.json", br#"{"a": [""]}"#).is_err());
    }

    #[test]
    fn malformed_file_index_names_its_path() {
        let err = parse_file_index("/data/houdini.json", b"not json").unwrap_err();
        assert!(err.to_string().contains("/data/houdini.json"));
    }

    #[test]
    fn file_record_serializes_back_to_array() {
        let record = FileRecord {
            archive: ArchiveName::from("core.tar"),
            extra: vec![Value::from(7)],
        };
        assert_eq!(serde_json::to_string(&record).unwrap(), r#"["core.tar",7]"#);
    }

    #[test]
    fn shared_tree_flags_lookup() {
        let flags = parse_shared_tree_flags(
            br#"{"files": {"otls/a.hda": {"required": true}, "docs/b.txt": {"required": false}}}"#,
        )
        .unwrap();
        assert_eq!(flags.required("otls/a.hda"), Some(true));
        assert_eq!(flags.required("docs/b.txt"), Some(false));
        assert_eq!(flags.required("docs/missing.txt"), None);
    }

    #[test]
    fn shared_tree_entry_requires_flag() {
        assert!(parse_shared_tree_flags(br#"{"files": {"a": {}}}"#).is_err());
    }
}
