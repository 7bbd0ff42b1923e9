use crate::catalog::{PackageKind, ProductKind};
use hextractor_schema::Vars;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Variable holding the install root, substitutable into any destination.
pub const INSTALL_ROOT: &str = "install_root";
/// Variable bound to the version of the product being resolved.
pub const ISO_VERSION: &str = "iso_version";
/// Variable holding the shared tree destination template.
pub const SHFS_DIR: &str = "shfs_dir";

/// Whether one product or package is wanted, and its raw destination template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSelection {
    pub enabled: bool,
    pub dir: String,
}

impl TargetSelection {
    pub fn new(enabled: bool, dir: impl Into<String>) -> Self {
        Self {
            enabled,
            dir: dir.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedTreeSelection {
    pub enabled: bool,
    pub include_optional: bool,
    pub dir: String,
}

/// Everything the user asked for, with destinations still unexpanded.
///
/// Products or packages without an entry are treated as not selected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallSelection {
    pub install_root: String,
    pub products: BTreeMap<ProductKind, TargetSelection>,
    pub packages: BTreeMap<PackageKind, TargetSelection>,
    pub shared_tree: SharedTreeSelection,
}

impl InstallSelection {
    pub fn product(&self, kind: ProductKind) -> Option<&TargetSelection> {
        self.products.get(&kind).filter(|t| t.enabled)
    }

    pub fn package(&self, kind: PackageKind) -> Option<&TargetSelection> {
        self.packages.get(&kind).filter(|t| t.enabled)
    }

    pub fn any_package_enabled(&self) -> bool {
        self.packages.values().any(|t| t.enabled)
    }

    /// The base variable bag: `install_root` plus every `<key>_dir` template,
    /// enabled or not, so templates may reference each other freely.
    pub fn vars(&self) -> Vars {
        let mut pairs: Vec<(String, String)> = vec![
            (INSTALL_ROOT.to_owned(), self.install_root.clone()),
            (SHFS_DIR.to_owned(), self.shared_tree.dir.clone()),
        ];
        pairs.extend(
            self.products
                .iter()
                .map(|(kind, t)| (kind.dir_var(), t.dir.clone())),
        );
        pairs.extend(
            self.packages
                .iter()
                .map(|(kind, t)| (kind.dir_var(), t.dir.clone())),
        );
        pairs.into_iter().collect()
    }
}
