//! Products and packages this installer knows how to place.
//!
//! Anything an image ships that is not listed here is skipped without error,
//! so newer images with extra products keep working with an older installer.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductKind {
    LicenseServer,
    HqueueServer,
    HqueueClient,
    EngineMaya,
    EngineUnity,
    EngineUnreal,
    Houdini,
    Hserver,
}

impl ProductKind {
    pub const ALL: [Self; 8] = [
        Self::LicenseServer,
        Self::HqueueServer,
        Self::HqueueClient,
        Self::EngineMaya,
        Self::EngineUnity,
        Self::EngineUnreal,
        Self::Houdini,
        Self::Hserver,
    ];

    /// Exact `name` used in `overview.json`.
    pub fn manifest_name(self) -> &'static str {
        match self {
            Self::LicenseServer => "License Server",
            Self::HqueueServer => "HQueue Server",
            Self::HqueueClient => "HQueue Client",
            Self::EngineMaya => "Engine Maya",
            Self::EngineUnity => "Engine Unity",
            Self::EngineUnreal => "Engine Unreal",
            Self::Houdini => "Houdini",
            Self::Hserver => "Hserver",
        }
    }

    /// Selection key; the destination variable is `{key}_dir`.
    pub fn key(self) -> &'static str {
        match self {
            Self::LicenseServer => "license_server",
            Self::HqueueServer => "hqueue_server",
            Self::HqueueClient => "hqueue_client",
            Self::EngineMaya => "engine_maya",
            Self::EngineUnity => "engine_unity",
            Self::EngineUnreal => "engine_unreal",
            Self::Houdini => "houdini",
            Self::Hserver => "hserver",
        }
    }

    pub fn from_manifest_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.manifest_name() == name)
    }

    pub fn dir_var(self) -> String {
        format!("{}_dir", self.key())
    }
}

impl fmt::Display for ProductKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.manifest_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageKind {
    SideFxLabs,
}

impl PackageKind {
    pub fn key(self) -> &'static str {
        match self {
            Self::SideFxLabs => "sidefxlabs",
        }
    }

    pub fn dir_var(self) -> String {
        format!("{}_dir", self.key())
    }
}

/// Maps packages whose `name` starts with `prefix` to `kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackageRule {
    pub prefix: &'static str,
    pub kind: PackageKind,
}

impl PackageRule {
    pub fn matches(&self, package_name: &str) -> bool {
        package_name.starts_with(self.prefix)
    }
}

/// Evaluated in order; the first rule that matches and is enabled wins.
pub const PACKAGE_RULES: &[PackageRule] = &[PackageRule {
    prefix: "SideFXLabs",
    kind: PackageKind::SideFxLabs,
}];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_names_round_trip() {
        for kind in ProductKind::ALL {
            assert_eq!(ProductKind::from_manifest_name(kind.manifest_name()), Some(kind));
        }
    }

    #[test]
    fn manifest_name_match_is_exact() {
        assert_eq!(ProductKind::from_manifest_name("houdini"), None);
        assert_eq!(ProductKind::from_manifest_name("Houdini Indie"), None);
        assert_eq!(ProductKind::from_manifest_name("Houdini"), Some(ProductKind::Houdini));
    }

    #[test]
    fn dir_vars_follow_keys() {
        assert_eq!(ProductKind::EngineUnreal.dir_var(), "engine_unreal_dir");
        assert_eq!(PackageKind::SideFxLabs.dir_var(), "sidefxlabs_dir");
    }

    #[test]
    fn labs_rule_matches_versioned_names() {
        let rule = PACKAGE_RULES[0];
        assert!(rule.matches("SideFXLabs_2.0"));
        assert!(rule.matches("SideFXLabs"));
        assert!(!rule.matches("OtherTool"));
        assert!(!rule.matches("sidefxlabs_2.0"));
    }
}
