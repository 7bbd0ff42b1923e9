//! Layered install settings: platform defaults, then an optional TOML file,
//! then command-line flags.

use hextractor_core::{
    InstallSelection, PackageKind, ProductKind, SharedTreeSelection, TargetSelection,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Destination templates. Each one may reference `{install_root}`,
/// `{iso_version}` and any other `<key>_dir`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DirsConfig {
    pub houdini: Option<String>,
    pub engine_maya: Option<String>,
    pub engine_unity: Option<String>,
    pub engine_unreal: Option<String>,
    pub sidefxlabs: Option<String>,
    pub shfs: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstallConfig {
    pub houdini: Option<bool>,
    pub engine_maya: Option<bool>,
    pub engine_unity: Option<bool>,
    pub engine_unreal: Option<bool>,
    pub sidefxlabs: Option<bool>,
    pub shfs: Option<bool>,
    pub optional_shfs: Option<bool>,
}

/// One settings layer. Unset fields fall through to the layer below.
///
/// ```toml
/// install_root = "/srv/sidefx"
///
/// [dirs]
/// houdini = "{install_root}/houdini/{iso_version}"
///
/// [install]
/// engine_maya = true
/// optional_shfs = false
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub install_root: Option<String>,
    #[serde(default)]
    pub dirs: DirsConfig,
    #[serde(default)]
    pub install: InstallConfig,
}

impl Settings {
    /// Defaults matching the layout SideFX installers use on this platform.
    pub fn platform_defaults() -> Self {
        let (install_root, houdini, shfs, sidefxlabs) = if cfg!(windows) {
            (
                "C:/Program Files/Side Effects Software",
                "{install_root}/Houdini {iso_version}",
                "{install_root}/shfs",
                "{install_root}/sidefx_packages",
            )
        } else {
            (
                "/opt",
                "{install_root}/hfs{iso_version}",
                "{install_root}/sidefx/shfs",
                "{install_root}/sidefx/sidefx_packages",
            )
        };
        Self {
            install_root: Some(install_root.to_owned()),
            dirs: DirsConfig {
                houdini: Some(houdini.to_owned()),
                engine_maya: Some("{houdini_dir}/engine/maya".to_owned()),
                engine_unity: Some("{houdini_dir}/engine/unity".to_owned()),
                engine_unreal: Some("{houdini_dir}/engine/unreal".to_owned()),
                sidefxlabs: Some(sidefxlabs.to_owned()),
                shfs: Some(shfs.to_owned()),
            },
            install: InstallConfig {
                houdini: Some(true),
                engine_maya: Some(false),
                engine_unity: Some(false),
                engine_unreal: Some(false),
                sidefxlabs: Some(false),
                shfs: Some(true),
                optional_shfs: Some(true),
            },
        }
    }

    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read config {}: {e}", path.display()))?;
        toml::from_str(&content)
            .map_err(|e| format!("invalid config {}: {e}", path.display()))
    }

    /// Load `~/.config/hextractor/config.toml` if it exists.
    pub fn load_default() -> Result<Option<Self>, String> {
        match default_config_path() {
            Some(path) if path.is_file() => Self::load(&path).map(Some),
            _ => Ok(None),
        }
    }

    /// Overlay `upper` on `self`; fields set in `upper` win.
    #[must_use]
    pub fn merge(self, upper: Self) -> Self {
        let d = upper.dirs;
        let i = upper.install;
        Self {
            install_root: upper.install_root.or(self.install_root),
            dirs: DirsConfig {
                houdini: d.houdini.or(self.dirs.houdini),
                engine_maya: d.engine_maya.or(self.dirs.engine_maya),
                engine_unity: d.engine_unity.or(self.dirs.engine_unity),
                engine_unreal: d.engine_unreal.or(self.dirs.engine_unreal),
                sidefxlabs: d.sidefxlabs.or(self.dirs.sidefxlabs),
                shfs: d.shfs.or(self.dirs.shfs),
            },
            install: InstallConfig {
                houdini: i.houdini.or(self.install.houdini),
                engine_maya: i.engine_maya.or(self.install.engine_maya),
                engine_unity: i.engine_unity.or(self.install.engine_unity),
                engine_unreal: i.engine_unreal.or(self.install.engine_unreal),
                sidefxlabs: i.sidefxlabs.or(self.install.sidefxlabs),
                shfs: i.shfs.or(self.install.shfs),
                optional_shfs: i.optional_shfs.or(self.install.optional_shfs),
            },
        }
    }

    /// Build the selection the installer runs with. Fields still unset after
    /// layering are treated as disabled or empty.
    pub fn into_selection(self) -> InstallSelection {
        let target = |enabled: Option<bool>, dir: Option<String>| {
            TargetSelection::new(enabled.unwrap_or(false), dir.unwrap_or_default())
        };
        let Self {
            install_root,
            dirs,
            install,
        } = self;

        InstallSelection {
            install_root: install_root.unwrap_or_default(),
            products: BTreeMap::from([
                (ProductKind::Houdini, target(install.houdini, dirs.houdini)),
                (
                    ProductKind::EngineMaya,
                    target(install.engine_maya, dirs.engine_maya),
                ),
                (
                    ProductKind::EngineUnity,
                    target(install.engine_unity, dirs.engine_unity),
                ),
                (
                    ProductKind::EngineUnreal,
                    target(install.engine_unreal, dirs.engine_unreal),
                ),
            ]),
            packages: BTreeMap::from([(
                PackageKind::SideFxLabs,
                target(install.sidefxlabs, dirs.sidefxlabs),
            )]),
            shared_tree: SharedTreeSelection {
                enabled: install.shfs.unwrap_or(false),
                include_optional: install.optional_shfs.unwrap_or(false),
                dir: dirs.shfs.unwrap_or_default(),
            },
        }
    }
}

fn default_config_path() -> Option<PathBuf> {
    let home = std::env::var_os("HOME")?;
    Some(PathBuf::from(home).join(".config/hextractor/config.toml"))
}
