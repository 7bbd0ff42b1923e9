use crate::executor::extract_target;
use crate::manifests;
use crate::report::{ArchiveReport, InstallReport, SharedTreeReport, TargetReport};
use crate::resolve::{expand_destination, resolve_packages, resolve_products, ResolvedTarget};
use crate::selection::{InstallSelection, SHFS_DIR};
use crate::shfs::{extract_shared_tree, plan_shared_tree, SharedTreePlan};
use crate::CoreError;
use hextractor_image::Image;
use serde::Serialize;
use tracing::info;

/// Everything a run would do, computed without writing anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InstallPlan {
    pub products: Vec<ResolvedTarget>,
    pub packages: Vec<ResolvedTarget>,
    pub shared_tree: Option<SharedTreePlan>,
}

impl InstallPlan {
    pub fn targets(&self) -> impl Iterator<Item = &ResolvedTarget> {
        self.products.iter().chain(&self.packages)
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty() && self.packages.is_empty() && self.shared_tree.is_none()
    }
}

/// Progress notifications emitted by [`Installer::install_with`].
#[derive(Debug)]
pub enum InstallEvent<'a> {
    TargetStarted(&'a ResolvedTarget),
    TargetFinished(&'a ResolvedTarget),
    SharedTreeStarted(&'a SharedTreePlan),
    SharedTreeFinished(&'a SharedTreePlan),
}

/// Runs one install against one image.
///
/// Execution is strictly sequential: the full plan is computed first, so a
/// manifest or template problem aborts the run before any destination is
/// touched; then products, packages and the shared tree are extracted in
/// that order. There is no rollback.
pub struct Installer<'a> {
    image: &'a dyn Image,
    selection: InstallSelection,
}

impl<'a> Installer<'a> {
    pub fn new(image: &'a dyn Image, selection: InstallSelection) -> Self {
        Self { image, selection }
    }

    pub fn plan(&self) -> Result<InstallPlan, CoreError> {
        info!("planning install from {}", self.image.describe());

        // Read first: its absence means this is not an image we understand.
        let products = manifests::load_overview(self.image)?;
        let resolved = resolve_products(
            self.image,
            &products,
            &self.selection,
            &self.selection.vars(),
        )?;
        let vars = resolved.vars;

        let packages = if self.selection.any_package_enabled() {
            let packages = manifests::load_packages(self.image)?;
            resolve_packages(&packages, &self.selection, &vars)?
        } else {
            Vec::new()
        };

        let shared_tree = if self.selection.shared_tree.enabled {
            let root = expand_destination(SHFS_DIR, &self.selection.shared_tree.dir, &vars)?;
            let flags = manifests::load_shared_tree_flags(self.image)?;
            Some(plan_shared_tree(
                self.image,
                &flags,
                &root,
                self.selection.shared_tree.include_optional,
            )?)
        } else {
            None
        };

        Ok(InstallPlan {
            products: resolved.targets,
            packages,
            shared_tree,
        })
    }

    pub fn install(&self) -> Result<InstallReport, CoreError> {
        self.install_with(|_| {})
    }

    pub fn install_with<F>(&self, mut on_event: F) -> Result<InstallReport, CoreError>
    where
        F: FnMut(InstallEvent<'_>),
    {
        let started_at = chrono::Utc::now().to_rfc3339();
        let plan = self.plan()?;
        if plan.is_empty() {
            info!("nothing selected to install");
        }

        let mut targets = Vec::new();
        for target in plan.targets() {
            on_event(InstallEvent::TargetStarted(target));
            let done = extract_target(self.image, target)?;
            on_event(InstallEvent::TargetFinished(target));
            targets.push(TargetReport {
                label: target.label.clone(),
                kind: target.kind,
                version: target.version.clone(),
                destination: target.destination.clone(),
                archives: done
                    .into_iter()
                    .map(|(name, entries)| ArchiveReport {
                        name: name.into_inner(),
                        entries,
                    })
                    .collect(),
            });
        }

        let shared_tree = match &plan.shared_tree {
            Some(tree) => {
                on_event(InstallEvent::SharedTreeStarted(tree));
                let bytes = extract_shared_tree(self.image, tree)?;
                on_event(InstallEvent::SharedTreeFinished(tree));
                info!(
                    "shared tree installed into {} ({} files)",
                    tree.root.display(),
                    tree.files.len()
                );
                Some(SharedTreeReport {
                    destination: tree.root.clone(),
                    copied: tree.files.len(),
                    skipped_optional: tree.skipped.len(),
                    bytes,
                })
            }
            None => None,
        };

        Ok(InstallReport {
            image: self.image.describe(),
            started_at,
            finished_at: chrono::Utc::now().to_rfc3339(),
            targets,
            shared_tree,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{PackageKind, ProductKind};
    use crate::selection::{SharedTreeSelection, TargetSelection};
    use hextractor_image::MemoryImage;
    use hextractor_schema::{paths, ManifestError, TemplateError};
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn selection(root: &str) -> InstallSelection {
        InstallSelection {
            install_root: root.to_owned(),
            products: BTreeMap::from([(
                ProductKind::Houdini,
                TargetSelection::new(true, "{install_root}/hfs{iso_version}"),
            )]),
            packages: BTreeMap::from([(
                PackageKind::SideFxLabs,
                TargetSelection::new(false, "{install_root}/packages"),
            )]),
            shared_tree: SharedTreeSelection {
                enabled: false,
                include_optional: true,
                dir: "{install_root}/shfs".to_owned(),
            },
        }
    }

    #[test]
    fn unrecognized_image_aborts_planning() {
        let image = MemoryImage::new().with_file("/boot/isolinux.bin", "x");
        let installer = Installer::new(&image, selection("/opt"));
        match installer.plan().unwrap_err() {
            CoreError::Manifest(ManifestError::Missing { path }) => {
                assert_eq!(path, paths::OVERVIEW);
            }
            other => panic!("expected missing overview, got {other:?}"),
        }
    }

    #[test]
    fn packages_manifest_is_only_read_when_a_package_is_selected() {
        let image = MemoryImage::new().with_file(paths::OVERVIEW, r#"{"products": []}"#);
        let installer = Installer::new(&image, selection("/opt"));
        let plan = installer.plan().unwrap();
        assert!(plan.is_empty());

        let mut sel = selection("/opt");
        sel.packages
            .insert(PackageKind::SideFxLabs, TargetSelection::new(true, "/p"));
        let installer = Installer::new(&image, sel);
        assert!(matches!(
            installer.plan().unwrap_err(),
            CoreError::Manifest(ManifestError::Missing { .. })
        ));
    }

    #[test]
    fn shared_tree_destination_sees_product_version() {
        let image = MemoryImage::new()
            .with_file(
                paths::OVERVIEW,
                r#"{"products": [{"name": "Houdini", "version": "20.5.278", "files": "h.json"}]}"#,
            )
            .with_file("/data/h.json", "{}")
            .with_file(paths::SHARED_TREE_FLAGS, r#"{"files": {"a.txt": {"required": true}}}"#)
            .with_file("/data/shfs/a.txt", "a");
        let mut sel = selection("/opt");
        sel.shared_tree.enabled = true;
        sel.shared_tree.dir = "{install_root}/shfs{iso_version}".to_owned();
        let plan = Installer::new(&image, sel).plan().unwrap();
        let tree = plan.shared_tree.unwrap();
        assert_eq!(tree.root, PathBuf::from("/opt/shfs20.5.278"));
        assert_eq!(tree.files.len(), 1);
    }

    #[test]
    fn shared_tree_destination_is_checked_like_targets() {
        let image = MemoryImage::new().with_file(paths::OVERVIEW, r#"{"products": []}"#);
        let mut sel = selection("/opt");
        sel.shared_tree.enabled = true;
        sel.shared_tree.dir = "  ".to_owned();
        match Installer::new(&image, sel.clone()).plan().unwrap_err() {
            CoreError::EmptyDestination { label } => assert_eq!(label, SHFS_DIR),
            other => panic!("expected EmptyDestination, got {other:?}"),
        }

        sel.shared_tree.dir = "{shfs_dir}/x".to_owned();
        match Installer::new(&image, sel).plan().unwrap_err() {
            CoreError::Template { label, source } => {
                assert_eq!(label, SHFS_DIR);
                assert!(matches!(source, TemplateError::CyclicExpansion { .. }));
            }
            other => panic!("expected Template, got {other:?}"),
        }
    }

    #[test]
    fn install_reports_events_in_order() {
        let image = MemoryImage::new()
            .with_file(paths::OVERVIEW, r#"{"products": []}"#)
            .with_file(paths::SHARED_TREE_FLAGS, r#"{"files": {"a.txt": {"required": true}}}"#)
            .with_file("/data/shfs/a.txt", "a");
        let dest = tempfile::tempdir().unwrap();
        let mut sel = selection(&dest.path().to_string_lossy());
        sel.shared_tree.enabled = true;

        let mut seen = Vec::new();
        let report = Installer::new(&image, sel)
            .install_with(|e| {
                seen.push(match e {
                    InstallEvent::SharedTreeStarted(_) => "tree-start",
                    InstallEvent::SharedTreeFinished(_) => "tree-done",
                    InstallEvent::TargetStarted(_) | InstallEvent::TargetFinished(_) => "target",
                });
            })
            .unwrap();
        assert_eq!(seen, vec!["tree-start", "tree-done"]);
        let tree = report.shared_tree.unwrap();
        assert_eq!(tree.copied, 1);
        assert_eq!(tree.bytes, 1);
        assert!(dest.path().join("shfs/a.txt").is_file());
    }
}
