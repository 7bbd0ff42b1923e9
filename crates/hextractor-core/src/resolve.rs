use crate::catalog::{ProductKind, PACKAGE_RULES};
use crate::manifests;
use crate::selection::{InstallSelection, ISO_VERSION};
use crate::CoreError;
use hextractor_image::{ArchiveFormat, Image};
use hextractor_schema::{expand, paths, placeholders, ArchiveName, Package, Product, Vars};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Product,
    Package,
}

/// A product or package ready to extract: where it goes and what to unpack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedTarget {
    pub label: String,
    pub kind: TargetKind,
    pub version: Option<String>,
    /// Destination template as selected, before expansion.
    pub template: String,
    pub destination: PathBuf,
    /// Image directory the archives are read from.
    pub source_dir: String,
    #[serde(skip)]
    pub format: ArchiveFormat,
    pub archives: BTreeSet<ArchiveName>,
}

#[derive(Debug, Clone)]
pub struct ProductResolution {
    pub targets: Vec<ResolvedTarget>,
    /// The variable bag after every selected product bound its version.
    pub vars: Vars,
}

/// Expand a destination template, rejecting one that comes out empty.
pub(crate) fn expand_destination(label: &str, template: &str, vars: &Vars) -> Result<PathBuf, CoreError> {
    debug!(
        "expanding {label} destination {template} (placeholders: {})",
        placeholders(template).join(", ")
    );
    let expanded = expand(template, vars).map_err(|source| CoreError::Template {
        label: label.to_owned(),
        source,
    })?;
    if expanded.trim().is_empty() {
        return Err(CoreError::EmptyDestination {
            label: label.to_owned(),
        });
    }
    Ok(PathBuf::from(expanded))
}

/// Resolve the selected products, in manifest order.
///
/// Products the catalog does not know are skipped on purpose. Each selected
/// product binds `iso_version` in a new bag before its destination is
/// expanded; that bag carries forward to later products.
pub fn resolve_products(
    image: &dyn Image,
    products: &[Product],
    selection: &InstallSelection,
    vars: &Vars,
) -> Result<ProductResolution, CoreError> {
    let mut vars = vars.clone();
    let mut targets = Vec::new();

    for product in products {
        let Some(kind) = ProductKind::from_manifest_name(&product.name) else {
            debug!("skipping unknown product '{}'", product.name);
            continue;
        };
        let Some(target) = selection.product(kind) else {
            debug!("product '{}' not selected", product.name);
            continue;
        };

        vars = vars.with(ISO_VERSION, product.version.as_str());
        let destination = expand_destination(&product.name, &target.dir, &vars)?;
        let index = manifests::load_file_index(image, product)?;
        let archives = index.archives();
        info!(
            "resolved {} {} -> {} ({} files in {} archives)",
            product.name,
            product.version,
            destination.display(),
            index.len(),
            archives.len()
        );

        targets.push(ResolvedTarget {
            label: product.name.clone(),
            kind: TargetKind::Product,
            version: Some(product.version.to_string()),
            template: target.dir.clone(),
            destination,
            source_dir: paths::DATA_DIR.to_owned(),
            format: ArchiveFormat::Tar,
            archives,
        });
    }

    Ok(ProductResolution { targets, vars })
}

/// Resolve the selected packages, in manifest order.
///
/// A package is taken by the first rule in [`PACKAGE_RULES`] whose prefix
/// matches its name and whose kind is selected; packages no rule takes are
/// skipped.
pub fn resolve_packages(
    packages: &[Package],
    selection: &InstallSelection,
    vars: &Vars,
) -> Result<Vec<ResolvedTarget>, CoreError> {
    let mut targets = Vec::new();

    for package in packages {
        let matched = PACKAGE_RULES.iter().find_map(|rule| {
            if rule.matches(&package.name) {
                selection.package(rule.kind).map(|t| (rule, t))
            } else {
                None
            }
        });
        let Some((rule, target)) = matched else {
            debug!("skipping package '{}'", package.name);
            continue;
        };

        let destination = expand_destination(rule.prefix, &target.dir, vars)?;
        let archive = package.archive_name();
        info!(
            "resolved {} ({}) -> {}",
            rule.prefix,
            archive,
            destination.display()
        );

        targets.push(ResolvedTarget {
            label: rule.prefix.to_owned(),
            kind: TargetKind::Package,
            version: None,
            template: target.dir.clone(),
            destination,
            source_dir: paths::PACKAGES_DIR.to_owned(),
            format: ArchiveFormat::Zip,
            archives: BTreeSet::from([archive]),
        });
    }

    Ok(targets)
}
