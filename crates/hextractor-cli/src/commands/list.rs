use super::{colorize_flag, json_pretty, open_image, EXIT_SUCCESS};
use hextractor_core::{manifests, ProductKind, PACKAGE_RULES};
use hextractor_schema::ManifestError;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Serialize)]
struct ProductEntry {
    name: String,
    version: String,
    /// Selection key when the installer knows this product.
    key: Option<&'static str>,
}

#[derive(Debug, Serialize)]
struct PackageEntry {
    name: String,
    display_name: String,
    archive: String,
    rule: Option<&'static str>,
}

#[derive(Debug, Serialize)]
struct Listing {
    products: Vec<ProductEntry>,
    packages: Vec<PackageEntry>,
}

pub fn run(image: &Path, json: bool) -> Result<u8, String> {
    let image = open_image(image)?;
    let products = manifests::load_overview(image.as_ref()).map_err(|e| format!("manifest error: {e}"))?;
    // An image without packages is still a valid image.
    let packages = match manifests::load_packages(image.as_ref()) {
        Ok(packages) => packages,
        Err(ManifestError::Missing { .. }) => Vec::new(),
        Err(e) => return Err(format!("manifest error: {e}")),
    };

    let listing = Listing {
        products: products
            .into_iter()
            .map(|p| ProductEntry {
                key: ProductKind::from_manifest_name(&p.name).map(ProductKind::key),
                version: p.version.into_inner(),
                name: p.name,
            })
            .collect(),
        packages: packages
            .into_iter()
            .map(|p| PackageEntry {
                archive: p.archive_name().into_inner(),
                rule: PACKAGE_RULES
                    .iter()
                    .find(|r| r.matches(&p.name))
                    .map(|r| r.prefix),
                name: p.name,
                display_name: p.display_name,
            })
            .collect(),
    };

    if json {
        println!("{}", json_pretty(&listing)?);
        return Ok(EXIT_SUCCESS);
    }

    println!("{:<24} {:<14} INSTALLABLE", "PRODUCT", "VERSION");
    for p in &listing.products {
        let known = colorize_flag(p.key.is_some(), p.key.unwrap_or(""), "no");
        println!("{:<24} {:<14} {known}", p.name, p.version);
    }
    if listing.packages.is_empty() {
        println!("\nno packages");
    } else {
        println!("\n{:<24} {:<32} INSTALLABLE", "PACKAGE", "ARCHIVE");
        for p in &listing.packages {
            let known = colorize_flag(p.rule.is_some(), p.rule.unwrap_or(""), "no");
            println!("{:<24} {:<32} {known}", p.name, p.archive);
        }
    }
    Ok(EXIT_SUCCESS)
}
