//! Loading the image's JSON manifests from their well-known paths.

use hextractor_image::Image;
use hextractor_schema::{
    parse_file_index, parse_overview, parse_packages, parse_shared_tree_flags, paths, FileIndex,
    ManifestError, Package, Product, SharedTreeFlags,
};
use tracing::debug;

fn fetch(image: &dyn Image, path: &str) -> Result<Vec<u8>, ManifestError> {
    debug!("reading manifest {path}");
    image.read(path).map_err(|e| {
        if e.is_not_found() {
            ManifestError::Missing {
                path: path.to_owned(),
            }
        } else {
            ManifestError::Image {
                path: path.to_owned(),
                message: e.to_string(),
            }
        }
    })
}

pub fn load_overview(image: &dyn Image) -> Result<Vec<Product>, ManifestError> {
    let bytes = fetch(image, paths::OVERVIEW)?;
    Ok(parse_overview(&bytes)?.products)
}

pub fn load_packages(image: &dyn Image) -> Result<Vec<Package>, ManifestError> {
    let bytes = fetch(image, paths::PACKAGES)?;
    Ok(parse_packages(&bytes)?.packages)
}

pub fn load_file_index(image: &dyn Image, product: &Product) -> Result<FileIndex, ManifestError> {
    let path = paths::join(paths::DATA_DIR, &product.files);
    let bytes = fetch(image, &path)?;
    parse_file_index(&path, &bytes)
}

pub fn load_shared_tree_flags(image: &dyn Image) -> Result<SharedTreeFlags, ManifestError> {
    let bytes = fetch(image, paths::SHARED_TREE_FLAGS)?;
    parse_shared_tree_flags(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hextractor_image::MemoryImage;

    #[test]
    fn missing_overview_means_unrecognized_image() {
        let image = MemoryImage::new().with_file("/README.txt", "not houdini");
        match load_overview(&image) {
            Err(ManifestError::Missing { path }) => assert_eq!(path, paths::OVERVIEW),
            other => panic!("expected Missing, got {other:?}"),
        }
    }

    #[test]
    fn loads_products_in_manifest_order() {
        let image = MemoryImage::new().with_file(
            paths::OVERVIEW,
            r#"{"products": [
                {"name": "Hserver", "version": "3.0", "files": "hserver.json"},
                {"name": "Houdini", "version": "20.5.278", "files": "houdini.json"}
            ]}"#,
        );
        let products = load_overview(&image).unwrap();
        let names: Vec<_> = products.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Hserver", "Houdini"]);
    }

    #[test]
    fn file_index_is_read_from_data_dir() {
        let image = MemoryImage::new()
            .with_file("/data/houdini.json", r#"{"bin/houdini": ["core.tar"]}"#);
        let product = Product {
            name: "Houdini".to_owned(),
            version: "20.5.278".into(),
            files: "houdini.json".to_owned(),
        };
        let index = load_file_index(&image, &product).unwrap();
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn malformed_packages_is_reported() {
        let image = MemoryImage::new().with_file(paths::PACKAGES, "[]");
        assert!(matches!(
            load_packages(&image),
            Err(ManifestError::Malformed { .. })
        ));
    }
}
