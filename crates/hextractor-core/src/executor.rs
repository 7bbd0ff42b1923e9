use crate::resolve::ResolvedTarget;
use crate::CoreError;
use hextractor_image::Image;
use hextractor_schema::{paths, ArchiveName};
use tracing::{debug, info};

/// Stream-extract every archive of `target` into its destination, in order.
///
/// Archives are additive: a later archive may overwrite files of an earlier
/// one. The first failure stops extraction and leaves whatever was already
/// written in place. Returns `(archive, entries written)` per archive.
pub fn extract_target(
    image: &dyn Image,
    target: &ResolvedTarget,
) -> Result<Vec<(ArchiveName, usize)>, CoreError> {
    info!(
        "installing {} into {}",
        target.label,
        target.destination.display()
    );
    let mut done = Vec::with_capacity(target.archives.len());

    for archive in &target.archives {
        let fail = |source| CoreError::Extraction {
            label: target.label.clone(),
            archive: archive.to_string(),
            source,
        };
        let source_path = paths::join(&target.source_dir, archive);
        debug!("extracting {source_path} ({})", target.format);
        let reader = image.open(&source_path).map_err(fail)?;
        let entries = target
            .format
            .unpack(reader, &target.destination)
            .map_err(fail)?;
        debug!("{archive}: {entries} entries");
        done.push((archive.clone(), entries));
    }
    Ok(done)
}
