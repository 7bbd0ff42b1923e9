pub mod completions;
pub mod install;
pub mod list;
pub mod man_pages;

use hextractor_image::{DirImage, Image, IsoImage};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_MANIFEST_ERROR: u8 = 2;
pub const EXIT_TEMPLATE_ERROR: u8 = 3;
pub const EXIT_EXTRACTION_ERROR: u8 = 4;

/// Map an error message to the process exit code.
pub fn exit_code_for(msg: &str) -> u8 {
    if msg.starts_with("manifest error:") {
        EXIT_MANIFEST_ERROR
    } else if msg.starts_with("template error") {
        EXIT_TEMPLATE_ERROR
    } else if msg.starts_with("extraction failed") || msg.starts_with("shared tree file") {
        EXIT_EXTRACTION_ERROR
    } else {
        EXIT_FAILURE
    }
}

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

/// An image file is read as ISO 9660; a directory is a mounted or unpacked
/// image.
pub fn open_image(path: &Path) -> Result<Box<dyn Image>, String> {
    let opened: Result<Box<dyn Image>, _> = if path.is_file() {
        IsoImage::open(path).map(|iso| Box::new(iso) as Box<dyn Image>)
    } else {
        DirImage::open(path).map(|dir| Box::new(dir) as Box<dyn Image>)
    };
    opened.map_err(|e| format!("cannot open image {}: {e}", path.display()))
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        pb.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
    }
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn finish(pb: &ProgressBar, msg: String) {
    if let Ok(style) = ProgressStyle::with_template("{msg}") {
        pb.set_style(style);
    }
    pb.finish_with_message(msg);
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    finish(pb, format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    finish(pb, format!("✗ {msg}"));
}

pub fn colorize_flag(enabled: bool, on: &str, off: &str) -> String {
    use console::Style;
    if enabled {
        Style::new().green().apply_to(on).to_string()
    } else {
        Style::new().dim().apply_to(off).to_string()
    }
}
