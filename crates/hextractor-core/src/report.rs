use crate::resolve::TargetKind;
use crate::CoreError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveReport {
    pub name: String,
    pub entries: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetReport {
    pub label: String,
    pub kind: TargetKind,
    pub version: Option<String>,
    pub destination: PathBuf,
    pub archives: Vec<ArchiveReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedTreeReport {
    pub destination: PathBuf,
    pub copied: usize,
    pub skipped_optional: usize,
    pub bytes: u64,
}

/// Summary of a completed install, written with `--report`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallReport {
    pub image: String,
    pub started_at: String,
    pub finished_at: String,
    pub targets: Vec<TargetReport>,
    pub shared_tree: Option<SharedTreeReport>,
}

impl InstallReport {
    pub fn write_to_file(&self, path: &Path) -> Result<(), CoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}
