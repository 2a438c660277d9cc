use walkdir::WalkDir;
use std::path::{Path, PathBuf};
use crate::error::{MubinGraphError, Result};

/// A discovered map unit document
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub relative_path: String,
    pub absolute_path: PathBuf,
}

/// Discover every `.xml` document under `root`, recursively.
///
/// Entries are sorted by file name at each directory level so the flat index
/// has the same order on every run and platform.
pub fn discover_sources(root: &Path) -> Result<Vec<SourceDocument>> {
    if !root.is_dir() {
        return Err(MubinGraphError::SourceNotFound(format!(
            "{} is not a directory",
            root.display()
        )));
    }

    let mut documents = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();

        if !path.is_file() {
            continue;
        }

        let is_xml = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("xml"))
            .unwrap_or(false);
        if !is_xml {
            continue;
        }

        let relative_path = path
            .strip_prefix(root)
            .map_err(|_| MubinGraphError::InvalidInput(
                format!("Failed to compute relative path for: {}", path.display())
            ))?
            .to_string_lossy()
            .replace('\\', "/");

        documents.push(SourceDocument {
            relative_path,
            absolute_path: path.to_path_buf(),
        });
    }

    log::info!("Discovered {} map unit document(s) in {}", documents.len(), root.display());
    Ok(documents)
}
