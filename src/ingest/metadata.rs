use sha2::{Sha256, Digest};
use std::path::Path;
use crate::config::XmlSchema;
use crate::error::Result;
use crate::ingest::SourceDocument;

/// Compute SHA256 hash of file contents
pub fn compute_file_hash(path: &Path) -> Result<String> {
    let content = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&content);
    let hash = hasher.finalize();
    Ok(format!("{:x}", hash))
}

/// SHA256 over a sequence of string parts, each terminated by a NUL byte.
pub fn hash_parts<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}

/// Content-derived identity of a source set.
///
/// Covers the tool version, the extraction schema and every document's
/// relative path and content hash in discovery order, so any edit, addition,
/// removal or rename produces a new fingerprint.
pub fn source_fingerprint(documents: &[SourceDocument], schema: &XmlSchema) -> Result<String> {
    let mut parts = vec![
        env!("CARGO_PKG_VERSION").to_string(),
        schema.fingerprint_input(),
    ];
    for doc in documents {
        parts.push(doc.relative_path.clone());
        parts.push(compute_file_hash(&doc.absolute_path)?);
    }
    Ok(hash_parts(parts.iter().map(String::as_str)))
}

/// Short display name for a source directory (its final path component).
pub fn source_name(root: &Path) -> String {
    root.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "source".to_string())
}
