pub mod walker;
pub mod metadata;
pub mod xml;

pub use walker::{SourceDocument, discover_sources};
pub use metadata::{compute_file_hash, hash_parts, source_fingerprint, source_name};
pub use xml::{Extraction, extract_objects};

use crate::config::XmlSchema;
use crate::graph::Object;

/// Outcome of building a flat index
#[derive(Debug, Default)]
pub struct IndexReport {
    pub objects: Vec<Object>,
    pub documents: usize,
    pub skipped_objects: usize,
    pub skipped_links: usize,
    /// Documents that could not be read or were not well-formed XML
    pub failed_documents: Vec<String>,
}

/// Build the flat object index from `documents`, in order.
///
/// Duplicates across documents are kept as-is. A document that cannot be read
/// or parsed is logged and skipped so one bad file does not sink the run.
pub fn build_index(documents: &[SourceDocument], schema: &XmlSchema) -> IndexReport {
    let mut report = IndexReport::default();
    let total = documents.len();

    for (idx, doc) in documents.iter().enumerate() {
        let extraction = std::fs::read_to_string(&doc.absolute_path)
            .map_err(crate::error::MubinGraphError::Io)
            .and_then(|content| extract_objects(&content, &doc.relative_path, schema));

        match extraction {
            Ok(extraction) => {
                log::info!(
                    "[{}/{}] {} ({} objects)",
                    idx + 1,
                    total,
                    doc.relative_path,
                    extraction.objects.len()
                );
                report.documents += 1;
                report.skipped_objects += extraction.skipped_objects;
                report.skipped_links += extraction.skipped_links;
                report.objects.extend(extraction.objects);
            }
            Err(e) => {
                log::error!("✗ {}: {}", doc.relative_path, e);
                report.failed_documents.push(doc.relative_path.clone());
            }
        }
    }

    if report.skipped_objects > 0 || report.skipped_links > 0 {
        log::info!(
            "Skipped {} object(s) without an id and {} link(s) without a target",
            report.skipped_objects,
            report.skipped_links
        );
    }
    if !report.failed_documents.is_empty() {
        log::warn!(
            "{} document(s) failed to parse. Check logs above for details.",
            report.failed_documents.len()
        );
    }

    report
}
