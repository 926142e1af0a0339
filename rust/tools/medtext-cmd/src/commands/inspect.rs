//! Inspect command implementation

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use medtext_docstore::TermDocumentFrequencyReader;

use crate::{
    commands::{load_details, open_docstore},
    utils,
};

#[derive(Debug, Serialize)]
pub struct InspectSummary {
    basename: String,
    number_of_documents: u32,
    number_of_terms: u32,
    optimized: bool,
    positions: bool,
    pmids: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    term_document_frequencies: Option<TermDocumentFrequencyInfo>,
    files: Vec<FileInfo>,
}

#[derive(Debug, Serialize)]
struct TermDocumentFrequencyInfo {
    number_of_documents: u32,
    tracked_terms: u32,
    transform_layers: u32,
}

#[derive(Debug, Serialize)]
struct FileInfo {
    name: String,
    size: u64,
    size_human: String,
}

/// Run the inspect command
pub fn run(basename: &str) -> Result<InspectSummary> {
    let mut reader = open_docstore(basename)?;
    let pmids = reader.read_pmids()?;
    let number_of_terms = reader.number_of_terms();

    let term_document_frequencies = match load_details(basename)? {
        Some(details) => {
            let tdf = TermDocumentFrequencyReader::open_details(&details)
                .with_context(|| format!("Failed to open the frequency store of {basename}"))?;
            Some(TermDocumentFrequencyInfo {
                number_of_documents: tdf.number_of_documents(),
                tracked_terms: tdf.transform().final_size(),
                transform_layers: tdf.transform().position(),
            })
        }
        None => None,
    };

    Ok(InspectSummary {
        basename: basename.to_string(),
        number_of_documents: reader.number_of_documents(),
        number_of_terms,
        optimized: reader.is_optimized(),
        positions: reader.is_positions_available(),
        pmids,
        term_document_frequencies,
        files: list_files(Path::new(basename))?,
    })
}

/// Files named `<basename>-*`, sorted by name.
fn list_files(basename: &Path) -> Result<Vec<FileInfo>> {
    let Some(stem) = basename.file_name().map(|s| format!("{}-", s.to_string_lossy())) else {
        anyhow::bail!("{} has no file name", basename.display());
    };
    let dir = match basename.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("Failed to list {}", dir.display()))? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with(&stem) && entry.file_type()?.is_file() {
            let size = entry.metadata()?.len();
            files.push(FileInfo {
                name,
                size,
                size_human: utils::format_size(size),
            });
        }
    }
    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}
