//! Command implementations for medtext-cmd

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use medtext_docstore::{
    DocumentStoreReader, DocumentStoreReaderOptions, IndexDetails, InMemoryVocabulary,
};

pub mod check;
pub mod dump;
pub mod import;
pub mod inspect;

/// The index at `basename`, described by its details file if there is one.
pub fn load_details(basename: &str) -> Result<Option<IndexDetails>> {
    let path = IndexDetails::path_for(Path::new(basename));
    if !path.is_file() {
        return Ok(None);
    }
    let details = IndexDetails::from_json_file(&path)
        .with_context(|| format!("Failed to load {}", path.display()))?;
    Ok(Some(details))
}

/// Opens the document store at `basename` with the reader options of its
/// details file, or the defaults.
pub fn open_docstore(basename: &str) -> Result<DocumentStoreReader> {
    let reader = match load_details(basename)? {
        Some(details) => DocumentStoreReader::open_details(&details),
        None => DocumentStoreReader::open(PathBuf::from(basename), DocumentStoreReaderOptions::default()),
    };
    reader.with_context(|| format!("Failed to open document store {basename}"))
}

pub fn load_vocabulary(basename: &str) -> Result<InMemoryVocabulary> {
    InMemoryVocabulary::load(basename)
        .with_context(|| format!("Failed to load the vocabulary of {basename}"))
}
