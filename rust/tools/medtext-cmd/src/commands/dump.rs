//! Dump command implementation

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use medtext_docstore::{
    PositionRange, StringPerDocumentReader, TermDocumentFrequencyReader, Vocabulary,
    format::{optional_file_exists, strings_path},
};

use crate::commands::{import::TITLES, load_details, load_vocabulary, open_docstore};

#[derive(Debug, Serialize)]
pub struct DocumentDump {
    document: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pmid: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    text: String,
    /// Raw term indices, -1 for unknown words.
    tokens: Vec<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frequencies: Option<Vec<TermCount>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    positions: Option<Vec<PositionRange>>,
}

#[derive(Debug, Serialize)]
struct TermCount {
    term: u32,
    word: String,
    count: u32,
}

/// Run the dump command
pub fn run(
    basename: &str,
    document: u32,
    with_frequencies: bool,
    with_positions: bool,
) -> Result<DocumentDump> {
    let mut reader = open_docstore(basename)?;
    if document >= reader.number_of_documents() {
        anyhow::bail!(
            "Document {document} out of range, {basename} holds {} documents",
            reader.number_of_documents()
        );
    }
    let vocabulary = load_vocabulary(basename)?;
    let tokens = reader.document(document)?;
    let text = reader.document_text(document, &vocabulary)?;
    let pmid = if reader.read_pmids()? {
        reader.pmid(document)?
    } else {
        None
    };

    let title = if optional_file_exists(&strings_path(Path::new(basename), TITLES))? {
        StringPerDocumentReader::open(Path::new(basename), TITLES)?.get(document)?
    } else {
        None
    };

    let frequencies = if with_frequencies {
        let mut tdf = match load_details(basename)? {
            Some(details) => TermDocumentFrequencyReader::open_details(&details),
            None => TermDocumentFrequencyReader::open(basename, vocabulary.number_of_terms(), 4),
        }
        .with_context(|| format!("Failed to open the frequency store of {basename}"))?;
        let mut counts = Vec::new();
        for (frequency_index, count) in tdf.sparse_frequencies(document)? {
            let Some(term) = tdf.transform().initial_term_index(frequency_index).known() else {
                continue;
            };
            let word = vocabulary
                .term_as_string(term)
                .map(|w| w.into_owned())
                .unwrap_or_default();
            counts.push(TermCount { term, word, count });
        }
        Some(counts)
    } else {
        None
    };

    let positions = if with_positions {
        reader.positions(document)?
    } else {
        None
    };

    Ok(DocumentDump {
        document,
        pmid,
        title,
        text,
        tokens: tokens.iter().map(|t| t.to_raw()).collect(),
        frequencies,
        positions,
    })
}
