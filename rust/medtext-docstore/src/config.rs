//! Store options and the persisted index description.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use medtext_bits::Coding;
use medtext_common::{Result, error::Error};

use crate::format::{INDEX_DETAILS_SUFFIX, path_with_suffix};

/// Options of a [`DocumentStoreWriter`](crate::DocumentStoreWriter).
///
/// The codings are persisted in each stream header, so a reader never needs
/// the options the store was written with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentStoreOptions {
    pub content_coding: Coding,
    pub offsets_coding: Coding,
    pub track_positions: bool,
    pub positions_coding: Coding,
    pub position_offsets_coding: Coding,
    /// Number of documents for which an external identifier (PMID) can be
    /// recorded. `None` disables the PMID map.
    pub pmid_capacity: Option<u32>,
    /// Staging buffer of every coded stream, in bytes.
    pub io_buffer_size: usize,
}

impl Default for DocumentStoreOptions {
    fn default() -> DocumentStoreOptions {
        DocumentStoreOptions {
            content_coding: Coding::Gamma,
            offsets_coding: Coding::Delta,
            track_positions: false,
            positions_coding: Coding::Delta,
            position_offsets_coding: Coding::Delta,
            pmid_capacity: None,
            io_buffer_size: 64 * 1024,
        }
    }
}

impl DocumentStoreOptions {
    pub fn with_positions(mut self) -> DocumentStoreOptions {
        self.track_positions = true;
        self
    }

    pub fn with_pmid_capacity(mut self, capacity: u32) -> DocumentStoreOptions {
        self.pmid_capacity = Some(capacity);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentStoreReaderOptions {
    /// Read-ahead of the offset and content readers, in 4 KiB pages.
    pub read_ahead: usize,
    /// Rendering of unknown words by `document_text`.
    pub unknown_word: String,
}

impl Default for DocumentStoreReaderOptions {
    fn default() -> DocumentStoreReaderOptions {
        DocumentStoreReaderOptions {
            read_ahead: 4,
            unknown_word: "<unk>".to_string(),
        }
    }
}

/// Options of a [`TermDocumentFrequencyWriter`](crate::TermDocumentFrequencyWriter).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TermDocumentFrequencyOptions {
    /// Terms occurring in at most this share of documents are dropped.
    pub min_document_frequency_ratio: f64,
    /// Terms occurring in more than this share of documents are dropped.
    pub max_document_frequency_ratio: f64,
    /// In-document counts at or below this value are not stored.
    pub minimum_frequency_support: u32,
    /// Coding of the first frequency index of a record.
    pub index_coding: Coding,
    /// Coding of index gaps and counts.
    pub gap_coding: Coding,
    pub offsets_coding: Coding,
    pub io_buffer_size: usize,
}

impl Default for TermDocumentFrequencyOptions {
    fn default() -> TermDocumentFrequencyOptions {
        TermDocumentFrequencyOptions {
            min_document_frequency_ratio: 0.0,
            max_document_frequency_ratio: 1.0,
            minimum_frequency_support: 0,
            index_coding: Coding::Gamma,
            gap_coding: Coding::Delta,
            offsets_coding: Coding::Delta,
            io_buffer_size: 64 * 1024,
        }
    }
}

impl TermDocumentFrequencyOptions {
    /// Keeps terms with `min_ratio × N < df ≤ max_ratio × N`.
    pub fn with_band(mut self, min_ratio: f64, max_ratio: f64) -> TermDocumentFrequencyOptions {
        self.min_document_frequency_ratio = min_ratio;
        self.max_document_frequency_ratio = max_ratio;
        self
    }

    pub fn with_minimum_frequency_support(mut self, support: u32) -> TermDocumentFrequencyOptions {
        self.minimum_frequency_support = support;
        self
    }

    pub fn includes(&self, document_frequency: u32, number_of_documents: u32) -> bool {
        let df = document_frequency as f64;
        let n = number_of_documents as f64;
        df > self.min_document_frequency_ratio * n && df <= self.max_document_frequency_ratio * n
    }
}

/// Everything needed to reopen the stores of one index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDetails {
    pub basename: PathBuf,
    pub number_of_documents: u32,
    pub number_of_terms: u32,
    #[serde(default)]
    pub docstore: DocumentStoreOptions,
    #[serde(default)]
    pub reader: DocumentStoreReaderOptions,
    #[serde(default)]
    pub term_document_frequencies: TermDocumentFrequencyOptions,
}

impl IndexDetails {
    pub fn new(basename: impl Into<PathBuf>, number_of_documents: u32, number_of_terms: u32) -> IndexDetails {
        IndexDetails {
            basename: basename.into(),
            number_of_documents,
            number_of_terms,
            docstore: Default::default(),
            reader: Default::default(),
            term_document_frequencies: Default::default(),
        }
    }

    /// Default location of the details file of `basename`.
    pub fn path_for(basename: &Path) -> PathBuf {
        path_with_suffix(basename, INDEX_DETAILS_SUFFIX)
    }

    pub fn from_json_file(path: &Path) -> Result<IndexDetails> {
        let json = std::fs::read(path).map_err(|e| Error::io(path.display().to_string(), e))?;
        serde_json::from_slice(&json)
            .map_err(|e| Error::invalid_format(path.display().to_string(), e.to_string()))
    }

    pub fn to_json_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self).map_err(|e| Error::other("index details", e))?;
        std::fs::write(path, json).map_err(|e| Error::io(path.display().to_string(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_predicate() {
        let options = TermDocumentFrequencyOptions::default();
        // A term present in every document is kept by the full band.
        assert!(options.includes(2, 2));
        assert!(options.includes(1, 2));
        assert!(!options.includes(0, 2));

        let narrow = options.with_band(0.1, 0.5);
        assert!(!narrow.includes(1, 10));
        assert!(narrow.includes(2, 10));
        assert!(narrow.includes(5, 10));
        assert!(!narrow.includes(6, 10));
    }

    #[test]
    fn test_index_details_json() {
        let dir = tempfile::tempdir().unwrap();
        let basename = dir.path().join("medline");
        let mut details = IndexDetails::new(&basename, 42, 1000);
        details.docstore = DocumentStoreOptions::default().with_positions();
        let path = IndexDetails::path_for(&basename);
        details.to_json_file(&path).unwrap();

        let loaded = IndexDetails::from_json_file(&path).unwrap();
        assert_eq!(loaded, details);
        assert!(loaded.docstore.track_positions);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "basename": "/x/y", "number_of_documents": 3, "number_of_terms": 9,
                        "reader": { "unknown_word": "?" } }"#;
        let details: IndexDetails = serde_json::from_str(json).unwrap();
        assert_eq!(details.reader.unknown_word, "?");
        assert_eq!(details.reader.read_ahead, 4);
        assert_eq!(details.docstore.content_coding, Coding::Gamma);
    }
}
