//! The compressed document content store.
//!
//! A store keeps, for every document index, the sequence of term indices the
//! document consists of, coded with a universal code (γ by default) into
//! `<basename>-docstore.docs`. The bit offset at which each document starts
//! goes to `<basename>-docstore.offsets`, so any document can be decoded
//! without touching its neighbours.
//!
//! Optional parts:
//! - character position ranges of every token (`-docstore-positions` and its
//!   offsets file),
//! - a document → external identifier (PMID) map (`-docstore.pmids`),
//! - a frequency-ranked renumbering of the vocabulary that shortens the
//!   codewords of frequent terms (`-docstore-opt-terms.index`).
//!
//! Unknown words are escaped as the index one past the last vocabulary term,
//! which is recorded in the header of the content stream.

mod reader;
mod writer;

pub use reader::DocumentStoreReader;
pub use writer::{DocumentStoreBuilder, DocumentStoreSummary, DocumentStoreWriter};

pub(crate) use writer::{check_order, create_file, create_stream, next_index, remove_stale};

use std::path::{Path, PathBuf};

use crate::format::{
    DOCSTORE_DOCS_SUFFIX, DOCSTORE_OFFSETS_SUFFIX, DOCSTORE_OPT_TERMS_SUFFIX, DOCSTORE_PMIDS_SUFFIX,
    DOCSTORE_POSITION_OFFSETS_SUFFIX, DOCSTORE_POSITIONS_SUFFIX, path_with_suffix,
};

/// Value of a PMID map slot that was never assigned.
pub const PMID_NOT_FOUND: i32 = -1;

/// Marker written after the final offset of a closed stream.
pub(crate) const TERMINAL_MARKER: u64 = 0;

/// Paths of every file of the store at `basename`.
#[derive(Debug, Clone)]
pub(crate) struct DocumentStorePaths {
    pub docs: PathBuf,
    pub offsets: PathBuf,
    pub positions: PathBuf,
    pub position_offsets: PathBuf,
    pub pmids: PathBuf,
    pub opt_terms: PathBuf,
}

impl DocumentStorePaths {
    pub fn new(basename: &Path) -> DocumentStorePaths {
        DocumentStorePaths {
            docs: path_with_suffix(basename, DOCSTORE_DOCS_SUFFIX),
            offsets: path_with_suffix(basename, DOCSTORE_OFFSETS_SUFFIX),
            positions: path_with_suffix(basename, DOCSTORE_POSITIONS_SUFFIX),
            position_offsets: path_with_suffix(basename, DOCSTORE_POSITION_OFFSETS_SUFFIX),
            pmids: path_with_suffix(basename, DOCSTORE_PMIDS_SUFFIX),
            opt_terms: path_with_suffix(basename, DOCSTORE_OPT_TERMS_SUFFIX),
        }
    }
}
