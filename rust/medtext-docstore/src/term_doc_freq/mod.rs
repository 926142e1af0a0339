//! Per-document term frequency vectors.
//!
//! For every document the store keeps a sparse, ascending list of
//! `(frequency index, count)` pairs over a filtered vocabulary: the
//! [`TermIndexTransform`](crate::TermIndexTransform) of the writer's
//! [`FrequencyStorage`](crate::FrequencyStorage) decides which terms are
//! tracked and numbers them densely. A record is
//!
//! ```text
//! index_coding(i0 + 1) gap_coding(c0) { gap_coding(i_k - i_{k-1}) gap_coding(c_k) }
//! ```
//!
//! Empty records take no bits at all. The transform is persisted next to the
//! data as `.projection` files and reloaded by the reader.

mod reader;
mod writer;

pub use reader::TermDocumentFrequencyReader;
pub use writer::{TermDocumentFrequencySummary, TermDocumentFrequencyWriter};

use std::path::{Path, PathBuf};

use crate::format::{TERM_DOC_FREQS_DATA_SUFFIX, TERM_DOC_FREQS_OFFSETS_SUFFIX, path_with_suffix};

pub(crate) fn data_path(basename: &Path) -> PathBuf {
    path_with_suffix(basename, TERM_DOC_FREQS_DATA_SUFFIX)
}

pub(crate) fn offsets_path(basename: &Path) -> PathBuf {
    path_with_suffix(basename, TERM_DOC_FREQS_OFFSETS_SUFFIX)
}
