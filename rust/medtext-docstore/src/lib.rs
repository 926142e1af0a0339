//! Compressed, random-access sidecar stores for a text index.
//!
//! Given only a document number, the stores return the document's token
//! sequence ([`DocumentStoreReader`]), its aggregated term frequencies over a
//! filtered vocabulary ([`TermDocumentFrequencyReader`]), or an associated
//! string ([`StringPerDocumentReader`]). All of them share one discipline:
//! documents are appended in increasing order by a single writer, skipped
//! indices become empty documents, and a writer must be closed for its store
//! to be readable.
//!
//! All files of an index share a basename; see [`format`] for the suffixes.

pub mod config;
pub mod consistency;
pub mod docstore;
pub mod format;
pub mod frequency;
pub mod offsets;
pub mod positions;
pub mod string_store;
pub mod term_doc_freq;
pub mod transform;
pub mod vocabulary;

pub use config::{
    DocumentStoreOptions, DocumentStoreReaderOptions, IndexDetails, TermDocumentFrequencyOptions,
};
pub use consistency::{
    ConsistencyReport, DocumentSource, DocumentStoreConsistencyChecker, Inconsistency,
};
pub use docstore::{
    DocumentStoreBuilder, DocumentStoreReader, DocumentStoreSummary, DocumentStoreWriter,
    PMID_NOT_FOUND,
};
pub use frequency::{FrequencyStorage, FrequencyStorageImpl};
pub use offsets::OffsetIndex;
pub use positions::PositionRange;
pub use string_store::{StringPerDocumentReader, StringPerDocumentWriter};
pub use term_doc_freq::{
    TermDocumentFrequencyReader, TermDocumentFrequencySummary, TermDocumentFrequencyWriter,
};
pub use transform::{TermIndexTransform, TermSubsetTransform, UnityTransform, load_transform};
pub use vocabulary::{InMemoryVocabulary, NO_SUCH_TERM, TermIndex, Vocabulary};

pub use medtext_bits::Coding;
pub use medtext_common::{Result, error::Error};
