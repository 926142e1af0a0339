//! Verification of a document store against itself, its vocabulary and,
//! optionally, the documents it was built from.

use std::fmt;

use serde::Serialize;

use medtext_common::Result;

use crate::{
    docstore::DocumentStoreReader,
    vocabulary::{TermIndex, Vocabulary},
};

/// The documents a store is expected to hold.
pub trait DocumentSource {
    /// Expected tokens of document `index`; `None` if the source does not know it.
    fn expected_document(&mut self, index: u32) -> Result<Option<Vec<TermIndex>>>;
}

impl DocumentSource for Vec<Vec<TermIndex>> {
    fn expected_document(&mut self, index: u32) -> Result<Option<Vec<TermIndex>>> {
        Ok(self.get(index as usize).cloned())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Inconsistency {
    DecreasingOffset {
        entry: u32,
        previous: u64,
        offset: u64,
    },
    UndecodableDocument {
        document: u32,
        message: String,
    },
    TermOutsideVocabulary {
        document: u32,
        term: u32,
    },
    FrequencySumMismatch {
        document: u32,
        length: u64,
        frequency_sum: u64,
    },
    MalformedPositions {
        document: u32,
        message: String,
    },
    ContentMismatch {
        document: u32,
        expected_length: usize,
        actual_length: usize,
        first_difference: Option<usize>,
    },
}

impl fmt::Display for Inconsistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Inconsistency::DecreasingOffset {
                entry,
                previous,
                offset,
            } => write!(f, "offset {entry} decreases from {previous} to {offset}"),
            Inconsistency::UndecodableDocument { document, message } => {
                write!(f, "document {document} cannot be decoded: {message}")
            }
            Inconsistency::TermOutsideVocabulary { document, term } => {
                write!(f, "document {document} holds term {term} outside the vocabulary")
            }
            Inconsistency::FrequencySumMismatch {
                document,
                length,
                frequency_sum,
            } => write!(
                f,
                "document {document} has {length} known tokens but frequencies sum to {frequency_sum}"
            ),
            Inconsistency::MalformedPositions { document, message } => {
                write!(f, "positions of document {document}: {message}")
            }
            Inconsistency::ContentMismatch {
                document,
                expected_length,
                actual_length,
                first_difference,
            } => write!(
                f,
                "document {document} differs from its source \
                 (expected {expected_length} tokens, found {actual_length}, first difference at {first_difference:?})"
            ),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ConsistencyReport {
    pub documents_checked: u32,
    pub inconsistencies: Vec<Inconsistency>,
}

impl ConsistencyReport {
    pub fn is_consistent(&self) -> bool {
        self.inconsistencies.is_empty()
    }
}

pub struct DocumentStoreConsistencyChecker<'a> {
    reader: &'a mut DocumentStoreReader,
    vocabulary: Option<&'a dyn Vocabulary>,
    source: Option<&'a mut dyn DocumentSource>,
}

impl<'a> DocumentStoreConsistencyChecker<'a> {
    pub fn new(reader: &'a mut DocumentStoreReader) -> DocumentStoreConsistencyChecker<'a> {
        DocumentStoreConsistencyChecker {
            reader,
            vocabulary: None,
            source: None,
        }
    }

    pub fn with_vocabulary(mut self, vocabulary: &'a dyn Vocabulary) -> Self {
        self.vocabulary = Some(vocabulary);
        self
    }

    pub fn with_source(mut self, source: &'a mut dyn DocumentSource) -> Self {
        self.source = Some(source);
        self
    }

    /// Checks every document. Damage is collected into the report; only
    /// failures to read the files at all are returned as errors.
    pub fn check(&mut self) -> Result<ConsistencyReport> {
        let mut report = ConsistencyReport::default();
        self.check_offsets(&mut report);

        let terms = self.reader.number_of_terms();
        let vocabulary_size = self.vocabulary.map(|v| v.number_of_terms());
        let mut frequencies = vec![0u32; terms as usize];
        let mut tokens = Vec::new();

        for document in 0..self.reader.number_of_documents() {
            report.documents_checked += 1;
            if let Err(e) = self.reader.document_into(document, &mut tokens) {
                if !e.is_corrupt_store() {
                    return Err(e);
                }
                report.inconsistencies.push(Inconsistency::UndecodableDocument {
                    document,
                    message: e.to_string(),
                });
                continue;
            }

            if let Some(size) = vocabulary_size {
                let outside = tokens
                    .iter()
                    .filter_map(|t| t.known())
                    .filter(|&term| term >= size);
                for term in outside {
                    report
                        .inconsistencies
                        .push(Inconsistency::TermOutsideVocabulary { document, term });
                }
            }

            let length = tokens.iter().filter(|t| t.is_known()).count() as u64;
            let frequency_sum = self.reader.frequencies(document, &mut frequencies, None)?;
            let array_sum: u64 = tokens
                .iter()
                .filter_map(|t| t.known())
                .map(|term| {
                    let count = frequencies[term as usize] as u64;
                    frequencies[term as usize] = 0;
                    count
                })
                .sum();
            if frequency_sum != length || array_sum != length {
                let frequency_sum = if frequency_sum != length {
                    frequency_sum
                } else {
                    array_sum
                };
                report.inconsistencies.push(Inconsistency::FrequencySumMismatch {
                    document,
                    length,
                    frequency_sum,
                });
            }

            self.check_positions(document, tokens.len(), &mut report)?;

            if let Some(source) = self.source.as_mut() {
                if let Some(expected) = source.expected_document(document)? {
                    if expected != tokens {
                        let first_difference =
                            expected.iter().zip(&tokens).position(|(a, b)| a != b);
                        report.inconsistencies.push(Inconsistency::ContentMismatch {
                            document,
                            expected_length: expected.len(),
                            actual_length: tokens.len(),
                            first_difference,
                        });
                    }
                }
            }
        }

        if report.is_consistent() {
            log::info!(
                "document store {} is consistent ({} documents)",
                self.reader.basename().display(),
                report.documents_checked
            );
        } else {
            log::warn!(
                "document store {}: {} inconsistencies in {} documents",
                self.reader.basename().display(),
                report.inconsistencies.len(),
                report.documents_checked
            );
        }
        Ok(report)
    }

    fn check_offsets(&self, report: &mut ConsistencyReport) {
        let offsets = self.reader.offsets().as_slice();
        for (entry, pair) in offsets.windows(2).enumerate() {
            if pair[1] < pair[0] {
                report.inconsistencies.push(Inconsistency::DecreasingOffset {
                    entry: entry as u32 + 1,
                    previous: pair[0],
                    offset: pair[1],
                });
            }
        }
    }

    fn check_positions(
        &self,
        document: u32,
        token_count: usize,
        report: &mut ConsistencyReport,
    ) -> Result<()> {
        let positions = match self.reader.positions(document) {
            Ok(Some(positions)) => positions,
            Ok(None) => return Ok(()),
            Err(e) if e.is_corrupt_store() => {
                report.inconsistencies.push(Inconsistency::MalformedPositions {
                    document,
                    message: e.to_string(),
                });
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        let mut cursor = 0;
        for (i, range) in positions.iter().enumerate() {
            if range.start < cursor || range.end < range.start {
                report.inconsistencies.push(Inconsistency::MalformedPositions {
                    document,
                    message: format!("range {i} ({}..{}) is out of order", range.start, range.end),
                });
                return Ok(());
            }
            cursor = range.end;
        }
        if !positions.is_empty() && positions.len() != token_count {
            report.inconsistencies.push(Inconsistency::MalformedPositions {
                document,
                message: format!("{} ranges for {token_count} tokens", positions.len()),
            });
        }
        Ok(())
    }
}
