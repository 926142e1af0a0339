use std::{
    cmp::Reverse,
    path::{Path, PathBuf},
};

use serde::Serialize;

use medtext_bits::{BitWriter, CodedWriter};
use medtext_common::{Result, error::Error, verify_arg};
use medtext_io::file::FileWriter;

use crate::{
    config::DocumentStoreOptions,
    docstore::{DocumentStorePaths, PMID_NOT_FOUND, TERMINAL_MARKER},
    format::{StreamHeader, StreamKind, write_i32_file},
    offsets::OffsetWriter,
    positions::{PositionRange, validate_ranges},
    vocabulary::{NO_SUCH_TERM, TermIndex, Vocabulary},
};

/// First phase of writing a document store.
///
/// Term reordering can only be requested here, which guarantees that it
/// happens before the first document is appended.
pub struct DocumentStoreBuilder {
    basename: PathBuf,
    vocabulary_size: u32,
    options: DocumentStoreOptions,
    term_to_small_index: Option<Vec<u32>>,
}

impl DocumentStoreBuilder {
    pub fn new(
        basename: impl Into<PathBuf>,
        vocabulary_size: u32,
        options: DocumentStoreOptions,
    ) -> DocumentStoreBuilder {
        DocumentStoreBuilder {
            basename: basename.into(),
            vocabulary_size,
            options,
            term_to_small_index: None,
        }
    }

    /// Renumbers the vocabulary by descending document frequency, so that the
    /// most common terms get the shortest codewords.
    ///
    /// Ties are broken by ascending term index. The small-index → term map is
    /// written to `-docstore-opt-terms.index` right away; its last slot is
    /// reserved for unknown words.
    pub fn optimize_term_ordering(
        mut self,
        vocabulary: &dyn Vocabulary,
    ) -> Result<DocumentStoreBuilder> {
        if vocabulary.number_of_terms() != self.vocabulary_size {
            return Err(Error::invalid_arg(
                "vocabulary",
                format!(
                    "{} terms, but the store was configured for {}",
                    vocabulary.number_of_terms(),
                    self.vocabulary_size
                ),
            ));
        }
        check_vocabulary_size(self.vocabulary_size)?;

        let mut ranked = Vec::with_capacity(self.vocabulary_size as usize);
        for term in 0..self.vocabulary_size {
            ranked.push((vocabulary.document_frequency(term)?, term));
        }
        ranked.sort_unstable_by_key(|&(df, term)| (Reverse(df), term));

        let mut small_index_to_term: Vec<i32> = ranked.iter().map(|&(_, term)| term as i32).collect();
        small_index_to_term.push(NO_SUCH_TERM);
        let mut term_to_small_index = vec![0u32; ranked.len()];
        for (small, &(_, term)) in ranked.iter().enumerate() {
            term_to_small_index[term as usize] = small as u32;
        }

        let paths = DocumentStorePaths::new(&self.basename);
        write_i32_file(&paths.opt_terms, &small_index_to_term)?;
        log::debug!(
            "optimized term ordering of {} terms for {}",
            self.vocabulary_size,
            self.basename.display()
        );
        self.term_to_small_index = Some(term_to_small_index);
        Ok(self)
    }

    /// Creates the store files. Optional files left over from an earlier store
    /// under the same basename are removed when this store does not write them.
    pub fn build(self) -> Result<DocumentStoreWriter> {
        check_vocabulary_size(self.vocabulary_size)?;
        verify_arg!(io_buffer_size, self.options.io_buffer_size > 0);
        let paths = DocumentStorePaths::new(&self.basename);
        let options = &self.options;

        let content = create_stream(
            &paths.docs,
            StreamHeader::new(StreamKind::DocumentContent, options.content_coding)
                .with_param(self.vocabulary_size as u64),
            options.io_buffer_size,
        )?;
        let offsets = create_offsets(&paths.offsets, options)?;

        let positions = if options.track_positions {
            Some(PositionStreams {
                data: create_stream(
                    &paths.positions,
                    StreamHeader::new(StreamKind::Positions, options.positions_coding),
                    options.io_buffer_size,
                )?,
                offsets: OffsetWriter::with_buffer_size(
                    create_file(&paths.position_offsets)?,
                    options.position_offsets_coding,
                    paths.position_offsets.display().to_string(),
                    options.io_buffer_size,
                )?,
                element: paths.positions.display().to_string(),
                next_document: 0,
            })
        } else {
            remove_stale(&paths.positions)?;
            remove_stale(&paths.position_offsets)?;
            None
        };

        if self.term_to_small_index.is_none() {
            remove_stale(&paths.opt_terms)?;
        }
        let pmids = match options.pmid_capacity {
            Some(capacity) => Some(vec![PMID_NOT_FOUND; capacity as usize]),
            None => {
                remove_stale(&paths.pmids)?;
                None
            }
        };

        log::debug!(
            "creating document store {} (content {}, positions {})",
            self.basename.display(),
            options.content_coding,
            options.track_positions
        );
        Ok(DocumentStoreWriter {
            streams: Some(Streams {
                content,
                offsets,
                positions,
            }),
            element: paths.docs.display().to_string(),
            paths,
            basename: self.basename,
            vocabulary_size: self.vocabulary_size,
            term_to_small_index: self.term_to_small_index,
            pmids,
            next_document: 0,
        })
    }
}

/// Append-only writer of a document store, created by [`DocumentStoreBuilder::build`].
///
/// Documents must be appended with strictly increasing indices; skipped
/// indices become empty documents. The store is only complete after
/// [`DocumentStoreWriter::close`].
pub struct DocumentStoreWriter {
    basename: PathBuf,
    paths: DocumentStorePaths,
    element: String,
    vocabulary_size: u32,
    term_to_small_index: Option<Vec<u32>>,
    streams: Option<Streams>,
    pmids: Option<Vec<i32>>,
    next_document: u32,
}

struct Streams {
    content: CodedWriter<FileWriter>,
    offsets: OffsetWriter<FileWriter>,
    positions: Option<PositionStreams>,
}

struct PositionStreams {
    data: CodedWriter<FileWriter>,
    offsets: OffsetWriter<FileWriter>,
    element: String,
    next_document: u32,
}

impl PositionStreams {
    fn append(&mut self, ranges: &[PositionRange]) -> Result<()> {
        self.offsets.append(self.data.bits_written())?;
        let element = self.element.as_str();
        let io = |e| Error::io(element, e);
        self.data.write_long(ranges.len() as u64).map_err(io)?;
        let mut cursor = 0u32;
        for range in ranges {
            self.data.write_int(range.start - cursor).map_err(io)?;
            self.data.write_int(range.end - range.start).map_err(io)?;
            cursor = range.end;
        }
        self.next_document += 1;
        Ok(())
    }

    fn fill_to(&mut self, index: u32) -> Result<()> {
        while self.next_document < index {
            self.append(&[])?;
        }
        Ok(())
    }

    fn close(mut self, documents: u32) -> Result<u64> {
        self.fill_to(documents)?;
        self.offsets.append(self.data.bits_written())?;
        let bits = self.data.bits_written();
        let element = self.element;
        self.data
            .write_long(TERMINAL_MARKER)
            .map_err(|e| Error::io(element.as_str(), e))?;
        self.data
            .into_inner()
            .seal()
            .map_err(|e| Error::io(element.as_str(), e))?;
        self.offsets.close()?;
        Ok(bits)
    }
}

/// Outcome of [`DocumentStoreWriter::close`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentStoreSummary {
    pub number_of_documents: u32,
    /// Size of the coded document content, without the header and the terminal marker.
    pub content_bits: u64,
    pub offsets: u64,
    pub position_bits: Option<u64>,
    pub optimized: bool,
    pub pmids: bool,
}

impl DocumentStoreWriter {
    pub fn basename(&self) -> &Path {
        &self.basename
    }

    pub fn vocabulary_size(&self) -> u32 {
        self.vocabulary_size
    }

    pub fn is_optimized(&self) -> bool {
        self.term_to_small_index.is_some()
    }

    pub fn is_tracking_positions(&self) -> bool {
        self.streams.as_ref().is_some_and(|s| s.positions.is_some())
    }

    /// Number of document indices addressed so far, including filled gaps.
    pub fn number_of_documents(&self) -> u32 {
        let positions = self
            .streams
            .as_ref()
            .and_then(|s| s.positions.as_ref())
            .map_or(0, |p| p.next_document);
        self.next_document.max(positions)
    }

    /// Appends document `index` and returns the number of content bits it took.
    ///
    /// Indices skipped since the previous append are filled with empty
    /// documents. Unknown words are escaped as the vocabulary size.
    pub fn append_document(&mut self, index: u32, tokens: &[TermIndex]) -> Result<u64> {
        check_order("docstore", self.next_document, index)?;
        let next = next_index(index)?;
        for token in tokens {
            if let TermIndex::Known(term) = *token {
                if term >= self.vocabulary_size {
                    return Err(Error::invalid_arg(
                        "tokens",
                        format!("term {term} outside vocabulary of {}", self.vocabulary_size),
                    ));
                }
            }
        }

        let remap = self.term_to_small_index.as_deref();
        let escape = self.vocabulary_size;
        let element = self.element.as_str();
        let streams = self
            .streams
            .as_mut()
            .ok_or_else(|| Error::invalid_operation("append_document on a closed writer"))?;

        while self.next_document < index {
            streams.offsets.append(streams.content.bits_written())?;
            self.next_document += 1;
        }
        let start = streams.content.bits_written();
        streams.offsets.append(start)?;
        for &token in tokens {
            streams
                .content
                .write_long(token_code(token, remap, escape))
                .map_err(|e| Error::io(element, e))?;
        }
        self.next_document = next;
        Ok(streams.content.bits_written() - start)
    }

    /// Appends the character ranges of the tokens of document `index`.
    ///
    /// Ranges must be ascending and non-overlapping. Does nothing when the
    /// store does not track positions.
    pub fn append_positions(&mut self, index: u32, ranges: &[PositionRange]) -> Result<()> {
        let streams = self
            .streams
            .as_mut()
            .ok_or_else(|| Error::invalid_operation("append_positions on a closed writer"))?;
        let Some(positions) = streams.positions.as_mut() else {
            return Ok(());
        };
        check_order("docstore-positions", positions.next_document, index)?;
        next_index(index)?;
        validate_ranges(ranges)?;
        positions.fill_to(index)?;
        positions.append(ranges)
    }

    /// Records the external identifier of document `index`.
    pub fn set_pmid(&mut self, index: u32, pmid: i32) -> Result<()> {
        let pmids = self
            .pmids
            .as_mut()
            .ok_or_else(|| Error::invalid_operation("set_pmid without a PMID capacity"))?;
        if pmid < 0 {
            return Err(Error::invalid_arg("pmid", format!("negative PMID {pmid}")));
        }
        let capacity = pmids.len();
        let slot = pmids.get_mut(index as usize).ok_or_else(|| {
            Error::invalid_arg(
                "index",
                format!("document {index} beyond the PMID capacity {capacity}"),
            )
        })?;
        *slot = pmid;
        Ok(())
    }

    /// Writes the final offsets and the terminal markers, seals every stream
    /// and persists the PMID map.
    pub fn close(mut self) -> Result<DocumentStoreSummary> {
        let Streams {
            mut content,
            mut offsets,
            positions,
        } = self
            .streams
            .take()
            .ok_or_else(|| Error::invalid_operation("close on a closed writer"))?;

        let documents = self.next_document.max(positions.as_ref().map_or(0, |p| p.next_document));
        while self.next_document < documents {
            offsets.append(content.bits_written())?;
            self.next_document += 1;
        }
        let content_bits = content.bits_written();
        offsets.append(content_bits)?;
        let element = self.element.as_str();
        content
            .write_long(TERMINAL_MARKER)
            .map_err(|e| Error::io(element, e))?;
        content
            .into_inner()
            .seal()
            .map_err(|e| Error::io(element, e))?;
        let offset_count = offsets.close()?;

        let position_bits = match positions {
            Some(positions) => Some(positions.close(documents)?),
            None => None,
        };
        if let Some(pmids) = &self.pmids {
            write_i32_file(&self.paths.pmids, pmids)?;
        }

        let summary = DocumentStoreSummary {
            number_of_documents: documents,
            content_bits,
            offsets: offset_count,
            position_bits,
            optimized: self.term_to_small_index.is_some(),
            pmids: self.pmids.is_some(),
        };
        log::info!(
            "closed document store {}: {} documents, {} content bits",
            self.basename.display(),
            summary.number_of_documents,
            summary.content_bits
        );
        Ok(summary)
    }
}

fn token_code(token: TermIndex, remap: Option<&[u32]>, escape: u32) -> u64 {
    match (token, remap) {
        (TermIndex::Known(term), Some(remap)) => remap[term as usize] as u64,
        (TermIndex::Known(term), None) => term as u64,
        (TermIndex::Unknown, _) => escape as u64,
    }
}

pub(crate) fn check_order(stream: &str, next: u32, index: u32) -> Result<()> {
    if index < next {
        return Err(Error::out_of_order(stream, next - 1, index));
    }
    Ok(())
}

pub(crate) fn next_index(index: u32) -> Result<u32> {
    index
        .checked_add(1)
        .ok_or_else(|| Error::invalid_arg("index", "document index space exhausted"))
}

fn check_vocabulary_size(size: u32) -> Result<()> {
    if size > i32::MAX as u32 {
        return Err(Error::invalid_arg(
            "vocabulary_size",
            format!("{size} terms exceed the serializable range"),
        ));
    }
    Ok(())
}

pub(crate) fn create_file(path: &Path) -> Result<FileWriter> {
    FileWriter::create(path).map_err(|e| Error::io(path.display().to_string(), e))
}

pub(crate) fn create_stream(
    path: &Path,
    header: StreamHeader,
    buffer_size: usize,
) -> Result<CodedWriter<FileWriter>> {
    let mut file = create_file(path)?;
    header
        .write(&mut file)
        .map_err(|e| Error::io(path.display().to_string(), e))?;
    Ok(CodedWriter::new(
        BitWriter::with_buffer_size(file, buffer_size),
        header.primary,
    ))
}

fn create_offsets(path: &Path, options: &DocumentStoreOptions) -> Result<OffsetWriter<FileWriter>> {
    OffsetWriter::with_buffer_size(
        create_file(path)?,
        options.offsets_coding,
        path.display().to_string(),
        options.io_buffer_size,
    )
}

pub(crate) fn remove_stale(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            log::debug!("removed stale {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::io(path.display().to_string(), e)),
    }
}
