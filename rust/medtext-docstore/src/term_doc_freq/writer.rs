use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::Serialize;

use medtext_bits::CodedWriter;
use medtext_common::{Result, error::Error, verify_arg};
use medtext_io::file::FileWriter;

use crate::{
    config::TermDocumentFrequencyOptions,
    docstore::{
        TERMINAL_MARKER, check_order, create_file, create_stream, next_index, remove_stale,
    },
    format::{StreamHeader, StreamKind, optional_file_exists, projection_path},
    frequency::{FrequencyStorage, FrequencyStorageImpl},
    offsets::OffsetWriter,
    term_doc_freq::{data_path, offsets_path},
    transform::{TermIndexTransform, TermSubsetTransform, UnityTransform},
    vocabulary::{TermIndex, Vocabulary},
};

/// Append-only writer of per-document term frequency records.
pub struct TermDocumentFrequencyWriter {
    basename: PathBuf,
    element: String,
    options: TermDocumentFrequencyOptions,
    storage: Box<dyn FrequencyStorage>,
    streams: Option<Streams>,
    /// Frequency indices counted in the current document.
    touched: Vec<u32>,
    next_document: u32,
}

struct Streams {
    data: CodedWriter<FileWriter>,
    offsets: OffsetWriter<FileWriter>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TermDocumentFrequencySummary {
    pub number_of_documents: u32,
    pub data_bits: u64,
    /// Number of terms inside the document frequency band.
    pub tracked_terms: u32,
}

impl TermDocumentFrequencyWriter {
    /// Tracks the terms of `vocabulary` whose document frequency `df` over
    /// `number_of_documents` documents satisfies `min_ratio × N < df ≤ max_ratio × N`.
    pub fn new(
        basename: impl Into<PathBuf>,
        vocabulary: &dyn Vocabulary,
        number_of_documents: u32,
        options: TermDocumentFrequencyOptions,
    ) -> Result<TermDocumentFrequencyWriter> {
        verify_arg!(
            options,
            options.min_document_frequency_ratio <= options.max_document_frequency_ratio
        );
        let terms = vocabulary.number_of_terms();
        let mut document_frequencies = Vec::with_capacity(terms as usize);
        for term in 0..terms {
            document_frequencies.push(vocabulary.document_frequency(term)?);
        }
        let unity: Arc<dyn TermIndexTransform> = Arc::new(UnityTransform::new(terms));
        let band = TermSubsetTransform::new(unity, |term| {
            options.includes(document_frequencies[term as usize], number_of_documents)
        });
        log::debug!(
            "{} of {terms} terms inside the document frequency band ({}, {}]",
            band.final_size(),
            options.min_document_frequency_ratio,
            options.max_document_frequency_ratio
        );
        let storage = FrequencyStorageImpl::new(Arc::new(band));
        Self::with_storage(basename, Box::new(storage), options)
    }

    /// Writes records over the terms tracked by `storage`. The band options
    /// are ignored; the storage's transform is persisted as is.
    pub fn with_storage(
        basename: impl Into<PathBuf>,
        mut storage: Box<dyn FrequencyStorage>,
        options: TermDocumentFrequencyOptions,
    ) -> Result<TermDocumentFrequencyWriter> {
        let basename = basename.into();
        storage.clear();
        remove_stale_projections(&basename)?;

        let data_path = data_path(&basename);
        let header = StreamHeader::new(StreamKind::TermDocumentFrequencies, options.index_coding)
            .with_secondary(options.gap_coding)
            .with_param(storage.len() as u64);
        let data = create_stream(&data_path, header, options.io_buffer_size)?;
        let offsets_path = offsets_path(&basename);
        let offsets = OffsetWriter::with_buffer_size(
            create_file(&offsets_path)?,
            options.offsets_coding,
            offsets_path.display().to_string(),
            options.io_buffer_size,
        )?;
        Ok(TermDocumentFrequencyWriter {
            basename,
            element: data_path.display().to_string(),
            options,
            storage,
            streams: Some(Streams { data, offsets }),
            touched: Vec::new(),
            next_document: 0,
        })
    }

    pub fn basename(&self) -> &Path {
        &self.basename
    }

    pub fn storage(&self) -> &dyn FrequencyStorage {
        self.storage.as_ref()
    }

    pub fn number_of_documents(&self) -> u32 {
        self.next_document
    }

    /// Appends the frequency record of document `index`; returns its size in bits.
    ///
    /// Skipped indices get empty records. Terms outside the band and counts
    /// at or below the minimum frequency support are not stored.
    pub fn append_document(&mut self, index: u32, tokens: &[TermIndex]) -> Result<u64> {
        check_order("term-doc-freqs", self.next_document, index)?;
        let next = next_index(index)?;
        let initial_size = self.storage.transform().initial_size();
        if let Some(term) = tokens
            .iter()
            .filter_map(|t| t.known())
            .find(|&term| term >= initial_size)
        {
            return Err(Error::invalid_arg(
                "tokens",
                format!("term {term} outside vocabulary of {initial_size}"),
            ));
        }

        self.touched.clear();
        for term in tokens.iter().filter_map(|t| t.known()) {
            if let TermIndex::Known(frequency_index) = self.storage.frequency_index(term) {
                if self.storage.increment_frequency(frequency_index)? == 1 {
                    self.touched.push(frequency_index);
                }
            }
        }
        self.touched.sort_unstable();

        let element = self.element.as_str();
        let io = |e| Error::io(element, e);
        let streams = self
            .streams
            .as_mut()
            .ok_or_else(|| Error::invalid_operation("append_document on a closed writer"))?;
        while self.next_document < index {
            streams.offsets.append(streams.data.bits_written())?;
            self.next_document += 1;
        }
        let start = streams.data.bits_written();
        streams.offsets.append(start)?;

        let mut previous = None;
        for &frequency_index in &self.touched {
            let count = self.storage.frequency(frequency_index);
            if count <= self.options.minimum_frequency_support {
                continue;
            }
            let written = match previous {
                None => streams
                    .data
                    .write_with(self.options.index_coding, frequency_index as u64 + 1),
                Some(previous) => streams
                    .data
                    .write_with(self.options.gap_coding, (frequency_index - previous) as u64),
            };
            written.map_err(io)?;
            streams
                .data
                .write_with(self.options.gap_coding, count as u64)
                .map_err(io)?;
            previous = Some(frequency_index);
        }
        for &frequency_index in &self.touched {
            self.storage.set_frequency(frequency_index, 0)?;
        }
        self.next_document = next;
        Ok(streams.data.bits_written() - start)
    }

    /// Writes the final offset and the terminal marker, seals the streams and
    /// persists the transform.
    pub fn close(mut self) -> Result<TermDocumentFrequencySummary> {
        let Streams {
            mut data,
            mut offsets,
        } = self
            .streams
            .take()
            .ok_or_else(|| Error::invalid_operation("close on a closed writer"))?;
        let data_bits = data.bits_written();
        offsets.append(data_bits)?;
        let element = self.element.as_str();
        data.write_with(self.options.gap_coding, TERMINAL_MARKER)
            .map_err(|e| Error::io(element, e))?;
        data.into_inner()
            .seal()
            .map_err(|e| Error::io(element, e))?;
        offsets.close()?;
        self.storage.save(&self.basename)?;

        let summary = TermDocumentFrequencySummary {
            number_of_documents: self.next_document,
            data_bits,
            tracked_terms: self.storage.len() as u32,
        };
        log::info!(
            "closed term document frequencies {}: {} documents, {} tracked terms, {} bits",
            self.basename.display(),
            summary.number_of_documents,
            summary.tracked_terms,
            summary.data_bits
        );
        Ok(summary)
    }
}

fn remove_stale_projections(basename: &Path) -> Result<()> {
    let mut position = 1;
    while optional_file_exists(&projection_path(basename, position))? {
        remove_stale(&projection_path(basename, position))?;
        position += 1;
    }
    Ok(())
}
