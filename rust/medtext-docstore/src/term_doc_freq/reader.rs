use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use medtext_bits::{BitReader, CodedReader};
use medtext_common::{Result, error::Error};
use medtext_io::{ReadAt, file::FileReader};

use crate::{
    config::IndexDetails,
    format::{StreamHeader, StreamKind},
    offsets::{OffsetIndex, READ_AHEAD_PAGE},
    term_doc_freq::{data_path, offsets_path},
    transform::{TermIndexTransform, load_transform},
    vocabulary::TermIndex,
};

/// Random access to per-document term frequencies. Not reentrant: reads move
/// the shared data cursor.
pub struct TermDocumentFrequencyReader {
    basename: PathBuf,
    element: String,
    header: StreamHeader,
    data: CodedReader<FileReader>,
    offsets: OffsetIndex,
    transform: Arc<dyn TermIndexTransform>,
}

impl TermDocumentFrequencyReader {
    /// Opens the store of `basename`, whose transform pipeline starts from a
    /// vocabulary of `vocabulary_size` terms. `read_ahead` is in 4 KiB pages.
    pub fn open(
        basename: impl Into<PathBuf>,
        vocabulary_size: u32,
        read_ahead: usize,
    ) -> Result<TermDocumentFrequencyReader> {
        let basename = basename.into();
        let path = data_path(&basename);
        let element = path.display().to_string();
        let source = FileReader::open(&path).map_err(|e| Error::io(element.as_str(), e))?;
        let header = StreamHeader::read(&source, &element, StreamKind::TermDocumentFrequencies)?;
        let size = source.size().map_err(|e| Error::io(element.as_str(), e))?;

        let transform = load_transform(&basename, vocabulary_size)?;
        if header.param != transform.final_size() as u64 {
            return Err(Error::invalid_format(
                element,
                format!(
                    "records over {} terms, but the transform keeps {}",
                    header.param,
                    transform.final_size()
                ),
            ));
        }

        let offsets = OffsetIndex::open(&offsets_path(&basename), read_ahead)?;
        match offsets.as_slice().last() {
            Some(&end) if StreamHeader::SIZE_BITS + end <= size * 8 => {}
            _ => {
                return Err(Error::corrupt_store(
                    element,
                    "offsets do not fit the frequency stream",
                ));
            }
        }
        let bits = BitReader::with_read_ahead(source, read_ahead.max(1) * READ_AHEAD_PAGE)
            .map_err(|e| Error::io(element.as_str(), e))?;
        log::debug!(
            "opened term document frequencies {}: {} documents, {} tracked terms",
            basename.display(),
            offsets.entry_count(),
            transform.final_size()
        );
        Ok(TermDocumentFrequencyReader {
            basename,
            element,
            data: CodedReader::new(bits, header.primary),
            header,
            offsets,
            transform,
        })
    }

    pub fn open_details(details: &IndexDetails) -> Result<TermDocumentFrequencyReader> {
        Self::open(
            &details.basename,
            details.number_of_terms,
            details.reader.read_ahead,
        )
    }

    pub fn basename(&self) -> &Path {
        &self.basename
    }

    pub fn number_of_documents(&self) -> u32 {
        self.offsets.entry_count()
    }

    pub fn transform(&self) -> &Arc<dyn TermIndexTransform> {
        &self.transform
    }

    /// The stored `(frequency index, count)` pairs of document `index`, ascending.
    pub fn sparse_frequencies(&mut self, index: u32) -> Result<Vec<(u32, u32)>> {
        let range = self.offsets.range(index).ok_or_else(|| {
            Error::invalid_arg(
                "index",
                format!(
                    "document {index} beyond the {} documents of the store",
                    self.number_of_documents()
                ),
            )
        })?;
        let element = self.element.as_str();
        let decode = |e| Error::decode(element, e);
        let final_size = self.transform.final_size() as u64;
        let end = StreamHeader::SIZE_BITS + range.end;
        self.data.seek(StreamHeader::SIZE_BITS + range.start);

        let mut pairs = Vec::new();
        let mut previous: Option<u64> = None;
        while self.data.position() < end {
            let frequency_index = match previous {
                None => self
                    .data
                    .read_with(self.header.primary)
                    .map_err(decode)?
                    .checked_sub(1),
                Some(previous) => {
                    let gap = self.data.read_with(self.header.secondary).map_err(decode)?;
                    (gap > 0).then(|| previous.saturating_add(gap))
                }
            };
            let count = self.data.read_with(self.header.secondary).map_err(decode)?;
            match (frequency_index, u32::try_from(count)) {
                (Some(frequency_index), Ok(count)) if frequency_index < final_size => {
                    pairs.push((frequency_index as u32, count));
                    previous = Some(frequency_index);
                }
                _ => {
                    return Err(Error::corrupt_store(
                        element,
                        format!("invalid frequency record of document {index}"),
                    ));
                }
            }
        }
        if self.data.position() != end {
            return Err(Error::corrupt_store(
                element,
                format!("frequency record of document {index} overruns its end offset"),
            ));
        }
        Ok(pairs)
    }

    /// Zeroes `frequencies`, then stores the count of every tracked term of
    /// document `index` at the term's initial (vocabulary) index. Returns the
    /// sum of the counts.
    pub fn frequencies(&mut self, index: u32, frequencies: &mut [u32]) -> Result<u64> {
        let initial_size = self.transform.initial_size() as usize;
        if frequencies.len() < initial_size {
            return Err(Error::invalid_arg(
                "frequencies",
                format!("array must hold {initial_size} terms"),
            ));
        }
        let pairs = self.sparse_frequencies(index)?;
        frequencies.fill(0);
        let mut sum = 0u64;
        for (frequency_index, count) in pairs {
            match self.transform.initial_term_index(frequency_index) {
                TermIndex::Known(term) => frequencies[term as usize] = count,
                TermIndex::Unknown => {
                    return Err(Error::corrupt_store(
                        self.element.as_str(),
                        format!("frequency index {frequency_index} has no term"),
                    ));
                }
            }
            sum += count as u64;
        }
        Ok(sum)
    }
}
