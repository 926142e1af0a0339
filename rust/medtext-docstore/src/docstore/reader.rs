use std::{
    ops::Range,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use ahash::AHashMap;

use medtext_bits::{BitReader, CodedReader};
use medtext_common::{Result, error::Error};
use medtext_io::{ReadAt, file::FileReader};

use crate::{
    config::{DocumentStoreReaderOptions, IndexDetails},
    docstore::{DocumentStorePaths, PMID_NOT_FOUND},
    format::{StreamHeader, StreamKind, optional_file_exists, read_i32_file},
    offsets::{OffsetIndex, READ_AHEAD_PAGE},
    positions::PositionRange,
    vocabulary::{NO_SUCH_TERM, TermIndex, Vocabulary},
};

/// Random access to the documents of a store.
///
/// [`DocumentStoreReader::document`] and the calls built on it move the
/// content cursor and therefore take `&mut self`; use one reader per thread
/// for parallel reads. [`DocumentStoreReader::positions`] takes `&self`: the
/// position offsets and the position data cursor each sit behind their own
/// lock, independent of the content cursor.
pub struct DocumentStoreReader {
    basename: PathBuf,
    options: DocumentStoreReaderOptions,
    paths: DocumentStorePaths,
    element: String,
    number_of_terms: u32,
    content: CodedReader<FileReader>,
    offsets: OffsetIndex,
    small_index_to_term: Option<Vec<i32>>,
    positions_available: bool,
    position_offsets: Mutex<Option<OffsetIndex>>,
    position_data: Mutex<Option<CodedReader<FileReader>>>,
    pmids: Option<Vec<i32>>,
    pmid_index: Option<AHashMap<i32, u32>>,
}

impl DocumentStoreReader {
    pub fn open(
        basename: impl Into<PathBuf>,
        options: DocumentStoreReaderOptions,
    ) -> Result<DocumentStoreReader> {
        let basename = basename.into();
        let paths = DocumentStorePaths::new(&basename);
        let element = paths.docs.display().to_string();

        let source = FileReader::open(&paths.docs).map_err(|e| Error::io(element.as_str(), e))?;
        let header = StreamHeader::read(&source, &element, StreamKind::DocumentContent)?;
        let number_of_terms = u32::try_from(header.param).map_err(|_| {
            Error::invalid_format(element.as_str(), format!("vocabulary size {}", header.param))
        })?;
        let size = source.size().map_err(|e| Error::io(element.as_str(), e))?;
        let bits = BitReader::with_read_ahead(source, read_ahead_bytes(options.read_ahead))
            .map_err(|e| Error::io(element.as_str(), e))?;
        let content = CodedReader::new(bits, header.primary);

        let offsets = OffsetIndex::open(&paths.offsets, options.read_ahead)?;
        match offsets.as_slice().last() {
            Some(&end) if StreamHeader::SIZE_BITS + end <= size * 8 => {}
            _ => {
                return Err(Error::corrupt_store(
                    element,
                    "offsets do not fit the content stream",
                ));
            }
        }

        let small_index_to_term = if optional_file_exists(&paths.opt_terms)? {
            let remap = read_i32_file(&paths.opt_terms)?;
            validate_remap(&remap, number_of_terms, &paths.opt_terms)?;
            Some(remap)
        } else {
            None
        };
        let positions_available = optional_file_exists(&paths.positions)?
            && optional_file_exists(&paths.position_offsets)?;

        log::debug!(
            "opened document store {}: {} documents, {} terms, optimized {}, positions {}",
            basename.display(),
            offsets.entry_count(),
            number_of_terms,
            small_index_to_term.is_some(),
            positions_available
        );
        Ok(DocumentStoreReader {
            basename,
            options,
            paths,
            element,
            number_of_terms,
            content,
            offsets,
            small_index_to_term,
            positions_available,
            position_offsets: Mutex::new(None),
            position_data: Mutex::new(None),
            pmids: None,
            pmid_index: None,
        })
    }

    pub fn open_details(details: &IndexDetails) -> Result<DocumentStoreReader> {
        Self::open(&details.basename, details.reader.clone())
    }

    pub fn basename(&self) -> &Path {
        &self.basename
    }

    pub fn options(&self) -> &DocumentStoreReaderOptions {
        &self.options
    }

    pub fn number_of_documents(&self) -> u32 {
        self.offsets.entry_count()
    }

    /// Vocabulary size the store was written against.
    pub fn number_of_terms(&self) -> u32 {
        self.number_of_terms
    }

    pub fn is_positions_available(&self) -> bool {
        self.positions_available
    }

    pub fn is_optimized(&self) -> bool {
        self.small_index_to_term.is_some()
    }

    /// Document boundaries in bits: `number_of_documents() + 1` entries.
    pub fn offsets(&self) -> &OffsetIndex {
        &self.offsets
    }

    pub fn document(&mut self, index: u32) -> Result<Vec<TermIndex>> {
        let mut tokens = Vec::new();
        self.document_into(index, &mut tokens)?;
        Ok(tokens)
    }

    /// Decodes document `index` into `out`, replacing its contents.
    pub fn document_into(&mut self, index: u32, out: &mut Vec<TermIndex>) -> Result<()> {
        out.clear();
        let range = self.document_range(index)?;
        let end = StreamHeader::SIZE_BITS + range.end;
        self.content.seek(StreamHeader::SIZE_BITS + range.start);
        while self.content.position() < end {
            let code = self
                .content
                .read_long()
                .map_err(|e| Error::decode(self.element.as_str(), e))?;
            out.push(decode_token(
                code,
                self.number_of_terms,
                self.small_index_to_term.as_deref(),
                &self.element,
            )?);
        }
        if self.content.position() != end {
            return Err(Error::corrupt_store(
                self.element.as_str(),
                format!("document {index} overruns its end offset"),
            ));
        }
        Ok(())
    }

    pub fn document_length(&mut self, index: u32) -> Result<usize> {
        Ok(self.document(index)?.len())
    }

    /// Space-separated text of document `index`; words without a string form
    /// are rendered as the configured unknown-word filler.
    pub fn document_text(&mut self, index: u32, vocabulary: &dyn Vocabulary) -> Result<String> {
        let tokens = self.document(index)?;
        let mut text = String::new();
        for (i, token) in tokens.iter().enumerate() {
            if i > 0 {
                text.push(' ');
            }
            match token.known().and_then(|term| vocabulary.term_as_string(term)) {
                Some(word) => text.push_str(&word),
                None => text.push_str(&self.options.unknown_word),
            }
        }
        Ok(text)
    }

    /// Adds the term counts of document `index` to `term_frequencies`, and one
    /// to `documents_per_term` for every distinct term. Unknown words are not
    /// counted. Returns the number of counted tokens.
    pub fn frequencies(
        &mut self,
        index: u32,
        term_frequencies: &mut [u32],
        documents_per_term: Option<&mut [u32]>,
    ) -> Result<u64> {
        let terms = self.number_of_terms as usize;
        if term_frequencies.len() < terms
            || documents_per_term.as_ref().is_some_and(|d| d.len() < terms)
        {
            return Err(Error::invalid_arg(
                "term_frequencies",
                format!("arrays must hold {terms} terms"),
            ));
        }
        let tokens = self.document(index)?;
        let mut known: Vec<u32> = tokens.iter().filter_map(|t| t.known()).collect();
        for &term in &known {
            term_frequencies[term as usize] += 1;
        }
        let sum = known.len() as u64;
        if let Some(documents_per_term) = documents_per_term {
            known.sort_unstable();
            known.dedup();
            for term in known {
                documents_per_term[term as usize] += 1;
            }
        }
        Ok(sum)
    }

    /// Character ranges of the tokens of document `index`, or `None` when the
    /// store does not track positions.
    pub fn positions(&self, index: u32) -> Result<Option<Vec<PositionRange>>> {
        if !self.positions_available {
            return Ok(None);
        }
        let range = {
            let mut offsets = lock(&self.position_offsets)?;
            if offsets.is_none() {
                *offsets = Some(OffsetIndex::open(
                    &self.paths.position_offsets,
                    self.options.read_ahead,
                )?);
            }
            offsets.as_ref().and_then(|o| o.range(index))
        };
        let range = range.ok_or_else(|| {
            Error::invalid_arg("index", format!("no positions for document {index}"))
        })?;

        let element = self.paths.positions.display().to_string();
        let mut data = lock(&self.position_data)?;
        if data.is_none() {
            *data = Some(self.open_positions(&element)?);
        }
        let Some(reader) = data.as_mut() else {
            return Err(Error::invalid_operation("position reader unavailable"));
        };
        decode_positions(reader, range, &element).map(Some)
    }

    fn open_positions(&self, element: &str) -> Result<CodedReader<FileReader>> {
        let source = FileReader::open(&self.paths.positions).map_err(|e| Error::io(element, e))?;
        let header = StreamHeader::read(&source, element, StreamKind::Positions)?;
        let bits = BitReader::with_read_ahead(source, read_ahead_bytes(self.options.read_ahead))
            .map_err(|e| Error::io(element, e))?;
        Ok(CodedReader::new(bits, header.primary))
    }

    /// Loads the PMID map. Returns `false` if the store has none.
    pub fn read_pmids(&mut self) -> Result<bool> {
        if !optional_file_exists(&self.paths.pmids)? {
            return Ok(false);
        }
        self.pmids = Some(read_i32_file(&self.paths.pmids)?);
        self.pmid_index = None;
        Ok(true)
    }

    /// External identifier of document `index`, if one was recorded.
    pub fn pmid(&self, index: u32) -> Result<Option<i32>> {
        let pmids = self.loaded_pmids()?;
        Ok(pmids
            .get(index as usize)
            .copied()
            .filter(|&pmid| pmid != PMID_NOT_FOUND))
    }

    /// Document carrying `pmid`. Scans the PMID map unless
    /// [`DocumentStoreReader::index_pmids`] built a lookup table.
    pub fn document_number(&self, pmid: i32) -> Result<Option<u32>> {
        let pmids = self.loaded_pmids()?;
        if pmid == PMID_NOT_FOUND {
            return Ok(None);
        }
        if let Some(index) = &self.pmid_index {
            return Ok(index.get(&pmid).copied());
        }
        Ok(pmids.iter().position(|&p| p == pmid).map(|i| i as u32))
    }

    /// Builds a hash lookup for [`DocumentStoreReader::document_number`].
    pub fn index_pmids(&mut self) -> Result<()> {
        let pmids = self.loaded_pmids()?;
        let mut index = AHashMap::with_capacity(pmids.len());
        for (document, &pmid) in pmids.iter().enumerate() {
            if pmid != PMID_NOT_FOUND {
                index.entry(pmid).or_insert(document as u32);
            }
        }
        self.pmid_index = Some(index);
        Ok(())
    }

    fn loaded_pmids(&self) -> Result<&[i32]> {
        self.pmids
            .as_deref()
            .ok_or_else(|| Error::invalid_operation("PMID lookup before read_pmids()"))
    }

    /// Term → small index map of an optimized store, for callers replicating
    /// the writer's renumbering.
    pub fn term_permutation(&self) -> Option<Vec<i32>> {
        let remap = self.small_index_to_term.as_ref()?;
        let terms = self.number_of_terms as usize;
        let mut permutation = vec![NO_SUCH_TERM; terms];
        for (small, &term) in remap[..terms].iter().enumerate() {
            permutation[term as usize] = small as i32;
        }
        Some(permutation)
    }

    fn document_range(&self, index: u32) -> Result<Range<u64>> {
        self.offsets.range(index).ok_or_else(|| {
            Error::invalid_arg(
                "index",
                format!(
                    "document {index} beyond the {} documents of the store",
                    self.number_of_documents()
                ),
            )
        })
    }
}

fn read_ahead_bytes(pages: usize) -> usize {
    pages.max(1) * READ_AHEAD_PAGE
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| Error::invalid_operation("position reader lock poisoned"))
}

fn decode_token(
    code: u64,
    number_of_terms: u32,
    remap: Option<&[i32]>,
    element: &str,
) -> Result<TermIndex> {
    let escape = number_of_terms as u64;
    if code > escape {
        return Err(Error::corrupt_store(
            element,
            format!("term code {code} beyond the escape index {escape}"),
        ));
    }
    if code == escape {
        return Ok(TermIndex::Unknown);
    }
    Ok(match remap {
        Some(remap) => TermIndex::from_raw(remap[code as usize]),
        None => TermIndex::Known(code as u32),
    })
}

fn decode_positions(
    reader: &mut CodedReader<FileReader>,
    range: Range<u64>,
    element: &str,
) -> Result<Vec<PositionRange>> {
    let end = StreamHeader::SIZE_BITS + range.end;
    reader.seek(StreamHeader::SIZE_BITS + range.start);
    let count = reader.read_long().map_err(|e| Error::decode(element, e))?;
    // Every range takes at least two bits.
    if count.saturating_mul(2) > range.end - range.start {
        return Err(Error::corrupt_store(
            element,
            format!("{count} position ranges cannot fit their offsets"),
        ));
    }
    let mut ranges = Vec::with_capacity(count as usize);
    let mut cursor = 0u64;
    for _ in 0..count {
        let gap = reader.read_long().map_err(|e| Error::decode(element, e))?;
        let len = reader.read_long().map_err(|e| Error::decode(element, e))?;
        let start = cursor.saturating_add(gap);
        let stop = start.saturating_add(len);
        match (u32::try_from(start), u32::try_from(stop)) {
            (Ok(start), Ok(stop)) => ranges.push(PositionRange::new(start, stop)),
            _ => {
                return Err(Error::corrupt_store(element, "position range exceeds 32 bits"));
            }
        }
        cursor = stop;
    }
    if reader.position() != end {
        return Err(Error::corrupt_store(
            element,
            "position list does not end at the next offset",
        ));
    }
    Ok(ranges)
}

fn validate_remap(remap: &[i32], number_of_terms: u32, path: &Path) -> Result<()> {
    let terms = number_of_terms as usize;
    let mut seen = vec![false; terms];
    let valid = remap.len() == terms + 1
        && remap[terms] == NO_SUCH_TERM
        && remap[..terms].iter().all(|&term| {
            term >= 0
                && (term as u32) < number_of_terms
                && !std::mem::replace(&mut seen[term as usize], true)
        });
    if !valid {
        return Err(Error::invalid_format(
            path.display().to_string(),
            format!("not a term ordering of {number_of_terms} terms"),
        ));
    }
    Ok(())
}
