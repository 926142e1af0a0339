//! Offset index: the document boundaries of a coded stream.
//!
//! An offset file holds a [`StreamHeader`] of kind [`StreamKind::Offsets`],
//! the coded deltas between consecutive bit offsets (the first one taken from
//! zero), zero padding to a byte boundary, and a trailing `u64` little-endian
//! entry count. Readers decode the whole sequence up front; lookups are then
//! plain array accesses.

use std::{ops::Range, path::Path};

use medtext_bits::{BitReader, BitWriter, CodedReader, CodedWriter, Coding};
use medtext_common::{Result, error::Error};
use medtext_io::{ReadAt, ReadAtExt, SealingWrite, SealingWriteExt, file::FileReader};

use crate::format::{StreamHeader, StreamKind};

/// Bytes per read-ahead page of an offset reader.
pub const READ_AHEAD_PAGE: usize = 4 * 1024;

const TRAILER_SIZE: u64 = 8;

/// Appends non-decreasing bit offsets to an offset file.
pub struct OffsetWriter<W> {
    coded: CodedWriter<W>,
    element: String,
    last: u64,
    count: u64,
}

impl<W: SealingWrite> OffsetWriter<W> {
    pub fn new(sink: W, coding: Coding, element: impl Into<String>) -> Result<OffsetWriter<W>> {
        Self::with_buffer_size(sink, coding, element, BitWriter::<W>::DEFAULT_BUFFER_SIZE)
    }

    pub fn with_buffer_size(
        mut sink: W,
        coding: Coding,
        element: impl Into<String>,
        buffer_size: usize,
    ) -> Result<OffsetWriter<W>> {
        let element = element.into();
        StreamHeader::new(StreamKind::Offsets, coding)
            .write(&mut sink)
            .map_err(|e| Error::io(element.as_str(), e))?;
        Ok(OffsetWriter {
            coded: CodedWriter::new(BitWriter::with_buffer_size(sink, buffer_size), coding),
            element,
            last: 0,
            count: 0,
        })
    }

    /// Number of offsets appended so far.
    pub fn len(&self) -> u64 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// The most recently appended offset, zero before the first append.
    pub fn last(&self) -> u64 {
        self.last
    }

    pub fn append(&mut self, offset: u64) -> Result<()> {
        if offset < self.last {
            return Err(Error::invalid_arg(
                "offset",
                format!(
                    "offset {offset} of '{}' precedes the previous offset {}",
                    self.element, self.last
                ),
            ));
        }
        self.coded
            .write_long(offset - self.last)
            .map_err(|e| Error::io(self.element.as_str(), e))?;
        self.last = offset;
        self.count += 1;
        Ok(())
    }

    /// Pads the coded deltas, writes the entry count and seals the sink.
    /// Returns the number of offsets written.
    pub fn close(self) -> Result<u64> {
        let element = self.element;
        let mut sink = self
            .coded
            .into_inner()
            .finish()
            .map_err(|e| Error::io(element.as_str(), e))?;
        sink.write_u64_le(self.count)
            .map_err(|e| Error::io(element.as_str(), e))?;
        sink.seal().map_err(|e| Error::io(element.as_str(), e))?;
        Ok(self.count)
    }
}

/// Decoded offset file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetIndex {
    offsets: Vec<u64>,
    coding: Coding,
}

impl OffsetIndex {
    /// Opens and decodes an offset file. `read_ahead` is counted in
    /// [`READ_AHEAD_PAGE`] units.
    pub fn open(path: &Path, read_ahead: usize) -> Result<OffsetIndex> {
        let element = path.display().to_string();
        let reader = FileReader::open(path).map_err(|e| Error::io(element.as_str(), e))?;
        Self::from_reader(reader, &element, read_ahead)
    }

    pub fn from_reader<R: ReadAt>(source: R, element: &str, read_ahead: usize) -> Result<OffsetIndex> {
        let header = StreamHeader::read(&source, element, StreamKind::Offsets)?;
        let size = source.size().map_err(|e| Error::io(element, e))?;
        if size < StreamHeader::SIZE + TRAILER_SIZE {
            return Err(Error::corrupt_store(element, format!("offset file of {size} bytes")));
        }
        let count = source
            .read_u64_le_at(size - TRAILER_SIZE)
            .map_err(|e| Error::decode(element, e))?;

        let end_bits = (size - TRAILER_SIZE) * 8;
        // Every codeword takes at least one bit.
        if count > end_bits - StreamHeader::SIZE_BITS {
            return Err(Error::corrupt_store(
                element,
                format!("{count} offsets cannot fit into {size} bytes"),
            ));
        }

        let bits = BitReader::with_read_ahead(source, read_ahead.max(1) * READ_AHEAD_PAGE)
            .map_err(|e| Error::io(element, e))?;
        let mut coded = CodedReader::new(bits, header.primary);
        coded.seek(StreamHeader::SIZE_BITS);

        let mut offsets = Vec::with_capacity(count as usize);
        let mut current = 0u64;
        for _ in 0..count {
            let delta = coded.read_long().map_err(|e| Error::decode(element, e))?;
            if coded.position() > end_bits {
                return Err(Error::corrupt_store(element, "offset deltas overrun the trailer"));
            }
            current = current.checked_add(delta).ok_or_else(|| {
                Error::corrupt_store(element, "offset sum overflows 64 bits")
            })?;
            offsets.push(current);
        }
        log::debug!("decoded {count} offsets from {element}");
        Ok(OffsetIndex {
            offsets,
            coding: header.primary,
        })
    }

    #[inline]
    pub fn get(&self, i: usize) -> Option<u64> {
        self.offsets.get(i).copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.offsets
    }

    pub fn coding(&self) -> Coding {
        self.coding
    }

    /// Number of entries delimited by consecutive offsets.
    pub fn entry_count(&self) -> u32 {
        self.offsets.len().saturating_sub(1) as u32
    }

    /// Bit range `[start, end)` of entry `i`, relative to the end of the stream header.
    pub fn range(&self, i: u32) -> Option<Range<u64>> {
        let i = i as usize;
        let start = self.get(i)?;
        let end = self.get(i + 1)?;
        Some(start..end)
    }
}
