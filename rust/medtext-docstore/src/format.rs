//! On-disk layout shared by the stores: file suffixes and the coded stream header.
//!
//! Every coded stream starts with a 16-byte header:
//!
//! | bytes | content |
//! |---|---|
//! | 0..4 | magic `MTXS` |
//! | 4 | format version |
//! | 5 | [`StreamKind`] |
//! | 6 | primary [`Coding`] id |
//! | 7 | secondary [`Coding`] id |
//! | 8..16 | kind-specific parameter, `u64` little-endian |
//!
//! Bit offsets recorded in offset indexes are relative to the first bit after
//! the header.

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use medtext_bits::Coding;
use medtext_common::{Result, error::Error};
use medtext_io::{
    ReadAt, ReadAtExt, SealingWrite, SealingWriteExt,
    file::{FileReader, FileWriter},
};

pub const DOCSTORE_DOCS_SUFFIX: &str = "-docstore.docs";
pub const DOCSTORE_OFFSETS_SUFFIX: &str = "-docstore.offsets";
pub const DOCSTORE_POSITIONS_SUFFIX: &str = "-docstore-positions";
pub const DOCSTORE_POSITION_OFFSETS_SUFFIX: &str = "-docstore-positions.offsets";
pub const DOCSTORE_PMIDS_SUFFIX: &str = "-docstore.pmids";
pub const DOCSTORE_OPT_TERMS_SUFFIX: &str = "-docstore-opt-terms.index";
pub const TERM_DOC_FREQS_DATA_SUFFIX: &str = "-term-doc-freqs.data";
pub const TERM_DOC_FREQS_OFFSETS_SUFFIX: &str = "-term-doc-freqs.offsets";
pub const VOCABULARY_SUFFIX: &str = "-vocabulary.json";
pub const INDEX_DETAILS_SUFFIX: &str = "-index-details.json";

/// Appends `suffix` to the final component of `basename`.
pub fn path_with_suffix(basename: &Path, suffix: &str) -> PathBuf {
    let mut path = OsString::from(basename.as_os_str());
    path.push(suffix);
    PathBuf::from(path)
}

/// File holding the transformed→initial permutation of transform layer `position`.
pub fn projection_path(basename: &Path, position: u32) -> PathBuf {
    path_with_suffix(basename, &format!("-term-doc-freqs-{position}.projection"))
}

/// Data file of a string-per-document store named `name`.
pub fn strings_path(basename: &Path, name: &str) -> PathBuf {
    path_with_suffix(basename, &format!("-{name}.strings"))
}

/// Offset/length index of a string-per-document store named `name`.
pub fn strings_index_path(basename: &Path, name: &str) -> PathBuf {
    path_with_suffix(basename, &format!("-{name}.strings-index"))
}

/// Probes for an optional file. Failing to probe is reported, absence is not.
pub fn optional_file_exists(path: &Path) -> Result<bool> {
    path.try_exists()
        .map_err(|e| Error::io(path.display().to_string(), e))
}

/// Writes a raw little-endian `i32` array side file.
pub fn write_i32_file(path: &Path, values: &[i32]) -> Result<()> {
    let context = path.display().to_string();
    let mut writer = FileWriter::create(path).map_err(|e| Error::io(context.as_str(), e))?;
    writer
        .write_i32_le_slice(values)
        .and_then(|_| writer.seal())
        .map_err(|e| Error::io(context, e))
}

/// Reads a raw little-endian `i32` array side file.
pub fn read_i32_file(path: &Path) -> Result<Vec<i32>> {
    let context = path.display().to_string();
    let reader = FileReader::open(path).map_err(|e| Error::io(context.as_str(), e))?;
    let size = reader.size().map_err(|e| Error::io(context.as_str(), e))?;
    if size % 4 != 0 {
        return Err(Error::invalid_format(
            context,
            format!("size {size} is not a multiple of 4"),
        ));
    }
    reader
        .read_i32_le_array_at(0, (size / 4) as usize)
        .map_err(|e| Error::decode(context, e))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    DocumentContent,
    Offsets,
    Positions,
    TermDocumentFrequencies,
}

impl StreamKind {
    fn id(self) -> u8 {
        match self {
            StreamKind::DocumentContent => 1,
            StreamKind::Offsets => 2,
            StreamKind::Positions => 3,
            StreamKind::TermDocumentFrequencies => 4,
        }
    }

    fn from_id(id: u8) -> Option<StreamKind> {
        match id {
            1 => Some(StreamKind::DocumentContent),
            2 => Some(StreamKind::Offsets),
            3 => Some(StreamKind::Positions),
            4 => Some(StreamKind::TermDocumentFrequencies),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamHeader {
    pub kind: StreamKind,
    pub primary: Coding,
    pub secondary: Coding,
    /// For document content: the number of vocabulary terms, which is also the
    /// escape index written for unknown words.
    pub param: u64,
}

impl StreamHeader {
    pub const MAGIC: &'static [u8; 4] = b"MTXS";
    pub const VERSION: u8 = 1;
    pub const SIZE: u64 = 16;
    pub const SIZE_BITS: u64 = Self::SIZE * 8;

    pub fn new(kind: StreamKind, primary: Coding) -> StreamHeader {
        StreamHeader {
            kind,
            primary,
            secondary: primary,
            param: 0,
        }
    }

    pub fn with_secondary(mut self, secondary: Coding) -> StreamHeader {
        self.secondary = secondary;
        self
    }

    pub fn with_param(mut self, param: u64) -> StreamHeader {
        self.param = param;
        self
    }

    pub fn to_bytes(&self) -> [u8; 16] {
        let mut bytes = [0u8; 16];
        bytes[0..4].copy_from_slice(Self::MAGIC);
        bytes[4] = Self::VERSION;
        bytes[5] = self.kind.id();
        bytes[6] = self.primary.id();
        bytes[7] = self.secondary.id();
        bytes[8..16].copy_from_slice(&self.param.to_le_bytes());
        bytes
    }

    pub fn write<W: SealingWrite + ?Sized>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(&self.to_bytes()[..8])?;
        writer.write_u64_le(self.param)
    }

    /// Reads and validates the header of `element`, which must be of `expected` kind.
    pub fn read<R: ReadAt + ?Sized>(
        reader: &R,
        element: &str,
        expected: StreamKind,
    ) -> Result<StreamHeader> {
        let bytes = reader
            .read_exact_at(0..Self::SIZE)
            .map_err(|e| Error::decode(element, e))?;
        Self::parse(&bytes, element, expected)
    }

    pub fn parse(bytes: &[u8], element: &str, expected: StreamKind) -> Result<StreamHeader> {
        if bytes.len() < Self::SIZE as usize {
            return Err(Error::invalid_format(element, "truncated stream header"));
        }
        if &bytes[0..4] != Self::MAGIC {
            return Err(Error::invalid_format(element, "bad stream magic"));
        }
        if bytes[4] != Self::VERSION {
            return Err(Error::invalid_format(
                element,
                format!("unsupported format version {}", bytes[4]),
            ));
        }
        let kind = StreamKind::from_id(bytes[5]).ok_or_else(|| {
            Error::invalid_format(element, format!("unknown stream kind {}", bytes[5]))
        })?;
        if kind != expected {
            return Err(Error::invalid_format(
                element,
                format!("expected a {expected:?} stream, found {kind:?}"),
            ));
        }
        let primary = coding_from_id(bytes[6], element)?;
        let secondary = coding_from_id(bytes[7], element)?;
        let mut param = [0u8; 8];
        param.copy_from_slice(&bytes[8..16]);
        Ok(StreamHeader {
            kind,
            primary,
            secondary,
            param: u64::from_le_bytes(param),
        })
    }
}

fn coding_from_id(id: u8, element: &str) -> Result<Coding> {
    Coding::from_id(id)
        .ok_or_else(|| Error::invalid_format(element, format!("unknown coding id {id}")))
}
