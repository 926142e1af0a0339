//! One string per document, e.g. titles or external identifiers.
//!
//! `<basename>-<name>.strings` holds the UTF-8 payloads back to back;
//! `<basename>-<name>.strings-index` holds one `(u64 byte offset, u64 byte
//! length)` little-endian pair per document, so a lookup is two positioned
//! reads.

use std::path::PathBuf;

use medtext_common::{Result, error::Error};
use medtext_io::{ReadAt, ReadAtExt, SealingWrite, SealingWriteExt, file::FileReader, file::FileWriter};

use crate::{
    docstore::{check_order, create_file, next_index},
    format::{strings_index_path, strings_path},
};

const INDEX_ENTRY_SIZE: u64 = 16;

pub struct StringPerDocumentWriter {
    basename: PathBuf,
    name: String,
    files: Option<(FileWriter, FileWriter)>,
    bytes_written: u64,
    next_document: u32,
}

impl StringPerDocumentWriter {
    pub fn create(basename: impl Into<PathBuf>, name: &str) -> Result<StringPerDocumentWriter> {
        let basename = basename.into();
        let data = create_file(&strings_path(&basename, name))?;
        let index = create_file(&strings_index_path(&basename, name))?;
        Ok(StringPerDocumentWriter {
            basename,
            name: name.to_string(),
            files: Some((data, index)),
            bytes_written: 0,
            next_document: 0,
        })
    }

    pub fn number_of_documents(&self) -> u32 {
        self.next_document
    }

    /// Stores the string of document `index`; skipped documents get empty strings.
    pub fn append(&mut self, index: u32, value: &str) -> Result<()> {
        check_order(&self.name, self.next_document, index)?;
        let next = next_index(index)?;
        let (data, entries) = self
            .files
            .as_mut()
            .ok_or_else(|| Error::invalid_operation("append on a closed string store"))?;
        let context = self.name.as_str();
        let io = |e| Error::io(context, e);
        while self.next_document < index {
            entries.write_u64_le(self.bytes_written).map_err(io)?;
            entries.write_u64_le(0).map_err(io)?;
            self.next_document += 1;
        }
        entries.write_u64_le(self.bytes_written).map_err(io)?;
        entries.write_u64_le(value.len() as u64).map_err(io)?;
        data.write_all(value.as_bytes()).map_err(io)?;
        self.bytes_written += value.len() as u64;
        self.next_document = next;
        Ok(())
    }

    /// Seals both files; returns the number of documents.
    pub fn close(mut self) -> Result<u32> {
        let (mut data, mut entries) = self
            .files
            .take()
            .ok_or_else(|| Error::invalid_operation("close on a closed string store"))?;
        data.seal()
            .and_then(|_| entries.seal())
            .map_err(|e| Error::io(self.name.as_str(), e))?;
        log::debug!(
            "closed string store '{}' of {}: {} documents, {} bytes",
            self.name,
            self.basename.display(),
            self.next_document,
            self.bytes_written
        );
        Ok(self.next_document)
    }
}

pub struct StringPerDocumentReader {
    name: String,
    data: FileReader,
    data_size: u64,
    entries: FileReader,
    len: u32,
}

impl StringPerDocumentReader {
    pub fn open(basename: impl Into<PathBuf>, name: &str) -> Result<StringPerDocumentReader> {
        let basename = basename.into();
        let data_path = strings_path(&basename, name);
        let index_path = strings_index_path(&basename, name);
        let data = FileReader::open(&data_path)
            .map_err(|e| Error::io(data_path.display().to_string(), e))?;
        let entries = FileReader::open(&index_path)
            .map_err(|e| Error::io(index_path.display().to_string(), e))?;
        let data_size = data.size().map_err(|e| Error::io(name, e))?;
        let index_size = entries.size().map_err(|e| Error::io(name, e))?;
        if index_size % INDEX_ENTRY_SIZE != 0 {
            return Err(Error::invalid_format(
                index_path.display().to_string(),
                format!("{index_size} bytes is not a whole number of entries"),
            ));
        }
        Ok(StringPerDocumentReader {
            name: name.to_string(),
            data,
            data_size,
            entries,
            len: (index_size / INDEX_ENTRY_SIZE) as u32,
        })
    }

    pub fn len(&self) -> u32 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// String of document `index`; `None` past the last document.
    pub fn get(&self, index: u32) -> Result<Option<String>> {
        if index >= self.len {
            return Ok(None);
        }
        let name = self.name.as_str();
        let position = index as u64 * INDEX_ENTRY_SIZE;
        let offset = self
            .entries
            .read_u64_le_at(position)
            .map_err(|e| Error::decode(name, e))?;
        let length = self
            .entries
            .read_u64_le_at(position + 8)
            .map_err(|e| Error::decode(name, e))?;
        let end = offset.checked_add(length).filter(|&end| end <= self.data_size);
        let Some(end) = end else {
            return Err(Error::corrupt_store(
                name,
                format!("string {index} lies outside the data file"),
            ));
        };
        let bytes = self
            .data
            .read_exact_at(offset..end)
            .map_err(|e| Error::decode(name, e))?;
        String::from_utf8(bytes)
            .map(Some)
            .map_err(|e| Error::corrupt_store(name, e.to_string()))
    }
}
