//! Extension traits for common IO primitives.
//!
//! The side files of the stores (PMID maps, term remaps, projections, string
//! indexes) are flat little-endian integer arrays; these helpers read and write
//! them on top of [`ReadAt`] and [`SealingWrite`].

use std::ops::Range;

use byteorder::{ByteOrder, LittleEndian};

use crate::{ReadAt, SealingWrite};

/// Positional reads with exact-length semantics.
pub trait ReadAtExt: ReadAt {
    /// Reads exactly the requested range, failing with `UnexpectedEof` on a short read.
    fn read_exact_at(&self, range: Range<u64>) -> std::io::Result<Vec<u8>> {
        let expected = range.end.saturating_sub(range.start) as usize;
        let bytes = self.read_at(range)?;
        if bytes.len() != expected {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("short read: {} of {expected} bytes", bytes.len()),
            ));
        }
        Ok(bytes)
    }

    fn read_u32_le_at(&self, pos: u64) -> std::io::Result<u32> {
        let bytes = self.read_exact_at(pos..pos + 4)?;
        Ok(LittleEndian::read_u32(&bytes))
    }

    fn read_u64_le_at(&self, pos: u64) -> std::io::Result<u64> {
        let bytes = self.read_exact_at(pos..pos + 8)?;
        Ok(LittleEndian::read_u64(&bytes))
    }

    /// Reads `count` little-endian `i32` values starting at `pos`.
    fn read_i32_le_array_at(&self, pos: u64, count: usize) -> std::io::Result<Vec<i32>> {
        let bytes = self.read_exact_at(pos..pos + count as u64 * 4)?;
        let mut values = vec![0i32; count];
        LittleEndian::read_i32_into(&bytes, &mut values);
        Ok(values)
    }
}

impl<R: ReadAt + ?Sized> ReadAtExt for R {}

/// Fixed-width little-endian writes on top of a [`SealingWrite`].
pub trait SealingWriteExt: SealingWrite {
    fn write_u32_le(&mut self, value: u32) -> std::io::Result<()> {
        self.write_all(&value.to_le_bytes())
    }

    fn write_u64_le(&mut self, value: u64) -> std::io::Result<()> {
        self.write_all(&value.to_le_bytes())
    }

    fn write_i32_le_slice(&mut self, values: &[i32]) -> std::io::Result<()> {
        let mut buf = vec![0u8; values.len() * 4];
        LittleEndian::write_i32_into(values, &mut buf);
        self.write_all(&buf)
    }
}

impl<W: SealingWrite + ?Sized> SealingWriteExt for W {}
