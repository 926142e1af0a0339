//! MSB-first bit output stream.

use medtext_io::SealingWrite;

use crate::{low_mask, msb};

/// Appends bits to a [`SealingWrite`] sink.
///
/// Bits are packed MSB-first into bytes, staged in an in-memory buffer and
/// handed to the sink in chunks. [`BitWriter::bits_written`] counts every bit
/// emitted since construction, which is what the store writers record as
/// document offsets.
pub struct BitWriter<W> {
    inner: W,
    buffer: Vec<u8>,
    /// Partially filled byte, aligned to the most significant bit.
    current: u8,
    /// Number of bits used in `current`.
    filled: u32,
    bits_written: u64,
    flush_threshold: usize,
}

impl<W: SealingWrite> BitWriter<W> {
    /// Default staging buffer size.
    pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

    pub fn new(inner: W) -> BitWriter<W> {
        Self::with_buffer_size(inner, Self::DEFAULT_BUFFER_SIZE)
    }

    pub fn with_buffer_size(inner: W, buffer_size: usize) -> BitWriter<W> {
        let flush_threshold = buffer_size.max(1);
        BitWriter {
            inner,
            buffer: Vec::with_capacity(flush_threshold),
            current: 0,
            filled: 0,
            bits_written: 0,
            flush_threshold,
        }
    }

    /// Total number of bits written so far.
    #[inline]
    pub fn bits_written(&self) -> u64 {
        self.bits_written
    }

    /// Writes the `n` low bits of `value`, most significant first. `n <= 64`.
    pub fn write_bits(&mut self, value: u64, n: u32) -> std::io::Result<()> {
        if n > 64 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("cannot write {n} bits at once"),
            ));
        }
        let mut remaining = n;
        while remaining > 0 {
            let free = 8 - self.filled;
            let take = free.min(remaining);
            let shift = remaining - take;
            let bits = ((value >> shift) & low_mask(take)) as u8;
            self.current |= bits << (free - take);
            self.filled += take;
            remaining -= take;
            if self.filled == 8 {
                self.push_byte()?;
            }
        }
        self.bits_written += n as u64;
        Ok(())
    }

    #[inline]
    pub fn write_bit(&mut self, bit: bool) -> std::io::Result<()> {
        self.write_bits(bit as u64, 1)
    }

    /// Writes `n` zero bits followed by a one bit.
    pub fn write_unary(&mut self, mut n: u64) -> std::io::Result<()> {
        while n >= 64 {
            self.write_bits(0, 64)?;
            n -= 64;
        }
        self.write_bits(1, n as u32 + 1)
    }

    /// Writes the γ code of `x`; returns the number of bits written.
    pub fn write_gamma(&mut self, x: u64) -> std::io::Result<u32> {
        let v = Self::shifted(x)?;
        let n = msb(v);
        self.write_unary(n as u64)?;
        self.write_bits(v & low_mask(n), n)?;
        Ok(2 * n + 1)
    }

    /// Writes the δ code of `x`; returns the number of bits written.
    pub fn write_delta(&mut self, x: u64) -> std::io::Result<u32> {
        let v = Self::shifted(x)?;
        let n = msb(v);
        let len = self.write_gamma(n as u64)?;
        self.write_bits(v & low_mask(n), n)?;
        Ok(len + n)
    }

    /// Pads the current byte with zero bits. Returns the number of padding bits.
    pub fn align(&mut self) -> std::io::Result<u32> {
        if self.filled == 0 {
            return Ok(0);
        }
        let padding = 8 - self.filled;
        self.write_bits(0, padding)?;
        Ok(padding)
    }

    /// Hands every complete byte to the sink. The partial byte stays staged.
    pub fn flush(&mut self) -> std::io::Result<()> {
        if !self.buffer.is_empty() {
            self.inner.write_all(&self.buffer)?;
            self.buffer.clear();
        }
        Ok(())
    }

    /// Pads to a byte boundary, flushes, and returns the sink without sealing it,
    /// so that a trailer can still be appended.
    pub fn finish(mut self) -> std::io::Result<W> {
        self.align()?;
        self.flush()?;
        Ok(self.inner)
    }

    /// Pads, flushes and seals the sink.
    pub fn seal(self) -> std::io::Result<W> {
        let mut inner = self.finish()?;
        inner.seal()?;
        Ok(inner)
    }

    fn push_byte(&mut self) -> std::io::Result<()> {
        self.buffer.push(self.current);
        self.current = 0;
        self.filled = 0;
        if self.buffer.len() >= self.flush_threshold {
            self.flush()?;
        }
        Ok(())
    }

    fn shifted(x: u64) -> std::io::Result<u64> {
        x.checked_add(1).ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "u64::MAX cannot be encoded with a universal code",
            )
        })
    }
}
