//! Random-access MSB-first bit input stream.

use medtext_io::ReadAt;

use crate::low_mask;

/// Reads bits from a [`ReadAt`] source starting at any bit position.
///
/// Bytes are fetched through a read-ahead window: a miss loads
/// `read_ahead` bytes starting at the missing byte. Repositioning with
/// [`BitReader::seek`] inside the current window costs nothing, which keeps
/// consecutive random reads of neighbouring documents cheap.
///
/// Running past the end of the source yields `UnexpectedEof`; a unary prefix
/// longer than any valid codeword yields `InvalidData`.
pub struct BitReader<R> {
    inner: R,
    size: u64,
    window: Vec<u8>,
    window_start: u64,
    /// Absolute position in bits.
    position: u64,
    read_ahead: usize,
}

impl<R: ReadAt> BitReader<R> {
    /// Default read-ahead window size in bytes.
    pub const DEFAULT_READ_AHEAD: usize = 16 * 1024;

    pub fn new(inner: R) -> std::io::Result<BitReader<R>> {
        Self::with_read_ahead(inner, Self::DEFAULT_READ_AHEAD)
    }

    pub fn with_read_ahead(inner: R, read_ahead: usize) -> std::io::Result<BitReader<R>> {
        let size = inner.size()?;
        Ok(BitReader {
            inner,
            size,
            window: Vec::new(),
            window_start: 0,
            position: 0,
            read_ahead: read_ahead.max(8),
        })
    }

    /// Current position in bits.
    #[inline]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Size of the source in bits.
    #[inline]
    pub fn len_bits(&self) -> u64 {
        self.size * 8
    }

    /// Moves the cursor to an absolute bit position. Seeking past the end is
    /// allowed; the next read then fails with `UnexpectedEof`.
    #[inline]
    pub fn seek(&mut self, bit_position: u64) {
        self.position = bit_position;
    }

    /// Skips `n` bits.
    #[inline]
    pub fn skip(&mut self, n: u64) {
        self.position += n;
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    pub fn read_bit(&mut self) -> std::io::Result<bool> {
        let byte = self.byte_at(self.position >> 3)?;
        let bit = (byte >> (7 - (self.position & 7))) & 1;
        self.position += 1;
        Ok(bit == 1)
    }

    /// Reads `n` bits, most significant first. `n <= 64`.
    pub fn read_bits(&mut self, n: u32) -> std::io::Result<u64> {
        if n > 64 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("cannot read {n} bits at once"),
            ));
        }
        let mut value = 0u64;
        let mut remaining = n;
        while remaining > 0 {
            let byte = self.byte_at(self.position >> 3)? as u64;
            let offset = (self.position & 7) as u32;
            let available = 8 - offset;
            let take = available.min(remaining);
            let bits = (byte >> (available - take)) & low_mask(take);
            value = (value << take) | bits;
            remaining -= take;
            self.position += take as u64;
        }
        Ok(value)
    }

    /// Counts zero bits up to and including the next one bit.
    ///
    /// Returns the number of zeros. More than 63 zeros cannot start a valid
    /// codeword and are reported as `InvalidData`.
    pub fn read_unary(&mut self) -> std::io::Result<u32> {
        let mut zeros = 0u32;
        loop {
            let byte = self.byte_at(self.position >> 3)?;
            let offset = (self.position & 7) as u32;
            // Bits already consumed in this byte are masked off.
            let rest = (byte << offset) as u32 & 0xFF;
            if rest == 0 {
                let consumed = 8 - offset;
                zeros += consumed;
                self.position += consumed as u64;
            } else {
                let lead = rest.leading_zeros() - 24;
                zeros += lead;
                self.position += lead as u64 + 1;
                break;
            }
            if zeros > 63 {
                return Err(invalid_codeword(zeros));
            }
        }
        if zeros > 63 {
            return Err(invalid_codeword(zeros));
        }
        Ok(zeros)
    }

    pub fn read_gamma(&mut self) -> std::io::Result<u64> {
        let n = self.read_unary()?;
        let low = self.read_bits(n)?;
        Ok(((1u64 << n) | low) - 1)
    }

    pub fn read_delta(&mut self) -> std::io::Result<u64> {
        let n = self.read_gamma()?;
        if n > 63 {
            return Err(invalid_codeword(n as u32));
        }
        let n = n as u32;
        let low = self.read_bits(n)?;
        Ok(((1u64 << n) | low) - 1)
    }

    fn byte_at(&mut self, pos: u64) -> std::io::Result<u8> {
        let window_end = self.window_start + self.window.len() as u64;
        if pos < self.window_start || pos >= window_end {
            self.fill(pos)?;
        }
        Ok(self.window[(pos - self.window_start) as usize])
    }

    fn fill(&mut self, pos: u64) -> std::io::Result<()> {
        if pos >= self.size {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("bit stream ends at byte {}", self.size),
            ));
        }
        let end = (pos + self.read_ahead as u64).min(self.size);
        let window = self.inner.read_at(pos..end)?;
        if window.is_empty() {
            return Err(std::io::ErrorKind::UnexpectedEof.into());
        }
        self.window = window;
        self.window_start = pos;
        Ok(())
    }
}

#[cold]
fn invalid_codeword(zeros: u32) -> std::io::Error {
    std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        format!("unary prefix of {zeros} zeros exceeds any valid codeword"),
    )
}
