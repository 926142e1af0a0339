//! Coding selection and the coded stream adaptors.
//!
//! Each stream of a store is written with one universal code chosen at
//! construction time. The choice is persisted in the stream header as the
//! numeric [`Coding::id`], so readers never depend on compiled-in defaults.

use serde::{Deserialize, Serialize};

use medtext_io::{ReadAt, SealingWrite};

use crate::{reader::BitReader, writer::BitWriter};

/// Universal code used for the integers of one stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Coding {
    /// Elias γ: best for small values (term indices, first gaps).
    Gamma,
    /// Elias δ: best for values with a wide range (offsets, counts, gaps).
    Delta,
}

impl Coding {
    /// On-disk identifier.
    pub fn id(self) -> u8 {
        match self {
            Coding::Gamma => 1,
            Coding::Delta => 2,
        }
    }

    /// Resolves an on-disk identifier; unknown identifiers are rejected
    /// rather than mapped to a default.
    pub fn from_id(id: u8) -> Option<Coding> {
        match id {
            1 => Some(Coding::Gamma),
            2 => Some(Coding::Delta),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Coding::Gamma => "gamma",
            Coding::Delta => "delta",
        }
    }

    /// Length in bits of the codeword for `x`.
    pub fn code_len(self, x: u64) -> u32 {
        match self {
            Coding::Gamma => crate::gamma_len(x),
            Coding::Delta => crate::delta_len(x),
        }
    }
}

impl std::fmt::Display for Coding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A [`BitWriter`] bound to one [`Coding`].
pub struct CodedWriter<W> {
    bits: BitWriter<W>,
    coding: Coding,
}

impl<W: SealingWrite> CodedWriter<W> {
    pub fn new(bits: BitWriter<W>, coding: Coding) -> CodedWriter<W> {
        CodedWriter { bits, coding }
    }

    pub fn coding(&self) -> Coding {
        self.coding
    }

    #[inline]
    pub fn bits_written(&self) -> u64 {
        self.bits.bits_written()
    }

    /// Writes one value with the stream coding; returns the codeword length.
    #[inline]
    pub fn write_int(&mut self, value: u32) -> std::io::Result<u32> {
        self.write_long(value as u64)
    }

    /// Writes one value with the stream coding; returns the codeword length.
    pub fn write_long(&mut self, value: u64) -> std::io::Result<u32> {
        match self.coding {
            Coding::Gamma => self.bits.write_gamma(value),
            Coding::Delta => self.bits.write_delta(value),
        }
    }

    /// Writes every value of `values`; returns the total number of bits written.
    pub fn write_ints(&mut self, values: &[u32]) -> std::io::Result<u64> {
        let mut total = 0u64;
        for &value in values {
            total += self.write_int(value)? as u64;
        }
        Ok(total)
    }

    /// Writes `value` with an explicit coding, bypassing the stream default.
    pub fn write_with(&mut self, coding: Coding, value: u64) -> std::io::Result<u32> {
        match coding {
            Coding::Gamma => self.bits.write_gamma(value),
            Coding::Delta => self.bits.write_delta(value),
        }
    }

    pub fn bit_writer(&mut self) -> &mut BitWriter<W> {
        &mut self.bits
    }

    pub fn into_inner(self) -> BitWriter<W> {
        self.bits
    }
}

/// A [`BitReader`] bound to one [`Coding`].
pub struct CodedReader<R> {
    bits: BitReader<R>,
    coding: Coding,
}

impl<R: ReadAt> CodedReader<R> {
    pub fn new(bits: BitReader<R>, coding: Coding) -> CodedReader<R> {
        CodedReader { bits, coding }
    }

    /// Convenience constructor over a source with the default read-ahead.
    pub fn from_source(source: R, coding: Coding) -> std::io::Result<CodedReader<R>> {
        let bits = BitReader::new(source)?;
        Ok(CodedReader { bits, coding })
    }

    pub fn coding(&self) -> Coding {
        self.coding
    }

    #[inline]
    pub fn position(&self) -> u64 {
        self.bits.position()
    }

    #[inline]
    pub fn seek(&mut self, bit_position: u64) {
        self.bits.seek(bit_position)
    }

    pub fn read_long(&mut self) -> std::io::Result<u64> {
        match self.coding {
            Coding::Gamma => self.bits.read_gamma(),
            Coding::Delta => self.bits.read_delta(),
        }
    }

    /// Reads one value that must fit into 32 bits.
    pub fn read_int(&mut self) -> std::io::Result<u32> {
        let value = self.read_long()?;
        u32::try_from(value).map_err(|_| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("decoded value {value} does not fit a 32-bit integer"),
            )
        })
    }

    /// Reads a value with an explicit coding, bypassing the stream default.
    pub fn read_with(&mut self, coding: Coding) -> std::io::Result<u64> {
        match coding {
            Coding::Gamma => self.bits.read_gamma(),
            Coding::Delta => self.bits.read_delta(),
        }
    }

    pub fn bit_reader(&mut self) -> &mut BitReader<R> {
        &mut self.bits
    }

    pub fn into_inner(self) -> BitReader<R> {
        self.bits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coding_ids() {
        for coding in [Coding::Gamma, Coding::Delta] {
            assert_eq!(Coding::from_id(coding.id()), Some(coding));
        }
        assert_eq!(Coding::from_id(0), None);
        assert_eq!(Coding::from_id(3), None);
    }

    #[test]
    fn test_coding_display() {
        assert_eq!(Coding::Gamma.to_string(), "gamma");
        assert_eq!(Coding::Delta.to_string(), "delta");
    }

    #[test]
    fn test_write_ints_reports_bits() {
        let mut writer = CodedWriter::new(BitWriter::new(Vec::new()), Coding::Delta);
        let values = [0u32, 5, 17, 1 << 20];
        let bits = writer.write_ints(&values).unwrap();
        let expected: u64 = values
            .iter()
            .map(|&v| Coding::Delta.code_len(v as u64) as u64)
            .sum();
        assert_eq!(bits, expected);
        assert_eq!(writer.bits_written(), expected);

        let bytes = writer.into_inner().finish().unwrap();
        let mut reader = CodedReader::from_source(bytes, Coding::Delta).unwrap();
        for &v in &values {
            assert_eq!(reader.read_int().unwrap(), v);
        }
    }

    #[test]
    fn test_mixed_codings() {
        let mut writer = CodedWriter::new(BitWriter::new(Vec::new()), Coding::Gamma);
        writer.write_int(3).unwrap();
        writer.write_with(Coding::Delta, 1000).unwrap();
        writer.write_long(u32::MAX as u64 + 1).unwrap();
        let bytes = writer.into_inner().finish().unwrap();

        let mut reader = CodedReader::from_source(bytes, Coding::Gamma).unwrap();
        assert_eq!(reader.read_int().unwrap(), 3);
        assert_eq!(reader.read_with(Coding::Delta).unwrap(), 1000);
        let err = reader.read_int().unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }
}
