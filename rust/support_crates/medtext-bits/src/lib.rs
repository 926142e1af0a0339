//! Bit-level streams and universal integer codes.
//!
//! # Key Types
//!
//! - [`writer::BitWriter`]: appends bits MSB-first on top of a
//!   [`medtext_io::SealingWrite`] and counts every bit it emits.
//! - [`reader::BitReader`]: reads bits from an arbitrary bit position of a
//!   [`medtext_io::ReadAt`] source through a read-ahead window.
//! - [`codec::Coding`]: the universal code (γ or δ) selected for a stream.
//! - [`codec::CodedWriter`] / [`codec::CodedReader`]: a bit stream bound to a
//!   coding, exposing `write_int`, `write_long`, `write_ints` and their readers.
//!
//! # Codes
//!
//! Both codes map a non-negative integer `x` through `v = x + 1`, with
//! `n = floor(log2(v))`:
//!
//! - γ: `n` zero bits followed by the `n + 1` bits of `v`.
//! - δ: γ(`n`) followed by the low `n` bits of `v`.
//!
//! ```rust
//! use medtext_bits::codec::{Coding, CodedReader, CodedWriter};
//! use medtext_bits::writer::BitWriter;
//!
//! let mut writer = CodedWriter::new(BitWriter::new(Vec::<u8>::new()), Coding::Gamma);
//! writer.write_ints(&[0, 1, 2, 1000]).unwrap();
//! let bytes = writer.into_inner().finish().unwrap();
//!
//! let mut reader = CodedReader::from_source(bytes, Coding::Gamma).unwrap();
//! assert_eq!(reader.read_int().unwrap(), 0);
//! assert_eq!(reader.read_int().unwrap(), 1);
//! assert_eq!(reader.read_int().unwrap(), 2);
//! assert_eq!(reader.read_int().unwrap(), 1000);
//! ```

pub mod codec;
pub mod reader;
pub mod writer;

pub use codec::{CodedReader, CodedWriter, Coding};
pub use reader::BitReader;
pub use writer::BitWriter;

/// Returns `floor(log2(v))` for a non-zero `v`.
#[inline]
pub(crate) fn msb(v: u64) -> u32 {
    debug_assert!(v != 0);
    63 - v.leading_zeros()
}

/// Returns a mask with the `n` low bits set, `n <= 64`.
#[inline]
pub(crate) fn low_mask(n: u32) -> u64 {
    if n >= 64 { u64::MAX } else { (1u64 << n) - 1 }
}

/// Length in bits of the γ code of `x`.
pub fn gamma_len(x: u64) -> u32 {
    2 * msb(x.saturating_add(1)) + 1
}

/// Length in bits of the δ code of `x`.
pub fn delta_len(x: u64) -> u32 {
    let n = msb(x.saturating_add(1));
    gamma_len(n as u64) + n
}
