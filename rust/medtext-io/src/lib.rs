//! I/O abstractions under the coded streams and side files of the stores:
//! - `ReadAt`: positional reads of a byte range, so any document can be
//!   decoded without a shared file cursor.
//! - `SealingWrite`: append-only writes committed by `seal()`.
//!
//! Implemented for files ([`file`]) and for `Vec<u8>` ([`memory`]).

use std::ops::Range;

pub mod file;
pub mod io_extensions;
pub mod memory;
pub mod utils;

pub use io_extensions::{ReadAtExt, SealingWriteExt};

/// A file or buffer that can be read at arbitrary positions, concurrently.
pub trait ReadAt: Send + Sync + 'static {
    fn size(&self) -> std::io::Result<u64>;

    /// Reads the bytes of `range`.
    ///
    /// A short read happens only at the end of the object; a range starting
    /// at or past the end yields an empty buffer.
    fn read_at(&self, range: Range<u64>) -> std::io::Result<Vec<u8>>;
}

/// Sequential writing with an explicit commit.
///
/// Store writers seal every stream they own from their `close()` method; a
/// stream dropped unsealed may lose buffered data.
pub trait SealingWrite: Send {
    /// Appends the entire buffer; either all bytes are written or an error is returned.
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()>;

    /// Flushes and commits everything written. No writes are accepted afterwards.
    fn seal(&mut self) -> std::io::Result<()>;
}
