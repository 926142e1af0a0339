use std::{
    fs::File,
    io::{BufWriter, Write},
    ops::Range,
    path::Path,
    sync::{Arc, OnceLock},
};

use crate::{ReadAt, SealingWrite, verify};

pub struct FileReader {
    file: Arc<File>,
    size: OnceLock<u64>,
}

impl FileReader {
    pub fn new(file: impl Into<Arc<File>>) -> FileReader {
        FileReader {
            file: file.into(),
            size: Default::default(),
        }
    }

    pub fn open<P: AsRef<Path>>(path: P) -> std::io::Result<FileReader> {
        Ok(FileReader::new(File::open(path)?))
    }
}

impl FileReader {
    fn get_size(&self) -> std::io::Result<u64> {
        if let Some(&size) = self.size.get() {
            Ok(size)
        } else {
            let size = self.file.metadata()?.len();
            let _ = self.size.set(size);
            Ok(size)
        }
    }

    fn adjust_read_range(&self, range: Range<u64>) -> std::io::Result<Range<u64>> {
        let size = self.get_size()?;
        if range.start >= size || range.start == range.end {
            return Ok(0..0);
        }
        let range = range.start..std::cmp::min(range.end, size);
        Ok(range)
    }

    fn read_at_impl(file: &File, range: Range<u64>) -> std::io::Result<Vec<u8>> {
        let len = (range.end - range.start) as usize;
        let mut buf = vec![0u8; len];
        file_read_at_exact(file, range.start, &mut buf)?;
        Ok(buf)
    }
}

impl ReadAt for FileReader {
    fn size(&self) -> std::io::Result<u64> {
        self.get_size()
    }

    fn read_at(&self, range: Range<u64>) -> std::io::Result<Vec<u8>> {
        verify!(range.end >= range.start);
        let range = self.adjust_read_range(range)?;
        if range.is_empty() {
            return Ok(Vec::new());
        }
        Self::read_at_impl(&self.file, range)
    }
}

/// Buffered sequential file writer.
///
/// The file is flushed and synced by [`SealingWrite::seal`]; after sealing every
/// further write fails with `NotFound`.
pub struct FileWriter {
    file: Option<BufWriter<File>>,
}

impl FileWriter {
    const BUFFER_SIZE: usize = 64 * 1024;

    pub fn new(file: File) -> FileWriter {
        FileWriter {
            file: Some(BufWriter::with_capacity(Self::BUFFER_SIZE, file)),
        }
    }

    /// Creates the file, truncating an existing one.
    pub fn create<P: AsRef<Path>>(path: P) -> std::io::Result<FileWriter> {
        Ok(FileWriter::new(File::create(path)?))
    }

    pub fn is_sealed(&self) -> bool {
        self.file.is_none()
    }
}

impl SealingWrite for FileWriter {
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        self.file
            .as_mut()
            .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound))?
            .write_all(buf)
    }

    fn seal(&mut self) -> std::io::Result<()> {
        let file = self
            .file
            .take()
            .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound))?;
        let file = file.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        Ok(())
    }
}

#[cfg(unix)]
pub fn file_read_at_exact(file: &File, pos: u64, buf: &mut [u8]) -> std::io::Result<()> {
    use std::os::unix::fs::FileExt;

    file.read_exact_at(buf, pos)?;
    Ok(())
}

#[cfg(windows)]
pub fn file_read_at_exact(file: &File, mut pos: u64, mut buf: &mut [u8]) -> std::io::Result<()> {
    use std::os::windows::fs::FileExt;

    while !buf.is_empty() {
        match file.seek_read(buf, pos) {
            Ok(0) => break,
            Ok(n) => {
                buf = &mut buf[n..];
                pos += n as u64;
            }
            Err(e) => return Err(e),
        }
    }
    if !buf.is_empty() {
        return Err(std::io::ErrorKind::UnexpectedEof.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::{
        ReadAt, SealingWrite,
        file::{FileReader, FileWriter},
    };

    #[test]
    fn test_file_reader_and_writer() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let path = tempdir.path().join("test.bin");
        let mut writer = FileWriter::create(&path).expect("create file");
        for _ in 0..10 {
            writer.write_all(b"abcdefgh").expect("write_all");
        }
        writer.seal().expect("seal");
        assert!(writer.is_sealed());
        assert!(writer.write_all(b"x").is_err());

        let reader = FileReader::open(&path).expect("open file");
        assert_eq!(reader.size().unwrap(), 80);
        for pos in (0..80).step_by(8) {
            let buf = reader.read_at(pos..pos + 4).expect("read_at");
            assert_eq!(buf, b"abcd");
        }
        assert_eq!(reader.read_at(78..200).unwrap(), b"gh");
        assert!(reader.read_at(200..300).unwrap().is_empty());
    }

    #[test]
    fn test_create_truncates() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let path = tempdir.path().join("test.bin");
        let mut writer = FileWriter::create(&path).unwrap();
        writer.write_all(b"0123456789").unwrap();
        writer.seal().unwrap();

        let mut writer = FileWriter::create(&path).unwrap();
        writer.write_all(b"ab").unwrap();
        writer.seal().unwrap();
        assert_eq!(FileReader::open(&path).unwrap().size().unwrap(), 2);
    }
}
