use std::io::{self, Read, Seek, SeekFrom};

/// Seekable, readable view over an upload's temporary storage.
///
/// Implemented for anything that is `Read + Seek` (`File`, `Cursor<Vec<u8>>`,
/// `&mut File`, ...). The inspector owns the source exclusively for the
/// duration of one call.
pub trait ByteSource: Read + Seek {
    /// Total length in bytes; the read position is preserved
    fn size(&mut self) -> io::Result<u64> {
        let current = self.stream_position()?;
        let end = self.seek(SeekFrom::End(0))?;
        self.seek(SeekFrom::Start(current))?;
        Ok(end)
    }
}

impl<T: Read + Seek> ByteSource for T {}

/// Fill `buf` from `offset`, returning how many bytes were available
pub(crate) fn read_at<S: ByteSource>(source: &mut S, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
    source.seek(SeekFrom::Start(offset))?;
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Read at most `limit` bytes from the start of the source
pub(crate) fn read_prefix<S: ByteSource>(source: &mut S, limit: u64) -> io::Result<Vec<u8>> {
    source.seek(SeekFrom::Start(0))?;
    let mut buf = Vec::new();
    source.by_ref().take(limit).read_to_end(&mut buf)?;
    Ok(buf)
}
