use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};

use tempfile::SpooledTempFile;

/// Archive data spills to disk past this size in streaming mode.
pub(crate) const SPOOL_THRESHOLD: usize = 16 * 1024 * 1024;

/// Scratch space for one archive, in RAM or spooled to a temporary file.
#[derive(Debug)]
pub(crate) enum Buffer {
    Memory(Cursor<Vec<u8>>),
    Spooled(SpooledTempFile),
}

impl Buffer {
    pub(crate) fn new(in_memory: bool) -> Self {
        if in_memory {
            Buffer::Memory(Cursor::new(Vec::new()))
        } else {
            Buffer::Spooled(SpooledTempFile::new(SPOOL_THRESHOLD))
        }
    }
}

impl Read for Buffer {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Buffer::Memory(inner) => inner.read(buf),
            Buffer::Spooled(inner) => inner.read(buf),
        }
    }
}

impl Write for Buffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Buffer::Memory(inner) => inner.write(buf),
            Buffer::Spooled(inner) => inner.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Buffer::Memory(inner) => inner.flush(),
            Buffer::Spooled(inner) => inner.flush(),
        }
    }
}

impl Seek for Buffer {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            Buffer::Memory(inner) => inner.seek(pos),
            Buffer::Spooled(inner) => inner.seek(pos),
        }
    }
}

/// Compares two streams chunk by chunk.
pub(crate) fn same_content(mut a: impl Read, mut b: impl Read) -> io::Result<bool> {
    let mut left = [0_u8; 8 * 1024];
    let mut right = [0_u8; 8 * 1024];
    loop {
        let n = read_full(&mut a, &mut left)?;
        let m = read_full(&mut b, &mut right)?;
        if n != m || left[..n] != right[..m] {
            return Ok(false);
        }
        if n == 0 {
            return Ok(true);
        }
    }
}

fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(filled)
}
