use crate::domain::errors::SourceError;
use std::io::{self, ErrorKind, Read};

/// Default size of one read, in bytes.
pub const DEFAULT_BUFFER_SIZE: usize = 2048;

/// Reads a byte source one bounded buffer at a time.
///
/// Opening the reader eagerly reads one lookahead buffer so the caller can
/// tell an empty source from a small one (fits in a single buffer) or a
/// large one (filled the first buffer, so more data may follow). A source
/// of exactly one buffer is reported as large.
pub struct ChunkedReader<R> {
    source: Option<R>,
    buffer: Vec<u8>,
    pending: usize,
    exhausted: bool,
    empty: bool,
    large: bool,
}

impl<R: Read> ChunkedReader<R> {
    /// Opens the reader over `source` and reads the lookahead buffer.
    ///
    /// # Returns
    /// * `Ok(ChunkedReader)` - Reader positioned before the first chunk
    /// * `Err(SourceError::Open)` - If the first read fails
    pub fn open(mut source: R, buffer_capacity: usize) -> Result<Self, SourceError> {
        let capacity = buffer_capacity.max(1);
        let mut buffer = vec![0; capacity];
        let pending = fill(&mut source, &mut buffer).map_err(SourceError::Open)?;

        let mut reader = Self {
            source: Some(source),
            buffer,
            pending,
            exhausted: false,
            empty: pending == 0,
            large: pending == capacity,
        };
        if reader.empty {
            reader.close();
        }
        Ok(reader)
    }

    /// True if the source had no data at all.
    pub fn is_empty(&self) -> bool {
        self.empty
    }

    /// True if the source filled at least one buffer.
    pub fn is_large(&self) -> bool {
        self.large
    }

    /// Returns the next chunk, or `None` once the source is exhausted.
    ///
    /// The slice borrows the reader's buffer and is only valid until the
    /// next call. Exhaustion is sticky: after the first `None` the source is
    /// never read again.
    pub fn next_chunk(&mut self) -> Result<Option<&[u8]>, SourceError> {
        if self.exhausted {
            return Ok(None);
        }
        let Some(source) = self.source.as_mut() else {
            return Ok(None);
        };

        if self.pending == 0 {
            self.pending = fill(source, &mut self.buffer).map_err(SourceError::Read)?;
        }
        if self.pending == 0 {
            self.exhausted = true;
            return Ok(None);
        }

        let count = std::mem::take(&mut self.pending);
        Ok(Some(&self.buffer[..count]))
    }

    /// Releases the source and the buffer. Safe to call more than once.
    pub fn close(&mut self) {
        self.source = None;
        self.buffer = Vec::new();
        self.pending = 0;
        self.exhausted = true;
    }
}

/// Reads until `buffer` is full or the source reports end of data.
fn fill<R: Read>(source: &mut R, buffer: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        match source.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn data(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    fn chunk_sizes<R: Read>(reader: &mut ChunkedReader<R>) -> Vec<usize> {
        let mut sizes = Vec::new();
        while let Some(chunk) = reader.next_chunk().unwrap() {
            sizes.push(chunk.len());
        }
        sizes
    }

    /// Yields at most `step` bytes per read, like a pipe.
    struct Trickle {
        data: Cursor<Vec<u8>>,
        step: usize,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let len = buf.len().min(self.step);
            self.data.read(&mut buf[..len])
        }
    }

    /// Delivers `good` bytes, then fails.
    struct Failing {
        good: usize,
    }

    impl Read for Failing {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.good == 0 {
                return Err(io::Error::other("device unplugged"));
            }
            let len = buf.len().min(self.good);
            buf[..len].fill(b'x');
            self.good -= len;
            Ok(len)
        }
    }

    #[test]
    fn empty_source() {
        let mut reader = ChunkedReader::open(Cursor::new(Vec::new()), 16).unwrap();
        assert!(reader.is_empty());
        assert!(!reader.is_large());
        assert!(reader.next_chunk().unwrap().is_none());
        assert!(reader.next_chunk().unwrap().is_none());
    }

    #[test]
    fn small_source_is_delivered_in_one_chunk() {
        let text = b"This is a small amount of data".to_vec();
        let mut reader = ChunkedReader::open(Cursor::new(text.clone()), DEFAULT_BUFFER_SIZE).unwrap();
        assert!(!reader.is_empty());
        assert!(!reader.is_large());
        assert_eq!(reader.next_chunk().unwrap(), Some(text.as_slice()));
        for _ in 0..3 {
            assert!(reader.next_chunk().unwrap().is_none());
        }
        reader.close();
    }

    #[test]
    fn large_source_is_split_into_buffers() {
        let mut reader = ChunkedReader::open(Cursor::new(data(500)), 200).unwrap();
        assert!(!reader.is_empty());
        assert!(reader.is_large());
        assert_eq!(chunk_sizes(&mut reader), vec![200, 200, 100]);
        assert!(reader.next_chunk().unwrap().is_none());
    }

    #[test]
    fn exact_multiple_ends_with_an_empty_read() {
        let mut reader = ChunkedReader::open(Cursor::new(data(400)), 200).unwrap();
        assert!(reader.is_large());
        assert_eq!(chunk_sizes(&mut reader), vec![200, 200]);
    }

    #[test]
    fn exactly_one_buffer_counts_as_large() {
        let mut reader = ChunkedReader::open(Cursor::new(data(64)), 64).unwrap();
        assert!(reader.is_large());
        assert_eq!(chunk_sizes(&mut reader), vec![64]);
    }

    #[test]
    fn chunks_preserve_every_byte_in_order() {
        let original = data(3000);
        let mut reader = ChunkedReader::open(Cursor::new(original.clone()), 2048).unwrap();
        let mut collected = Vec::new();
        let mut sizes = Vec::new();
        while let Some(chunk) = reader.next_chunk().unwrap() {
            sizes.push(chunk.len());
            collected.extend_from_slice(chunk);
        }
        assert_eq!(sizes, vec![2048, 952]);
        assert_eq!(collected, original);
    }

    #[test]
    fn short_reads_still_fill_whole_buffers() {
        let source = Trickle {
            data: Cursor::new(data(250)),
            step: 7,
        };
        let mut reader = ChunkedReader::open(source, 100).unwrap();
        assert!(reader.is_large());
        assert_eq!(chunk_sizes(&mut reader), vec![100, 100, 50]);
    }

    #[test]
    fn failure_on_open_is_an_open_error() {
        let result = ChunkedReader::open(Failing { good: 0 }, 8);
        assert!(matches!(result, Err(SourceError::Open(_))));
    }

    #[test]
    fn failure_mid_stream_propagates() {
        let mut reader = ChunkedReader::open(Failing { good: 8 }, 8).unwrap();
        assert_eq!(reader.next_chunk().unwrap().map(<[u8]>::len), Some(8));
        assert!(matches!(reader.next_chunk(), Err(SourceError::Read(_))));
    }

    #[test]
    fn close_is_idempotent() {
        let mut reader = ChunkedReader::open(Cursor::new(data(10)), 4).unwrap();
        reader.close();
        reader.close();
        assert!(reader.next_chunk().unwrap().is_none());

        let mut empty = ChunkedReader::open(Cursor::new(Vec::new()), 4).unwrap();
        empty.close();
        empty.close();
    }
}
