//! Streaming, seekable, read-only access to a record's payload.
//!
//! A [`BlobReader`] presents a record's chunks as one byte stream without
//! loading them all. A read resolves its byte range to the chunks that hold
//! it ([`resolve_range`]) and reads only those slices.
//!
//! Chunks are opened through a [`ChunkSource`] the first time they are
//! touched and stay open until the reader is closed or dropped. The reader
//! is a snapshot: its byte and chunk totals are fixed at construction.

use std::io::{self, SeekFrom};
use std::ops::Range;

use bytes::Bytes;
use rusqlite::{Connection, DatabaseName};
use tracing::warn;

use tessera_core::{
    byte_index, resolve_range, update_position, ByteSlice, RecordId, ValidationError,
};

use crate::error::{Result, StoreError};
use crate::model::Model;

/// An opened chunk that supports random-range reads.
pub trait ChunkAccess {
    /// Length of the chunk in bytes.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append the bytes in `range` to `out`.
    fn read_into(&mut self, range: Range<usize>, out: &mut Vec<u8>) -> Result<()>;

    /// Release the accessor.
    fn close(self) -> Result<()>;
}

/// Opens the chunks of one record by ordinal.
pub trait ChunkSource {
    type Chunk: ChunkAccess;

    fn open_chunk(&self, index: usize) -> Result<Self::Chunk>;
}

/// Read-only cursor over a record's payload.
pub struct BlobReader<S: ChunkSource> {
    source: S,
    /// Opened accessors, indexed by chunk ordinal.
    chunks: Vec<Option<S::Chunk>>,
    position: u64,
    total_bytes: u64,
    total_chunks: usize,
    chunk_size: usize,
}

impl<S: ChunkSource> BlobReader<S> {
    pub fn new(source: S, total_bytes: u64, total_chunks: usize, chunk_size: usize) -> Self {
        let mut chunks = Vec::new();
        chunks.resize_with(total_chunks, || None);
        Self {
            source,
            chunks,
            position: 0,
            total_bytes,
            total_chunks,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Total payload length.
    pub fn len(&self) -> u64 {
        self.total_bytes
    }

    pub fn is_empty(&self) -> bool {
        self.total_bytes == 0
    }

    pub fn chunk_count(&self) -> usize {
        self.total_chunks
    }

    /// Current cursor position.
    pub fn tell(&self) -> u64 {
        self.position
    }

    /// Read up to `length` bytes from the cursor, or everything left when
    /// `length` is `None`. Returns an empty buffer at end of data.
    pub fn read_bytes(&mut self, length: Option<usize>) -> Result<Vec<u8>> {
        if length == Some(0) || self.position >= self.total_bytes {
            return Ok(Vec::new());
        }
        let last = self.total_bytes - 1;
        let stop = match length {
            None => last,
            Some(n) => self
                .position
                .saturating_add(n as u64 - 1)
                .min(last),
        };
        let data = self.read_range(self.position, stop)?;
        self.position += data.len() as u64;
        Ok(data)
    }

    /// Read from the cursor to the end.
    pub fn read_all(&mut self) -> Result<Vec<u8>> {
        self.read_bytes(None)
    }

    /// Move the cursor. Leaves it unchanged on error.
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        self.position = update_position(self.position, pos, self.total_bytes)?;
        Ok(self.position)
    }

    /// The byte at `index`, negative counting from the end. Does not move
    /// the cursor.
    pub fn at(&mut self, index: i64) -> Result<Option<u8>> {
        match byte_index(index, self.total_bytes) {
            Some(i) => Ok(self.read_range(i, i)?.first().copied()),
            None => Ok(None),
        }
    }

    /// The bytes selected by `slice`. Does not move the cursor.
    pub fn slice(&mut self, slice: impl Into<ByteSlice>) -> Result<Vec<u8>> {
        let range = slice.into().indices(self.total_bytes)?;
        if range.is_empty() {
            return Ok(Vec::new());
        }
        self.read_range(range.start, range.end - 1)
    }

    /// Writes are never permitted.
    pub fn write(&mut self, _data: &[u8]) -> Result<usize> {
        Err(StoreError::ReadOnly)
    }

    /// Release every opened chunk accessor.
    ///
    /// Failures are logged and otherwise ignored.
    pub fn close(&mut self) {
        for (index, slot) in self.chunks.iter_mut().enumerate() {
            if let Some(chunk) = slot.take() {
                if let Err(e) = chunk.close() {
                    warn!(chunk = index, error = %e, "failed to close chunk accessor");
                }
            }
        }
    }

    /// Read the inclusive byte range `[start, stop]`.
    fn read_range(&mut self, start: u64, stop: u64) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity((stop - start + 1) as usize);
        for slice in resolve_range(start, stop, self.chunk_size) {
            if slice.chunk == self.total_chunks {
                // cursor at end of data
                continue;
            }
            if slice.chunk > self.total_chunks {
                return Err(ValidationError::ChunkOutOfRange {
                    index: slice.chunk,
                    chunks: self.total_chunks,
                }
                .into());
            }
            let chunk = self.chunk(slice.chunk)?;
            let end = slice.range.end.min(chunk.len());
            if slice.range.start < end {
                chunk.read_into(slice.range.start..end, &mut out)?;
            }
        }
        Ok(out)
    }

    fn chunk(&mut self, index: usize) -> Result<&mut S::Chunk> {
        if self.chunks[index].is_none() {
            let opened = self.source.open_chunk(index)?;
            self.chunks[index] = Some(opened);
        }
        self.chunks[index]
            .as_mut()
            .ok_or_else(|| StoreError::InvalidData(format!("chunk {} not open", index)))
    }
}

impl<S: ChunkSource> Drop for BlobReader<S> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<S: ChunkSource> io::Read for BlobReader<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let data = self.read_bytes(Some(buf.len())).map_err(StoreError::into_io)?;
        buf[..data.len()].copy_from_slice(&data);
        Ok(data.len())
    }
}

impl<S: ChunkSource> io::Seek for BlobReader<S> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        BlobReader::seek(self, pos).map_err(StoreError::into_io)
    }
}

impl<S: ChunkSource> io::Write for BlobReader<S> {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(StoreError::ReadOnly.into_io())
    }

    fn flush(&mut self) -> io::Result<()> {
        Err(StoreError::ReadOnly.into_io())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SQLite chunks
// ─────────────────────────────────────────────────────────────────────────────

/// Chunks of one record, opened as SQLite incremental blob handles.
pub struct SqliteChunks<'c> {
    conn: &'c Connection,
    model: Model,
    record_id: RecordId,
}

impl<'c> SqliteChunks<'c> {
    pub fn new(conn: &'c Connection, model: Model, record_id: RecordId) -> Self {
        Self {
            conn,
            model,
            record_id,
        }
    }
}

impl<'c> ChunkSource for SqliteChunks<'c> {
    type Chunk = rusqlite::blob::Blob<'c>;

    fn open_chunk(&self, index: usize) -> Result<Self::Chunk> {
        let table = self.model.chunk_table();
        let row_id: i64 = self.conn.query_row(
            &format!(
                "SELECT id FROM {} WHERE record_id = ?1 ORDER BY id ASC LIMIT 1 OFFSET ?2",
                table
            ),
            rusqlite::params![self.record_id, index as i64],
            |row| row.get(0),
        )?;
        Ok(self
            .conn
            .blob_open(DatabaseName::Main, table, "chunk", row_id, true)?)
    }
}

impl ChunkAccess for rusqlite::blob::Blob<'_> {
    fn len(&self) -> usize {
        rusqlite::blob::Blob::len(self)
    }

    fn read_into(&mut self, range: Range<usize>, out: &mut Vec<u8>) -> Result<()> {
        let start = out.len();
        out.resize(start + range.len(), 0);
        self.read_at_exact(&mut out[start..], range.start)?;
        Ok(())
    }

    fn close(self) -> Result<()> {
        rusqlite::blob::Blob::close(self)?;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// In-memory chunks
// ─────────────────────────────────────────────────────────────────────────────

/// Chunks held in memory, e.g. the output of [`tessera_core::encode`].
#[derive(Debug, Clone, Default)]
pub struct MemoryChunks {
    chunks: Vec<Bytes>,
}

impl MemoryChunks {
    pub fn new(chunks: Vec<Bytes>) -> Self {
        Self { chunks }
    }

    /// A reader over these chunks.
    pub fn into_reader(self, chunk_size: usize) -> BlobReader<Self> {
        let total_bytes = self.chunks.iter().map(|c| c.len() as u64).sum();
        let total_chunks = self.chunks.len();
        BlobReader::new(self, total_bytes, total_chunks, chunk_size)
    }
}

impl ChunkSource for MemoryChunks {
    type Chunk = Bytes;

    fn open_chunk(&self, index: usize) -> Result<Bytes> {
        self.chunks.get(index).cloned().ok_or_else(|| {
            ValidationError::ChunkOutOfRange {
                index,
                chunks: self.chunks.len(),
            }
            .into()
        })
    }
}

impl ChunkAccess for Bytes {
    fn len(&self) -> usize {
        Bytes::len(self)
    }

    fn read_into(&mut self, range: Range<usize>, out: &mut Vec<u8>) -> Result<()> {
        let bytes = self.get(range.clone()).ok_or_else(|| {
            StoreError::InvalidData(format!("range {:?} outside chunk of {} bytes", range, self.len()))
        })?;
        out.extend_from_slice(bytes);
        Ok(())
    }

    fn close(self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::cell::Cell;
    use std::io::{Read, Seek, Write};
    use std::rc::Rc;
    use tessera_core::{encode, Value};

    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

    fn reader(data: &[u8], chunk_size: usize) -> BlobReader<MemoryChunks> {
        let (_, chunks) = encode(&Value::Bytes(data.to_vec()), chunk_size).unwrap();
        MemoryChunks::new(chunks).into_reader(chunk_size)
    }

    #[test]
    fn test_sequential_reads() {
        let mut blob = reader(ALPHABET, 1);
        assert_eq!(blob.read_bytes(Some(1)).unwrap(), b"A");
        assert_eq!(blob.read_bytes(Some(1)).unwrap(), b"B");
        assert_eq!(blob.read_bytes(Some(2)).unwrap(), b"CD");
        assert_eq!(blob.tell(), 4);

        blob.seek(SeekFrom::Start(0)).unwrap();
        assert_eq!(blob.read_all().unwrap(), ALPHABET);
        assert_eq!(blob.tell(), 26);

        blob.seek(SeekFrom::End(0)).unwrap();
        assert_eq!(blob.read_all().unwrap(), b"");
        assert_eq!(blob.tell(), 26);
    }

    #[test]
    fn test_reads_across_chunk_sizes() {
        for chunk_size in [1, 2, 3, 5, 7, 26, 100] {
            let mut blob = reader(ALPHABET, chunk_size);
            assert_eq!(blob.read_bytes(Some(3)).unwrap(), b"ABC", "size {}", chunk_size);
            assert_eq!(blob.read_bytes(Some(10)).unwrap(), b"DEFGHIJKLM");
            assert_eq!(blob.read_all().unwrap(), &ALPHABET[13..]);
        }
    }

    #[test]
    fn test_read_past_end_is_truncated() {
        let mut blob = reader(ALPHABET, 4);
        blob.seek(SeekFrom::End(-3)).unwrap();
        assert_eq!(blob.read_bytes(Some(100)).unwrap(), b"XYZ");
        assert_eq!(blob.tell(), 26);
        assert_eq!(blob.read_bytes(Some(1)).unwrap(), b"");
    }

    #[test]
    fn test_zero_length_read() {
        let mut blob = reader(ALPHABET, 4);
        assert_eq!(blob.read_bytes(Some(0)).unwrap(), b"");
        assert_eq!(blob.tell(), 0);
    }

    #[test]
    fn test_seek_errors_leave_position() {
        let mut blob = reader(ALPHABET, 4);
        blob.seek(SeekFrom::Start(5)).unwrap();
        assert!(blob.seek(SeekFrom::End(1)).is_err());
        assert!(blob.seek(SeekFrom::Current(-6)).is_err());
        assert!(blob.seek(SeekFrom::Start(27)).is_err());
        assert_eq!(blob.tell(), 5);
        assert_eq!(blob.seek(SeekFrom::Current(-5)).unwrap(), 0);
    }

    #[test]
    fn test_index_and_slice_keep_position() {
        let mut blob = reader(ALPHABET, 3);
        blob.seek(SeekFrom::Start(10)).unwrap();

        assert_eq!(blob.at(0).unwrap(), Some(b'A'));
        assert_eq!(blob.at(-1).unwrap(), Some(b'Z'));
        assert_eq!(blob.at(26).unwrap(), None);
        assert_eq!(blob.slice(2i64..5).unwrap(), b"CDE");
        assert_eq!(blob.slice(-3i64..).unwrap(), b"XYZ");
        assert_eq!(blob.slice(..).unwrap(), ALPHABET);
        assert_eq!(blob.slice(5i64..2).unwrap(), b"");
        assert_eq!(blob.tell(), 10);
    }

    #[test]
    fn test_slice_step_rejected() {
        let mut blob = reader(ALPHABET, 3);
        let err = blob.slice(ByteSlice::from(..).with_step(2)).unwrap_err();
        assert!(matches!(err, StoreError::Validation(ValidationError::NonUnitStep(2))));
    }

    #[test]
    fn test_writes_rejected() {
        let mut blob = reader(ALPHABET, 3);
        assert!(matches!(blob.write(b"x"), Err(StoreError::ReadOnly)));
        let err = Write::write(&mut blob, b"x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }

    #[test]
    fn test_io_traits() {
        let mut blob = reader(ALPHABET, 4);
        let mut buf = [0u8; 5];
        blob.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ABCDE");

        Seek::seek(&mut blob, SeekFrom::Start(20)).unwrap();
        let mut rest = Vec::new();
        blob.read_to_end(&mut rest).unwrap();
        assert_eq!(rest, b"UVWXYZ");

        let err = Seek::seek(&mut blob, SeekFrom::End(3)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_empty_payload() {
        let mut blob = reader(b"", 4);
        assert_eq!(blob.len(), 0);
        assert_eq!(blob.chunk_count(), 1);
        assert_eq!(blob.read_all().unwrap(), b"");
        assert_eq!(blob.at(0).unwrap(), None);
        assert_eq!(blob.slice(..).unwrap(), b"");
    }

    #[test]
    fn test_chunks_open_lazily_and_close() {
        let mut blob = reader(ALPHABET, 5);
        assert!(blob.chunks.iter().all(Option::is_none));
        blob.slice(6i64..8).unwrap();
        assert!(blob.chunks[1].is_some());
        assert!(blob.chunks[0].is_none());
        blob.close();
        assert!(blob.chunks.iter().all(Option::is_none));
    }

    fn two_chunks() -> MemoryChunks {
        MemoryChunks::new(vec![Bytes::from_static(b"ABCD"), Bytes::from_static(b"EFGH")])
    }

    #[test]
    fn test_chunk_index_at_total_reads_nothing() {
        // Totals claim a third chunk that the record does not have.
        let mut blob = BlobReader::new(two_chunks(), 12, 2, 4);
        blob.seek(SeekFrom::Start(8)).unwrap();
        assert_eq!(blob.read_bytes(Some(4)).unwrap(), b"");
        assert_eq!(blob.tell(), 8);
        assert_eq!(blob.slice(4i64..).unwrap(), b"EFGH");
    }

    #[test]
    fn test_chunk_index_past_total_is_out_of_range() {
        let mut blob = BlobReader::new(two_chunks(), 16, 2, 4);
        blob.seek(SeekFrom::Start(12)).unwrap();
        let err = blob.read_bytes(Some(4)).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::ChunkOutOfRange { index: 3, chunks: 2 })
        ));
        assert_eq!(blob.tell(), 12);
    }

    /// Chunks whose accessors always fail to close.
    struct StickyChunks {
        inner: MemoryChunks,
        closes: Rc<Cell<usize>>,
    }

    struct StickyChunk {
        bytes: Bytes,
        closes: Rc<Cell<usize>>,
    }

    impl ChunkSource for StickyChunks {
        type Chunk = StickyChunk;

        fn open_chunk(&self, index: usize) -> Result<StickyChunk> {
            Ok(StickyChunk {
                bytes: self.inner.open_chunk(index)?,
                closes: Rc::clone(&self.closes),
            })
        }
    }

    impl ChunkAccess for StickyChunk {
        fn len(&self) -> usize {
            self.bytes.len()
        }

        fn read_into(&mut self, range: Range<usize>, out: &mut Vec<u8>) -> Result<()> {
            self.bytes.read_into(range, out)
        }

        fn close(self) -> Result<()> {
            self.closes.set(self.closes.get() + 1);
            Err(StoreError::InvalidData("handle already released".into()))
        }
    }

    fn sticky(closes: &Rc<Cell<usize>>) -> BlobReader<StickyChunks> {
        let source = StickyChunks {
            inner: two_chunks(),
            closes: Rc::clone(closes),
        };
        BlobReader::new(source, 8, 2, 4)
    }

    #[test]
    fn test_close_failures_are_ignored() {
        let closes = Rc::new(Cell::new(0));
        let mut blob = sticky(&closes);
        assert_eq!(blob.read_all().unwrap(), b"ABCDEFGH");

        blob.close();
        assert_eq!(closes.get(), 2);
        assert!(blob.chunks.iter().all(Option::is_none));

        // Still usable: chunks reopen on demand.
        assert_eq!(blob.slice(-2i64..).unwrap(), b"GH");
        drop(blob);
        assert_eq!(closes.get(), 3);
    }

    #[test]
    fn test_drop_with_failing_close() {
        let closes = Rc::new(Cell::new(0));
        {
            let mut blob = sticky(&closes);
            blob.at(0).unwrap();
        }
        assert_eq!(closes.get(), 1);
    }

    proptest! {
        #[test]
        fn test_at_matches_buffer(
            data in prop::collection::vec(any::<u8>(), 0..100),
            size in 1usize..12,
            index in -120i64..120,
        ) {
            let mut blob = reader(&data, size);
            let expected = if index < 0 {
                data.len().checked_sub(index.unsigned_abs() as usize).map(|i| data[i])
            } else {
                data.get(index as usize).copied()
            };
            prop_assert_eq!(blob.at(index).unwrap(), expected);
            prop_assert_eq!(blob.tell(), 0);
        }

        #[test]
        fn test_seek_then_read_tail(
            data in prop::collection::vec(any::<u8>(), 1..100),
            size in 1usize..12,
            back in 0usize..100,
        ) {
            let back = back.min(data.len());
            let mut blob = reader(&data, size);
            blob.seek(SeekFrom::End(-(back as i64))).unwrap();
            prop_assert_eq!(blob.read_all().unwrap(), &data[data.len() - back..]);
        }
    }
}

