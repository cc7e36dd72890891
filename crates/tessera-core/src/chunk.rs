//! Chunk codec: splitting payloads into fixed-size chunks and reassembling them.
//!
//! Binary values are split directly. Everything else is streamed through the
//! CBOR encoder into a rolling buffer that emits a chunk every time it holds
//! `chunk_size` bytes; the remainder becomes a final, possibly shorter, chunk.
//!
//! Decoding feeds chunks to the deserializer one at a time through
//! [`ChunkReader`], so a payload is never concatenated in memory unless it is
//! binary.

use bytes::{Bytes, BytesMut};
use ciborium::value::Value;
use std::convert::Infallible;
use std::fmt;
use std::io::{self, Read, Write};

use crate::codec::{self, FieldRange};
use crate::error::CoreError;
use crate::types::{describe, Datatype};

/// Default chunk size: 1 MiB.
pub const DEFAULT_CHUNK_SIZE: usize = 1 << 20;

/// Failure of a chunked encode or decode.
///
/// Either the codec failed, or the caller's chunk sink/source did. The sink's
/// own error type is kept intact so storage errors surface unchanged.
#[derive(Debug)]
pub enum ChunkError<E> {
    Codec(CoreError),
    Sink(E),
}

impl<E> From<CoreError> for ChunkError<E> {
    fn from(e: CoreError) -> Self {
        ChunkError::Codec(e)
    }
}

impl<E: fmt::Display> fmt::Display for ChunkError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkError::Codec(e) => write!(f, "{}", e),
            ChunkError::Sink(e) => write!(f, "chunk sink failed: {}", e),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for ChunkError<E> {}

/// Summary of an encoded payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    pub datatype: Datatype,
    /// Number of chunks emitted. Always at least 1.
    pub chunks: usize,
    /// Total payload length in bytes.
    pub bytes: u64,
    /// Field ranges for mapping values, empty otherwise.
    pub fields: Vec<FieldRange>,
}

/// Split raw bytes into chunks of at most `chunk_size` bytes.
///
/// Empty input yields exactly one empty chunk.
pub fn split_binary(data: &[u8], chunk_size: usize) -> impl Iterator<Item = &[u8]> {
    let tail: Option<&[u8]> = if data.is_empty() { Some(data) } else { None };
    data.chunks(chunk_size.max(1)).chain(tail)
}

/// Encode a value, handing each chunk to `emit` as soon as it is full.
///
/// The datatype is determined before anything is emitted, so an unsupported
/// top-level value never reaches the sink.
pub fn encode_chunks<F, E>(
    value: &Value,
    chunk_size: usize,
    mut emit: F,
) -> Result<Encoded, ChunkError<E>>
where
    F: FnMut(Bytes) -> Result<(), E>,
{
    let datatype = Datatype::of(value)
        .ok_or_else(|| CoreError::UnsupportedType(describe(value).into()))?;

    if let Value::Bytes(data) = value {
        let mut chunks = 0;
        for piece in split_binary(data, chunk_size) {
            emit(Bytes::copy_from_slice(piece)).map_err(ChunkError::Sink)?;
            chunks += 1;
        }
        return Ok(Encoded {
            datatype,
            chunks,
            bytes: data.len() as u64,
            fields: Vec::new(),
        });
    }

    let mut writer = ChunkWriter::new(chunk_size, emit);
    let fields = match codec::serialize_into(value, &mut writer) {
        Ok(fields) => fields,
        Err(e) => {
            return Err(match writer.take_error() {
                Some(sink) => ChunkError::Sink(sink),
                None => ChunkError::Codec(e),
            })
        }
    };
    let (chunks, bytes) = writer.finish()?;

    Ok(Encoded {
        datatype,
        chunks,
        bytes,
        fields,
    })
}

/// Encode a value into an in-memory list of chunks.
pub fn encode(value: &Value, chunk_size: usize) -> Result<(Encoded, Vec<Bytes>), CoreError> {
    let mut out = Vec::new();
    let encoded = encode_chunks(value, chunk_size, |chunk| {
        out.push(chunk);
        Ok::<(), Infallible>(())
    })
    .map_err(|e| match e {
        ChunkError::Codec(e) => e,
        ChunkError::Sink(never) => match never {},
    })?;
    Ok((encoded, out))
}

/// Reassemble a value from its ordered chunks.
///
/// Binary payloads are concatenated; everything else is streamed through the
/// deserializer.
pub fn decode_chunks<I, B, E>(chunks: I, datatype: Datatype) -> Result<Value, ChunkError<E>>
where
    I: IntoIterator<Item = Result<B, E>>,
    B: AsRef<[u8]>,
{
    if datatype.is_binary() {
        let mut data = Vec::new();
        for chunk in chunks {
            data.extend_from_slice(chunk.map_err(ChunkError::Sink)?.as_ref());
        }
        return Ok(Value::Bytes(data));
    }

    let mut reader = ChunkReader::new(chunks.into_iter());
    match codec::deserialize(&mut reader) {
        Ok(value) => Ok(value),
        Err(e) => Err(match reader.take_error() {
            Some(source) => ChunkError::Sink(source),
            None => ChunkError::Codec(e),
        }),
    }
}

/// Reassemble a value from chunks already in memory.
pub fn decode<B: AsRef<[u8]>>(chunks: &[B], datatype: Datatype) -> Result<Value, CoreError> {
    decode_chunks(
        chunks.iter().map(|c| Ok::<&[u8], Infallible>(c.as_ref())),
        datatype,
    )
    .map_err(|e| match e {
        ChunkError::Codec(e) => e,
        ChunkError::Sink(never) => match never {},
    })
}

/// `io::Write` adapter that cuts the written stream into fixed-size chunks.
///
/// The first error returned by the sink is stashed and every later write
/// fails; retrieve it with [`ChunkWriter::take_error`].
pub struct ChunkWriter<F, E> {
    chunk_size: usize,
    buffer: BytesMut,
    emit: F,
    chunks: usize,
    bytes: u64,
    error: Option<E>,
}

impl<F, E> ChunkWriter<F, E>
where
    F: FnMut(Bytes) -> Result<(), E>,
{
    pub fn new(chunk_size: usize, emit: F) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            buffer: BytesMut::with_capacity(chunk_size.min(64 * 1024)),
            emit,
            chunks: 0,
            bytes: 0,
            error: None,
        }
    }

    /// Take the stashed sink error, if any.
    pub fn take_error(&mut self) -> Option<E> {
        self.error.take()
    }

    /// Flush the remainder and return `(chunks, bytes)` emitted in total.
    ///
    /// A stream that produced no bytes still emits one empty chunk.
    pub fn finish(mut self) -> Result<(usize, u64), ChunkError<E>> {
        if let Some(e) = self.error.take() {
            return Err(ChunkError::Sink(e));
        }
        if !self.buffer.is_empty() || self.chunks == 0 {
            let rest = self.buffer.split().freeze();
            if self.emit_chunk(rest).is_err() {
                if let Some(e) = self.error.take() {
                    return Err(ChunkError::Sink(e));
                }
            }
        }
        Ok((self.chunks, self.bytes))
    }

    fn emit_chunk(&mut self, chunk: Bytes) -> io::Result<()> {
        let len = chunk.len() as u64;
        match (self.emit)(chunk) {
            Ok(()) => {
                self.chunks += 1;
                self.bytes += len;
                Ok(())
            }
            Err(e) => {
                self.error = Some(e);
                Err(io::Error::new(io::ErrorKind::Other, "chunk sink failed"))
            }
        }
    }
}

impl<F, E> Write for ChunkWriter<F, E>
where
    F: FnMut(Bytes) -> Result<(), E>,
{
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.error.is_some() {
            return Err(io::Error::new(io::ErrorKind::Other, "chunk sink failed"));
        }
        self.buffer.extend_from_slice(buf);
        while self.buffer.len() >= self.chunk_size {
            let chunk = self.buffer.split_to(self.chunk_size).freeze();
            self.emit_chunk(chunk)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// `io::Read` adapter over a fallible sequence of chunks.
///
/// Chunks are pulled one at a time as the consumer reads. The first error
/// from the source is stashed; retrieve it with [`ChunkReader::take_error`].
pub struct ChunkReader<I, B, E> {
    chunks: I,
    current: Option<B>,
    offset: usize,
    error: Option<E>,
}

impl<I, B, E> ChunkReader<I, B, E>
where
    I: Iterator<Item = Result<B, E>>,
    B: AsRef<[u8]>,
{
    pub fn new(chunks: I) -> Self {
        Self {
            chunks,
            current: None,
            offset: 0,
            error: None,
        }
    }

    pub fn take_error(&mut self) -> Option<E> {
        self.error.take()
    }
}

impl<I, B, E> Read for ChunkReader<I, B, E>
where
    I: Iterator<Item = Result<B, E>>,
    B: AsRef<[u8]>,
{
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            if let Some(chunk) = &self.current {
                let data = chunk.as_ref();
                if self.offset < data.len() {
                    let n = (data.len() - self.offset).min(buf.len());
                    buf[..n].copy_from_slice(&data[self.offset..self.offset + n]);
                    self.offset += n;
                    return Ok(n);
                }
            }
            match self.chunks.next() {
                Some(Ok(chunk)) => {
                    self.current = Some(chunk);
                    self.offset = 0;
                }
                Some(Err(e)) => {
                    self.error = Some(e);
                    return Err(io::Error::new(io::ErrorKind::Other, "chunk source failed"));
                }
                None => return Ok(0),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Value {
        Value::Text(s.into())
    }

    #[test]
    fn test_split_binary() {
        let pieces: Vec<&[u8]> = split_binary(b"abcdefg", 3).collect();
        assert_eq!(pieces, vec![&b"abc"[..], &b"def"[..], &b"g"[..]]);

        let pieces: Vec<&[u8]> = split_binary(b"abcdef", 3).collect();
        assert_eq!(pieces.len(), 2);
    }

    #[test]
    fn test_empty_binary_is_one_empty_chunk() {
        let pieces: Vec<&[u8]> = split_binary(b"", 4).collect();
        assert_eq!(pieces, vec![&b""[..]]);

        let (encoded, chunks) = encode(&Value::Bytes(vec![]), 4).unwrap();
        assert_eq!(encoded.chunks, 1);
        assert_eq!(encoded.bytes, 0);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].is_empty());
        assert_eq!(decode(&chunks, Datatype::Bin).unwrap(), Value::Bytes(vec![]));
    }

    #[test]
    fn test_chunk_size_one() {
        let value = Value::Map(vec![
            (text("id"), Value::Integer(42.into())),
            (text("name"), text("alex")),
        ]);
        let (encoded, chunks) = encode(&value, 1).unwrap();
        assert_eq!(encoded.datatype, Datatype::Dict);
        assert_eq!(encoded.bytes, 16);
        assert_eq!(chunks.len(), 16);
        assert!(chunks.iter().all(|c| c.len() == 1));
        assert_eq!(encoded.fields.len(), 2);
        assert_eq!(decode(&chunks, Datatype::Dict).unwrap(), value);
    }

    #[test]
    fn test_rolling_buffer_remainder() {
        let value = text("hello world, this is a longer string");
        let (encoded, chunks) = encode(&value, 8).unwrap();
        let total: usize = chunks.iter().map(|c| c.len()).sum();
        assert_eq!(total as u64, encoded.bytes);
        assert!(chunks[..chunks.len() - 1].iter().all(|c| c.len() == 8));
        assert!(chunks.last().unwrap().len() <= 8);
        assert_eq!(decode(&chunks, Datatype::Str).unwrap(), value);
    }

    #[test]
    fn test_exact_multiple_has_no_trailing_empty_chunk() {
        let (encoded, chunks) = encode(&Value::Bytes(vec![7; 10]), 5).unwrap();
        assert_eq!(encoded.chunks, 2);
        assert_eq!(chunks.len(), 2);

        // a one-byte CBOR integer fills a one-byte chunk exactly
        let (encoded, chunks) = encode(&Value::Integer(1.into()), 1).unwrap();
        assert_eq!(encoded.chunks, 1);
        assert_eq!(chunks[0].as_ref(), &[0x01]);
    }

    #[test]
    fn test_null_and_tag_rejected_before_emit() {
        let mut emitted = 0;
        let result = encode_chunks(&Value::Null, 4, |_| {
            emitted += 1;
            Ok::<(), Infallible>(())
        });
        assert!(matches!(
            result,
            Err(ChunkError::Codec(CoreError::UnsupportedType(_)))
        ));
        assert_eq!(emitted, 0);

        let tagged = Value::Tag(0, Box::new(text("2024-01-01")));
        assert!(encode(&tagged, 4).is_err());
    }

    #[test]
    fn test_sink_error_surfaces_unchanged() {
        #[derive(Debug, PartialEq)]
        struct Full;

        let mut calls = 0;
        let result = encode_chunks(&text("abcdefghijklmnop"), 2, |_| {
            calls += 1;
            if calls == 3 {
                Err(Full)
            } else {
                Ok(())
            }
        });
        assert!(matches!(result, Err(ChunkError::Sink(Full))));
    }

    #[test]
    fn test_source_error_surfaces_unchanged() {
        #[derive(Debug, PartialEq)]
        struct Gone;

        let (_, chunks) = encode(&text("abcdefghijklmnop"), 2).unwrap();
        let source = chunks
            .iter()
            .enumerate()
            .map(|(i, c)| if i == 2 { Err(Gone) } else { Ok(c.clone()) });
        let result = decode_chunks(source, Datatype::Str);
        assert!(matches!(result, Err(ChunkError::Sink(Gone))));
    }

    #[test]
    fn test_chunk_reader_skips_empty_chunks() {
        let chunks: Vec<&[u8]> = vec![b"ab", b"", b"c", b"", b"de"];
        let mut reader = ChunkReader::new(chunks.into_iter().map(Ok::<_, Infallible>));
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"abcde");
    }

    #[test]
    fn test_zero_chunk_size_treated_as_one() {
        let (encoded, chunks) = encode(&Value::Bytes(vec![1, 2, 3]), 0).unwrap();
        assert_eq!(encoded.chunks, 3);
        assert_eq!(chunks.len(), 3);
    }
}
