use std::io::{BufReader, BufWriter, Read, Write};

use bytes::Bytes;

use crate::buf::{ByteSource, IoSource};
use crate::wire::{read_tag, read_value, write_record};
use crate::{DecodeError, DecodeResult, EncodeError, EncodeErrorKind, EncodeResult};

/// A single tag-value unit of a binpack stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// The record's tag; meaningful only to the caller.
    pub tag: u32,
    /// The raw record value.
    pub value: Bytes,
}

impl Record {
    pub fn new(tag: u32, value: impl Into<Bytes>) -> Self {
        Record {
            tag,
            value: value.into(),
        }
    }
}

/// Reads one record, distinguishing a clean end of input from a partial
/// record.
fn next_record<S: ByteSource>(src: &mut S) -> DecodeResult<Option<Record>> {
    let Some(tag) = read_tag(src)? else {
        return Ok(None);
    };
    match read_value(src)? {
        Some(value) => Ok(Some(Record { tag, value })),
        None => Err(DecodeError::truncated(1, 0)),
    }
}

/// Appends tag-value records to a byte sink.
///
/// Output is buffered; call [`Encoder::flush`] before relying on the contents
/// of the underlying writer.
pub struct Encoder<W: Write> {
    inner: BufWriter<W>,
    scratch: Vec<u8>,
}

impl<W: Write> Encoder<W> {
    pub fn new(inner: W) -> Self {
        Encoder {
            inner: BufWriter::new(inner),
            scratch: Vec::new(),
        }
    }

    /// Creates an encoder whose internal buffer holds `capacity` bytes.
    pub fn with_capacity(capacity: usize, inner: W) -> Self {
        Encoder {
            inner: BufWriter::with_capacity(capacity, inner),
            scratch: Vec::new(),
        }
    }

    /// Appends a single record.
    pub fn encode(&mut self, tag: u32, value: &[u8]) -> EncodeResult<()> {
        self.scratch.clear();
        write_record(&mut self.scratch, tag, value)?;
        self.inner.write_all(&self.scratch)?;
        Ok(())
    }

    /// Flushes buffered records through to the underlying writer.
    pub fn flush(&mut self) -> EncodeResult<()> {
        tracing::trace!(buffered = self.inner.buffer().len(), "flushing records");
        self.inner.flush()?;
        Ok(())
    }

    /// Returns the underlying writer. Records not yet flushed are not
    /// visible through it.
    pub fn get_ref(&self) -> &W {
        self.inner.get_ref()
    }

    /// Flushes pending records and returns the underlying writer.
    pub fn into_inner(mut self) -> EncodeResult<W> {
        self.flush()?;
        self.inner
            .into_inner()
            .map_err(|e| EncodeError::new(EncodeErrorKind::Io(e.error().kind())))
    }
}

/// Reads tag-value records from a byte source, front to back.
pub struct Decoder<R: Read> {
    src: IoSource<BufReader<R>>,
}

impl<R: Read> Decoder<R> {
    pub fn new(inner: R) -> Self {
        Decoder {
            src: IoSource::new(BufReader::new(inner)),
        }
    }

    /// Creates a decoder whose internal buffer holds `capacity` bytes.
    pub fn with_capacity(capacity: usize, inner: R) -> Self {
        Decoder {
            src: IoSource::new(BufReader::with_capacity(capacity, inner)),
        }
    }

    /// Returns the next record, or `None` when the input ends exactly at a
    /// record boundary.
    pub fn decode(&mut self) -> DecodeResult<Option<Record>> {
        next_record(&mut self.src)
    }

    pub fn get_ref(&self) -> &R {
        self.src.get_ref().get_ref()
    }

    /// Returns the underlying reader. Bytes already buffered are lost.
    pub fn into_inner(self) -> R {
        self.src.into_inner().into_inner()
    }
}

impl<R: Read> Iterator for Decoder<R> {
    type Item = DecodeResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.decode().transpose()
    }
}

/// Reads records from an in-memory payload without copying record values.
pub struct RecordReader {
    data: Bytes,
}

impl RecordReader {
    pub fn new(data: Bytes) -> Self {
        RecordReader { data }
    }

    /// Returns the next record, or `None` once the payload is consumed.
    pub fn next_record(&mut self) -> DecodeResult<Option<Record>> {
        next_record(&mut self.data)
    }

    /// Number of bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len()
    }
}

impl Iterator for RecordReader {
    type Item = DecodeResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}
