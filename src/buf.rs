use std::io::{BufRead, ErrorKind, Read};

use bytes::{Buf, Bytes};

use crate::{DecodeError, DecodeResult};

/// A forward-only source of encoded bytes.
///
/// The wire decoders only ever need to look at the next byte, or to take a
/// run of bytes whose length was announced by a prefix. Running out of input
/// is reported as `None` by `next_byte`, so callers can tell a clean record
/// boundary apart from a truncated record.
pub(crate) trait ByteSource {
    /// Returns the next byte, or `None` when the source is exhausted.
    fn next_byte(&mut self) -> DecodeResult<Option<u8>>;

    /// Returns exactly `amt` bytes, failing with `Truncated` if fewer remain.
    fn take(&mut self, amt: usize) -> DecodeResult<Bytes>;
}

impl ByteSource for Bytes {
    fn next_byte(&mut self) -> DecodeResult<Option<u8>> {
        if self.has_remaining() {
            Ok(Some(self.get_u8()))
        } else {
            Ok(None)
        }
    }

    fn take(&mut self, amt: usize) -> DecodeResult<Bytes> {
        if amt > self.remaining() {
            return Err(DecodeError::truncated(amt, self.remaining()));
        }
        Ok(self.split_to(amt))
    }
}

/// Adapts a buffered reader into a [`ByteSource`].
pub(crate) struct IoSource<R> {
    inner: R,
}

impl<R: BufRead> IoSource<R> {
    pub(crate) fn new(inner: R) -> Self {
        IoSource { inner }
    }

    pub(crate) fn get_ref(&self) -> &R {
        &self.inner
    }

    pub(crate) fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: BufRead> ByteSource for IoSource<R> {
    fn next_byte(&mut self) -> DecodeResult<Option<u8>> {
        loop {
            match self.inner.fill_buf() {
                Ok([]) => return Ok(None),
                Ok(buf) => {
                    let b = buf[0];
                    self.inner.consume(1);
                    return Ok(Some(b));
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn take(&mut self, amt: usize) -> DecodeResult<Bytes> {
        // The buffer grows with the bytes actually read, so a length prefix
        // larger than the input never allocates up front.
        let mut data = Vec::new();
        Read::take(&mut self.inner, amt as u64).read_to_end(&mut data)?;
        if data.len() < amt {
            return Err(DecodeError::truncated(amt, data.len()));
        }
        Ok(Bytes::from(data))
    }
}
