//! Lazily decoded, single-consumption byte streams.

use crate::encoding::{self, TransferEncoding};
use bytes::{Buf, Bytes};
use std::io::{self, Read};

/// Body bytes of an attachment, embedded file or opaque message content.
///
/// Transfer decoding runs on the first read. Reading consumes the stream: once
/// drained, further reads return `0`. Decoding failures surface as
/// [`io::ErrorKind::InvalidData`].
#[derive(Debug)]
pub struct Data {
    state: State,
}

#[derive(Debug)]
enum State {
    Encoded {
        raw: Bytes,
        encoding: TransferEncoding,
    },
    Decoded(Bytes),
}

impl Data {
    /// Wraps raw body bytes that still carry `encoding`.
    pub(crate) fn encoded(raw: Bytes, encoding: TransferEncoding) -> Self {
        let state = if encoding.is_identity() {
            State::Decoded(raw)
        } else {
            State::Encoded { raw, encoding }
        };
        Self { state }
    }

    /// Wraps bytes that are exposed as they are.
    pub(crate) const fn raw(raw: Bytes) -> Self {
        Self {
            state: State::Decoded(raw),
        }
    }

    /// Reads everything that is left into a vector.
    ///
    /// # Errors
    ///
    /// Returns an error if transfer decoding fails.
    pub fn into_vec(mut self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

impl Read for Data {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if let State::Encoded { raw, encoding } = &self.state {
            let decoded = encoding::decode(raw, *encoding)
                .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
            self.state = State::Decoded(Bytes::from(decoded));
        }

        match &mut self.state {
            State::Decoded(bytes) => {
                let n = buf.len().min(bytes.remaining());
                bytes.copy_to_slice(&mut buf[..n]);
                Ok(n)
            }
            State::Encoded { .. } => Ok(0),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_on_read() {
        let data = Data::encoded(Bytes::from_static(b"aGVsbG8="), TransferEncoding::Base64);
        assert_eq!(data.into_vec().unwrap(), b"hello");
    }

    #[test]
    fn test_single_consumption() {
        let mut data = Data::raw(Bytes::from_static(b"once"));
        let mut first = Vec::new();
        data.read_to_end(&mut first).unwrap();
        assert_eq!(first, b"once");

        let mut second = Vec::new();
        assert_eq!(data.read_to_end(&mut second).unwrap(), 0);
        assert!(second.is_empty());
    }

    #[test]
    fn test_small_reads() {
        let mut data = Data::encoded(Bytes::from_static(b"abc"), TransferEncoding::SevenBit);
        let mut buf = [0u8; 2];
        assert_eq!(data.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf, b"ab");
        assert_eq!(data.read(&mut buf).unwrap(), 1);
        assert_eq!(buf[0], b'c');
        assert_eq!(data.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_decode_error_is_invalid_data() {
        let mut data = Data::encoded(Bytes::from_static(b"!!!"), TransferEncoding::Base64);
        let err = data.read(&mut [0u8; 8]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
