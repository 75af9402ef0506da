use crate::error::ProtocolError;
use crate::message::MAX_LINE_LENGTH;
use bytes::{BufMut, BytesMut};
use std::io;
use tokio_util::codec::{AnyDelimiterCodec, AnyDelimiterCodecError, Decoder, Encoder};
use tracing::debug;

/// Leading bytes of an oversized line kept for the error reply.
pub const TOO_LONG_EXCERPT: usize = 64;

/// One decoded line.
///
/// Bytes that are not valid UTF-8 are replaced, not rejected. A line longer
/// than [`MAX_LINE_LENGTH`] is reported once, with its first
/// [`TOO_LONG_EXCERPT`] bytes, and the rest of it is skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Text(String),
    TooLong(String),
}

/// Newline-delimited framing shared by both ends of the status protocol.
///
/// A trailing fragment without a newline at end of stream is dropped instead
/// of being surfaced as a final line.
pub struct LineCodec {
    inner: AnyDelimiterCodec,
}

impl LineCodec {
    pub fn new() -> Self {
        Self {
            inner: AnyDelimiterCodec::new_with_max_length(
                b"\n".to_vec(),
                b"\n".to_vec(),
                MAX_LINE_LENGTH,
            ),
        }
    }

    /// Next line in `src`. The codec stays usable after an oversized line.
    pub fn decode_line(&mut self, src: &mut BytesMut) -> io::Result<Option<Line>> {
        match self.inner.decode(src) {
            Ok(chunk) => Ok(chunk.map(|chunk| Line::Text(lossy_text(&chunk)))),
            Err(AnyDelimiterCodecError::MaxChunkLengthExceeded) => {
                // The oversized line is still at the front of `src`; the inner
                // codec discards it on the following calls.
                let excerpt = lossy_text(&src[..src.len().min(TOO_LONG_EXCERPT)]);
                debug!("Skipping line longer than {} bytes", MAX_LINE_LENGTH);
                Ok(Some(Line::TooLong(excerpt)))
            }
            Err(AnyDelimiterCodecError::Io(e)) => Err(e),
        }
    }

    pub fn decode_line_eof(&mut self, src: &mut BytesMut) -> io::Result<Option<Line>> {
        if let Some(line) = self.decode_line(src)? {
            return Ok(Some(line));
        }
        if !src.is_empty() {
            debug!("Discarding {} bytes of unterminated input at end of stream", src.len());
            src.clear();
        }
        Ok(None)
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

fn lossy_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

fn expect_text(line: Option<Line>) -> io::Result<Option<String>> {
    match line {
        Some(Line::Text(text)) => Ok(Some(text)),
        Some(Line::TooLong(_)) => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            ProtocolError::LineTooLong(MAX_LINE_LENGTH).to_string(),
        )),
        None => Ok(None),
    }
}

/// Plain text lines; an oversized line is an error.
impl Decoder for LineCodec {
    type Item = String;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let line = self.decode_line(src)?;
        expect_text(line)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let line = self.decode_line_eof(src)?;
        expect_text(line)
    }
}

impl<T: AsRef<str>> Encoder<T> for LineCodec {
    type Error = io::Error;

    fn encode(&mut self, item: T, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let line = item.as_ref();
        dst.reserve(line.len() + 1);
        dst.put_slice(line.as_bytes());
        dst.put_u8(b'\n');
        Ok(())
    }
}
