use super::{Line, LineCodec};
use crate::message::Response;
use bytes::BytesMut;
use std::io;
use tokio_util::codec::{Decoder, Encoder};

/// Daemon side: decodes raw request [`Line`]s, encodes [`Response`]s.
///
/// Requests stay raw strings so that an unrecognised line can be echoed back.
/// Neither invalid UTF-8 nor an oversized line ends the stream.
#[derive(Default)]
pub struct ServerCodec {
    inner: LineCodec,
}

impl ServerCodec {
    pub fn new() -> Self {
        Self {
            inner: LineCodec::new(),
        }
    }
}

impl Decoder for ServerCodec {
    type Item = Line;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> std::result::Result<Option<Self::Item>, Self::Error> {
        self.inner.decode_line(src)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> std::result::Result<Option<Self::Item>, Self::Error> {
        self.inner.decode_line_eof(src)
    }
}

impl Encoder<Response> for ServerCodec {
    type Error = io::Error;

    fn encode(&mut self, item: Response, dst: &mut BytesMut) -> std::result::Result<(), Self::Error> {
        self.inner.encode(item.to_string(), dst)
    }
}
