use super::LineCodec;
use crate::message::Command;
use bytes::BytesMut;
use std::io;
use tokio_util::codec::{Decoder, Encoder};

/// Client side: encodes [`Command`]s, decodes raw response lines.
///
/// Responses are parsed by the caller with [`crate::Response::parse`], which
/// needs to know the command that was sent.
#[derive(Default)]
pub struct ClientCodec {
    inner: LineCodec,
}

impl ClientCodec {
    pub fn new() -> Self {
        Self {
            inner: LineCodec::new(),
        }
    }
}

impl Decoder for ClientCodec {
    type Item = String;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> std::result::Result<Option<Self::Item>, Self::Error> {
        self.inner.decode(src)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> std::result::Result<Option<Self::Item>, Self::Error> {
        self.inner.decode_eof(src)
    }
}

impl Encoder<Command> for ClientCodec {
    type Error = io::Error;

    fn encode(&mut self, item: Command, dst: &mut BytesMut) -> std::result::Result<(), Self::Error> {
        self.inner.encode(item.as_str(), dst)
    }
}
