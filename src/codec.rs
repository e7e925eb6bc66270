use bytes::{BufMut, BytesMut};
use std::io;
use tokio_util::codec::{Decoder, Encoder};

/// Upper bound on bytes buffered for one connection while waiting for a
/// newline. Crossing it is treated as abuse and ends the session.
pub const MAX_CLIENT_BUFFER_SIZE: usize = 8192;

/// Splits the inbound byte stream into `\n`-terminated lines and writes
/// outbound lines back verbatim. Decoded lines keep any trailing `\r`;
/// the router strips it.
pub struct LineCodec {
    max_length: usize,
}

impl LineCodec {
    pub fn new() -> Self {
        Self {
            max_length: MAX_CLIENT_BUFFER_SIZE,
        }
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(idx) = buf.iter().position(|&b| b == b'\n') {
            let line = buf.split_to(idx + 1);
            let line = &line[..line.len() - 1];

            let line = std::str::from_utf8(line)
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "Invalid UTF-8"))?;
            Ok(Some(line.to_string()))
        } else if buf.len() > self.max_length {
            Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "Client buffer overflow",
            ))
        } else {
            Ok(None)
        }
    }
}

impl Encoder<String> for LineCodec {
    type Error = io::Error;

    fn encode(&mut self, line: String, buf: &mut BytesMut) -> Result<(), Self::Error> {
        buf.put(line.as_bytes());
        Ok(())
    }
}
