//! Framing for async transports
//!
//! [`PromptCodec`] splits the byte stream of a debug server into one frame per
//! response, each frame ending with the prompt byte.
use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::{
    codec::{Response, prompt_position},
    error::ProtocolError,
    protocol::{Command, DEFAULT_PROMPT},
};

/// Encodes [`Command`]s and decodes prompt-terminated responses.
///
/// The codec remembers the last command it encoded so that the echo of the
/// following frame can be checked.
#[derive(Debug, Clone)]
pub struct PromptCodec {
    prompt: u8,
    pending_echo: Option<String>,
}

impl PromptCodec {
    pub fn new(prompt: u8) -> PromptCodec {
        PromptCodec {
            prompt,
            pending_echo: None,
        }
    }
}

impl Default for PromptCodec {
    fn default() -> Self {
        PromptCodec::new(DEFAULT_PROMPT)
    }
}

impl Encoder<Command> for PromptCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: Command, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let line = item.to_string();
        dst.reserve(line.len() + 1);
        dst.put_slice(line.as_bytes());
        dst.put_u8(b'\n');
        self.pending_echo = Some(line);
        Ok(())
    }
}

impl Decoder for PromptCodec {
    type Item = Response;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // The prompt is followed by a space that belongs to neither frame
        let padding = src.iter().take_while(|b| b.is_ascii_whitespace()).count();
        src.advance(padding);

        let Some(end) = prompt_position(src, self.prompt) else {
            return Ok(None);
        };
        let frame = src.split_to(end + 1);
        match self.pending_echo.take() {
            Some(echo) => Response::from_bytes(&echo, &frame, self.prompt).map(Some),
            // Banner before the first command
            None => Ok(Some(Response {
                lines: Vec::new(),
                complete: true,
            })),
        }
    }
}
