//! Byte-stream endpoint: an append-only outgoing buffer and a consumable
//! incoming buffer. Transport framing (WebSocket messages, TCP segments)
//! never reaches the codecs; only these two buffers do.

use bytes::{Bytes, BytesMut};

use crate::game::controls::Controls;
use crate::game::snapshot::StateSnapshot;

use super::frame::{try_decode_frame, Frame, MessageTag, ProtocolError};
use super::protocol::{encode_controls, encode_state};

#[derive(Debug, Default)]
pub struct Connection {
    pub send_buffer: BytesMut,
    pub recv_buffer: BytesMut,
    /// Only tag the peer may send; `None` accepts any known tag
    accepts: Option<MessageTag>,
}

impl Connection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Endpoint that fails as soon as a frame of any other type starts
    /// arriving, before its payload is buffered
    pub fn accepting(tag: MessageTag) -> Self {
        Self {
            accepts: Some(tag),
            ..Self::default()
        }
    }

    /// Append bytes that arrived from the transport
    pub fn receive(&mut self, bytes: &[u8]) {
        self.recv_buffer.extend_from_slice(bytes);
    }

    /// Next complete frame, or `Ok(None)` until more bytes arrive
    pub fn next_frame(&mut self) -> Result<Option<Frame>, ProtocolError> {
        if let (Some(accepted), Some(&byte)) = (self.accepts, self.recv_buffer.first()) {
            let tag = MessageTag::from_byte(byte).ok_or(ProtocolError::UnknownTag(byte))?;
            if tag != accepted {
                return Err(ProtocolError::UnexpectedMessage(tag));
            }
        }
        try_decode_frame(&mut self.recv_buffer)
    }

    pub fn send_controls(&mut self, controls: &Controls) -> Result<(), ProtocolError> {
        encode_controls(&mut self.send_buffer, controls)
    }

    pub fn send_state(&mut self, snapshot: &StateSnapshot) -> Result<(), ProtocolError> {
        encode_state(&mut self.send_buffer, snapshot)
    }

    /// Hand everything queued so far to the transport
    pub fn take_outgoing(&mut self) -> Bytes {
        self.send_buffer.split().freeze()
    }
}
