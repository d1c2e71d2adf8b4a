//! Frame envelope: `[tag:1][payload_len:3 little-endian][payload]`
//!
//! Decoding is partial-read safe. While the header or payload is still
//! incomplete the buffer is left untouched and `Ok(None)` is returned, so the
//! caller can retry once more bytes arrive. A successful decode removes
//! exactly one frame from the front of the buffer.

use bytes::{Buf, Bytes, BytesMut};
use thiserror::Error;

/// Tag byte plus three length bytes
pub const FRAME_HEADER_LEN: usize = 4;

/// Largest payload a 24-bit length can describe
pub const MAX_PAYLOAD_LEN: usize = 0x00ff_ffff;

/// Message type carried in the first header byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageTag {
    /// client -> server, per-tick button state
    Controls = 0x01,
    /// server -> client, full snapshot
    State = b's',
}

impl MessageTag {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(MessageTag::Controls),
            b's' => Some(MessageTag::State),
            _ => None,
        }
    }

    /// Payload size for fixed-format messages
    pub fn fixed_payload_len(self) -> Option<usize> {
        match self {
            MessageTag::Controls => Some(5),
            MessageTag::State => None,
        }
    }
}

/// Errors that terminate the connection they occur on
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    #[error("unknown message tag: 0x{0:02X}")]
    UnknownTag(u8),

    #[error("{tag:?} message with size {declared} != {expected}")]
    UnexpectedSize {
        tag: MessageTag,
        declared: usize,
        expected: usize,
    },

    #[error("{0:?} message is not accepted on this side of the connection")]
    UnexpectedMessage(MessageTag),

    #[error("ran out of bytes: field needs {needed}, {remaining} left in payload")]
    ShortPayload { needed: usize, remaining: usize },

    #[error("trailing data: payload declared {declared} bytes, fields used {consumed}")]
    TrailingData { declared: usize, consumed: usize },

    #[error("invalid {field}: {value}")]
    InvalidField { field: &'static str, value: i64 },

    #[error("payload of {0} bytes does not fit a 24-bit length")]
    PayloadTooLarge(usize),
}

/// One decoded frame
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub tag: MessageTag,
    pub payload: Bytes,
}

/// Write the tag and a placeholder length; returns the mark for [`finish_frame`]
pub fn begin_frame(buf: &mut BytesMut, tag: MessageTag) -> usize {
    buf.extend_from_slice(&[tag as u8, 0, 0, 0]);
    buf.len()
}

/// Patch the payload length of the frame started at `mark`
pub fn finish_frame(buf: &mut BytesMut, mark: usize) -> Result<(), ProtocolError> {
    let size = buf.len() - mark;
    if size > MAX_PAYLOAD_LEN {
        buf.truncate(mark - FRAME_HEADER_LEN);
        return Err(ProtocolError::PayloadTooLarge(size));
    }
    let len = (size as u32).to_le_bytes();
    buf[mark - 3..mark].copy_from_slice(&len[..3]);
    Ok(())
}

/// Try to take one complete frame off the front of `buf`
pub fn try_decode_frame(buf: &mut BytesMut) -> Result<Option<Frame>, ProtocolError> {
    if buf.len() < FRAME_HEADER_LEN {
        return Ok(None);
    }

    let tag = MessageTag::from_byte(buf[0]).ok_or(ProtocolError::UnknownTag(buf[0]))?;
    let size = u32::from_le_bytes([buf[1], buf[2], buf[3], 0]) as usize;

    if let Some(expected) = tag.fixed_payload_len() {
        if size != expected {
            return Err(ProtocolError::UnexpectedSize {
                tag,
                declared: size,
                expected,
            });
        }
    }

    if buf.len() < FRAME_HEADER_LEN + size {
        return Ok(None);
    }

    buf.advance(FRAME_HEADER_LEN);
    let payload = buf.split_to(size).freeze();
    Ok(Some(Frame { tag, payload }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    fn frame_bytes(tag: u8, payload: &[u8]) -> Vec<u8> {
        let len = (payload.len() as u32).to_le_bytes();
        let mut out = vec![tag, len[0], len[1], len[2]];
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn incomplete_header_leaves_buffer_alone() {
        let mut buf = BytesMut::from(&[0x01u8, 5, 0][..]);
        assert_eq!(assert_ok!(try_decode_frame(&mut buf)), None);
        assert_eq!(&buf[..], &[0x01, 5, 0]);
    }

    #[test]
    fn incomplete_payload_leaves_buffer_alone() {
        let full = frame_bytes(b's', &[1, 2, 3, 4, 5, 6]);
        let mut buf = BytesMut::from(&full[..7]);
        assert_eq!(assert_ok!(try_decode_frame(&mut buf)), None);
        assert_eq!(&buf[..], &full[..7]);

        buf.extend_from_slice(&full[7..]);
        let frame = assert_ok!(try_decode_frame(&mut buf)).unwrap();
        assert_eq!(frame.tag, MessageTag::State);
        assert_eq!(&frame.payload[..], &[1, 2, 3, 4, 5, 6]);
        assert!(buf.is_empty());
    }

    #[test]
    fn fixed_size_mismatch_is_fatal_even_before_payload_arrives() {
        let mut buf = BytesMut::from(&[0x01u8, 4, 0, 0][..]);
        let err = assert_err!(try_decode_frame(&mut buf));
        assert_eq!(
            err,
            ProtocolError::UnexpectedSize {
                tag: MessageTag::Controls,
                declared: 4,
                expected: 5
            }
        );
    }

    #[test]
    fn unknown_tag_is_fatal() {
        let mut buf = BytesMut::from(&[0x7fu8, 0, 0, 0][..]);
        assert_eq!(
            assert_err!(try_decode_frame(&mut buf)),
            ProtocolError::UnknownTag(0x7f)
        );
    }

    #[test]
    fn frames_drain_in_order() {
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&frame_bytes(b's', b"ab"));
        buf.extend_from_slice(&frame_bytes(0x01, &[1, 2, 3, 4, 5]));
        buf.extend_from_slice(&frame_bytes(b's', b""));

        let first = assert_ok!(try_decode_frame(&mut buf)).unwrap();
        let second = assert_ok!(try_decode_frame(&mut buf)).unwrap();
        let third = assert_ok!(try_decode_frame(&mut buf)).unwrap();
        assert_eq!(&first.payload[..], b"ab");
        assert_eq!(second.tag, MessageTag::Controls);
        assert!(third.payload.is_empty());
        assert_eq!(assert_ok!(try_decode_frame(&mut buf)), None);
    }

    #[test]
    fn length_is_patched_little_endian() {
        let mut buf = BytesMut::new();
        let mark = begin_frame(&mut buf, MessageTag::State);
        buf.extend_from_slice(&vec![0xAA; 0x0102]);
        assert_ok!(finish_frame(&mut buf, mark));
        assert_eq!(&buf[..4], &[b's', 0x02, 0x01, 0x00]);
    }
}
