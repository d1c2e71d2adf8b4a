//! Controls and State payload codecs
//!
//! Controls payload (client -> server, 5 bytes): one byte per button in
//! left, right, up, down, start order; bit 7 = held, bits 0-6 = edge count.
//!
//! State payload (server -> client):
//! ```text
//! [player_count:1]
//! player_count x [id:u32][active:u8][advantage_direction:i32][penalty:f32]
//!                [advantage:u8][name_len:u8][name:name_len]
//! [active_count:u32][progress:f32][trigger_direction:u32][match_state:u32]
//! ```
//! All multi-byte fields are little-endian.

use bytes::{Buf, BufMut, BytesMut};

use crate::game::controls::{ButtonKind, Controls};
use crate::game::r#match::{MatchState, TriggerDirection};
use crate::game::roster::{PlayerId, Side};
use crate::game::snapshot::{PlayerView, StateSnapshot};

use super::frame::{begin_frame, finish_frame, MessageTag, ProtocolError};

pub const CONTROLS_PAYLOAD_LEN: usize = 5;

/// Longest name carried in a State frame, in bytes
pub const MAX_NAME_LEN: usize = 255;

/// Most roster entries a State frame can list
pub const MAX_LISTED_PLAYERS: usize = 255;

pub fn encode_controls(buf: &mut BytesMut, controls: &Controls) -> Result<(), ProtocolError> {
    let mark = begin_frame(buf, MessageTag::Controls);
    for kind in ButtonKind::ALL {
        buf.put_u8(controls.button(kind).to_wire());
    }
    finish_frame(buf, mark)
}

/// Merge a Controls payload: held state is overwritten, edge counts add up.
pub fn merge_controls(controls: &mut Controls, payload: &[u8]) -> Result<(), ProtocolError> {
    if payload.len() != CONTROLS_PAYLOAD_LEN {
        return Err(ProtocolError::UnexpectedSize {
            tag: MessageTag::Controls,
            declared: payload.len(),
            expected: CONTROLS_PAYLOAD_LEN,
        });
    }
    for (kind, byte) in ButtonKind::ALL.into_iter().zip(payload) {
        controls.button_mut(kind).merge_wire(*byte);
    }
    Ok(())
}

pub fn encode_state(buf: &mut BytesMut, snapshot: &StateSnapshot) -> Result<(), ProtocolError> {
    let mark = begin_frame(buf, MessageTag::State);

    let listed = &snapshot.players[..snapshot.players.len().min(MAX_LISTED_PLAYERS)];
    buf.put_u8(listed.len() as u8);
    for player in listed {
        let name = truncate_name(&player.name);
        buf.put_u32_le(player.id.0);
        buf.put_u8(player.active as u8);
        buf.put_i32_le(player.advantage_direction.map_or(0, Side::sign));
        buf.put_f32_le(player.penalty);
        buf.put_u8(player.advantage as u8);
        buf.put_u8(name.len() as u8);
        buf.put_slice(name.as_bytes());
    }

    buf.put_u32_le(snapshot.active_player_count);
    buf.put_f32_le(snapshot.progress);
    buf.put_u32_le(snapshot.trigger_direction.ordinal());
    buf.put_u32_le(snapshot.match_state.ordinal());

    finish_frame(buf, mark)
}

/// Decode a State payload into a fresh snapshot
pub fn decode_state(payload: &[u8]) -> Result<StateSnapshot, ProtocolError> {
    let declared = payload.len();
    let mut cur = payload;

    need(&cur, 1)?;
    let player_count = cur.get_u8();
    let mut players = Vec::with_capacity(player_count as usize);
    for _ in 0..player_count {
        need(&cur, 4 + 1 + 4 + 4 + 1 + 1)?;
        let id = PlayerId(cur.get_u32_le());
        let active = cur.get_u8() != 0;
        let sign = cur.get_i32_le();
        let advantage_direction = match sign {
            0 => None,
            s => Some(Side::from_sign(s).ok_or(ProtocolError::InvalidField {
                field: "advantage_direction",
                value: i64::from(s),
            })?),
        };
        let penalty = cur.get_f32_le();
        let advantage = cur.get_u8() != 0;
        let name_len = cur.get_u8() as usize;
        need(&cur, name_len)?;
        let name = String::from_utf8(cur[..name_len].to_vec()).map_err(|e| {
            ProtocolError::InvalidField {
                field: "name",
                value: e.utf8_error().valid_up_to() as i64,
            }
        })?;
        cur.advance(name_len);

        players.push(PlayerView {
            id,
            active,
            advantage_direction,
            penalty,
            advantage,
            name,
        });
    }

    need(&cur, 16)?;
    let active_player_count = cur.get_u32_le();
    let progress = cur.get_f32_le();
    let direction = cur.get_u32_le();
    let trigger_direction =
        TriggerDirection::from_ordinal(direction).ok_or(ProtocolError::InvalidField {
            field: "trigger_direction",
            value: i64::from(direction),
        })?;
    let state = cur.get_u32_le();
    let match_state = MatchState::from_ordinal(state).ok_or(ProtocolError::InvalidField {
        field: "match_state",
        value: i64::from(state),
    })?;

    if cur.has_remaining() {
        return Err(ProtocolError::TrailingData {
            declared,
            consumed: declared - cur.remaining(),
        });
    }

    Ok(StateSnapshot {
        players,
        active_player_count,
        progress,
        trigger_direction,
        match_state,
    })
}

fn need(cur: &&[u8], needed: usize) -> Result<(), ProtocolError> {
    if cur.remaining() < needed {
        return Err(ProtocolError::ShortPayload {
            needed,
            remaining: cur.remaining(),
        });
    }
    Ok(())
}

/// Cut a name to at most [`MAX_NAME_LEN`] bytes on a character boundary
fn truncate_name(name: &str) -> &str {
    if name.len() <= MAX_NAME_LEN {
        return name;
    }
    let mut end = MAX_NAME_LEN;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}
