//! Client-side view: local button edges going up, full snapshots coming down.
//!
//! There is no prediction. The client shows whatever the newest State frame
//! says and replaces its snapshot wholesale each time one arrives.

use tracing::debug;

use crate::game::controls::{ButtonKind, Controls};
use crate::game::snapshot::StateSnapshot;
use crate::ws::protocol::decode_state;
use crate::ws::{Connection, MessageTag, ProtocolError};

#[derive(Debug, Default)]
pub struct ClientView {
    controls: Controls,
    snapshot: StateSnapshot,
}

impl ClientView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn controls(&self) -> &Controls {
        &self.controls
    }

    /// Latest authoritative state
    pub fn snapshot(&self) -> &StateSnapshot {
        &self.snapshot
    }

    /// Key went down
    pub fn press(&mut self, kind: ButtonKind) {
        self.controls.button_mut(kind).press();
    }

    /// Key went up
    pub fn release(&mut self, kind: ButtonKind) {
        self.controls.button_mut(kind).release();
    }

    /// Queue a Controls frame, then forget the edges it carried
    pub fn send_controls(&mut self, connection: &mut Connection) -> Result<(), ProtocolError> {
        connection.send_controls(&self.controls)?;
        self.controls.clear_downs();
        Ok(())
    }

    /// Drain every complete State frame; returns true if the snapshot changed
    pub fn poll(&mut self, connection: &mut Connection) -> Result<bool, ProtocolError> {
        let mut updated = false;
        while let Some(frame) = connection.next_frame()? {
            match frame.tag {
                MessageTag::State => {
                    self.snapshot = decode_state(&frame.payload)?;
                    updated = true;
                }
                other => return Err(ProtocolError::UnexpectedMessage(other)),
            }
        }
        if updated {
            debug!(
                players = self.snapshot.players.len(),
                match_state = ?self.snapshot.match_state,
                "State replaced"
            );
        }
        Ok(updated)
    }
}
