//! Button edge counters and the per-player control set

use tracing::warn;

/// Largest edge count a single Controls frame can carry (7 bits)
pub const WIRE_DOWNS_MAX: u8 = 0x7f;

/// Stable tag for one of the five buttons of a control set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonKind {
    Left,
    Right,
    Up,
    Down,
    Start,
}

impl ButtonKind {
    /// Wire order of the Controls payload
    pub const ALL: [ButtonKind; 5] = [
        ButtonKind::Left,
        ButtonKind::Right,
        ButtonKind::Up,
        ButtonKind::Down,
        ButtonKind::Start,
    ];

    /// Buttons that count as match inputs (everything but start)
    pub const DIRECTIONS: [ButtonKind; 4] = [
        ButtonKind::Left,
        ButtonKind::Right,
        ButtonKind::Up,
        ButtonKind::Down,
    ];
}

/// A single button: edges seen since last consumed, plus held state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Button {
    /// Number of press edges since the server last consumed this button
    pub downs: u8,
    /// Whether the button is held right now
    pub pressed: bool,
}

impl Button {
    /// Record a press edge (client side). Repeated presses while held are ignored.
    pub fn press(&mut self) {
        if !self.pressed {
            self.downs = self.downs.saturating_add(1);
        }
        self.pressed = true;
    }

    pub fn release(&mut self) {
        self.pressed = false;
    }

    /// Pack into one wire byte: bit 7 = pressed, bits 0-6 = saturating edge count
    pub fn to_wire(self) -> u8 {
        if self.downs > WIRE_DOWNS_MAX {
            warn!(downs = self.downs, "Edge count exceeds 7 bits, saturating on send");
        }
        let downs = self.downs.min(WIRE_DOWNS_MAX);
        (if self.pressed { 0x80 } else { 0x00 }) | downs
    }

    /// Merge one received wire byte: held state is overwritten, edges accumulate.
    pub fn merge_wire(&mut self, byte: u8) {
        self.pressed = byte & 0x80 != 0;
        let received = byte & WIRE_DOWNS_MAX;
        let total = u16::from(self.downs) + u16::from(received);
        if total > u16::from(u8::MAX) {
            warn!(total, "Received a whole lot of downs, saturating at 255");
        }
        self.downs = total.min(u16::from(u8::MAX)) as u8;
    }
}

/// The five buttons a player drives
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Controls {
    pub left: Button,
    pub right: Button,
    pub up: Button,
    pub down: Button,
    pub start: Button,
}

impl Controls {
    pub fn button(&self, kind: ButtonKind) -> &Button {
        match kind {
            ButtonKind::Left => &self.left,
            ButtonKind::Right => &self.right,
            ButtonKind::Up => &self.up,
            ButtonKind::Down => &self.down,
            ButtonKind::Start => &self.start,
        }
    }

    pub fn button_mut(&mut self, kind: ButtonKind) -> &mut Button {
        match kind {
            ButtonKind::Left => &mut self.left,
            ButtonKind::Right => &mut self.right,
            ButtonKind::Up => &mut self.up,
            ButtonKind::Down => &mut self.down,
            ButtonKind::Start => &mut self.start,
        }
    }

    /// Zero every edge counter, leaving held state alone
    pub fn clear_downs(&mut self) {
        for kind in ButtonKind::ALL {
            self.button_mut(kind).downs = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_counts_only_fresh_edges() {
        let mut button = Button::default();
        button.press();
        button.press();
        assert_eq!(button.downs, 1);
        button.release();
        button.press();
        assert_eq!(button.downs, 2);
        assert!(button.pressed);
    }

    #[test]
    fn wire_byte_saturates_at_seven_bits() {
        let button = Button {
            downs: 200,
            pressed: true,
        };
        assert_eq!(button.to_wire(), 0xff);

        let idle = Button {
            downs: 3,
            pressed: false,
        };
        assert_eq!(idle.to_wire(), 0x03);
    }

    #[test]
    fn merge_adds_edges_and_overwrites_pressed() {
        let mut button = Button {
            downs: 4,
            pressed: true,
        };
        button.merge_wire(0x02);
        assert_eq!(button.downs, 6);
        assert!(!button.pressed);

        button.downs = 250;
        button.merge_wire(0x80 | 0x7f);
        assert_eq!(button.downs, 255);
        assert!(button.pressed);
    }

    #[test]
    fn clear_downs_keeps_held_state() {
        let mut controls = Controls::default();
        controls.up.press();
        controls.start.press();
        controls.clear_downs();
        assert_eq!(controls.button(ButtonKind::Up).downs, 0);
        assert!(controls.button(ButtonKind::Start).pressed);
    }
}
