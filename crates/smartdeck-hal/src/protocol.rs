//! SmartPort wire codec.
//!
//! # Outbound state packet
//!
//! ```text
//! 0xFE
//! per included slot, in slot order:
//!   [slot id + 10] [selection index] [dpad bits] [action bits]
//! 0xFF
//! ```
//!
//! | Byte | Contents |
//! |---|---|
//! | selection index | `selection - 1`, or `15` for no selection |
//! | dpad bits | bit3 = UP, bit2 = DOWN, bit1 = RIGHT, bit0 = LEFT |
//! | action bits | bit4 = A, bit3 = B, bit2 = X, bit1 = Y, bit0 = either trigger |
//!
//! There is no length field.  Every payload byte stays below `0xFE`, so the
//! sentinels alone delimit the packet.
//!
//! # Inbound acknowledgement
//!
//! ```text
//! [0xFE] [status] [12 player ids] [12 selections] [0xFF]     27 bytes
//! ```
//!
//! `status == 0` means the board's SmartPort link is down.  A selection byte
//! of `15` means "none", anything lower is `selection - 1`.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use smartdeck_types::{Button, Controller, VehicleId};

pub const START_SENTINEL: u8 = 0xFE;
pub const END_SENTINEL: u8 = 0xFF;

/// Added to the slot id so player bytes never look like low control values.
pub const SLOT_ID_OFFSET: u8 = 10;

/// Selection index meaning "nothing selected".
pub const WIRE_NO_SELECTION: u8 = 15;

/// Bytes per slot in the outbound packet.
pub const SLOT_LEN: usize = 4;

/// Number of players echoed in an acknowledgement frame.
pub const ACK_PLAYERS: usize = 12;

/// Total acknowledgement frame length including both sentinels.
pub const ACK_FRAME_LEN: usize = 3 + 2 * ACK_PLAYERS;

/// Exact outbound packet length for `slots` included slots.
pub const fn packet_len(slots: usize) -> usize {
    2 + SLOT_LEN * slots
}

/// Selection as carried on the wire.
pub fn wire_selection(selection: Option<VehicleId>) -> u8 {
    match selection {
        Some(sel) if (1..=WIRE_NO_SELECTION).contains(&sel) => sel - 1,
        _ => WIRE_NO_SELECTION,
    }
}

/// Inverse of [`wire_selection`].  Bytes at or above 15 read as "none".
pub fn selection_from_wire(byte: u8) -> Option<VehicleId> {
    (byte < WIRE_NO_SELECTION).then(|| byte + 1)
}

pub fn dpad_bits(pressed: &BTreeSet<Button>) -> u8 {
    let mut bits = 0;
    if pressed.contains(&Button::DpadUp) {
        bits |= 1 << 3;
    }
    if pressed.contains(&Button::DpadDown) {
        bits |= 1 << 2;
    }
    if pressed.contains(&Button::DpadRight) {
        bits |= 1 << 1;
    }
    if pressed.contains(&Button::DpadLeft) {
        bits |= 1;
    }
    bits
}

pub fn action_bits(pressed: &BTreeSet<Button>) -> u8 {
    let mut bits = 0;
    if pressed.contains(&Button::A) {
        bits |= 1 << 4;
    }
    if pressed.contains(&Button::B) {
        bits |= 1 << 3;
    }
    if pressed.contains(&Button::X) {
        bits |= 1 << 2;
    }
    if pressed.contains(&Button::Y) {
        bits |= 1 << 1;
    }
    if pressed.contains(&Button::LeftTrigger) || pressed.contains(&Button::RightTrigger) {
        bits |= 1;
    }
    bits
}

/// The four bytes describing one slot.
pub fn encode_slot(controller: &Controller) -> [u8; SLOT_LEN] {
    [
        controller.id().saturating_add(SLOT_ID_OFFSET),
        wire_selection(controller.selection()),
        dpad_bits(controller.pressed()),
        action_bits(controller.pressed()),
    ]
}

/// Build the full multiplexed packet from the given slots, in the order
/// supplied.
pub fn encode_packet<'a>(slots: impl IntoIterator<Item = &'a Controller>) -> Vec<u8> {
    let mut packet = vec![START_SENTINEL];
    for controller in slots {
        let bytes = encode_slot(controller);
        debug_assert!(
            bytes.iter().all(|&b| b < START_SENTINEL),
            "slot {} payload collides with a sentinel",
            controller.id()
        );
        packet.extend_from_slice(&bytes);
    }
    packet.push(END_SENTINEL);
    packet
}

/// A decoded acknowledgement frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AckFrame {
    pub status: u8,
    pub player_ids: [u8; ACK_PLAYERS],
    pub selections: [Option<VehicleId>; ACK_PLAYERS],
}

impl AckFrame {
    pub fn link_up(&self) -> bool {
        self.status != 0
    }

    /// Serialize the frame as the board would send it.
    pub fn to_bytes(&self) -> [u8; ACK_FRAME_LEN] {
        let mut frame = [0u8; ACK_FRAME_LEN];
        frame[0] = START_SENTINEL;
        frame[1] = self.status;
        frame[2..2 + ACK_PLAYERS].copy_from_slice(&self.player_ids);
        for (slot, selection) in self.selections.iter().enumerate() {
            frame[2 + ACK_PLAYERS + slot] = wire_selection(*selection);
        }
        frame[ACK_FRAME_LEN - 1] = END_SENTINEL;
        frame
    }

    fn from_frame(frame: &[u8]) -> Self {
        let mut player_ids = [0u8; ACK_PLAYERS];
        player_ids.copy_from_slice(&frame[2..2 + ACK_PLAYERS]);

        let mut selections = [None; ACK_PLAYERS];
        for (slot, byte) in frame[2 + ACK_PLAYERS..2 + 2 * ACK_PLAYERS].iter().enumerate() {
            selections[slot] = selection_from_wire(*byte);
        }

        Self {
            status: frame[1],
            player_ids,
            selections,
        }
    }
}

/// Extract the freshest acknowledgement from a raw receive buffer.
///
/// The buffer may start with garbage, hold a stale partial frame, or several
/// concatenated frames.  Only the span starting at the *last* start sentinel
/// is considered; it must be a full frame ending in the end sentinel.
/// Anything else yields `None`.
pub fn decode_ack(buf: &[u8]) -> Option<AckFrame> {
    let start = buf.iter().rposition(|&b| b == START_SENTINEL)?;
    let frame = buf.get(start..start + ACK_FRAME_LEN)?;
    if frame[ACK_FRAME_LEN - 1] != END_SENTINEL {
        return None;
    }
    Some(AckFrame::from_frame(frame))
}

/// Space-separated upper-case hex, for debug logs.
pub fn hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{b:02X}");
    }
    out
}
