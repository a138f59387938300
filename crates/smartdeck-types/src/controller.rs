//! [`Controller`] – one logical controller slot and its input state machine.
//!
//! # Selection cycle
//!
//! A slot's `selection` is either `None` or a vehicle id in
//! `1..=vehicle_count`.  Pressing `SELECT_UP` / `SELECT_DOWN` moves it one
//! step; stepping past either end lands on `None` rather than wrapping
//! around, and stepping from `None` enters at the near end:
//!
//! ```text
//! UP:   None -> 1 -> 2 -> ... -> N -> None
//! DOWN: None -> N -> ... -> 2 -> 1 -> None
//! ```
//!
//! Releases of the selection buttons are ignored.  All other buttons are
//! level state: a press adds to the pressed set, a release removes from it.

use std::collections::BTreeSet;

use crate::{Button, ControllerId, SessionId, VehicleId};

/// What a single input did to a controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputEffect {
    pub selection_changed: bool,
    pub pressed_changed: bool,
}

impl InputEffect {
    pub fn changed(&self) -> bool {
        self.selection_changed || self.pressed_changed
    }
}

/// A logical controller slot.
///
/// The slot id is fixed for the lifetime of the deck; the owning session,
/// display name, selection and pressed set come and go with client sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Controller {
    id: ControllerId,
    owner: Option<SessionId>,
    display_name: Option<String>,
    selection: Option<VehicleId>,
    pressed: BTreeSet<Button>,
}

impl Controller {
    /// Create an unbound slot with the given fixed id.
    pub fn new(id: ControllerId) -> Self {
        Self {
            id,
            owner: None,
            display_name: None,
            selection: None,
            pressed: BTreeSet::new(),
        }
    }

    pub fn id(&self) -> ControllerId {
        self.id
    }

    pub fn owner(&self) -> Option<&SessionId> {
        self.owner.as_ref()
    }

    pub fn is_bound(&self) -> bool {
        self.owner.is_some()
    }

    pub fn is_owned_by(&self, session: &SessionId) -> bool {
        self.owner.as_ref() == Some(session)
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    pub fn selection(&self) -> Option<VehicleId> {
        self.selection
    }

    /// Currently held buttons.  Never contains a selection button.
    pub fn pressed(&self) -> &BTreeSet<Button> {
        &self.pressed
    }

    pub fn is_pressed(&self, button: Button) -> bool {
        self.pressed.contains(&button)
    }

    /// Bind the slot to `owner`, starting it fresh with no selection and
    /// nothing held.
    pub fn bind(&mut self, owner: SessionId) {
        self.owner = Some(owner);
        self.selection = None;
        self.pressed.clear();
    }

    /// Unbind the slot.  Held buttons are dropped so a released slot never
    /// keeps driving a vehicle.
    pub fn release(&mut self) {
        self.owner = None;
        self.display_name = None;
        self.pressed.clear();
    }

    /// Set the display name; returns `true` when it actually changed.
    /// Blank names are treated as "no name".
    pub fn set_display_name(&mut self, name: Option<String>) -> bool {
        let name = name.filter(|n| !n.trim().is_empty());
        if self.display_name == name {
            return false;
        }
        self.display_name = name;
        true
    }

    /// Apply one button edge.
    ///
    /// `vehicle_count` bounds the selection cycle.  With no vehicles
    /// configured the selection stays `None`.
    pub fn apply(&mut self, button: Button, pressed: bool, vehicle_count: u8) -> InputEffect {
        let mut effect = InputEffect::default();

        if button.is_selector() {
            if pressed {
                let next = next_selection(self.selection, button == Button::SelectUp, vehicle_count);
                effect.selection_changed = next != self.selection;
                self.selection = next;
            }
        } else if pressed {
            effect.pressed_changed = self.pressed.insert(button);
        } else {
            effect.pressed_changed = self.pressed.remove(&button);
        }

        effect
    }
}

/// One step of the clamp-to-unselected selection cycle.
pub fn next_selection(current: Option<VehicleId>, up: bool, vehicle_count: u8) -> Option<VehicleId> {
    if vehicle_count == 0 {
        return None;
    }
    match current {
        None if up => Some(1),
        None => Some(vehicle_count),
        Some(sel) if up => (sel < vehicle_count).then(|| sel + 1),
        Some(sel) => (sel > 1).then(|| sel - 1),
    }
}
