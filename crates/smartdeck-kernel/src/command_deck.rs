//! [`CommandDeck`] – the controller slots, the vehicle table and the routing
//! between them.
//!
//! Both tables are built once in [`CommandDeck::new`] and never resized.
//! Slots are bound to client sessions first-free-by-id; every button edge is
//! applied to the owning slot's state machine and, when that slot has a
//! vehicle selected, the *whole* controller table is pushed to the vehicle's
//! adapter.
//!
//! The deck is not `Send`: it holds the shared board links, which are driven
//! synchronously from whichever thread owns the deck.
//!
//! # Example
//!
//! ```
//! use smartdeck_hal::{DeviceKind, SimOpener};
//! use smartdeck_kernel::CommandDeck;
//! use smartdeck_types::{Button, DeckConfig, SessionId, VehicleSpec};
//!
//! let mut config = DeckConfig::default();
//! config.vehicles.push(VehicleSpec {
//!     id: 1,
//!     name: "Forklift".into(),
//!     device_type: "smartport_arduino".into(),
//!     device_config: Default::default(),
//! });
//!
//! let opener = SimOpener::new();
//! let mut deck = CommandDeck::new(&config, Box::new(opener.clone())).unwrap();
//!
//! let session = SessionId::from("browser-1");
//! assert_eq!(deck.assign_controller(session.clone()).unwrap().id(), 1);
//! deck.handle_input(&session, Button::SelectUp, true).unwrap();
//!
//! let board = opener.handle(DeviceKind::SmartPortArduino).unwrap();
//! assert_eq!(board.last_written().unwrap(), vec![0xFE, 11, 0, 0, 0, 0xFF]);
//! ```

use smartdeck_hal::{
    AckFrame, ConnectionManager, DeviceKind, LinkStats, TransportOpener, Vehicle, VehicleFactory,
    VehicleRegistry,
};
use smartdeck_types::{
    Button, Controller, DeckConfig, DeckError, InputEffect, PlayerInfo, SessionId, VehicleId,
};
use tracing::{debug, info, warn};

pub struct CommandDeck {
    controllers: Vec<Controller>,
    vehicles: VehicleRegistry,
    vehicle_count: u8,
    connections: ConnectionManager,
}

impl CommandDeck {
    /// Validate `config`, build the slot table and configure every vehicle.
    ///
    /// Board links are opened through `opener` as the first vehicle of each
    /// board-backed type is configured.
    ///
    /// # Errors
    ///
    /// Fails on any invalid configuration, unknown device type or transport
    /// open failure.  All of these are fatal at startup.
    pub fn new(config: &DeckConfig, opener: Box<dyn TransportOpener>) -> Result<Self, DeckError> {
        config.validate()?;

        let mut factory = VehicleFactory::new(ConnectionManager::new(opener), config.slot_inclusion);
        let vehicles = VehicleRegistry::build(&config.vehicles, &mut factory)?;
        let vehicle_count = u8::try_from(vehicles.len()).map_err(|_| {
            DeckError::InvalidConfig(format!("too many vehicles: {}", vehicles.len()))
        })?;
        let controllers = (1..=config.controller_count).map(Controller::new).collect();

        info!(
            controllers = config.controller_count,
            vehicles = vehicle_count,
            inclusion = ?config.slot_inclusion,
            "command deck ready"
        );

        Ok(Self {
            controllers,
            vehicles,
            vehicle_count,
            connections: factory.into_connections(),
        })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Session binding
    // ─────────────────────────────────────────────────────────────────────

    /// Bind `owner` to the lowest-numbered free slot.
    ///
    /// The slot starts with no selection and nothing held.  A session that
    /// already holds a slot gets that slot back unchanged.  Returns `None`
    /// when every slot is taken; nothing is queued.
    pub fn assign_controller(&mut self, owner: SessionId) -> Option<&Controller> {
        if let Some(index) = self.index_of(&owner) {
            return self.controllers.get(index);
        }

        let Some(slot) = self.controllers.iter_mut().find(|c| !c.is_bound()) else {
            warn!(session = %owner, "no free controller slot");
            return None;
        };
        info!(slot = slot.id(), session = %owner, "controller assigned");
        slot.bind(owner);
        Some(&*slot)
    }

    /// Unbind the slot held by `owner`, clearing its display name and held
    /// buttons.  Returns `None` if `owner` holds no slot.
    ///
    /// If the slot had a vehicle selected, the table is pushed to that
    /// vehicle once more so the board stops driving the departed slot.
    ///
    /// # Errors
    ///
    /// Returns the adapter's [`DeckError::Transport`] fault.  The slot is
    /// already released when a transport fault is returned.
    pub fn release_controller(
        &mut self,
        owner: &SessionId,
    ) -> Result<Option<&Controller>, DeckError> {
        let Some(index) = self.index_of(owner) else {
            return Ok(None);
        };
        let Some(slot) = self.controllers.get_mut(index) else {
            return Ok(None);
        };
        slot.release();
        let selection = slot.selection();
        info!(slot = slot.id(), session = %owner, "controller released");

        if let Some(vehicle) = selection {
            self.vehicles.dispatch(vehicle, &self.controllers)?;
        }
        Ok(self.controllers.get(index))
    }

    pub fn get_controller(&self, owner: &SessionId) -> Option<&Controller> {
        self.controllers.iter().find(|c| c.is_owned_by(owner))
    }

    pub fn get_vehicle(&self, id: VehicleId) -> Option<&Vehicle> {
        self.vehicles.get(id)
    }

    /// Set or clear (`None` or blank) the display name of `owner`'s slot.
    /// Returns whether the name changed.
    ///
    /// # Errors
    ///
    /// Returns [`DeckError::UnknownSession`] if `owner` holds no slot.
    pub fn set_display_name(
        &mut self,
        owner: &SessionId,
        name: Option<String>,
    ) -> Result<bool, DeckError> {
        let slot = self.slot_mut(owner)?;
        Ok(slot.set_display_name(name))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Input
    // ─────────────────────────────────────────────────────────────────────

    /// Apply one button edge from `owner` and push the controller table to
    /// the selected vehicle, if any.
    ///
    /// Dispatch happens on every input while a vehicle is selected, changed
    /// or not: the board protocol is whole-state and the packet doubles as a
    /// keep-alive.
    ///
    /// # Errors
    ///
    /// Returns [`DeckError::UnknownSession`] if `owner` holds no slot, or the
    /// adapter's [`DeckError::Transport`] fault.  The slot's state has
    /// already been updated when a transport fault is returned.
    pub fn handle_input(
        &mut self,
        owner: &SessionId,
        button: Button,
        pressed: bool,
    ) -> Result<InputEffect, DeckError> {
        let vehicle_count = self.vehicle_count;
        let slot = self.slot_mut(owner)?;
        let effect = slot.apply(button, pressed, vehicle_count);
        let slot_id = slot.id();
        let selection = slot.selection();

        if effect.selection_changed {
            debug!(slot = slot_id, selection = ?selection, "selection changed");
        }

        if let Some(vehicle) = selection
            && !self.vehicles.dispatch(vehicle, &self.controllers)?
        {
            debug!(slot = slot_id, vehicle, "selection has no configured vehicle");
        }
        Ok(effect)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Views
    // ─────────────────────────────────────────────────────────────────────

    /// Bound slots in slot order, as reported to clients.
    pub fn list_players(&self) -> Vec<PlayerInfo> {
        self.controllers
            .iter()
            .filter(|c| c.is_bound())
            .map(|c| PlayerInfo {
                player_name: c
                    .display_name()
                    .map_or_else(|| format!("Player {}", c.id()), str::to_string),
                selection: c.selection(),
                selection_name: c
                    .selection()
                    .and_then(|id| self.vehicles.get(id))
                    .map(|v| v.name().to_string()),
            })
            .collect()
    }

    pub fn controllers(&self) -> &[Controller] {
        &self.controllers
    }

    pub fn vehicles(&self) -> &VehicleRegistry {
        &self.vehicles
    }

    pub fn vehicle_count(&self) -> u8 {
        self.vehicle_count
    }

    /// Counters of the link for `kind`, if it has been opened.
    pub fn link_stats(&self, kind: DeviceKind) -> Option<LinkStats> {
        self.connections.get(kind).map(|link| link.borrow().stats())
    }

    /// The last acknowledgement decoded on the link for `kind`.
    pub fn last_ack(&self, kind: DeviceKind) -> Option<AckFrame> {
        let link = self.connections.get(kind)?;
        link.borrow().last_ack().cloned()
    }

    fn index_of(&self, owner: &SessionId) -> Option<usize> {
        self.controllers.iter().position(|c| c.is_owned_by(owner))
    }

    fn slot_mut(&mut self, owner: &SessionId) -> Result<&mut Controller, DeckError> {
        self.controllers
            .iter_mut()
            .find(|c| c.is_owned_by(owner))
            .ok_or_else(|| DeckError::UnknownSession(owner.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smartdeck_hal::SimOpener;
    use smartdeck_hal::connection::SerialOpener;
    use smartdeck_hal::protocol::{ACK_FRAME_LEN, END_SENTINEL, START_SENTINEL};
    use smartdeck_types::{SerialSettings, VehicleSpec};

    fn vehicle(id: VehicleId, name: &str, device_type: &str) -> VehicleSpec {
        VehicleSpec {
            id,
            name: name.to_string(),
            device_type: device_type.to_string(),
            device_config: Default::default(),
        }
    }

    fn config(controller_count: u8) -> DeckConfig {
        DeckConfig {
            controller_count,
            vehicles: vec![
                vehicle(1, "Forklift", "smartport_arduino"),
                vehicle(2, "Loader", "smartport_arduino"),
                vehicle(3, "Crane", "console"),
            ],
            ..DeckConfig::default()
        }
    }

    fn deck(controller_count: u8) -> (CommandDeck, SimOpener) {
        let opener = SimOpener::new();
        let deck = CommandDeck::new(&config(controller_count), Box::new(opener.clone())).unwrap();
        (deck, opener)
    }

    fn sid(s: &str) -> SessionId {
        SessionId::from(s)
    }

    #[test]
    fn new_builds_fixed_tables() {
        let (deck, opener) = deck(4);
        let ids: Vec<u8> = deck.controllers().iter().map(Controller::id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        assert_eq!(deck.vehicle_count(), 3);
        assert_eq!(deck.get_vehicle(2).unwrap().name(), "Loader");
        assert!(deck.get_vehicle(4).is_none());
        assert_eq!(opener.open_count(), 1, "both boards share one link");
    }

    #[test]
    fn new_rejects_unknown_device_type() {
        let mut cfg = config(4);
        cfg.vehicles.push(vehicle(4, "Hover", "hovercraft"));
        let result = CommandDeck::new(&cfg, Box::new(SimOpener::new()));
        assert!(matches!(result, Err(DeckError::UnknownDeviceType(_))));
    }

    #[test]
    fn new_rejects_invalid_config() {
        let result = CommandDeck::new(&config(13), Box::new(SimOpener::new()));
        assert!(matches!(result, Err(DeckError::InvalidConfig(_))));
    }

    #[test]
    fn new_fails_when_board_cannot_be_opened() {
        let opener = SerialOpener::new(SerialSettings {
            port: Some("/dev/smartdeck-does-not-exist".to_string()),
            ..SerialSettings::default()
        });
        let result = CommandDeck::new(&config(4), Box::new(opener));
        assert!(matches!(result, Err(DeckError::TransportOpen { .. })));
    }

    #[test]
    fn assign_takes_first_free_slot_in_id_order() {
        let (mut deck, _) = deck(3);
        assert_eq!(deck.assign_controller(sid("a")).unwrap().id(), 1);
        assert_eq!(deck.assign_controller(sid("b")).unwrap().id(), 2);
        deck.release_controller(&sid("a")).unwrap();
        assert_eq!(deck.assign_controller(sid("c")).unwrap().id(), 1);
        assert_eq!(deck.assign_controller(sid("d")).unwrap().id(), 3);
    }

    #[test]
    fn assign_twice_returns_the_same_slot() {
        let (mut deck, _) = deck(3);
        deck.assign_controller(sid("a"));
        deck.handle_input(&sid("a"), Button::SelectUp, true).unwrap();

        let again = deck.assign_controller(sid("a")).unwrap();
        assert_eq!(again.id(), 1);
        assert_eq!(again.selection(), Some(1), "existing binding is left alone");
        assert_eq!(deck.controllers().iter().filter(|c| c.is_bound()).count(), 1);
    }

    #[test]
    fn assign_on_full_deck_changes_nothing() {
        let (mut deck, _) = deck(2);
        deck.assign_controller(sid("a"));
        deck.assign_controller(sid("b"));
        let before: Vec<Option<SessionId>> =
            deck.controllers().iter().map(|c| c.owner().cloned()).collect();

        assert!(deck.assign_controller(sid("c")).is_none());

        let after: Vec<Option<SessionId>> =
            deck.controllers().iter().map(|c| c.owner().cloned()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn reassigned_slot_starts_unselected() {
        let (mut deck, _) = deck(1);
        deck.assign_controller(sid("a"));
        deck.handle_input(&sid("a"), Button::SelectUp, true).unwrap();
        deck.release_controller(&sid("a")).unwrap();

        let slot = deck.assign_controller(sid("b")).unwrap();
        assert_eq!(slot.selection(), None);
        assert!(slot.pressed().is_empty());
    }

    #[test]
    fn release_clears_owner_and_name() {
        let (mut deck, _) = deck(2);
        deck.assign_controller(sid("a"));
        deck.set_display_name(&sid("a"), Some("Ann".into())).unwrap();

        let released = deck.release_controller(&sid("a")).unwrap().unwrap();
        assert!(!released.is_bound());
        assert_eq!(released.display_name(), None);
        assert!(deck.get_controller(&sid("a")).is_none());
        assert!(deck.release_controller(&sid("a")).unwrap().is_none());
    }

    #[test]
    fn release_drops_departed_slot_from_the_board() {
        let (mut deck, opener) = deck(2);
        deck.assign_controller(sid("a"));
        deck.handle_input(&sid("a"), Button::SelectUp, true).unwrap();
        deck.handle_input(&sid("a"), Button::DpadUp, true).unwrap();

        let board = opener.handle(DeviceKind::SmartPortArduino).unwrap();
        assert_eq!(
            board.last_written().unwrap(),
            vec![START_SENTINEL, 11, 0, 0b1000, 0, END_SENTINEL]
        );

        deck.release_controller(&sid("a")).unwrap();
        assert_eq!(board.written().len(), 3);
        assert_eq!(
            board.last_written().unwrap(),
            vec![START_SENTINEL, END_SENTINEL]
        );
    }

    #[test]
    fn release_keeps_other_drivers_on_the_board() {
        let (mut deck, opener) = deck(2);
        deck.assign_controller(sid("a"));
        deck.assign_controller(sid("b"));
        deck.handle_input(&sid("a"), Button::SelectUp, true).unwrap();
        deck.handle_input(&sid("b"), Button::SelectUp, true).unwrap();
        deck.handle_input(&sid("b"), Button::A, true).unwrap();

        deck.release_controller(&sid("a")).unwrap();
        let board = opener.handle(DeviceKind::SmartPortArduino).unwrap();
        assert_eq!(
            board.last_written().unwrap(),
            vec![START_SENTINEL, 12, 0, 0, 0b10000, END_SENTINEL]
        );
    }

    #[test]
    fn release_without_selection_sends_nothing() {
        let (mut deck, opener) = deck(2);
        deck.assign_controller(sid("a"));
        deck.handle_input(&sid("a"), Button::B, true).unwrap();

        assert!(deck.release_controller(&sid("a")).unwrap().is_some());
        assert!(opener.handle(DeviceKind::SmartPortArduino).unwrap().written().is_empty());
    }

    #[test]
    fn release_transport_fault_propagates_after_unbinding() {
        let (mut deck, opener) = deck(2);
        deck.assign_controller(sid("a"));
        deck.handle_input(&sid("a"), Button::SelectUp, true).unwrap();
        opener
            .handle(DeviceKind::SmartPortArduino)
            .unwrap()
            .set_fail_writes(true);

        let result = deck.release_controller(&sid("a"));
        assert!(matches!(result, Err(DeckError::Transport { .. })));
        assert!(deck.get_controller(&sid("a")).is_none());
    }

    #[test]
    fn input_for_unbound_session_is_rejected() {
        let (mut deck, opener) = deck(2);
        let result = deck.handle_input(&sid("ghost"), Button::A, true);
        assert!(matches!(result, Err(DeckError::UnknownSession(_))));
        assert!(opener.handle(DeviceKind::SmartPortArduino).unwrap().written().is_empty());
    }

    #[test]
    fn input_without_selection_sends_nothing() {
        let (mut deck, opener) = deck(2);
        deck.assign_controller(sid("a"));
        let effect = deck.handle_input(&sid("a"), Button::A, true).unwrap();
        assert!(effect.pressed_changed);
        assert!(opener.handle(DeviceKind::SmartPortArduino).unwrap().written().is_empty());
    }

    #[test]
    fn selected_vehicle_receives_whole_table() {
        let (mut deck, opener) = deck(4);
        deck.assign_controller(sid("a"));
        deck.assign_controller(sid("b"));
        deck.handle_input(&sid("b"), Button::DpadLeft, true).unwrap();
        deck.handle_input(&sid("a"), Button::SelectUp, true).unwrap();
        deck.handle_input(&sid("a"), Button::A, true).unwrap();

        let board = opener.handle(DeviceKind::SmartPortArduino).unwrap();
        assert_eq!(board.written().len(), 2);
        assert_eq!(
            board.last_written().unwrap(),
            vec![START_SENTINEL, 11, 0, 0, 0b10000, 12, 15, 0b0001, 0, END_SENTINEL]
        );
    }

    #[test]
    fn repeated_press_still_dispatches_but_reports_no_change() {
        let (mut deck, opener) = deck(2);
        deck.assign_controller(sid("a"));
        deck.handle_input(&sid("a"), Button::SelectUp, true).unwrap();
        deck.handle_input(&sid("a"), Button::B, true).unwrap();
        let effect = deck.handle_input(&sid("a"), Button::B, true).unwrap();

        assert!(!effect.changed());
        let board = opener.handle(DeviceKind::SmartPortArduino).unwrap();
        assert_eq!(board.written().len(), 3);
    }

    #[test]
    fn selection_release_is_ignored() {
        let (mut deck, _) = deck(2);
        deck.assign_controller(sid("a"));
        deck.handle_input(&sid("a"), Button::SelectUp, true).unwrap();
        let effect = deck.handle_input(&sid("a"), Button::SelectUp, false).unwrap();
        assert!(!effect.changed());
        assert_eq!(deck.get_controller(&sid("a")).unwrap().selection(), Some(1));
    }

    #[test]
    fn console_vehicle_does_not_touch_the_board() {
        let (mut deck, opener) = deck(2);
        deck.assign_controller(sid("a"));
        deck.handle_input(&sid("a"), Button::SelectDown, true).unwrap();
        assert_eq!(deck.get_controller(&sid("a")).unwrap().selection(), Some(3));
        assert!(opener.handle(DeviceKind::SmartPortArduino).unwrap().written().is_empty());
    }

    #[test]
    fn no_vehicles_keeps_selection_empty() {
        let cfg = DeckConfig::default();
        let opener = SimOpener::new();
        let mut deck = CommandDeck::new(&cfg, Box::new(opener.clone())).unwrap();
        deck.assign_controller(sid("a"));
        let effect = deck.handle_input(&sid("a"), Button::SelectUp, true).unwrap();
        assert!(!effect.selection_changed);
        assert_eq!(deck.get_controller(&sid("a")).unwrap().selection(), None);
        assert_eq!(opener.open_count(), 0);
    }

    #[test]
    fn list_players_reports_bound_slots_in_order() {
        let (mut deck, _) = deck(4);
        deck.assign_controller(sid("a"));
        deck.assign_controller(sid("b"));
        deck.assign_controller(sid("c"));
        deck.release_controller(&sid("b")).unwrap();
        deck.set_display_name(&sid("c"), Some("Cleo".into())).unwrap();
        deck.handle_input(&sid("c"), Button::SelectUp, true).unwrap();
        deck.handle_input(&sid("c"), Button::SelectUp, true).unwrap();

        assert_eq!(
            deck.list_players(),
            vec![
                PlayerInfo {
                    player_name: "Player 1".into(),
                    selection: None,
                    selection_name: None,
                },
                PlayerInfo {
                    player_name: "Cleo".into(),
                    selection: Some(2),
                    selection_name: Some("Loader".into()),
                },
            ]
        );
    }

    #[test]
    fn set_display_name_requires_binding() {
        let (mut deck, _) = deck(2);
        let result = deck.set_display_name(&sid("a"), Some("Ann".into()));
        assert!(matches!(result, Err(DeckError::UnknownSession(_))));

        deck.assign_controller(sid("a"));
        assert!(deck.set_display_name(&sid("a"), Some("Ann".into())).unwrap());
        assert!(!deck.set_display_name(&sid("a"), Some("Ann".into())).unwrap());
        assert!(deck.set_display_name(&sid("a"), Some("  ".into())).unwrap());
        assert_eq!(deck.list_players()[0].player_name, "Player 1");
    }

    #[test]
    fn transport_fault_propagates_after_state_update() {
        let (mut deck, opener) = deck(2);
        deck.assign_controller(sid("a"));
        deck.handle_input(&sid("a"), Button::SelectUp, true).unwrap();
        opener
            .handle(DeviceKind::SmartPortArduino)
            .unwrap()
            .set_fail_writes(true);

        let result = deck.handle_input(&sid("a"), Button::X, true);
        assert!(matches!(result, Err(DeckError::Transport { .. })));
        assert!(deck.get_controller(&sid("a")).unwrap().is_pressed(Button::X));
    }

    #[test]
    fn link_telemetry_is_exposed() {
        let opener = SimOpener::new().with_board_echo();
        let mut deck = CommandDeck::new(&config(2), Box::new(opener.clone())).unwrap();
        assert!(deck.last_ack(DeviceKind::SmartPortArduino).is_none());
        assert!(deck.link_stats(DeviceKind::Console).is_none());

        deck.assign_controller(sid("a"));
        deck.handle_input(&sid("a"), Button::SelectUp, true).unwrap();

        let stats = deck.link_stats(DeviceKind::SmartPortArduino).unwrap();
        assert_eq!(stats.packets_sent, 1);
        assert_eq!(stats.acks_decoded, 1);
        let ack = deck.last_ack(DeviceKind::SmartPortArduino).unwrap();
        assert!(ack.link_up());
        assert_eq!(ack.player_ids[0], 11);
        assert_eq!(ack.selections[0], Some(1));
        assert_eq!(
            opener.handle(DeviceKind::SmartPortArduino).unwrap().pending_inbound(),
            0,
            "the {ACK_FRAME_LEN}-byte echo was consumed"
        );
    }
}
