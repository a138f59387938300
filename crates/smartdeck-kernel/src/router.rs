//! [`EventRouter`] – feeds push-transport events into a [`CommandDeck`] and
//! reports player-list changes back out.
//!
//! | Event | Deck call | Players emitted when |
//! |---|---|---|
//! | `connect` | [`CommandDeck::assign_controller`] | a slot was bound |
//! | `disconnect` | [`CommandDeck::release_controller`] | a slot was released |
//! | `input` | [`CommandDeck::set_display_name`] + [`CommandDeck::handle_input`] | name, selection or pressed set changed |
//! | `rename` | [`CommandDeck::set_display_name`] | the name changed |
//!
//! Events that cannot be applied (no free slot, unknown session, unmapped
//! gamepad button) are logged and dropped.  Only transport faults and sink
//! failures are returned to the caller.

use smartdeck_types::{Button, DeckError, DeckEvent, PlayerInfo, SessionId};
use tracing::{debug, warn};

use crate::command_deck::CommandDeck;

/// Receives the full player list after every change.
pub trait EventSink {
    /// # Errors
    ///
    /// Returns [`DeckError::Transport`] if the list cannot be delivered.
    fn players_changed(&mut self, players: &[PlayerInfo]) -> Result<(), DeckError>;
}

pub struct EventRouter<S: EventSink> {
    deck: CommandDeck,
    sink: S,
}

impl<S: EventSink> EventRouter<S> {
    pub fn new(deck: CommandDeck, sink: S) -> Self {
        Self { deck, sink }
    }

    pub fn deck(&self) -> &CommandDeck {
        &self.deck
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Process one event to completion.
    ///
    /// # Errors
    ///
    /// Returns the adapter's transport fault or the sink's delivery error.
    pub fn handle(&mut self, event: DeckEvent) -> Result<(), DeckError> {
        let changed = match event {
            DeckEvent::Connect { session } => self.deck.assign_controller(session).is_some(),
            DeckEvent::Disconnect { session } => {
                let released = self.deck.release_controller(&session)?.is_some();
                if !released {
                    debug!(session = %session, "disconnect for session without a slot");
                }
                released
            }
            DeckEvent::Input {
                session,
                button,
                pressed,
                player_name,
            } => self.input(&session, button.resolve(), pressed, player_name)?,
            DeckEvent::Rename {
                session,
                player_name,
            } => match self.deck.set_display_name(&session, Some(player_name)) {
                Ok(renamed) => renamed,
                Err(DeckError::UnknownSession(_)) => {
                    warn!(session = %session, "rename for session without a slot");
                    false
                }
                Err(e) => return Err(e),
            },
        };

        if changed {
            self.sink.players_changed(&self.deck.list_players())?;
        }
        Ok(())
    }

    fn input(
        &mut self,
        session: &SessionId,
        button: Option<Button>,
        pressed: bool,
        player_name: Option<String>,
    ) -> Result<bool, DeckError> {
        if self.deck.get_controller(session).is_none() {
            warn!(session = %session, "input for session without a slot");
            return Ok(false);
        }

        let renamed = match player_name {
            Some(name) => self.deck.set_display_name(session, Some(name))?,
            None => false,
        };

        let Some(button) = button else {
            warn!(session = %session, "input with unmapped button ignored");
            return Ok(renamed);
        };

        let effect = self.deck.handle_input(session, button, pressed)?;
        Ok(renamed || effect.changed())
    }
}
