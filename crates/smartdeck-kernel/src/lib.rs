//! `smartdeck-kernel` – Orchestration
//!
//! Owns the controller slots and the vehicle table and decides what reaches
//! the boards.
//!
//! # Modules
//!
//! - [`command_deck`] – [`CommandDeck`][command_deck::CommandDeck]: binds
//!   client sessions to controller slots, applies button edges to the slot
//!   state machines and dispatches the whole controller table to the selected
//!   vehicle's adapter.
//! - [`router`] – [`EventRouter`][router::EventRouter]: turns connect,
//!   disconnect, input and rename events into deck calls and reports the
//!   player list through an [`EventSink`][router::EventSink] whenever it
//!   changes.

pub mod command_deck;
pub mod router;

pub use command_deck::CommandDeck;
pub use router::{EventRouter, EventSink};
