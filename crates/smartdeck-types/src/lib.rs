//! `smartdeck-types` – shared vocabulary for the SmartPort bridge.
//!
//! Every other crate in the workspace speaks in these types:
//!
//! - [`Button`] – the twelve controller inputs a remote player can send.
//! - [`Controller`] – one logical controller slot and its selection state
//!   machine.
//! - [`DeckEvent`] / [`DeckNotice`] – events consumed from and produced to the
//!   real-time push transport.
//! - [`DeckConfig`] – immutable startup configuration.
//! - [`DeckError`] – the single error type spanning configuration and
//!   transport failures.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod config;
pub mod controller;

pub use config::{DeckConfig, SerialSettings, SlotInclusion, VehicleSpec};
pub use controller::{Controller, InputEffect};

/// Fixed numeric id of a controller slot (`1..=controller_count`).
pub type ControllerId = u8;

/// Numeric id of a configured vehicle (`1..=MAX_VEHICLES`).
pub type VehicleId = u8;

/// The acknowledgement frame reports exactly this many players, so the deck
/// never manages more slots than the board can echo back.
pub const MAX_CONTROLLERS: u8 = 12;

/// Selection index 15 is reserved on the wire for "no selection", which caps
/// the vehicle table at 15 entries.
pub const MAX_VEHICLES: u8 = 15;

/// Opaque token identifying a remote client session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A controller input.
///
/// `SelectUp` / `SelectDown` are edge-triggered selection commands; every
/// other button is held state tracked in [`Controller::pressed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Button {
    #[serde(rename = "A_BUTTON")]
    A,
    #[serde(rename = "B_BUTTON")]
    B,
    #[serde(rename = "X_BUTTON")]
    X,
    #[serde(rename = "Y_BUTTON")]
    Y,
    #[serde(rename = "LEFT_TRIGGER")]
    LeftTrigger,
    #[serde(rename = "RIGHT_TRIGGER")]
    RightTrigger,
    #[serde(rename = "DPAD_UP")]
    DpadUp,
    #[serde(rename = "DPAD_DOWN")]
    DpadDown,
    #[serde(rename = "DPAD_LEFT")]
    DpadLeft,
    #[serde(rename = "DPAD_RIGHT")]
    DpadRight,
    #[serde(rename = "SELECT_UP")]
    SelectUp,
    #[serde(rename = "SELECT_DOWN")]
    SelectDown,
}

impl Button {
    pub const ALL: [Button; 12] = [
        Button::A,
        Button::B,
        Button::X,
        Button::Y,
        Button::LeftTrigger,
        Button::RightTrigger,
        Button::DpadUp,
        Button::DpadDown,
        Button::DpadLeft,
        Button::DpadRight,
        Button::SelectUp,
        Button::SelectDown,
    ];

    /// Default mapping from a browser Gamepad API button index.
    pub fn from_gamepad_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Button::A),
            1 => Some(Button::B),
            2 => Some(Button::X),
            3 => Some(Button::Y),
            4 => Some(Button::LeftTrigger),
            5 => Some(Button::RightTrigger),
            8 => Some(Button::SelectDown),
            9 => Some(Button::SelectUp),
            12 => Some(Button::DpadUp),
            13 => Some(Button::DpadDown),
            14 => Some(Button::DpadLeft),
            15 => Some(Button::DpadRight),
            _ => None,
        }
    }

    /// `true` for the two edge-triggered selection buttons.
    pub fn is_selector(self) -> bool {
        matches!(self, Button::SelectUp | Button::SelectDown)
    }

    /// Wire name used in JSON events.
    pub fn name(self) -> &'static str {
        match self {
            Button::A => "A_BUTTON",
            Button::B => "B_BUTTON",
            Button::X => "X_BUTTON",
            Button::Y => "Y_BUTTON",
            Button::LeftTrigger => "LEFT_TRIGGER",
            Button::RightTrigger => "RIGHT_TRIGGER",
            Button::DpadUp => "DPAD_UP",
            Button::DpadDown => "DPAD_DOWN",
            Button::DpadLeft => "DPAD_LEFT",
            Button::DpadRight => "DPAD_RIGHT",
            Button::SelectUp => "SELECT_UP",
            Button::SelectDown => "SELECT_DOWN",
        }
    }
}

impl fmt::Display for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A button as it arrives from a client: either its name or a raw gamepad
/// index that still has to go through [`Button::from_gamepad_index`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ButtonInput {
    Named(Button),
    Gamepad(u8),
}

impl ButtonInput {
    pub fn resolve(self) -> Option<Button> {
        match self {
            ButtonInput::Named(button) => Some(button),
            ButtonInput::Gamepad(index) => Button::from_gamepad_index(index),
        }
    }
}

impl From<Button> for ButtonInput {
    fn from(button: Button) -> Self {
        ButtonInput::Named(button)
    }
}

/// Events consumed from the real-time push transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DeckEvent {
    /// A client session connected and wants a controller slot.
    Connect { session: SessionId },
    /// A client session went away; its slot becomes free.
    Disconnect { session: SessionId },
    /// A button edge from a client.
    Input {
        session: SessionId,
        button: ButtonInput,
        pressed: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        player_name: Option<String>,
    },
    /// The client changed its display name without pressing anything.
    Rename {
        session: SessionId,
        player_name: String,
    },
}

/// One bound slot as reported to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub player_name: String,
    pub selection: Option<VehicleId>,
    pub selection_name: Option<String>,
}

/// Events produced to the real-time push transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DeckNotice {
    /// The player list changed; carries the full list of bound slots.
    Players { players: Vec<PlayerInfo> },
}

/// Global error type spanning configuration, startup and transport faults.
#[derive(Error, Debug)]
pub enum DeckError {
    #[error("Unknown vehicle type: {0}")]
    UnknownDeviceType(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to open transport {port}: {details}")]
    TransportOpen { port: String, details: String },

    #[error("Transport fault on {component}: {details}")]
    Transport { component: String, details: String },

    #[error("No controller bound to session {0}")]
    UnknownSession(String),
}

impl DeckError {
    /// Wrap an I/O failure raised mid-session by `component`.
    pub fn transport(component: impl Into<String>, err: impl fmt::Display) -> Self {
        DeckError::Transport {
            component: component.into(),
            details: err.to_string(),
        }
    }
}
