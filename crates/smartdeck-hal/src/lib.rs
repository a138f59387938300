//! `smartdeck-hal` – Vehicle Adapters & Board Links
//!
//! Everything between the controller table and the wire.
//!
//! # Modules
//!
//! - [`protocol`] – the SmartPort packet encoder and acknowledgement decoder.
//!   Pure functions, no I/O.
//! - [`transport`] – the [`Transport`][transport::Transport] trait: a
//!   non-blocking byte pipe to a board.
//! - [`serial`] – [`SerialTransport`][serial::SerialTransport], the
//!   `serialport`-backed transport used in production.
//! - [`sim`] – [`SimOpener`][sim::SimOpener], an in-memory board for tests and
//!   `--simulate` runs.
//! - [`connection`] – [`ConnectionManager`][connection::ConnectionManager]:
//!   opens one [`SharedLink`][connection::SharedLink] per device type and
//!   hands it to every vehicle of that type.
//! - [`vehicle`] – [`Vehicle`][vehicle::Vehicle] and the
//!   [`VehicleDriver`][vehicle::VehicleDriver] trait every adapter implements.
//! - [`smartport`] / [`console`] – the two adapters.
//! - [`registry`] – [`VehicleFactory`][registry::VehicleFactory] and
//!   [`VehicleRegistry`][registry::VehicleRegistry]: device-type tags in,
//!   vehicle table out.

pub mod connection;
pub mod console;
pub mod protocol;
pub mod registry;
pub mod serial;
pub mod sim;
pub mod smartport;
pub mod transport;
pub mod vehicle;

pub use connection::{
    ConnectionManager, Link, LinkStats, SerialOpener, SharedLink, TransportOpener,
};
pub use console::ConsoleAdapter;
pub use protocol::AckFrame;
pub use registry::{VehicleFactory, VehicleRegistry};
pub use sim::SimOpener;
pub use smartport::SmartPortAdapter;
pub use transport::Transport;
pub use vehicle::{DeviceKind, Vehicle, VehicleDriver};
