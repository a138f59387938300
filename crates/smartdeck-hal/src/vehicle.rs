//! [`Vehicle`] and the [`VehicleDriver`] trait every device adapter
//! implements.
//!
//! The set of device types is closed: [`DeviceKind`] lists every adapter
//! compiled into the bridge, and the
//! [`VehicleFactory`][crate::registry::VehicleFactory] maps a configuration
//! tag onto one of them.  Adding a device type means adding a variant and a
//! factory arm; third-party adapters loaded without recompiling are not
//! supported.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use smartdeck_types::{Controller, DeckError, VehicleId};

/// Every device type the bridge can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeviceKind {
    /// An Arduino speaking the multiplexed SmartPort protocol over serial.
    SmartPortArduino,
    /// Logs the multiplexed state instead of driving hardware.
    Console,
}

impl DeviceKind {
    /// Canonical configuration tag.
    pub fn tag(self) -> &'static str {
        match self {
            DeviceKind::SmartPortArduino => "smartport_arduino",
            DeviceKind::Console => "console",
        }
    }
}

impl FromStr for DeviceKind {
    type Err = DeckError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "smartport_arduino" | "smartport-arduino" => Ok(DeviceKind::SmartPortArduino),
            "console" | "debug" => Ok(DeviceKind::Console),
            other => Err(DeckError::UnknownDeviceType(other.to_string())),
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A device adapter able to push controller state to a physical vehicle.
pub trait VehicleDriver {
    fn kind(&self) -> DeviceKind;

    /// Push the state of the whole controller table.
    ///
    /// The table is passed in full because the wire protocols are
    /// whole-state, not per-slot deltas.
    ///
    /// # Errors
    ///
    /// Returns [`DeckError::Transport`] when the underlying link faults.
    fn control(&self, vehicle: VehicleId, controllers: &[Controller]) -> Result<(), DeckError>;
}

/// A configured vehicle.  Immutable once built.
pub struct Vehicle {
    id: VehicleId,
    name: String,
    kind: DeviceKind,
    device_config: BTreeMap<String, String>,
    driver: Box<dyn VehicleDriver>,
}

impl Vehicle {
    pub fn new(
        id: VehicleId,
        name: impl Into<String>,
        device_config: BTreeMap<String, String>,
        driver: Box<dyn VehicleDriver>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            kind: driver.kind(),
            device_config,
            driver,
        }
    }

    pub fn id(&self) -> VehicleId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn device_type(&self) -> DeviceKind {
        self.kind
    }

    pub fn device_config(&self) -> &BTreeMap<String, String> {
        &self.device_config
    }

    /// Forward the controller table to this vehicle's adapter.
    pub fn control(&self, controllers: &[Controller]) -> Result<(), DeckError> {
        self.driver.control(self.id, controllers)
    }
}

impl fmt::Debug for Vehicle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vehicle")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("device_type", &self.kind)
            .field("device_config", &self.device_config)
            .finish_non_exhaustive()
    }
}
