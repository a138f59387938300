//! [`DeckConfig`] – the immutable startup configuration of a deck.
//!
//! Loading (file, environment, command line) is the binary's job; this module
//! only defines the shape and the structural checks every loader shares.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{Controller, DeckError, MAX_CONTROLLERS, MAX_VEHICLES, VehicleId};

/// Which controller slots are written into the outbound packet.
///
/// The choice is fixed per board firmware revision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotInclusion {
    /// Only slots currently bound to a client session.
    #[default]
    SessionBound,
    /// Every slot, bound or not.
    AllSlots,
}

impl SlotInclusion {
    pub fn includes(self, controller: &Controller) -> bool {
        match self {
            SlotInclusion::SessionBound => controller.is_bound(),
            SlotInclusion::AllSlots => true,
        }
    }
}

/// Serial link settings shared by every board-backed device type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialSettings {
    /// Serial device path, e.g. `/dev/ttyUSB0` or `COM3`.
    #[serde(default)]
    pub port: Option<String>,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

fn default_baud_rate() -> u32 {
    1_000_000
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: default_baud_rate(),
        }
    }
}

/// One entry of the vehicle table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleSpec {
    pub id: VehicleId,
    pub name: String,
    /// Device type tag, resolved by the vehicle factory.
    pub device_type: String,
    /// Opaque per-vehicle settings handed to the device adapter.
    #[serde(default)]
    pub device_config: BTreeMap<String, String>,
}

/// Complete deck configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckConfig {
    #[serde(default = "default_controller_count")]
    pub controller_count: u8,

    #[serde(default)]
    pub slot_inclusion: SlotInclusion,

    #[serde(default)]
    pub serial: SerialSettings,

    #[serde(default)]
    pub vehicles: Vec<VehicleSpec>,
}

fn default_controller_count() -> u8 {
    MAX_CONTROLLERS
}

impl Default for DeckConfig {
    fn default() -> Self {
        Self {
            controller_count: default_controller_count(),
            slot_inclusion: SlotInclusion::default(),
            serial: SerialSettings::default(),
            vehicles: Vec::new(),
        }
    }
}

impl DeckConfig {
    /// Check the structural limits imposed by the wire protocol.
    ///
    /// # Errors
    ///
    /// Returns [`DeckError::InvalidConfig`] when the controller count is
    /// outside `1..=12`, a vehicle id is outside `1..=15` or repeated, the
    /// ids do not form the contiguous range `1..=N`, or the baud rate is
    /// zero.
    pub fn validate(&self) -> Result<(), DeckError> {
        if !(1..=MAX_CONTROLLERS).contains(&self.controller_count) {
            return Err(DeckError::InvalidConfig(format!(
                "controller_count must be between 1 and {MAX_CONTROLLERS}, got {}",
                self.controller_count
            )));
        }

        if self.serial.baud_rate == 0 {
            return Err(DeckError::InvalidConfig(
                "serial.baud_rate must be non-zero".to_string(),
            ));
        }

        let mut seen = BTreeSet::new();
        for vehicle in &self.vehicles {
            if !(1..=MAX_VEHICLES).contains(&vehicle.id) {
                return Err(DeckError::InvalidConfig(format!(
                    "vehicle '{}' has id {}, ids must be between 1 and {MAX_VEHICLES}",
                    vehicle.name, vehicle.id
                )));
            }
            if !seen.insert(vehicle.id) {
                return Err(DeckError::InvalidConfig(format!(
                    "vehicle id {} is configured more than once",
                    vehicle.id
                )));
            }
        }

        // Selection cycles over 1..=N, so the table must fill that range.
        if let Some(missing) = (1..=MAX_VEHICLES)
            .take(seen.len())
            .find(|id| !seen.contains(id))
        {
            return Err(DeckError::InvalidConfig(format!(
                "vehicle ids must run from 1 to {} without gaps, id {missing} is missing",
                seen.len()
            )));
        }
        Ok(())
    }
}
