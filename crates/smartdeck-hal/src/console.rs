//! [`ConsoleAdapter`] – a device type that logs instead of driving hardware.
//!
//! Useful for exercising the bridge from a browser with no board attached.

use smartdeck_types::{Controller, DeckError, SlotInclusion, VehicleId};
use tracing::info;

use crate::vehicle::{DeviceKind, VehicleDriver};

#[derive(Debug, Default)]
pub struct ConsoleAdapter {
    inclusion: SlotInclusion,
}

impl ConsoleAdapter {
    pub fn new(inclusion: SlotInclusion) -> Self {
        Self { inclusion }
    }
}

/// One `slot:selection[buttons]` entry per slot that `inclusion` admits,
/// the same slots a board would receive.
pub fn describe(controllers: &[Controller], inclusion: SlotInclusion) -> String {
    controllers
        .iter()
        .filter(|c| inclusion.includes(c))
        .map(|c| {
            let selection = c
                .selection()
                .map_or_else(|| "-".to_string(), |s| s.to_string());
            let held: Vec<&str> = c.pressed().iter().map(|b| b.name()).collect();
            format!("{}:{}[{}]", c.id(), selection, held.join(","))
        })
        .collect::<Vec<_>>()
        .join(" ")
}

impl VehicleDriver for ConsoleAdapter {
    fn kind(&self) -> DeviceKind {
        DeviceKind::Console
    }

    fn control(&self, vehicle: VehicleId, controllers: &[Controller]) -> Result<(), DeckError> {
        info!(
            vehicle,
            state = %describe(controllers, self.inclusion),
            "console control"
        );
        Ok(())
    }
}
