//! [`SmartPortAdapter`] – drives vehicles through a SmartPort Arduino board.
//!
//! Every call rebuilds the full multiplexed packet from the controller table,
//! writes it synchronously, then opportunistically picks up whatever
//! acknowledgement the board has buffered.  All vehicles of this type share
//! one [`SharedLink`].

use smartdeck_types::{Controller, DeckError, SlotInclusion, VehicleId};
use tracing::trace;

use crate::connection::SharedLink;
use crate::protocol;
use crate::vehicle::{DeviceKind, VehicleDriver};

pub struct SmartPortAdapter {
    link: SharedLink,
    inclusion: SlotInclusion,
}

impl SmartPortAdapter {
    pub fn new(link: SharedLink, inclusion: SlotInclusion) -> Self {
        Self { link, inclusion }
    }

    pub fn link(&self) -> &SharedLink {
        &self.link
    }

    /// The packet this adapter would send for `controllers`.
    pub fn build_packet(&self, controllers: &[Controller]) -> Vec<u8> {
        protocol::encode_packet(controllers.iter().filter(|c| self.inclusion.includes(c)))
    }
}

impl VehicleDriver for SmartPortAdapter {
    fn kind(&self) -> DeviceKind {
        DeviceKind::SmartPortArduino
    }

    fn control(&self, vehicle: VehicleId, controllers: &[Controller]) -> Result<(), DeckError> {
        let packet = self.build_packet(controllers);
        trace!(vehicle, slots = (packet.len() - 2) / protocol::SLOT_LEN, "dispatching state packet");

        let mut link = self.link.borrow_mut();
        link.send(&packet)?;
        link.poll_ack()?;
        Ok(())
    }
}
