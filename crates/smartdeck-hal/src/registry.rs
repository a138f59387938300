//! [`VehicleFactory`] and [`VehicleRegistry`] – building the vehicle table and
//! routing controller state to it.
//!
//! The factory turns a device-type tag into a concrete adapter, opening (or
//! reusing) the shared link for that type through its
//! [`ConnectionManager`].  The registry is the resulting id → vehicle table;
//! it is filled once at startup and never resized.

use std::collections::BTreeMap;

use smartdeck_types::{Controller, DeckError, SlotInclusion, VehicleId, VehicleSpec};
use tracing::info;

use crate::connection::ConnectionManager;
use crate::console::ConsoleAdapter;
use crate::smartport::SmartPortAdapter;
use crate::vehicle::{DeviceKind, Vehicle, VehicleDriver};

/// Builds vehicles from configuration entries.
pub struct VehicleFactory {
    connections: ConnectionManager,
    inclusion: SlotInclusion,
}

impl VehicleFactory {
    pub fn new(connections: ConnectionManager, inclusion: SlotInclusion) -> Self {
        Self {
            connections,
            inclusion,
        }
    }

    pub fn connections(&self) -> &ConnectionManager {
        &self.connections
    }

    /// Finish building and keep only the opened links.
    pub fn into_connections(self) -> ConnectionManager {
        self.connections
    }

    /// Build one vehicle.
    ///
    /// # Errors
    ///
    /// Returns [`DeckError::UnknownDeviceType`] for an unrecognised tag, or
    /// the link's open error the first time a board-backed type is used.
    pub fn configure(
        &mut self,
        device_type: &str,
        device_config: BTreeMap<String, String>,
        id: VehicleId,
        name: &str,
    ) -> Result<Vehicle, DeckError> {
        let kind: DeviceKind = device_type.parse()?;

        let driver: Box<dyn VehicleDriver> = match kind {
            DeviceKind::SmartPortArduino => {
                let link = self.connections.link(kind)?;
                Box::new(SmartPortAdapter::new(link, self.inclusion))
            }
            DeviceKind::Console => Box::new(ConsoleAdapter::new(self.inclusion)),
        };

        info!(vehicle = id, name, device = %kind, "configured vehicle");
        Ok(Vehicle::new(id, name, device_config, driver))
    }
}

/// The fixed id → vehicle table.
#[derive(Debug, Default)]
pub struct VehicleRegistry {
    vehicles: BTreeMap<VehicleId, Vehicle>,
}

impl VehicleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure every entry of `specs` through `factory`.
    ///
    /// # Errors
    ///
    /// Stops at the first entry that fails to configure or repeats an id.
    pub fn build(specs: &[VehicleSpec], factory: &mut VehicleFactory) -> Result<Self, DeckError> {
        let mut registry = Self::new();
        for spec in specs {
            let vehicle = factory.configure(
                &spec.device_type,
                spec.device_config.clone(),
                spec.id,
                &spec.name,
            )?;
            registry.register(vehicle)?;
        }
        Ok(registry)
    }

    /// Add a vehicle.
    ///
    /// # Errors
    ///
    /// Returns [`DeckError::InvalidConfig`] if the id is already taken.
    pub fn register(&mut self, vehicle: Vehicle) -> Result<(), DeckError> {
        if self.vehicles.contains_key(&vehicle.id()) {
            return Err(DeckError::InvalidConfig(format!(
                "vehicle id {} is configured more than once",
                vehicle.id()
            )));
        }
        self.vehicles.insert(vehicle.id(), vehicle);
        Ok(())
    }

    pub fn get(&self, id: VehicleId) -> Option<&Vehicle> {
        self.vehicles.get(&id)
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Vehicle> {
        self.vehicles.values()
    }

    /// Send the controller table to vehicle `id`.
    ///
    /// Returns `Ok(false)` when no such vehicle is configured.
    ///
    /// # Errors
    ///
    /// Propagates the adapter's transport error.
    pub fn dispatch(&self, id: VehicleId, controllers: &[Controller]) -> Result<bool, DeckError> {
        match self.vehicles.get(&id) {
            Some(vehicle) => {
                vehicle.control(controllers)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimOpener;
    use smartdeck_types::SessionId;

    fn spec(id: VehicleId, device_type: &str) -> VehicleSpec {
        VehicleSpec {
            id,
            name: format!("Vehicle {id}"),
            device_type: device_type.to_string(),
            device_config: BTreeMap::new(),
        }
    }

    fn factory(opener: &SimOpener) -> VehicleFactory {
        VehicleFactory::new(
            ConnectionManager::new(Box::new(opener.clone())),
            SlotInclusion::SessionBound,
        )
    }

    #[test]
    fn configure_resolves_known_tags() {
        let opener = SimOpener::new();
        let mut factory = factory(&opener);

        let mut config = BTreeMap::new();
        config.insert("channel".to_string(), "a".to_string());
        let board = factory
            .configure("smartport_arduino", config, 1, "Forklift")
            .unwrap();
        assert_eq!(board.device_type(), DeviceKind::SmartPortArduino);
        assert_eq!(board.device_config()["channel"], "a");

        let console = factory.configure("console", BTreeMap::new(), 2, "Loader").unwrap();
        assert_eq!(console.device_type(), DeviceKind::Console);
    }

    #[test]
    fn configure_unknown_tag_fails() {
        let opener = SimOpener::new();
        let mut factory = factory(&opener);
        let result = factory.configure("hovercraft", BTreeMap::new(), 1, "Hover");
        assert!(matches!(result, Err(DeckError::UnknownDeviceType(_))));
        assert_eq!(opener.open_count(), 0);
    }

    #[test]
    fn board_vehicles_share_one_link() {
        let opener = SimOpener::new();
        let mut factory = factory(&opener);
        let specs = [
            spec(1, "smartport_arduino"),
            spec(2, "smartport_arduino"),
            spec(3, "console"),
        ];

        let registry = VehicleRegistry::build(&specs, &mut factory).unwrap();
        assert_eq!(registry.len(), 3);
        assert_eq!(opener.open_count(), 1);
        assert!(factory.connections().is_open(DeviceKind::SmartPortArduino));
        assert!(!factory.connections().is_open(DeviceKind::Console));
    }

    #[test]
    fn console_only_table_opens_nothing() {
        let opener = SimOpener::new();
        let mut factory = factory(&opener);
        let registry = VehicleRegistry::build(&[spec(1, "debug")], &mut factory).unwrap();
        assert!(!registry.is_empty());
        assert_eq!(opener.open_count(), 0);
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let opener = SimOpener::new();
        let mut factory = factory(&opener);
        let result = VehicleRegistry::build(&[spec(1, "console"), spec(1, "console")], &mut factory);
        assert!(matches!(result, Err(DeckError::InvalidConfig(_))));
    }

    #[test]
    fn dispatch_reaches_the_shared_board() {
        let opener = SimOpener::new();
        let mut factory = factory(&opener);
        let registry = VehicleRegistry::build(
            &[spec(1, "smartport_arduino"), spec(2, "smartport_arduino")],
            &mut factory,
        )
        .unwrap();

        let mut controller = Controller::new(1);
        controller.bind(SessionId::from("s"));
        assert!(registry.dispatch(1, std::slice::from_ref(&controller)).unwrap());
        assert!(registry.dispatch(2, std::slice::from_ref(&controller)).unwrap());
        assert!(!registry.dispatch(9, std::slice::from_ref(&controller)).unwrap());

        let handle = opener.handle(DeviceKind::SmartPortArduino).unwrap();
        assert_eq!(handle.written().len(), 2);
    }

    #[test]
    fn iter_is_ordered_by_id() {
        let opener = SimOpener::new();
        let mut factory = factory(&opener);
        let registry =
            VehicleRegistry::build(&[spec(3, "console"), spec(1, "console")], &mut factory).unwrap();
        let ids: Vec<VehicleId> = registry.iter().map(Vehicle::id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(registry.get(3).unwrap().name(), "Vehicle 3");
    }
}
