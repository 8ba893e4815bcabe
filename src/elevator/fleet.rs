use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::config::{BuildingConfig, FleetConfig};
use crate::elevator::car::Car;
use crate::shared::{CarId, CarSnapshot, DispatchError, Result, Signal};

/**
 * Shared handle to one car.
 *
 * The dispatcher takes the read lock to score and the write lock to commit a stop. The car's
 * mover takes the write lock to step. A poisoned lock is reported as the car being out of
 * service, which keeps the fault contained to that car.
 */
#[derive(Debug, Clone)]
pub struct CarHandle {
    id: CarId,
    car: Arc<RwLock<Car>>,
}

impl CarHandle {
    pub fn new(car: Car) -> CarHandle {
        CarHandle {
            id: car.id(),
            car: Arc::new(RwLock::new(car)),
        }
    }

    pub fn id(&self) -> CarId {
        self.id
    }

    pub fn read(&self) -> Result<RwLockReadGuard<'_, Car>> {
        self.car
            .read()
            .map_err(|_| DispatchError::OutOfService(self.id))
    }

    pub fn write(&self) -> Result<RwLockWriteGuard<'_, Car>> {
        self.car
            .write()
            .map_err(|_| DispatchError::OutOfService(self.id))
    }

    pub fn snapshot(&self) -> Result<CarSnapshot> {
        Ok(self.read()?.snapshot())
    }

    pub fn is_in_service(&self) -> bool {
        self.read().map(|car| car.is_in_service()).unwrap_or(false)
    }

    pub fn estimate_cost(&self, signal: &Signal) -> Option<u32> {
        self.read().ok()?.estimate_cost(signal)
    }
}

/// The set of cars known to the dispatcher, fixed at configuration time.
#[derive(Debug, Default)]
pub struct FleetRegistry {
    cars: BTreeMap<CarId, CarHandle>,
}

/// View over the in-service cars, evaluated each time it is iterated.
#[derive(Debug, Clone, Copy)]
pub struct InServiceView<'a> {
    cars: &'a BTreeMap<CarId, CarHandle>,
}

impl<'a> InServiceView<'a> {
    pub fn iter(&self) -> impl Iterator<Item = CarHandle> + 'a {
        let cars = self.cars;
        cars.values()
            .filter(|handle| handle.is_in_service())
            .cloned()
    }
}

impl FleetRegistry {
    pub fn from_config(fleet: &FleetConfig, building: &BuildingConfig) -> FleetRegistry {
        FleetRegistry::from_cars(
            fleet
                .cars
                .iter()
                .map(|car| Car::new(car.id, car.home_floor, building)),
        )
    }

    pub fn from_cars(cars: impl IntoIterator<Item = Car>) -> FleetRegistry {
        let cars = cars
            .into_iter()
            .map(|car| (car.id(), CarHandle::new(car)))
            .collect();
        FleetRegistry { cars }
    }

    pub fn get(&self, id: CarId) -> Result<CarHandle> {
        self.cars
            .get(&id)
            .cloned()
            .ok_or(DispatchError::UnknownCar(id))
    }

    pub fn ids(&self) -> Vec<CarId> {
        self.cars.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.cars.len()
    }

    pub fn list_in_service(&self) -> InServiceView<'_> {
        InServiceView { cars: &self.cars }
    }

    pub fn in_service_count(&self) -> usize {
        self.list_in_service().iter().count()
    }

    /// Snapshots of every readable car, in id order.
    pub fn snapshots(&self) -> Vec<CarSnapshot> {
        self.cars
            .values()
            .filter_map(|handle| handle.snapshot().ok())
            .collect()
    }
}
