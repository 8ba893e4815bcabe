use std::collections::BTreeSet;

use crate::config::BuildingConfig;
use crate::shared::{
    CarId, CarSnapshot, CarState, Direction, DispatchError, DoorState, Floor, Result,
    ServiceState, Signal,
};

/**
 * Logical state of a single elevator car.
 *
 * The `Car` is a plain state machine without any locking of its own. It is shared between the
 * dispatcher and the car's mover through a `CarHandle`, which wraps it in a `RwLock`.
 *
 * # Fields
 * - `id`:              Unique car id, also used as the dispatch tie-breaker.
 * - `current_floor`:   Floor the car is at (or just passed while moving).
 * - `direction`:       Direction of travel. Kept while the door is open so the scan can continue.
 * - `door`:            Door state.
 * - `service`:         Whether the car takes part in dispatch.
 * - `stops`:           Floors the car has committed to stop at. Never contains `current_floor`.
 * - `hall_calls`:      Hall calls (floor, direction) accepted by this car, cleared on arrival.
 * - `min_floor`:       Lowest floor of the building.
 * - `max_floor`:       Highest floor of the building.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct Car {
    id: CarId,
    current_floor: Floor,
    direction: Direction,
    door: DoorState,
    service: ServiceState,
    stops: BTreeSet<Floor>,
    hall_calls: BTreeSet<(Floor, Direction)>,
    min_floor: Floor,
    max_floor: Floor,
}

/// What a single `Car::step` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Idle,
    Moved(Floor),
    Arrived(Floor),
    DoorClosed(CarState),
    OutOfService,
}

impl Car {
    pub fn new(id: CarId, home_floor: Floor, building: &BuildingConfig) -> Car {
        Car {
            id,
            current_floor: home_floor,
            direction: Direction::Idle,
            door: DoorState::Closed,
            service: ServiceState::InService,
            stops: BTreeSet::new(),
            hall_calls: BTreeSet::new(),
            min_floor: building.min_floor,
            max_floor: building.max_floor,
        }
    }

    pub fn id(&self) -> CarId {
        self.id
    }

    pub fn current_floor(&self) -> Floor {
        self.current_floor
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn door(&self) -> DoorState {
        self.door
    }

    pub fn service(&self) -> ServiceState {
        self.service
    }

    pub fn is_in_service(&self) -> bool {
        self.service == ServiceState::InService
    }

    pub fn has_stop(&self, floor: Floor) -> bool {
        self.stops.contains(&floor)
    }

    pub fn has_hall_call(&self, floor: Floor, direction: Direction) -> bool {
        self.stops.contains(&floor) && self.hall_calls.contains(&(floor, direction))
    }

    pub fn state(&self) -> CarState {
        if !self.is_in_service() {
            return CarState::OutOfService;
        }
        if self.door == DoorState::Open {
            return CarState::DoorOpen;
        }
        match self.direction {
            Direction::Up => CarState::MovingUp,
            Direction::Down => CarState::MovingDown,
            Direction::Idle => CarState::Idle,
        }
    }

    /// Floors of travel needed before this car can serve `signal`, `None` if it cannot.
    pub fn estimate_cost(&self, signal: &Signal) -> Option<u32> {
        if !self.is_in_service() {
            return None;
        }

        let target = signal.origin_floor();
        let distance = (target - self.current_floor).unsigned_abs();
        if signal.is_emergency() {
            return Some(distance);
        }

        let heading = self.heading();
        if heading == Direction::Idle {
            return Some(distance);
        }

        // Only calls at or ahead of the car, wanting to go the same way, can be picked up
        let ahead = Direction::towards(self.current_floor, target);
        let same_way = signal
            .travel_direction()
            .map_or(true, |wanted| wanted == heading);
        if same_way && (ahead == heading || ahead == Direction::Idle) {
            Some(distance)
        } else {
            None
        }
    }

    pub fn commit_stop(&mut self, floor: Floor) -> Result<()> {
        if !self.is_in_service() {
            return Err(DispatchError::OutOfService(self.id));
        }
        if floor < self.min_floor || floor > self.max_floor {
            return Err(DispatchError::InvalidFloor {
                floor,
                min: self.min_floor,
                max: self.max_floor,
            });
        }

        // Served right here: stop at the current floor instead of queueing it
        if floor == self.current_floor {
            if self.door == DoorState::Closed {
                self.open_door();
            }
            return Ok(());
        }

        if self.stops.insert(floor)
            && self.direction == Direction::Idle
            && self.door == DoorState::Closed
        {
            self.direction = Direction::towards(self.current_floor, floor);
        }
        Ok(())
    }

    pub fn commit_hall_call(&mut self, floor: Floor, direction: Direction) -> Result<()> {
        self.commit_stop(floor)?;
        if floor != self.current_floor {
            self.hall_calls.insert((floor, direction));
        }
        Ok(())
    }

    pub fn snapshot(&self) -> CarSnapshot {
        CarSnapshot {
            id: self.id,
            current_floor: self.current_floor,
            direction: self.direction,
            door: self.door,
            state: self.state(),
            service: self.service,
            stops: self.ordered_stops(),
        }
    }

    /// Advances the car by one tick of motion.
    pub fn step(&mut self) -> StepOutcome {
        if !self.is_in_service() {
            return StepOutcome::OutOfService;
        }

        if self.door == DoorState::Open {
            self.door = DoorState::Closed;
            self.direction = self.next_direction();
            return StepOutcome::DoorClosed(self.state());
        }

        if !self.has_stops_ahead(self.direction) {
            self.direction = self.next_direction();
            if self.direction == Direction::Idle {
                return StepOutcome::Idle;
            }
        }

        self.current_floor += self.direction.delta();
        if self.stops.remove(&self.current_floor) {
            self.open_door();
            return StepOutcome::Arrived(self.current_floor);
        }
        StepOutcome::Moved(self.current_floor)
    }

    /// Takes the car out of dispatch. Returns the hall calls it can no longer serve.
    pub fn take_out_of_service(&mut self) -> Vec<Signal> {
        let orphaned = self
            .hall_calls
            .iter()
            .map(|&(floor, direction)| Signal::hall(floor, direction))
            .collect();

        self.service = ServiceState::OutOfService;
        self.direction = Direction::Idle;
        self.door = DoorState::Closed;
        self.stops.clear();
        self.hall_calls.clear();
        orphaned
    }

    pub fn readmit(&mut self) {
        if self.is_in_service() {
            return;
        }
        self.service = ServiceState::InService;
        self.direction = Direction::Idle;
        self.door = DoorState::Closed;
    }

    fn open_door(&mut self) {
        let floor = self.current_floor;
        self.door = DoorState::Open;
        self.hall_calls.retain(|&(f, _)| f != floor);
    }

    fn has_stops_ahead(&self, direction: Direction) -> bool {
        match direction {
            Direction::Up => self.stops.range(self.current_floor + 1..).next().is_some(),
            Direction::Down => self.stops.range(..self.current_floor).next().is_some(),
            Direction::Idle => false,
        }
    }

    /// Scan discipline: keep going while stops remain ahead, then reverse.
    fn next_direction(&self) -> Direction {
        if self.stops.is_empty() {
            return Direction::Idle;
        }
        match self.direction {
            Direction::Up | Direction::Down => {
                if self.has_stops_ahead(self.direction) {
                    self.direction
                } else {
                    self.direction.opposite()
                }
            }
            Direction::Idle => self
                .nearest_stop()
                .map_or(Direction::Idle, |floor| {
                    Direction::towards(self.current_floor, floor)
                }),
        }
    }

    /// Direction the car will travel next, taking an open door into account.
    fn heading(&self) -> Direction {
        match self.door {
            DoorState::Open => self.next_direction(),
            DoorState::Closed if self.stops.is_empty() => Direction::Idle,
            DoorState::Closed => self.direction,
        }
    }

    fn nearest_stop(&self) -> Option<Floor> {
        let current = self.current_floor;
        self.stops
            .iter()
            .copied()
            .min_by_key(|&floor| ((floor - current).abs(), floor))
    }

    fn ordered_stops(&self) -> Vec<Floor> {
        let current = self.current_floor;
        let above = self.stops.range(current + 1..).copied();
        let below = self.stops.range(..current).rev().copied();
        match self.heading() {
            Direction::Up => above.chain(below).collect(),
            Direction::Down => below.chain(above).collect(),
            Direction::Idle => {
                let mut stops: Vec<Floor> = self.stops.iter().copied().collect();
                stops.sort_by_key(|&floor| ((floor - current).abs(), floor));
                stops
            }
        }
    }
}
