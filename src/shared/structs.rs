/***************************************/
/*        3rd party libraries          */
/***************************************/
use serde::Deserialize;
use serde::Serialize;

/***************************************/
/*         Public type aliases         */
/***************************************/
pub type Floor = i32;
pub type CarId = u32;

/***************************************/
/*       Public data structures        */
/***************************************/
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Idle,
}

impl Direction {
    /// Direction of travel needed to get from `from` to `to`.
    pub fn towards(from: Floor, to: Floor) -> Direction {
        if to > from {
            Direction::Up
        } else if to < from {
            Direction::Down
        } else {
            Direction::Idle
        }
    }

    pub fn opposite(&self) -> Direction {
        match *self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Idle => Direction::Idle,
        }
    }

    pub fn delta(&self) -> Floor {
        match *self {
            Direction::Up => 1,
            Direction::Down => -1,
            Direction::Idle => 0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DoorState {
    Closed,
    Open,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ServiceState {
    InService,
    OutOfService,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CarState {
    Idle,
    MovingUp,
    MovingDown,
    DoorOpen,
    OutOfService,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    HallUp,
    HallDown,
    Cabin,
    Emergency,
}

/**
 * A single call for service.
 *
 * Signals are produced by panels and consumed exactly once by the dispatch controller.
 * The fields are private so a signal cannot change after it has been queued.
 *
 * # Fields
 * - `origin_floor`:    Floor the call was made from.
 * - `kind`:            Hall up/down, cabin or emergency.
 * - `target_floor`:    Destination of a cabin call.
 * - `car`:             Cabin the call was placed in, if known.
 */
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signal {
    origin_floor: Floor,
    kind: SignalKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    target_floor: Option<Floor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    car: Option<CarId>,
}

impl Signal {
    pub fn hall_up(floor: Floor) -> Signal {
        Signal {
            origin_floor: floor,
            kind: SignalKind::HallUp,
            target_floor: None,
            car: None,
        }
    }

    pub fn hall_down(floor: Floor) -> Signal {
        Signal {
            origin_floor: floor,
            kind: SignalKind::HallDown,
            target_floor: None,
            car: None,
        }
    }

    pub fn hall(floor: Floor, direction: Direction) -> Signal {
        match direction {
            Direction::Down => Signal::hall_down(floor),
            _ => Signal::hall_up(floor),
        }
    }

    #[cfg(test)]
    pub fn cabin(car: Option<CarId>, origin_floor: Floor, target_floor: Floor) -> Signal {
        Signal {
            origin_floor,
            kind: SignalKind::Cabin,
            target_floor: Some(target_floor),
            car,
        }
    }

    #[cfg(test)]
    pub fn emergency(floor: Floor) -> Signal {
        Signal {
            origin_floor: floor,
            kind: SignalKind::Emergency,
            target_floor: None,
            car: None,
        }
    }

    pub fn origin_floor(&self) -> Floor {
        self.origin_floor
    }

    pub fn kind(&self) -> SignalKind {
        self.kind
    }

    pub fn target_floor(&self) -> Option<Floor> {
        self.target_floor
    }

    pub fn car(&self) -> Option<CarId> {
        self.car
    }

    pub fn is_emergency(&self) -> bool {
        self.kind == SignalKind::Emergency
    }

    /// Direction a hall call wants to travel, `None` for cabin and emergency calls.
    pub fn hall_direction(&self) -> Option<Direction> {
        match self.kind {
            SignalKind::HallUp => Some(Direction::Up),
            SignalKind::HallDown => Some(Direction::Down),
            _ => None,
        }
    }

    /// Direction the passenger wants to travel from the origin floor, if it is known.
    pub fn travel_direction(&self) -> Option<Direction> {
        match self.kind {
            SignalKind::HallUp => Some(Direction::Up),
            SignalKind::HallDown => Some(Direction::Down),
            SignalKind::Cabin => match self.target_floor {
                Some(target) if target != self.origin_floor => {
                    Some(Direction::towards(self.origin_floor, target))
                }
                _ => None,
            },
            SignalKind::Emergency => None,
        }
    }
}

/// Read-only copy of a car, stops listed in traversal order.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CarSnapshot {
    pub id: CarId,
    #[serde(rename = "currentFloor")]
    pub current_floor: Floor,
    pub direction: Direction,
    #[serde(rename = "doorState")]
    pub door: DoorState,
    pub state: CarState,
    pub service: ServiceState,
    pub stops: Vec<Floor>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Committed,
    AlreadySatisfied,
}

/// Result of one assignment decision.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchRecord {
    pub signal: Signal,
    #[serde(rename = "assignedCarId")]
    pub assigned_car: CarId,
    pub outcome: Outcome,
}

/// Notifications sent from the car movers to the dispatch controller.
#[derive(Debug, Clone, PartialEq)]
pub enum CarEvent {
    Arrived { car_id: CarId, floor: Floor },
    Faulted { car_id: CarId, orphaned: Vec<Signal> },
    Readmitted { car_id: CarId },
}
