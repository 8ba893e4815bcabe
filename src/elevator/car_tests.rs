/*
 * Unit tests for the car state machine
 *
 * The unit tests follows the Arrange, Act, Assert pattern.
 *
 * Tests:
 *  - test_car_init
 *  - test_car_commit_sets_direction
 *  - test_car_commit_is_idempotent
 *  - test_car_commit_current_floor_opens_door
 *  - test_car_commit_rejected_out_of_service
 *  - test_car_commit_rejects_invalid_floor
 *  - test_car_travels_and_arrives
 *  - test_car_scan_continues_before_reversing
 *  - test_car_door_open_cabin_call
 *  - test_car_no_ghost_stop_while_moving
 *  - test_car_cost_idle
 *  - test_car_cost_direction_compatible
 *  - test_car_cost_direction_incompatible
 *  - test_car_cost_emergency_ignores_direction
 *  - test_car_cost_out_of_service
 *  - test_car_snapshot_traversal_order
 *  - test_car_out_of_service_orphans_hall_calls
 *  - test_car_hall_call_cleared_on_arrival
 *  - test_car_readmit
 */

/***************************************/
/*             Unit tests              */
/***************************************/
#[cfg(test)]
mod car_tests {
    use crate::config::BuildingConfig;
    use crate::elevator::car::{Car, StepOutcome};
    use crate::shared::CarState::{DoorOpen, Idle, MovingDown, MovingUp, OutOfService};
    use crate::shared::{Direction, DispatchError, DoorState, ServiceState, Signal};

    fn building() -> BuildingConfig {
        BuildingConfig {
            min_floor: 0,
            max_floor: 12,
        }
    }

    fn setup_car(floor: i32) -> Car {
        Car::new(1, floor, &building())
    }

    // Steps the car until it reports an arrival, returning the floor
    fn run_until_arrival(car: &mut Car) -> i32 {
        for _ in 0..50 {
            if let StepOutcome::Arrived(floor) = car.step() {
                return floor;
            }
        }
        panic!("Car never arrived");
    }

    #[test]
    fn test_car_init() {
        // Arrange
        let car = setup_car(3);

        // Assert
        assert_eq!(car.id(), 1);
        assert_eq!(car.current_floor(), 3);
        assert_eq!(car.state(), Idle);
        assert_eq!(car.door(), DoorState::Closed);
        assert_eq!(car.service(), ServiceState::InService);
        assert!(car.snapshot().stops.is_empty());
    }

    #[test]
    fn test_car_commit_sets_direction() {
        // Arrange
        let mut up = setup_car(3);
        let mut down = setup_car(3);

        // Act
        up.commit_stop(7).unwrap();
        down.commit_stop(1).unwrap();

        // Assert
        assert_eq!(up.state(), MovingUp);
        assert_eq!(up.direction(), Direction::Up);
        assert_eq!(down.state(), MovingDown);
        assert_eq!(down.direction(), Direction::Down);
    }

    #[test]
    fn test_car_commit_is_idempotent() {
        // Arrange
        let mut car = setup_car(0);

        // Act
        car.commit_stop(5).unwrap();
        car.commit_stop(5).unwrap();

        // Assert
        assert_eq!(car.snapshot().stops, vec![5]);
    }

    #[test]
    fn test_car_commit_current_floor_opens_door() {
        // Arrange
        let mut car = setup_car(4);

        // Act
        car.commit_stop(4).unwrap();

        // Assert
        assert_eq!(car.state(), DoorOpen);
        assert!(!car.has_stop(4));
    }

    #[test]
    fn test_car_commit_rejected_out_of_service() {
        // Arrange
        let mut car = setup_car(2);
        car.take_out_of_service();

        // Act
        let result = car.commit_stop(6);

        // Assert
        assert_eq!(result, Err(DispatchError::OutOfService(1)));
        assert!(!car.has_stop(6));
    }

    #[test]
    fn test_car_commit_rejects_invalid_floor() {
        // Arrange
        let mut car = setup_car(2);

        // Act
        let result = car.commit_stop(13);

        // Assert
        assert_eq!(
            result,
            Err(DispatchError::InvalidFloor {
                floor: 13,
                min: 0,
                max: 12
            })
        );
        assert_eq!(car.state(), Idle);
    }

    #[test]
    fn test_car_travels_and_arrives() {
        // Arrange
        let mut car = setup_car(1);
        car.commit_stop(3).unwrap();

        // Act & Assert
        assert_eq!(car.step(), StepOutcome::Moved(2));
        assert_eq!(car.state(), MovingUp);
        assert_eq!(car.step(), StepOutcome::Arrived(3));
        assert_eq!(car.state(), DoorOpen);
        assert!(!car.has_stop(3));
        assert_eq!(car.step(), StepOutcome::DoorClosed(Idle));
        assert_eq!(car.direction(), Direction::Idle);
        assert_eq!(car.step(), StepOutcome::Idle);
    }

    #[test]
    fn test_car_scan_continues_before_reversing() {
        // Arrange
        let mut car = setup_car(5);
        car.commit_stop(7).unwrap();
        car.commit_stop(3).unwrap();
        car.commit_stop(9).unwrap();

        // Act
        let first = run_until_arrival(&mut car);
        let second = run_until_arrival(&mut car);
        let third = run_until_arrival(&mut car);

        // Assert
        assert_eq!((first, second, third), (7, 9, 3));
        assert_eq!(car.step(), StepOutcome::DoorClosed(Idle));
    }

    #[test]
    fn test_car_door_open_cabin_call() {
        // Arrange
        let mut car = setup_car(4);
        car.commit_stop(4).unwrap();

        // Act
        car.commit_stop(9).unwrap();
        let outcome = car.step();

        // Assert
        assert_eq!(outcome, StepOutcome::DoorClosed(MovingUp));
        assert_eq!(car.snapshot().stops, vec![9]);
    }

    #[test]
    fn test_car_no_ghost_stop_while_moving() {
        // Purpose: stops never hold the current floor while the car travels with the door closed

        // Arrange
        let mut car = setup_car(6);
        for floor in [2, 11, 6, 8, 0, 12, 4] {
            car.commit_stop(floor).unwrap();
        }

        // Act & Assert
        for tick in 0..100 {
            if tick == 10 {
                car.commit_stop(car.current_floor()).unwrap();
                car.commit_stop(5).unwrap();
            }
            car.step();
            let moving = matches!(car.state(), MovingUp | MovingDown);
            if moving && car.door() == DoorState::Closed {
                assert!(!car.has_stop(car.current_floor()));
            }
        }
        assert!(car.snapshot().stops.is_empty());
    }

    #[test]
    fn test_car_cost_idle() {
        // Arrange
        let car = setup_car(5);

        // Assert
        assert_eq!(car.estimate_cost(&Signal::hall_up(6)), Some(1));
        assert_eq!(car.estimate_cost(&Signal::hall_down(1)), Some(4));
        assert_eq!(car.estimate_cost(&Signal::hall_up(5)), Some(0));
    }

    #[test]
    fn test_car_cost_direction_compatible() {
        // Arrange
        let mut car = setup_car(5);
        car.commit_stop(8).unwrap();

        // Assert
        assert_eq!(car.estimate_cost(&Signal::hall_up(6)), Some(1));
        assert_eq!(car.estimate_cost(&Signal::hall_up(10)), Some(5));
        assert_eq!(car.estimate_cost(&Signal::cabin(None, 7, 11)), Some(2));
    }

    #[test]
    fn test_car_cost_direction_incompatible() {
        // Arrange
        let mut car = setup_car(5);
        car.commit_stop(8).unwrap();

        // Assert
        assert_eq!(car.estimate_cost(&Signal::hall_down(3)), None);
        assert_eq!(car.estimate_cost(&Signal::hall_up(3)), None);
        assert_eq!(car.estimate_cost(&Signal::hall_down(7)), None);
        assert_eq!(car.estimate_cost(&Signal::cabin(None, 7, 2)), None);
    }

    #[test]
    fn test_car_cost_emergency_ignores_direction() {
        // Arrange
        let mut car = setup_car(5);
        car.commit_stop(8).unwrap();

        // Assert
        assert_eq!(car.estimate_cost(&Signal::emergency(3)), Some(2));
    }

    #[test]
    fn test_car_cost_out_of_service() {
        // Arrange
        let mut car = setup_car(5);
        car.take_out_of_service();

        // Assert
        assert_eq!(car.state(), OutOfService);
        assert_eq!(car.estimate_cost(&Signal::hall_up(5)), None);
        assert_eq!(car.estimate_cost(&Signal::emergency(5)), None);
        assert_eq!(car.step(), StepOutcome::OutOfService);
    }

    #[test]
    fn test_car_snapshot_traversal_order() {
        // Arrange
        let mut up = setup_car(5);
        let mut door_open = setup_car(5);
        for floor in [8, 2, 6, 1, 10] {
            up.commit_stop(floor).unwrap();
        }
        door_open.commit_stop(5).unwrap();
        for floor in [8, 4] {
            door_open.commit_stop(floor).unwrap();
        }

        // Act
        let up_stops = up.snapshot().stops;
        let door_open_stops = door_open.snapshot().stops;

        // Assert
        assert_eq!(up.direction(), Direction::Up);
        assert_eq!(up_stops, vec![6, 8, 10, 2, 1]);
        assert_eq!(door_open.direction(), Direction::Idle);
        assert_eq!(door_open_stops, vec![4, 8]);
    }

    #[test]
    fn test_car_out_of_service_orphans_hall_calls() {
        // Arrange
        let mut car = setup_car(0);
        car.commit_hall_call(4, Direction::Up).unwrap();
        car.commit_hall_call(9, Direction::Down).unwrap();
        car.commit_stop(7).unwrap();

        // Act
        let orphaned = car.take_out_of_service();

        // Assert
        assert_eq!(orphaned, vec![Signal::hall_up(4), Signal::hall_down(9)]);
        assert_eq!(car.state(), OutOfService);
        assert!(car.snapshot().stops.is_empty());
    }

    #[test]
    fn test_car_hall_call_cleared_on_arrival() {
        // Arrange
        let mut car = setup_car(0);
        car.commit_hall_call(2, Direction::Up).unwrap();
        assert!(car.has_hall_call(2, Direction::Up));

        // Act
        let floor = run_until_arrival(&mut car);

        // Assert
        assert_eq!(floor, 2);
        assert!(!car.has_hall_call(2, Direction::Up));
        assert!(car.take_out_of_service().is_empty());
    }

    #[test]
    fn test_car_readmit() {
        // Arrange
        let mut car = setup_car(3);
        car.commit_stop(6).unwrap();
        car.step();
        car.take_out_of_service();

        // Act
        car.readmit();

        // Assert
        assert_eq!(car.state(), Idle);
        assert_eq!(car.current_floor(), 4);
        assert!(car.commit_stop(6).is_ok());
        assert_eq!(car.state(), MovingUp);
    }
}
