/*
 * Unit tests for the car mover
 *
 * The unit tests follows the Arrange, Act, Assert pattern.
 * Movers run on their own thread with a short tick, events are read with a timeout.
 *
 * Tests:
 *  - test_mover_reports_arrival
 *  - test_mover_serves_stops_in_scan_order
 *  - test_mover_fault_orphans_hall_calls
 *  - test_mover_readmit
 */

/***************************************/
/*             Unit tests              */
/***************************************/
#[cfg(test)]
mod mover_tests {
    use crate::config::{BuildingConfig, MoverConfig};
    use crate::elevator::car::Car;
    use crate::elevator::{CarHandle, MoverHandle};
    use crate::shared::{CarEvent, CarState, Direction, Signal};
    use crossbeam_channel::{unbounded, Receiver};
    use std::time::Duration;

    const TIMEOUT: Duration = Duration::from_secs(3);

    fn setup_mover(floor: i32) -> (MoverHandle, CarHandle, Receiver<CarEvent>) {
        // Arrange mock channels
        let (car_event_tx, car_event_rx) = unbounded::<CarEvent>();

        // Default configuration
        let building = BuildingConfig {
            min_floor: 0,
            max_floor: 10,
        };
        let config = MoverConfig {
            tick: 5,
            door_open_time: 10,
        };

        let car = CarHandle::new(Car::new(1, floor, &building));
        let mover = MoverHandle::spawn(&config, car.clone(), car_event_tx).unwrap();
        (mover, car, car_event_rx)
    }

    fn next_event(car_event_rx: &Receiver<CarEvent>) -> CarEvent {
        match car_event_rx.recv_timeout(TIMEOUT) {
            Ok(event) => event,
            Err(e) => panic!("Timed out waiting for car event: {:?}", e),
        }
    }

    #[test]
    fn test_mover_reports_arrival() {
        // Arrange
        let (mover, car, car_event_rx) = setup_mover(0);

        // Act
        car.write().unwrap().commit_stop(3).unwrap();

        // Assert
        assert_eq!(
            next_event(&car_event_rx),
            CarEvent::Arrived { car_id: 1, floor: 3 }
        );
        let snapshot = car.snapshot().unwrap();
        assert_eq!(snapshot.current_floor, 3);
        assert!(snapshot.stops.is_empty());

        // Cleanup
        mover.shutdown();
    }

    #[test]
    fn test_mover_serves_stops_in_scan_order() {
        // Arrange
        let (mover, car, car_event_rx) = setup_mover(5);

        // Act
        {
            let mut car = car.write().unwrap();
            car.commit_stop(7).unwrap();
            car.commit_stop(2).unwrap();
            car.commit_stop(9).unwrap();
        }

        // Assert
        let floors: Vec<CarEvent> = (0..3).map(|_| next_event(&car_event_rx)).collect();
        assert_eq!(
            floors,
            vec![
                CarEvent::Arrived { car_id: 1, floor: 7 },
                CarEvent::Arrived { car_id: 1, floor: 9 },
                CarEvent::Arrived { car_id: 1, floor: 2 },
            ]
        );

        // Cleanup
        mover.shutdown();
    }

    #[test]
    fn test_mover_fault_orphans_hall_calls() {
        // Arrange
        let (mover, car, car_event_rx) = setup_mover(0);
        car.write()
            .unwrap()
            .commit_hall_call(10, Direction::Down)
            .unwrap();

        // Act
        mover.fault().unwrap();

        // Assert
        let mut event = next_event(&car_event_rx);
        while matches!(event, CarEvent::Arrived { .. }) {
            event = next_event(&car_event_rx);
        }
        assert_eq!(
            event,
            CarEvent::Faulted {
                car_id: 1,
                orphaned: vec![Signal::hall_down(10)],
            }
        );
        assert_eq!(car.snapshot().unwrap().state, CarState::OutOfService);
        assert!(!car.is_in_service());

        // Cleanup
        mover.shutdown();
    }

    #[test]
    fn test_mover_readmit() {
        // Arrange
        let (mover, car, car_event_rx) = setup_mover(4);
        mover.fault().unwrap();
        next_event(&car_event_rx);

        // Act
        mover.readmit().unwrap();

        // Assert
        assert_eq!(next_event(&car_event_rx), CarEvent::Readmitted { car_id: 1 });
        assert!(car.is_in_service());
        car.write().unwrap().commit_stop(5).unwrap();
        assert_eq!(
            next_event(&car_event_rx),
            CarEvent::Arrived { car_id: 1, floor: 5 }
        );

        // Cleanup
        mover.shutdown();
    }
}
