use crossbeam_channel as cbc;
use log::{debug, error, info, warn};
use std::thread::{Builder, JoinHandle};
use std::time::{Duration, Instant};

use crate::config::MoverConfig;
use crate::elevator::car::StepOutcome;
use crate::elevator::fleet::CarHandle;
use crate::shared::{CarEvent, CarId, DispatchError, DoorState, Result};

enum Event {
    Command(MoverCommand),
    Tick,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoverCommand {
    Fault,
    Readmit,
    Terminate,
}

/**
 * Drives one car through its stop list.
 *
 * Each car gets its own mover thread. On every tick the mover steps the car one floor (or
 * closes its door once the dwell time is over) and reports arrivals to the dispatcher so that
 * signals waiting for a retry can be re-scored straight away.
 *
 * # Fields
 * - `car`:             Handle to the car this mover owns.
 * - `tick`:            Time between two steps.
 * - `door_open_time`:  How long the door stays open after an arrival.
 * - `door_deadline`:   When the currently open door may close.
 * - `command_rx`:      Receives fault, readmit and terminate commands.
 * - `car_event_tx`:    Sends arrivals and service changes to the dispatcher.
 */
pub struct CarMover {
    car: CarHandle,
    tick: Duration,
    door_open_time: Duration,
    door_deadline: Option<Instant>,
    command_rx: cbc::Receiver<MoverCommand>,
    car_event_tx: cbc::Sender<CarEvent>,
}

impl CarMover {
    pub fn new(
        config: &MoverConfig,
        car: CarHandle,
        command_rx: cbc::Receiver<MoverCommand>,
        car_event_tx: cbc::Sender<CarEvent>,
    ) -> CarMover {
        CarMover {
            car,
            tick: config.tick(),
            door_open_time: config.door_open_time(),
            door_deadline: None,
            command_rx,
            car_event_tx,
        }
    }

    pub fn run(mut self) {
        info!("Car {} mover started", self.car.id());

        loop {
            let result = match self.wait_for_event() {
                Event::Command(MoverCommand::Fault) => self.handle_fault(),
                Event::Command(MoverCommand::Readmit) => self.handle_readmit(),
                Event::Command(MoverCommand::Terminate) => break,
                Event::Tick => self.step(),
            };

            if let Err(e) = result {
                error!("Car {} mover stopped: {}", self.car.id(), e);
                break;
            }
        }

        info!("Car {} mover terminated", self.car.id());
    }

    fn wait_for_event(&self) -> Event {
        cbc::select! {
            recv(self.command_rx) -> command => {
                // A dropped handle means nobody can stop us any more
                Event::Command(command.unwrap_or(MoverCommand::Terminate))
            }
            default(self.tick) => Event::Tick,
        }
    }

    fn step(&mut self) -> Result<()> {
        let now = Instant::now();
        if matches!(self.door_deadline, Some(deadline) if now < deadline) {
            return Ok(());
        }

        let outcome = {
            let mut car = self.car.write()?;

            // Door opened by a commit at the current floor, start the dwell first
            if car.door() == DoorState::Open && self.door_deadline.is_none() {
                self.door_deadline = Some(now + self.door_open_time);
                return Ok(());
            }
            self.door_deadline = None;
            car.step()
        };

        let car_id = self.car.id();
        match outcome {
            StepOutcome::Arrived(floor) => {
                info!("Car {} arrived at floor {}", car_id, floor);
                self.door_deadline = Some(now + self.door_open_time);
                self.notify(CarEvent::Arrived { car_id, floor });
            }
            StepOutcome::Moved(floor) => debug!("Car {} passing floor {}", car_id, floor),
            StepOutcome::DoorClosed(state) => {
                debug!("Car {} closed its door, now {:?}", car_id, state)
            }
            StepOutcome::Idle | StepOutcome::OutOfService => {}
        }
        Ok(())
    }

    fn handle_fault(&mut self) -> Result<()> {
        let car_id = self.car.id();
        let orphaned = self.car.write()?.take_out_of_service();
        self.door_deadline = None;

        warn!(
            "Car {} taken out of service, {} hall call(s) to reassign",
            car_id,
            orphaned.len()
        );
        self.notify(CarEvent::Faulted { car_id, orphaned });
        Ok(())
    }

    fn handle_readmit(&mut self) -> Result<()> {
        let car_id = self.car.id();
        self.car.write()?.readmit();

        info!("Car {} readmitted to service", car_id);
        self.notify(CarEvent::Readmitted { car_id });
        Ok(())
    }

    fn notify(&self, event: CarEvent) {
        if self.car_event_tx.send(event).is_err() {
            debug!("Car {} event dropped, dispatcher is gone", self.car.id());
        }
    }
}

/// Owner side of a running mover thread.
pub struct MoverHandle {
    car_id: CarId,
    command_tx: cbc::Sender<MoverCommand>,
    thread: JoinHandle<()>,
}

impl MoverHandle {
    pub fn spawn(
        config: &MoverConfig,
        car: CarHandle,
        car_event_tx: cbc::Sender<CarEvent>,
    ) -> std::io::Result<MoverHandle> {
        let car_id = car.id();
        let (command_tx, command_rx) = cbc::unbounded::<MoverCommand>();
        let mover = CarMover::new(config, car, command_rx, car_event_tx);

        let thread = Builder::new()
            .name(format!("car_mover_{}", car_id))
            .spawn(move || mover.run())?;

        Ok(MoverHandle {
            car_id,
            command_tx,
            thread,
        })
    }

    pub fn car_id(&self) -> CarId {
        self.car_id
    }

    pub fn fault(&self) -> Result<()> {
        self.send(MoverCommand::Fault)
    }

    pub fn readmit(&self) -> Result<()> {
        self.send(MoverCommand::Readmit)
    }

    pub fn shutdown(self) {
        let _ = self.command_tx.send(MoverCommand::Terminate);
        if self.thread.join().is_err() {
            error!("Car {} mover panicked", self.car_id);
        }
    }

    fn send(&self, command: MoverCommand) -> Result<()> {
        self.command_tx
            .send(command)
            .map_err(|_| DispatchError::OutOfService(self.car_id))
    }
}
