/***************************************/
/*        3rd party libraries          */
/***************************************/
use crossbeam_channel as cbc;
use log::{debug, info, warn};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

/***************************************/
/*           Local modules             */
/***************************************/
use crate::config::DispatchConfig;
use crate::coordinator::queue::{Envelope, SignalQueue};
use crate::elevator::{CarHandle, FleetRegistry};
use crate::shared::{
    CarEvent, CarId, Direction, DispatchError, DispatchRecord, Floor, Outcome, Result, Signal,
    SignalKind,
};

const IDLE_POLL: Duration = Duration::from_millis(100);

/***************************************/
/*               Enums                 */
/***************************************/
enum Event {
    NewSignal(Envelope),
    CarUpdate(CarEvent),
    CarEventsClosed,
    NoEvent,
    Terminate,
}

struct PendingRetry {
    envelope: Envelope,
    deadline: Instant,
}

/***************************************/
/*             Public API              */
/***************************************/

/**
 * Single decision-maker of the fleet.
 *
 * The dispatcher drains the signal queue on its own thread, so no two assignment decisions
 * are ever made at the same time. Every signal ends as one committed stop on one car, as an
 * already satisfied hall call, or as an error sent back to the producer.
 *
 * # Fields
 * - `registry`:        Fleet registry used for scoring and committing.
 * - `queue`:           Receiving side of the ordinary and emergency lanes.
 * - `car_event_rx`:    Arrivals and service changes reported by the movers.
 * - `terminate_rx`:    Stops the dispatcher.
 * - `retry_delay`:     How long an unservable signal waits before its final attempt.
 * - `pending`:         Signals waiting for a car to become available.
 */
pub struct Dispatcher {
    registry: Arc<FleetRegistry>,
    queue: SignalQueue,
    car_event_rx: cbc::Receiver<CarEvent>,
    terminate_rx: cbc::Receiver<()>,
    retry_delay: Duration,
    pending: Vec<PendingRetry>,
}

impl Dispatcher {
    pub fn new(
        config: &DispatchConfig,
        registry: Arc<FleetRegistry>,
        queue: SignalQueue,
        car_event_rx: cbc::Receiver<CarEvent>,
        terminate_rx: cbc::Receiver<()>,
    ) -> Dispatcher {
        Dispatcher {
            registry,
            queue,
            car_event_rx,
            terminate_rx,
            retry_delay: config.retry_delay(),
            pending: Vec::new(),
        }
    }

    pub fn run(mut self) {
        info!(
            "Dispatcher started with {} car(s), {} in service",
            self.registry.len(),
            self.registry.in_service_count()
        );

        // Main loop
        loop {
            match self.wait_for_event() {
                Event::Terminate => break,
                event => self.handle_event(event),
            }
        }

        self.shutdown();
    }

    /// Decides which car serves `signal` and commits the stop(s) on it.
    pub fn assign(&self, signal: &Signal) -> Result<DispatchRecord> {
        let floor = signal.origin_floor();

        if let Some(direction) = signal.hall_direction() {
            if let Some(car_id) = self.existing_assignee(floor, direction) {
                debug!("Hall call {:?} already served by car {}", signal, car_id);
                return Ok(DispatchRecord {
                    signal: *signal,
                    assigned_car: car_id,
                    outcome: Outcome::AlreadySatisfied,
                });
            }
        }

        let winner = self
            .select_car(signal, &BTreeSet::new())?
            .ok_or(DispatchError::NoElevatorAvailable { floor })?;
        self.commit_or_rescore(signal, winner)
    }

    /**
     * Commits `signal` on the scored `winner`.
     *
     * The scores can go stale before the commit. A winner that has left service in the meantime
     * is excluded and the remaining cars are scored again, until a commit succeeds or no car is
     * left.
     */
    pub(crate) fn commit_or_rescore(
        &self,
        signal: &Signal,
        winner: CarHandle,
    ) -> Result<DispatchRecord> {
        let mut winner = winner;
        let mut excluded = BTreeSet::new();
        loop {
            match self.commit(&winner, signal) {
                Ok(()) => {
                    info!("Signal {:?} assigned to car {}", signal, winner.id());
                    return Ok(DispatchRecord {
                        signal: *signal,
                        assigned_car: winner.id(),
                        outcome: Outcome::Committed,
                    });
                }
                Err(DispatchError::OutOfService(car_id)) => {
                    warn!("Car {} left service before commit, re-scoring", car_id);
                    excluded.insert(car_id);
                    winner = self
                        .select_car(signal, &excluded)?
                        .ok_or(DispatchError::NoElevatorAvailable {
                            floor: signal.origin_floor(),
                        })?;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::NewSignal(envelope) => self.process(envelope),

            Event::CarUpdate(CarEvent::Arrived { car_id, floor }) => {
                debug!("Car {} arrived at floor {}", car_id, floor);
                self.retry_pending(false);
            }

            Event::CarUpdate(CarEvent::Faulted { car_id, orphaned }) => {
                warn!(
                    "Car {} is out of service, reassigning {} hall call(s)",
                    car_id,
                    orphaned.len()
                );
                for signal in orphaned {
                    self.process(Envelope::detached(signal));
                }
            }

            Event::CarUpdate(CarEvent::Readmitted { car_id }) => {
                info!("Car {} is back in service", car_id);
                self.retry_pending(false);
            }

            Event::CarEventsClosed => {
                warn!("All car movers are gone, no more arrivals will be reported");
                self.car_event_rx = cbc::never();
            }

            Event::NoEvent => self.retry_pending(true),

            Event::Terminate => {}
        }
    }

    fn wait_for_event(&self) -> Event {
        // Emergency lane always goes first
        if let Ok(envelope) = self.queue.emergency_rx.try_recv() {
            return Event::NewSignal(envelope);
        }

        let timeout = self.next_timeout();
        cbc::select! {
            recv(self.terminate_rx) -> _ => Event::Terminate,

            recv(self.queue.emergency_rx) -> envelope => {
                match envelope {
                    Ok(envelope) => Event::NewSignal(envelope),
                    Err(_) => Event::Terminate,
                }
            },

            recv(self.queue.signal_rx) -> envelope => {
                match envelope {
                    Ok(envelope) => Event::NewSignal(envelope),
                    Err(_) => Event::Terminate,
                }
            },

            recv(self.car_event_rx) -> car_event => {
                match car_event {
                    Ok(car_event) => Event::CarUpdate(car_event),
                    Err(_) => Event::CarEventsClosed,
                }
            },

            default(timeout) => Event::NoEvent,
        }
    }

    fn next_timeout(&self) -> Duration {
        let now = Instant::now();
        self.pending
            .iter()
            .map(|retry| retry.deadline.saturating_duration_since(now))
            .min()
            .map_or(IDLE_POLL, |until| until.min(IDLE_POLL))
    }

    fn process(&mut self, envelope: Envelope) {
        match self.assign(&envelope.signal) {
            Err(DispatchError::NoElevatorAvailable { floor }) => {
                debug!("No car for floor {} yet, retrying later", floor);
                self.pending.push(PendingRetry {
                    envelope,
                    deadline: Instant::now() + self.retry_delay,
                });
            }
            result => envelope.respond(result),
        }
    }

    // Re-scores parked signals. Expired ones get their last attempt.
    fn retry_pending(&mut self, expired_only: bool) {
        if self.pending.is_empty() {
            return;
        }

        let now = Instant::now();
        for retry in std::mem::take(&mut self.pending) {
            let expired = retry.deadline <= now;
            if expired_only && !expired {
                self.pending.push(retry);
                continue;
            }

            match self.assign(&retry.envelope.signal) {
                Err(DispatchError::NoElevatorAvailable { .. }) if !expired => {
                    self.pending.push(retry)
                }
                result => {
                    if let Err(e) = &result {
                        warn!("Signal {:?} failed after retry: {}", retry.envelope.signal, e);
                    }
                    retry.envelope.respond(result);
                }
            }
        }
    }

    fn select_car(&self, signal: &Signal, excluded: &BTreeSet<CarId>) -> Result<Option<CarHandle>> {
        // A cabin call belongs to the car it was placed in
        if let (SignalKind::Cabin, Some(car_id)) = (signal.kind(), signal.car()) {
            let handle = self.registry.get(car_id)?;
            if excluded.contains(&car_id) || !handle.is_in_service() {
                return Ok(None);
            }
            return Ok(Some(handle));
        }

        let winner = self
            .registry
            .list_in_service()
            .iter()
            .filter(|handle| !excluded.contains(&handle.id()))
            .filter_map(|handle| handle.estimate_cost(signal).map(|cost| (cost, handle)))
            .min_by_key(|(cost, handle)| (*cost, handle.id()))
            .map(|(_, handle)| handle);

        Ok(winner)
    }

    fn commit(&self, handle: &CarHandle, signal: &Signal) -> Result<()> {
        let mut car = handle.write()?;
        let origin = signal.origin_floor();

        match signal.hall_direction() {
            Some(direction) => car.commit_hall_call(origin, direction)?,
            None => car.commit_stop(origin)?,
        }

        if signal.kind() == SignalKind::Cabin {
            if let Some(target) = signal.target_floor() {
                car.commit_stop(target)?;
            }
        }
        Ok(())
    }

    fn existing_assignee(&self, floor: Floor, direction: Direction) -> Option<CarId> {
        self.registry
            .list_in_service()
            .iter()
            .find(|handle| {
                handle
                    .read()
                    .map(|car| car.has_hall_call(floor, direction))
                    .unwrap_or(false)
            })
            .map(|handle| handle.id())
    }

    fn shutdown(&mut self) {
        info!("Dispatcher shutting down");

        // Stop taking new work, queued signals are turned away
        let queued: Vec<Envelope> = self
            .queue
            .emergency_rx
            .try_iter()
            .chain(self.queue.signal_rx.try_iter())
            .collect();
        for envelope in queued {
            envelope.respond(Err(DispatchError::ShuttingDown));
        }

        // Parked signals are already in flight and get a final attempt
        for retry in std::mem::take(&mut self.pending) {
            let result = self.assign(&retry.envelope.signal);
            retry.envelope.respond(result);
        }

        info!("Dispatcher terminated");
    }
}
