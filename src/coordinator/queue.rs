/***************************************/
/*        3rd party libraries          */
/***************************************/
use crossbeam_channel as cbc;
use log::warn;

/***************************************/
/*           Local modules             */
/***************************************/
use crate::config::{BuildingConfig, DispatchConfig};
use crate::shared::{CarId, DispatchError, DispatchRecord, Floor, Result, Signal, SignalKind};

/***************************************/
/*       Public data structures        */
/***************************************/

/// A queued signal together with the channel its decision is sent back on.
pub struct Envelope {
    pub signal: Signal,
    reply: Option<cbc::Sender<Result<DispatchRecord>>>,
}

impl Envelope {
    pub fn detached(signal: Signal) -> Envelope {
        Envelope {
            signal,
            reply: None,
        }
    }

    pub fn respond(self, result: Result<DispatchRecord>) {
        match self.reply {
            Some(reply) => {
                // The producer may have given up waiting
                let _ = reply.send(result);
            }
            None => {
                if let Err(e) = result {
                    warn!("Unanswered signal {:?} failed: {}", self.signal, e);
                }
            }
        }
    }
}

/// Receiving side of the inbound queue, owned by the dispatcher.
pub struct SignalQueue {
    pub signal_rx: cbc::Receiver<Envelope>,
    pub emergency_rx: cbc::Receiver<Envelope>,
}

/**
 * Producer side of the inbound queue.
 *
 * Cheap to clone and safe to share between any number of panels. Signals are validated before
 * they are queued. Ordinary signals fail with `QueueOverflow` once their lane is full, while
 * emergency signals have a lane of their own that the dispatcher always drains first.
 */
#[derive(Clone)]
pub struct DispatchHandle {
    signal_tx: cbc::Sender<Envelope>,
    emergency_tx: cbc::Sender<Envelope>,
    building: BuildingConfig,
    queue_capacity: usize,
    emergency_capacity: usize,
}

/***************************************/
/*             Public API              */
/***************************************/
pub fn signal_queue(config: &DispatchConfig, building: BuildingConfig) -> (DispatchHandle, SignalQueue) {
    let (signal_tx, signal_rx) = cbc::bounded::<Envelope>(config.queue_capacity);
    let (emergency_tx, emergency_rx) = cbc::bounded::<Envelope>(config.emergency_capacity);

    (
        DispatchHandle {
            signal_tx,
            emergency_tx,
            building,
            queue_capacity: config.queue_capacity,
            emergency_capacity: config.emergency_capacity,
        },
        SignalQueue {
            signal_rx,
            emergency_rx,
        },
    )
}

impl DispatchHandle {
    /// Queues a signal without waiting for the decision.
    pub fn submit(&self, signal: Signal) -> Result<()> {
        self.enqueue(Envelope::detached(signal))
    }

    /// Queues a signal and blocks until the dispatcher has decided on it.
    pub fn request(&self, signal: Signal) -> Result<DispatchRecord> {
        let (reply_tx, reply_rx) = cbc::bounded::<Result<DispatchRecord>>(1);
        self.enqueue(Envelope {
            signal,
            reply: Some(reply_tx),
        })?;

        reply_rx.recv().unwrap_or(Err(DispatchError::ShuttingDown))
    }

    pub fn handle_signal(&self, signal: Signal) -> Result<CarId> {
        self.request(signal).map(|record| record.assigned_car)
    }

    /// Signals accepted on either lane that the dispatcher has not picked up yet.
    pub fn queued(&self) -> usize {
        self.signal_tx.len() + self.emergency_tx.len()
    }

    pub fn validate(&self, signal: &Signal) -> Result<()> {
        self.check_floor(signal.origin_floor())?;

        if signal.kind() == SignalKind::Cabin {
            let target = signal.target_floor().ok_or_else(|| DispatchError::InvalidSignal {
                reason: "cabin call without a target floor".to_string(),
            })?;
            self.check_floor(target)?;
        }
        Ok(())
    }

    fn check_floor(&self, floor: Floor) -> Result<()> {
        if self.building.contains(floor) {
            Ok(())
        } else {
            Err(DispatchError::InvalidFloor {
                floor,
                min: self.building.min_floor,
                max: self.building.max_floor,
            })
        }
    }

    fn enqueue(&self, envelope: Envelope) -> Result<()> {
        self.validate(&envelope.signal)?;

        let (lane, capacity) = if envelope.signal.is_emergency() {
            (&self.emergency_tx, self.emergency_capacity)
        } else {
            (&self.signal_tx, self.queue_capacity)
        };

        lane.try_send(envelope).map_err(|e| match e {
            cbc::TrySendError::Full(_) => DispatchError::QueueOverflow { capacity },
            cbc::TrySendError::Disconnected(_) => DispatchError::ShuttingDown,
        })
    }
}
