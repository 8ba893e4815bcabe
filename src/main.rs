/* 3rd party libraries */
use clap::{Parser, ValueEnum};
use crossbeam_channel as cbc;
use log::{error, info, warn};
use serde::Deserialize;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{sleep, Builder};

/* Custom libraries */
use coordinator::{DispatchHandle, Dispatcher};
use elevator::{FleetRegistry, MoverHandle};
use shared::{CarEvent, CarId, DoorState, Signal};

/* Modules */
mod config;
mod coordinator;
mod elevator;
#[macro_use]
mod shared;

#[derive(Parser, Debug)]
#[clap(
    author,
    version,
    about = "Dispatches elevator calls read as JSON lines from stdin"
)]
struct Args {
    /// Path to the TOML configuration file
    #[clap(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// What each panel prints once its signal is handled
    #[clap(short, long, value_enum, default_value = "record")]
    output: Output,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Output {
    /// The full dispatch record as JSON
    Record,
    /// Only the id of the assigned car
    Car,
    /// Nothing, signals are queued without waiting for a decision
    Quiet,
}

/// One line on stdin: a call from a panel, or a maintenance command such as `{"fault": 2}`.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum PanelInput {
    Signal(Signal),
    Maintenance(Maintenance),
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
enum Maintenance {
    Fault(CarId),
    Readmit(CarId),
}

/* Main */
fn main() -> std::io::Result<()> {
    env_logger::init();
    let args = Args::parse();

    // Load the configuration
    let config = unwrap_or_exit!(config::load_config(&args.config));

    // Initialize channels
    let (car_event_tx, car_event_rx) = cbc::unbounded::<CarEvent>();
    let (dispatcher_terminate_tx, dispatcher_terminate_rx) = cbc::unbounded::<()>();
    let (dispatch_handle, signal_queue) =
        coordinator::signal_queue(&config.dispatch, config.building);

    // Create the fleet
    let registry = Arc::new(FleetRegistry::from_config(&config.fleet, &config.building));

    // Start one mover per car
    let mut movers = Vec::new();
    for id in registry.ids() {
        let car = unwrap_or_exit!(registry.get(id));
        movers.push(MoverHandle::spawn(&config.mover, car, car_event_tx.clone())?);
    }
    drop(car_event_tx);

    // Start the dispatcher
    let dispatcher = Dispatcher::new(
        &config.dispatch,
        registry.clone(),
        signal_queue,
        car_event_rx,
        dispatcher_terminate_rx,
    );
    let dispatcher_thread = Builder::new()
        .name("dispatcher".into())
        .spawn(move || dispatcher.run())?;

    // Every line on stdin is one panel press
    let mut panels = Vec::new();
    for line in io::stdin().lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<PanelInput>(&line) {
            Ok(PanelInput::Signal(signal)) => match args.output {
                Output::Quiet => {
                    if let Err(e) = dispatch_handle.submit(signal) {
                        error!("Signal {:?} rejected: {}", signal, e);
                    }
                }
                output => panels.push(spawn_panel(dispatch_handle.clone(), signal, output)?),
            },
            Ok(PanelInput::Maintenance(command)) => maintain(&movers, command),
            Err(e) => warn!("Ignoring malformed input {:?}: {}", line, e),
        }
    }

    for panel in panels {
        if panel.join().is_err() {
            error!("Panel thread panicked");
        }
    }

    // Signals submitted without waiting are still owed a decision
    while dispatch_handle.queued() > 0 {
        sleep(config.mover.tick());
    }

    // Let the cars finish their trips before stopping
    wait_for_idle_fleet(&registry, config.mover.tick());

    let _ = dispatcher_terminate_tx.send(());
    if dispatcher_thread.join().is_err() {
        error!("Dispatcher thread panicked");
    }
    for mover in movers {
        info!("Stopping mover for car {}", mover.car_id());
        mover.shutdown();
    }

    for snapshot in registry.snapshots() {
        info!(
            "Car {} parked at floor {} ({:?})",
            snapshot.id, snapshot.current_floor, snapshot.state
        );
    }

    Ok(())
}

fn spawn_panel(
    handle: DispatchHandle,
    signal: Signal,
    output: Output,
) -> std::io::Result<std::thread::JoinHandle<()>> {
    Builder::new()
        .name("panel".into())
        .spawn(move || report(&handle, signal, output))
}

fn report(handle: &DispatchHandle, signal: Signal, output: Output) {
    if output == Output::Car {
        match handle.handle_signal(signal) {
            Ok(car_id) => println!("{}", car_id),
            Err(e) => error!("Dispatch failed: {}", e),
        }
        return;
    }

    match handle.request(signal) {
        Ok(record) => match serde_json::to_string(&record) {
            Ok(json) => println!("{}", json),
            Err(e) => error!("Failed to serialize dispatch record: {}", e),
        },
        Err(e) => error!("Dispatch failed: {}", e),
    }
}

fn maintain(movers: &[MoverHandle], command: Maintenance) {
    let car_id = match command {
        Maintenance::Fault(car_id) | Maintenance::Readmit(car_id) => car_id,
    };
    let Some(mover) = movers.iter().find(|mover| mover.car_id() == car_id) else {
        warn!("No car {} to send {:?} to", car_id, command);
        return;
    };

    let result = match command {
        Maintenance::Fault(_) => mover.fault(),
        Maintenance::Readmit(_) => mover.readmit(),
    };
    if let Err(e) = result {
        error!("Car {} did not take {:?}: {}", car_id, command, e);
    }
}

fn wait_for_idle_fleet(registry: &FleetRegistry, tick: std::time::Duration) {
    loop {
        let busy = registry
            .snapshots()
            .iter()
            .any(|car| !car.stops.is_empty() || car.door == DoorState::Open);
        if !busy {
            return;
        }
        sleep(tick);
    }
}
