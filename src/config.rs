/***************************************/
/*        3rd party libraries          */
/***************************************/
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

/***************************************/
/*           Local modules             */
/***************************************/
use crate::shared::{CarId, ConfigError, Floor};

/***************************************/
/*       Public data structures        */
/***************************************/
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    pub building: BuildingConfig,
    pub fleet: FleetConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub mover: MoverConfig,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct BuildingConfig {
    pub min_floor: Floor,
    pub max_floor: Floor,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct FleetConfig {
    pub cars: Vec<CarConfig>,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct CarConfig {
    pub id: CarId,
    pub home_floor: Floor,
}

/// Queue sizes and the retry window of the dispatch controller. Times are in milliseconds.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct DispatchConfig {
    pub queue_capacity: usize,
    pub emergency_capacity: usize,
    pub retry_delay: u64,
}

/// Pace of every car mover. Times are in milliseconds.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct MoverConfig {
    pub tick: u64,
    pub door_open_time: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        DispatchConfig {
            queue_capacity: 64,
            emergency_capacity: 8,
            retry_delay: 2000,
        }
    }
}

impl Default for MoverConfig {
    fn default() -> Self {
        MoverConfig {
            tick: 500,
            door_open_time: 1500,
        }
    }
}

impl BuildingConfig {
    pub fn contains(&self, floor: Floor) -> bool {
        (self.min_floor..=self.max_floor).contains(&floor)
    }
}

impl DispatchConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay)
    }
}

impl MoverConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick)
    }

    pub fn door_open_time(&self) -> Duration {
        Duration::from_millis(self.door_open_time)
    }
}

/***************************************/
/*             Public API              */
/***************************************/
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let config_str = fs::read_to_string(path)?;
    parse_config(&config_str)
}

pub fn parse_config(config_str: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(config_str)?;
    config.validate()?;
    Ok(config)
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let building = &self.building;
        if building.min_floor >= building.max_floor {
            return Err(ConfigError::invalid(format!(
                "min_floor {} must be below max_floor {}",
                building.min_floor, building.max_floor
            )));
        }

        if self.fleet.cars.is_empty() {
            return Err(ConfigError::invalid("fleet has no cars"));
        }

        let mut seen = HashSet::new();
        for car in &self.fleet.cars {
            if !seen.insert(car.id) {
                return Err(ConfigError::invalid(format!("duplicate car id {}", car.id)));
            }
            if !building.contains(car.home_floor) {
                return Err(ConfigError::invalid(format!(
                    "car {} home floor {} is outside {}..={}",
                    car.id, car.home_floor, building.min_floor, building.max_floor
                )));
            }
        }

        if self.dispatch.queue_capacity == 0 || self.dispatch.emergency_capacity == 0 {
            return Err(ConfigError::invalid("queue capacities must be positive"));
        }

        if self.mover.tick == 0 {
            return Err(ConfigError::invalid("mover tick must be positive"));
        }

        Ok(())
    }
}
